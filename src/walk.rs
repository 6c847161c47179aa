//! Tree walking for the post-migration passes.

use std::path::{Path, PathBuf};

use crate::context::ServiceContext;
use crate::restructure::is_preserved_dir;

/// The text formats the rewriting and obfuscation passes understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// `.html` / `.htm`
    Html,
    /// `.css`
    Css,
    /// `.js` / `.mjs`
    Script,
}

impl FileKind {
    /// Classifies a path by its extension (case-insensitive).
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "html" | "htm" => Some(Self::Html),
            "css" => Some(Self::Css),
            "js" | "mjs" => Some(Self::Script),
            _ => None,
        }
    }
}

/// Collects every HTML, CSS and script file below `root`.
///
/// Dot-directories and preserved directories are not entered. Results are
/// sorted so passes visit files in a stable order.
///
/// # Errors
///
/// Returns an error if a directory cannot be listed.
pub fn find_web_files(ctx: &ServiceContext, root: &Path) -> Result<Vec<(PathBuf, FileKind)>, String> {
    let mut found = Vec::new();
    collect(ctx, root, &mut found)?;
    found.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(found)
}

fn collect(ctx: &ServiceContext, dir: &Path, found: &mut Vec<(PathBuf, FileKind)>) -> Result<(), String> {
    let entries = ctx
        .fs
        .list_dir(dir)
        .map_err(|e| format!("failed to read directory {}: {e}", dir.display()))?;
    for entry in entries {
        if entry.name.starts_with('.') {
            continue;
        }
        let path = dir.join(&entry.name);
        if entry.is_dir {
            if !is_preserved_dir(&entry.name) {
                collect(ctx, &path, found)?;
            }
        } else if let Some(kind) = FileKind::from_path(&path) {
            found.push((path, kind));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn classifies_extensions() {
        assert_eq!(FileKind::from_path(Path::new("a/INDEX.HTM")), Some(FileKind::Html));
        assert_eq!(FileKind::from_path(Path::new("site.css")), Some(FileKind::Css));
        assert_eq!(FileKind::from_path(Path::new("mod.mjs")), Some(FileKind::Script));
        assert_eq!(FileKind::from_path(Path::new("logo.png")), None);
        assert_eq!(FileKind::from_path(Path::new("Makefile")), None);
    }

    #[test]
    fn finds_web_files_outside_preserved_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        for path in ["index.html", "a/b/site.css", "a/app.js", "a/logo.png", "node_modules/x.js", ".hidden/y.js"] {
            let full = root.join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(full, "").unwrap();
        }

        let ctx = ServiceContext::seeded(0);
        let found = find_web_files(&ctx, root).unwrap();
        let relative: Vec<String> = found
            .iter()
            .map(|(p, _)| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(relative, vec!["a/app.js", "a/b/site.css", "index.html"]);
    }
}
