//! Project reorganization: scan the tree, plan a randomized layout, move files.
//!
//! ```text
//! scan ──> Inventory ──> layout::generate ──> LayoutPlan ──> migrate ──> MappingLedger
//! ```
//!
//! Paths handed between the stages are root-relative strings using `/`
//! separators, so the ledger reads the same on every platform.

pub mod layout;
pub mod migrator;
pub mod scanner;

use std::path::{Path, PathBuf};

use tracing::info;

use crate::context::ServiceContext;
use crate::ledger::MappingLedger;

pub use layout::LayoutPlan;
pub use migrator::MigrationReport;
pub use scanner::scan;

/// Directories never descended into or relocated.
pub const PRESERVED_DIRECTORIES: &[&str] = &[
    "node_modules",
    ".git",
    ".vscode",
    ".idea",
    "dist",
    "build",
    "coverage",
    "test",
    "tests",
    ".svn",
    ".hg",
    "vendor",
    "packages",
];

/// Package and metadata files left out of the inventory entirely.
pub const PRESERVED_FILES: &[&str] = &[
    "package.json",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    ".gitignore",
    ".gitattributes",
    "README.md",
    "LICENSE",
    "CHANGELOG.md",
    "tsconfig.json",
    "webpack.config.js",
    "vite.config.js",
    "rollup.config.js",
];

/// Base names (case-insensitive, extension ignored) that keep their location.
pub const RESERVED_BASE_NAMES: &[&str] = &["index", "main", "app", "config"];

/// Whether an inventory entry is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
}

/// A file or directory discovered by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryEntry {
    /// Entry name without any directory part.
    pub name: String,
    /// Path relative to the scanned root, `/`-separated.
    pub relative_path: String,
    /// Absolute path on disk at scan time.
    pub absolute_path: PathBuf,
    /// File or directory.
    pub kind: EntryKind,
    /// Relative path of the parent directory (`""` for the root).
    pub containing_dir: String,
}

/// Everything the scanner found, split by kind.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    /// Directories, depth-first order.
    pub directories: Vec<InventoryEntry>,
    /// Files, depth-first order.
    pub files: Vec<InventoryEntry>,
}

/// Outcome of one reorganization pass.
#[derive(Debug, Clone)]
pub struct ReorganizeReport {
    /// Number of directories inventoried.
    pub directories_scanned: usize,
    /// Number of files inventoried.
    pub files_scanned: usize,
    /// The plan that was executed.
    pub plan: LayoutPlan,
    /// What the migrator actually did.
    pub migration: MigrationReport,
}

/// Scans `root`, plans a random layout and migrates files into it.
///
/// # Errors
///
/// Returns an error if the scan fails; migration problems are reported per
/// file in the returned report instead.
pub fn reorganize(
    ctx: &ServiceContext,
    root: &Path,
    ledger: &mut MappingLedger,
) -> Result<ReorganizeReport, String> {
    let inventory = scan(ctx, root)?;
    info!(
        directories = inventory.directories.len(),
        files = inventory.files.len(),
        "project scanned"
    );

    let plan = layout::generate(ctx.entropy.as_ref(), &inventory);
    info!(
        synthetic = plan.new_directories.len(),
        relocating = plan.file_assignment.len(),
        preserved = plan.preserved.len(),
        "layout planned"
    );

    let migration = migrator::migrate(ctx, root, &plan, ledger);
    info!(
        moved = migration.moved,
        conflicts = migration.conflicts.len(),
        failed = migration.failed,
        pruned = migration.pruned_dirs,
        "files migrated"
    );

    Ok(ReorganizeReport {
        directories_scanned: inventory.directories.len(),
        files_scanned: inventory.files.len(),
        plan,
        migration,
    })
}

/// Returns `true` if `name` is a preserved directory name.
#[must_use]
pub fn is_preserved_dir(name: &str) -> bool {
    PRESERVED_DIRECTORIES.contains(&name)
}

/// Returns `true` if the file's base name (without extension) is reserved.
#[must_use]
pub fn is_reserved_base_name(file_name: &str) -> bool {
    let (stem, _) = split_extension(file_name);
    RESERVED_BASE_NAMES.iter().any(|reserved| stem.eq_ignore_ascii_case(reserved))
}

/// Splits `name` into stem and extension (extension keeps its dot).
///
/// A leading dot is part of the stem, so `.env` has no extension.
#[must_use]
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}

/// Joins a relative directory and a name with `/`.
#[must_use]
pub fn join_relative(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

/// Resolves a `/`-separated relative path against `root`.
#[must_use]
pub fn resolve(root: &Path, relative: &str) -> PathBuf {
    relative.split('/').filter(|s| !s.is_empty()).fold(root.to_path_buf(), |p, s| p.join(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    use crate::ledger::Category;

    #[test]
    fn reserved_base_names_ignore_case_and_extension() {
        assert!(is_reserved_base_name("index.html"));
        assert!(is_reserved_base_name("Main.JS"));
        assert!(is_reserved_base_name("config"));
        assert!(!is_reserved_base_name("indexer.js"));
        assert!(!is_reserved_base_name("logo.png"));
    }

    #[test]
    fn split_extension_handles_dotfiles() {
        assert_eq!(split_extension("logo.png"), ("logo", ".png"));
        assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", ".gz"));
        assert_eq!(split_extension(".env"), (".env", ""));
        assert_eq!(split_extension("Makefile"), ("Makefile", ""));
    }

    #[test]
    fn resolve_splits_on_forward_slash() {
        let root = Path::new("/site");
        assert_eq!(resolve(root, "a/b/c.txt"), Path::new("/site").join("a").join("b").join("c.txt"));
        assert_eq!(resolve(root, ""), Path::new("/site"));
    }

    #[test]
    fn reorganize_moves_every_eligible_file_once() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        for (path, body) in [
            ("index.html", "<img src=\"images/logo.png\">"),
            ("images/logo.png", "png"),
            ("css/site.css", "body{}"),
            ("js/widgets/menu.js", "menu()"),
            ("docs/guide.txt", "guide"),
            ("js/main.js", "main()"),
            ("package.json", "{}"),
        ] {
            let full = resolve(root, path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(full, body).unwrap();
        }

        let ctx = ServiceContext::seeded(21);
        let mut ledger = MappingLedger::new();
        let report = reorganize(&ctx, root, &mut ledger).unwrap();

        assert_eq!(report.files_scanned, 6);
        assert_eq!(report.migration.moved, 4);
        let files = ledger.entries(Category::Files);
        for original in ["images/logo.png", "css/site.css", "js/widgets/menu.js", "docs/guide.txt"] {
            let moved_to = files.get(original).unwrap();
            assert!(resolve(root, moved_to).is_file(), "{moved_to} should exist");
            assert!(!resolve(root, original).exists(), "{original} should be gone");
        }
        assert_eq!(files.get("docs/guide.txt").unwrap().rsplit('/').next(), Some("guide.txt"));

        // Reserved names and the root entry document stay put.
        assert!(root.join("index.html").is_file());
        assert!(resolve(root, "js/main.js").is_file());
        assert!(root.join("package.json").is_file());
        assert!(!files.contains_key("index.html"));
        assert!(!files.contains_key("js/main.js"));

        // Emptied originals are pruned, directories holding preserved files are not.
        assert!(!root.join("images").exists());
        assert!(!root.join("css").exists());
        assert!(root.join("js").is_dir());
        assert!(!resolve(root, "js/widgets").exists());
    }
}
