//! Recursive project scan producing the relocation inventory.

use std::path::Path;

use crate::context::ServiceContext;

use super::{
    is_preserved_dir, join_relative, EntryKind, Inventory, InventoryEntry, PRESERVED_FILES,
};

/// Walks `root` depth-first and returns every movable directory and file.
///
/// Dot-entries, preserved directories (and everything below them) and
/// preserved metadata files are left out. Consumers must not depend on the
/// order of the returned entries.
///
/// # Errors
///
/// Returns an error naming the directory if any directory cannot be read;
/// a partial inventory is never returned.
pub fn scan(ctx: &ServiceContext, root: &Path) -> Result<Inventory, String> {
    let mut inventory = Inventory::default();
    scan_dir(ctx, root, "", &mut inventory)?;
    Ok(inventory)
}

fn scan_dir(
    ctx: &ServiceContext,
    dir: &Path,
    relative_dir: &str,
    inventory: &mut Inventory,
) -> Result<(), String> {
    let entries = ctx
        .fs
        .list_dir(dir)
        .map_err(|e| format!("failed to read directory {}: {e}", dir.display()))?;

    for entry in entries {
        if entry.name.starts_with('.') {
            continue;
        }
        let relative_path = join_relative(relative_dir, &entry.name);
        let absolute_path = dir.join(&entry.name);

        if entry.is_dir {
            if is_preserved_dir(&entry.name) {
                continue;
            }
            inventory.directories.push(InventoryEntry {
                name: entry.name,
                relative_path: relative_path.clone(),
                absolute_path: absolute_path.clone(),
                kind: EntryKind::Directory,
                containing_dir: relative_dir.to_string(),
            });
            scan_dir(ctx, &absolute_path, &relative_path, inventory)?;
        } else if !PRESERVED_FILES.contains(&entry.name.as_str()) {
            inventory.files.push(InventoryEntry {
                name: entry.name,
                relative_path,
                absolute_path,
                kind: EntryKind::File,
                containing_dir: relative_dir.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = super::super::resolve(root, relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "x").unwrap();
    }

    #[test]
    fn skips_preserved_and_hidden_entries() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(root, "index.html");
        touch(root, "package.json");
        touch(root, ".env");
        touch(root, "assets/img/logo.png");
        touch(root, "node_modules/lib/index.js");
        touch(root, ".git/HEAD");
        touch(root, ".cache/blob");
        touch(root, "tests/spec.js");

        let ctx = ServiceContext::seeded(0);
        let inventory = scan(&ctx, root).unwrap();

        let mut dirs: Vec<&str> =
            inventory.directories.iter().map(|d| d.relative_path.as_str()).collect();
        dirs.sort_unstable();
        assert_eq!(dirs, vec!["assets", "assets/img"]);

        let mut files: Vec<&str> = inventory.files.iter().map(|f| f.relative_path.as_str()).collect();
        files.sort_unstable();
        assert_eq!(files, vec!["assets/img/logo.png", "index.html"]);
    }

    #[test]
    fn entries_carry_containing_directory() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "assets/img/logo.png");

        let ctx = ServiceContext::seeded(0);
        let inventory = scan(&ctx, temp_dir.path()).unwrap();

        let logo = &inventory.files[0];
        assert_eq!(logo.name, "logo.png");
        assert_eq!(logo.containing_dir, "assets/img");
        assert_eq!(logo.kind, EntryKind::File);
        assert_eq!(logo.absolute_path, temp_dir.path().join("assets").join("img").join("logo.png"));

        let img = inventory.directories.iter().find(|d| d.name == "img").unwrap();
        assert_eq!(img.containing_dir, "assets");
        assert_eq!(img.kind, EntryKind::Directory);
    }

    #[test]
    fn unreadable_root_fails_fast() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = ServiceContext::seeded(0);
        let err = scan(&ctx, &temp_dir.path().join("missing")).unwrap_err();
        assert!(err.contains("failed to read directory"));
    }
}
