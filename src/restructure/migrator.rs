//! Executes a [`LayoutPlan`] on disk and records the results in the ledger.

use std::path::Path;

use tracing::{debug, warn};

use crate::context::ServiceContext;
use crate::ledger::{Category, MappingLedger};

use super::{is_preserved_dir, resolve, LayoutPlan};

/// What the migrator did with the plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Files moved and recorded in the ledger.
    pub moved: usize,
    /// Original paths left in place because their target was occupied.
    pub conflicts: Vec<String>,
    /// Moves that failed for another reason.
    pub failed: usize,
    /// Empty directories removed after the moves.
    pub pruned_dirs: usize,
}

/// Moves every assigned file, records successful moves, then prunes empty directories.
///
/// An occupied target is only overwritten when it is a hidden artifact
/// (name starting with `.`); any other collision is logged and the file
/// stays where it was. Per-file failures never abort the migration.
pub fn migrate(
    ctx: &ServiceContext,
    root: &Path,
    plan: &LayoutPlan,
    ledger: &mut MappingLedger,
) -> MigrationReport {
    let mut report = MigrationReport::default();

    for directory in &plan.new_directories {
        if let Err(e) = ctx.fs.create_dir_all(&resolve(root, directory)) {
            warn!(directory = %directory, error = %e, "failed to create synthetic directory");
        }
    }

    for (original, target) in &plan.file_assignment {
        let from = resolve(root, original);
        let to = resolve(root, target);

        if ctx.fs.exists(&to) {
            if is_hidden_artifact(target) {
                if let Err(e) = ctx.fs.remove_file(&to) {
                    warn!(target = %target, error = %e, "failed to clear hidden artifact");
                    report.failed += 1;
                    continue;
                }
            } else {
                warn!(original = %original, target = %target, "target already exists, file left in place");
                report.conflicts.push(original.clone());
                continue;
            }
        }

        match ctx.fs.rename(&from, &to) {
            Ok(()) => {
                debug!(original = %original, target = %target, "file moved");
                ledger.record(Category::Files, normalize(original), normalize(target));
                report.moved += 1;
            }
            Err(e) => {
                warn!(original = %original, target = %target, error = %e, "file move failed");
                report.failed += 1;
            }
        }
    }

    for (original, synthetic) in &plan.directory_assignment {
        ledger.record(Category::Directories, normalize(original), normalize(synthetic));
    }

    report.pruned_dirs = prune_empty_dirs(ctx, root, root);
    report
}

/// Hidden or system files (`.DS_Store`, `.keep`, ...) may be overwritten.
fn is_hidden_artifact(relative: &str) -> bool {
    relative.rsplit('/').next().is_some_and(|name| name.starts_with('.'))
}

/// Ledger keys always use `/`, whatever separator crept in.
fn normalize(relative: &str) -> String {
    relative.replace('\\', "/")
}

/// Removes directories left empty below `dir`, bottom-up. `root` itself is kept.
fn prune_empty_dirs(ctx: &ServiceContext, root: &Path, dir: &Path) -> usize {
    let Ok(entries) = ctx.fs.list_dir(dir) else {
        return 0;
    };

    let mut removed = 0;
    for entry in entries.iter().filter(|e| e.is_dir && !is_preserved_dir(&e.name)) {
        removed += prune_empty_dirs(ctx, root, &dir.join(&entry.name));
    }

    if dir != root && ctx.fs.list_dir(dir).is_ok_and(|left| left.is_empty()) {
        match ctx.fs.remove_dir(dir) {
            Ok(()) => {
                debug!(directory = %dir.display(), "empty directory removed");
                removed += 1;
            }
            Err(e) => debug!(directory = %dir.display(), error = %e, "could not remove directory"),
        }
    }
    removed
}
