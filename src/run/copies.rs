//! Output copy naming, purging of earlier outputs, and tree copying.

use std::path::Path;

use regex::Regex;
use tracing::{debug, info};

use crate::context::ServiceContext;

/// Directory name of copy `index` of project `base`.
#[must_use]
pub fn copy_dir_name(base: &str, index: usize) -> String {
    format!("{base}_OBF_DIR{index}")
}

/// Snapshot file name of copy `index` of project `base`.
#[must_use]
pub fn snapshot_name(base: &str, index: usize) -> String {
    format!("{}_mapping.json", copy_dir_name(base, index))
}

/// Whether this is the first run against an output directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    /// No earlier outputs were found.
    First,
    /// Earlier outputs were found and removed.
    Subsequent,
}

/// Matches names produced by earlier runs for `base`.
pub struct OutputNames {
    pattern: Regex,
}

impl OutputNames {
    /// Builds the matcher for project `base`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern fails to compile.
    pub fn new(base: &str) -> Result<Self, String> {
        let pattern = Regex::new(&format!(r"^{}_OBF_DIR\d+(_mapping\.json)?$", regex::escape(base)))
            .map_err(|e| format!("failed to build output name pattern: {e}"))?;
        Ok(Self { pattern })
    }

    /// Whether `name` is a copy directory (`false`) or snapshot (`true`), or neither.
    fn classify(&self, name: &str) -> Option<bool> {
        self.pattern.captures(name).map(|caps| caps.get(1).is_some())
    }

    /// Whether `name` is any output of an earlier run.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.classify(name).is_some()
    }
}

/// Removes every earlier copy directory and snapshot for `base` in `output`.
///
/// # Errors
///
/// Returns an error if the output directory cannot be listed or an earlier
/// output cannot be removed.
pub fn purge_previous(ctx: &ServiceContext, output: &Path, names: &OutputNames) -> Result<RunKind, String> {
    let entries = ctx
        .fs
        .list_dir(output)
        .map_err(|e| format!("failed to read output directory {}: {e}", output.display()))?;

    let mut removed = 0;
    for entry in entries {
        let path = output.join(&entry.name);
        let result = match names.classify(&entry.name) {
            Some(false) if entry.is_dir => ctx.fs.remove_dir_all(&path),
            Some(true) if !entry.is_dir => ctx.fs.remove_file(&path),
            _ => continue,
        };
        result.map_err(|e| format!("failed to remove earlier output {}: {e}", path.display()))?;
        debug!(path = %path.display(), "removed earlier output");
        removed += 1;
    }

    if removed == 0 {
        info!("first run, no earlier outputs");
        Ok(RunKind::First)
    } else {
        info!(removed, "subsequent run, earlier outputs removed");
        Ok(RunKind::Subsequent)
    }
}

/// Copies the whole tree at `from` into `to`, skipping paths for which
/// `skip` returns `true`. Returns the number of files copied.
///
/// # Errors
///
/// Returns an error naming the first path that could not be listed or copied.
pub fn copy_tree(
    ctx: &ServiceContext,
    from: &Path,
    to: &Path,
    skip: &dyn Fn(&Path) -> bool,
) -> Result<usize, String> {
    ctx.fs
        .create_dir_all(to)
        .map_err(|e| format!("failed to create {}: {e}", to.display()))?;
    let entries = ctx
        .fs
        .list_dir(from)
        .map_err(|e| format!("failed to read directory {}: {e}", from.display()))?;

    let mut copied = 0;
    for entry in entries {
        let source = from.join(&entry.name);
        if skip(&source) {
            continue;
        }
        let target = to.join(&entry.name);
        if entry.is_dir {
            copied += copy_tree(ctx, &source, &target, skip)?;
        } else {
            ctx.fs
                .copy_file(&source, &target)
                .map_err(|e| format!("failed to copy {}: {e}", source.display()))?;
            copied += 1;
        }
    }
    Ok(copied)
}
