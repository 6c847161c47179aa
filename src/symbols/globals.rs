//! Top-level script identifiers.

use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{info, warn};

use crate::context::ServiceContext;
use crate::ledger::{Category, MappingLedger};
use crate::obfuscate::MAX_FILE_BYTES;
use crate::walk::{find_web_files, FileKind};

/// Browser and runtime globals that must keep their names.
pub const RESERVED_GLOBALS: &[&str] = &[
    "window",
    "document",
    "console",
    "Array",
    "Object",
    "String",
    "Number",
    "Boolean",
    "Date",
    "Math",
    "JSON",
    "Promise",
    "setTimeout",
    "setInterval",
    "clearTimeout",
    "clearInterval",
    "require",
    "module",
    "exports",
    "__dirname",
    "__filename",
    "process",
    "global",
    "Buffer",
    "parseInt",
    "parseFloat",
    "isNaN",
    "isFinite",
    "encodeURIComponent",
    "decodeURIComponent",
    "encodeURI",
    "decodeURI",
];

fn declaration() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?m)^(?:export\s+(?:default\s+)?)?(?:(?:async\s+)?function(?:\s*\*\s*|\s+)|class\s+|(?:var|let|const)\s+)([A-Za-z_$][\w$]*)",
        )
        .expect("declaration pattern is valid")
    })
}

/// Counts from global discovery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlobalsReport {
    /// Script files inspected.
    pub files: usize,
    /// New names recorded in the ledger.
    pub recorded: usize,
}

/// Whether a discovered name may be renamed.
#[must_use]
pub fn should_rename_global(name: &str) -> bool {
    name.len() > 2
        && !RESERVED_GLOBALS.contains(&name)
        && !name.chars().all(|c| c.is_ascii_uppercase() || c == '_')
}

/// Names declared at the start of a line by `function`, `class`, `var`,
/// `let` or `const`, in order of appearance.
///
/// Unindented declarations stand in for top-level ones.
#[must_use]
pub fn discover_globals(source: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    declaration()
        .captures_iter(source)
        .map(|caps| caps[1].to_string())
        .filter(|name| should_rename_global(name) && seen.insert(name.clone()))
        .collect()
}

/// Discovers globals in every script file below `root` and records a
/// random replacement for each new one.
///
/// # Errors
///
/// Returns an error if the tree cannot be walked.
pub fn collect_globals(
    ctx: &ServiceContext,
    root: &Path,
    ledger: &mut MappingLedger,
) -> Result<GlobalsReport, String> {
    let mut report = GlobalsReport::default();
    let mut taken: HashSet<String> = ledger.entries(Category::Globals).values().cloned().collect();

    for (path, kind) in find_web_files(ctx, root)? {
        if kind != FileKind::Script {
            continue;
        }
        match ctx.fs.file_size(&path) {
            Ok(size) if size > MAX_FILE_BYTES => {
                warn!(path = %path.display(), size, "skipping large file for global discovery");
                continue;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(path = %path.display(), "failed to stat script: {e}");
                continue;
            }
        }
        let source = match ctx.fs.read_to_string(&path) {
            Ok(source) => source,
            Err(e) => {
                warn!(path = %path.display(), "failed to read script: {e}");
                continue;
            }
        };

        report.files += 1;
        for name in discover_globals(&source) {
            if ledger.lookup(Category::Globals, &name).is_some() {
                continue;
            }
            taken.insert(name.clone());
            let replacement = super::fresh_identifier(ctx.entropy.as_ref(), &mut taken);
            ledger.record(Category::Globals, name, replacement);
            report.recorded += 1;
        }
    }

    info!(files = report.files, recorded = report.recorded, "global discovery finished");
    Ok(report)
}
