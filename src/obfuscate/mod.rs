//! Per-file obfuscation passes over a migrated copy.
//!
//! Every HTML, CSS and script file is transformed once and stamped with a
//! marker; files already carrying a marker are left alone. Collaborator
//! failures never fail the file: the original text is kept.

pub mod html;
pub mod markers;

use std::path::Path;

use tracing::{debug, info, warn};

use crate::cloak::KeywordCloaker;
use crate::context::ServiceContext;
use crate::ledger::{Category, MappingLedger};
use crate::ports::{PortError, ScriptOptions};
use crate::walk::{find_web_files, FileKind};

/// Files above this size are skipped.
pub const MAX_FILE_BYTES: u64 = 1024 * 1024;

/// Files above this size are processed with a warning.
pub const WARN_FILE_BYTES: u64 = 500 * 1024;

/// What happened to one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// Transformed and stamped.
    Processed {
        /// Keyword occurrences cloaked (HTML only).
        cloaked: usize,
        /// Collaborator calls that fell back to the original text.
        fallbacks: usize,
    },
    /// Already carried a marker.
    AlreadyMarked,
    /// Larger than [`MAX_FILE_BYTES`].
    TooLarge,
}

/// Totals for one pass over a tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Files transformed.
    pub processed: usize,
    /// Files skipped because they were already marked.
    pub already_marked: usize,
    /// Files skipped for size.
    pub too_large: usize,
    /// Files that could not be read or written.
    pub failed: usize,
    /// Collaborator fallbacks across all files.
    pub fallbacks: usize,
    /// Keyword occurrences cloaked across all HTML files.
    pub cloaked: usize,
}

/// Runs the per-file transforms for one copy.
pub struct ObfuscationPass<'a> {
    ctx: &'a ServiceContext,
    ledger: &'a MappingLedger,
    cloaker: &'a KeywordCloaker,
}

impl<'a> ObfuscationPass<'a> {
    /// Creates a pass bound to one copy's context, ledger and cloaker.
    #[must_use]
    pub fn new(ctx: &'a ServiceContext, ledger: &'a MappingLedger, cloaker: &'a KeywordCloaker) -> Self {
        Self { ctx, ledger, cloaker }
    }

    /// Transforms every web file below `root`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the tree cannot be walked; per-file failures
    /// are logged and counted.
    pub async fn process_tree(&self, root: &Path) -> Result<PassReport, String> {
        let mut report = PassReport::default();
        for (path, kind) in find_web_files(self.ctx, root)? {
            match self.process_file(&path, kind).await {
                Ok(FileOutcome::Processed { cloaked, fallbacks }) => {
                    report.processed += 1;
                    report.cloaked += cloaked;
                    report.fallbacks += fallbacks;
                }
                Ok(FileOutcome::AlreadyMarked) => report.already_marked += 1,
                Ok(FileOutcome::TooLarge) => report.too_large += 1,
                Err(e) => {
                    warn!("{e}");
                    report.failed += 1;
                }
            }
        }
        info!(
            processed = report.processed,
            already_marked = report.already_marked,
            too_large = report.too_large,
            failed = report.failed,
            cloaked = report.cloaked,
            "obfuscation passes finished"
        );
        Ok(report)
    }

    /// Transforms one file in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be inspected, read or written.
    pub async fn process_file(&self, path: &Path, kind: FileKind) -> Result<FileOutcome, String> {
        let size = self
            .ctx
            .fs
            .file_size(path)
            .map_err(|e| format!("failed to stat {}: {e}", path.display()))?;
        if size > MAX_FILE_BYTES {
            warn!(path = %path.display(), size, "skipping large file");
            return Ok(FileOutcome::TooLarge);
        }
        if size > WARN_FILE_BYTES {
            warn!(path = %path.display(), size, "processing large file");
        }

        let content = self
            .ctx
            .fs
            .read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        if markers::is_marked(&content) {
            debug!(path = %path.display(), "already processed, skipping");
            return Ok(FileOutcome::AlreadyMarked);
        }

        let (text, outcome) = self.transform(kind, &content, Some(path)).await;
        let stamped = markers::stamp(self.ctx, kind, &text);
        self.ctx
            .fs
            .write(path, &stamped)
            .map_err(|e| format!("failed to write {}: {e}", path.display()))?;
        Ok(outcome)
    }

    /// Transforms content of the given kind without touching the filesystem.
    pub async fn transform(&self, kind: FileKind, content: &str, source: Option<&Path>) -> (String, FileOutcome) {
        let options = ScriptOptions { globals: self.ledger.entries(Category::Globals), source };
        match kind {
            FileKind::Html => {
                let outcome = html::obfuscate_document(self.ctx, content, &options, self.cloaker).await;
                let result = FileOutcome::Processed { cloaked: outcome.cloaked, fallbacks: outcome.fallbacks };
                (outcome.text, result)
            }
            FileKind::Css => fail_open(content, self.ctx.styles.minify(content), "style minification"),
            FileKind::Script => {
                fail_open(content, self.ctx.scripts.obfuscate(content, &options), "script obfuscation")
            }
        }
    }
}

fn fail_open(original: &str, result: Result<String, PortError>, what: &str) -> (String, FileOutcome) {
    match result {
        Ok(text) => (text, FileOutcome::Processed { cloaked: 0, fallbacks: 0 }),
        Err(e) => {
            warn!("{what} failed, keeping original: {e}");
            (original.to_string(), FileOutcome::Processed { cloaked: 0, fallbacks: 1 })
        }
    }
}
