//! Reference rewriting: after files move, fix every static reference to them.
//!
//! Path references are matched in four syntactic positions (see
//! [`PathClass`]); script files additionally get their DOM-id lookups
//! rewritten from the ledger's `ids` map. Paths in the ledger are
//! root-relative, and so are the rewritten references.

mod dom_ids;
mod paths;

use std::borrow::Cow;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::context::ServiceContext;
use crate::ledger::{Category, MappingLedger};
use crate::walk::{find_web_files, FileKind};

use dom_ids::IdRules;
use paths::PathRules;

pub use paths::PathClass;

/// Result of rewriting one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    /// The rewritten (or untouched) text.
    pub text: String,
    /// Whether anything was replaced.
    pub changed: bool,
}

/// Counts from one pass over a tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteReport {
    /// Files examined.
    pub scanned: usize,
    /// Files written back with changes.
    pub updated: usize,
    /// Files that could not be read or written.
    pub failed: usize,
}

/// Precompiled rewrite rules for one copy's ledger.
pub struct ReferenceRewriter {
    paths: Option<PathRules>,
    ids: Option<IdRules>,
}

impl ReferenceRewriter {
    /// Compiles rules from the ledger's `files` and `ids` maps.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern fails to compile.
    pub fn new(ledger: &MappingLedger) -> Result<Self, String> {
        Ok(Self {
            paths: PathRules::new(ledger.entries(Category::Files))?,
            ids: IdRules::new(ledger.entries(Category::Ids))?,
        })
    }

    /// Whether there is nothing to rewrite.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_none() && self.ids.is_none()
    }

    /// Rewrites one document of the given kind.
    #[must_use]
    pub fn rewrite_content(&self, kind: FileKind, content: &str) -> Rewrite {
        let text = self.rewrite_cow(kind, content);
        let changed = text != content;
        Rewrite { text: text.into_owned(), changed }
    }

    fn rewrite_cow<'t>(&self, kind: FileKind, content: &'t str) -> Cow<'t, str> {
        let mut text = Cow::Borrowed(content);
        if let Some(paths) = &self.paths {
            for class in PathClass::ALL {
                let replaced = paths.apply(class, &text);
                if let Cow::Owned(next) = replaced {
                    text = Cow::Owned(next);
                }
            }
        }
        if kind == FileKind::Script {
            if let Some(ids) = &self.ids {
                let replaced = ids.apply(&text);
                if let Cow::Owned(next) = replaced {
                    text = Cow::Owned(next);
                }
            }
        }
        text
    }

    /// Rewrites every web file below `root` in place.
    ///
    /// Per-file failures are logged and counted; only a failure to walk the
    /// tree is returned as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be listed.
    pub fn rewrite_tree(&self, ctx: &ServiceContext, root: &Path) -> Result<RewriteReport, String> {
        let mut report = RewriteReport::default();
        if self.is_empty() {
            return Ok(report);
        }

        for (path, kind) in find_web_files(ctx, root)? {
            report.scanned += 1;
            match self.rewrite_file(ctx, &path, kind) {
                Ok(true) => {
                    debug!(path = %path.display(), "references rewritten");
                    report.updated += 1;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!("{e}");
                    report.failed += 1;
                }
            }
        }

        info!(scanned = report.scanned, updated = report.updated, failed = report.failed, "reference rewrite finished");
        Ok(report)
    }

    fn rewrite_file(&self, ctx: &ServiceContext, path: &Path, kind: FileKind) -> Result<bool, String> {
        let content = ctx
            .fs
            .read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        let rewrite = self.rewrite_content(kind, &content);
        if rewrite.changed {
            ctx.fs
                .write(path, &rewrite.text)
                .map_err(|e| format!("failed to write {}: {e}", path.display()))?;
        }
        Ok(rewrite.changed)
    }
}
