//! Run orchestration: purge earlier outputs, then build each copy in turn.
//!
//! ```text
//! validate target ─> purge outputs ─> for each copy:
//!     copy tree ─> reorganize ─> [ids] ─> [globals] ─> rewrite ─> passes ─> snapshot
//! ```
//!
//! Copies are strictly sequential and share nothing: each gets its own
//! context, ledger and keyword cloaker.

pub mod copies;

use std::path::{Path, PathBuf};

use tracing::{error, info};
use uuid::Uuid;

use crate::cloak::KeywordCloaker;
use crate::context::ServiceContext;
use crate::ledger::{LedgerSnapshot, LedgerStats, MappingLedger};
use crate::obfuscate::{ObfuscationPass, PassReport};
use crate::restructure::reorganize;
use crate::rewrite::{ReferenceRewriter, RewriteReport};
use crate::symbols::{collect_globals, rename_ids};

pub use copies::{copy_dir_name, snapshot_name, OutputNames, RunKind};

/// Upper bound on copies per invocation.
pub const MAX_COPIES: usize = 10;

/// Parses a copy count leniently: anything unparsable or below 1 means 1,
/// fractions are truncated, and the result is capped at [`MAX_COPIES`].
#[must_use]
// The float is clamped to 1..=MAX_COPIES before the cast.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn parse_copy_count(raw: &str) -> usize {
    match raw.trim().parse::<f64>() {
        Ok(value) if value >= 1.0 => value.min(MAX_COPIES as f64).floor() as usize,
        _ => 1,
    }
}

/// Everything a run needs, already resolved from CLI, config and environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Project directory to copy from. Never modified.
    pub target: PathBuf,
    /// Directory receiving the copies and snapshots.
    pub output: PathBuf,
    /// Number of copies, `1..=MAX_COPIES`.
    pub copies: usize,
    /// Keyword list file, if any.
    pub keywords: Option<PathBuf>,
    /// Base seed; copy `i` uses `seed + i`.
    pub seed: Option<u64>,
    /// Rename DOM ids.
    pub rename_ids: bool,
    /// Rename top-level script globals.
    pub rename_globals: bool,
}

/// What one successful copy produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyReport {
    /// 1-based copy index.
    pub copy: usize,
    /// The copy's directory.
    pub directory: PathBuf,
    /// The copy's ledger snapshot.
    pub snapshot: PathBuf,
    /// Files moved by the migrator.
    pub moved: usize,
    /// Migration conflicts.
    pub conflicts: usize,
    /// Reference rewriting counts.
    pub rewrite: RewriteReport,
    /// Per-file pass counts.
    pub passes: PassReport,
    /// Ledger sizes.
    pub stats: LedgerStats,
}

/// Result of one copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyOutcome {
    /// The copy was fully produced.
    Completed(CopyReport),
    /// The copy failed; later copies still ran.
    Failed {
        /// 1-based copy index.
        copy: usize,
        /// What went wrong.
        error: String,
    },
}

/// Result of a whole invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Identifier written into every snapshot of this run.
    pub run_id: String,
    /// Whether earlier outputs were found.
    pub kind: RunKind,
    /// One outcome per copy, in order.
    pub copies: Vec<CopyOutcome>,
}

impl RunSummary {
    /// Number of copies that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.copies.iter().filter(|c| matches!(c, CopyOutcome::Failed { .. })).count()
    }
}

/// Drives a run from a resolved [`RunConfig`].
pub struct RunManager {
    config: RunConfig,
}

impl RunManager {
    /// Creates a manager for `config`.
    #[must_use]
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    /// Context for copy `index` (0 is used for setup work).
    #[must_use]
    pub fn context_for(&self, index: usize) -> ServiceContext {
        match self.config.seed {
            Some(seed) => ServiceContext::seeded(seed.wrapping_add(index as u64)),
            None => ServiceContext::live(),
        }
    }

    /// Runs with live contexts, seeded when the config has a seed.
    ///
    /// # Errors
    ///
    /// See [`RunManager::run_with`].
    pub async fn run(&self) -> Result<RunSummary, String> {
        self.run_with(|index| self.context_for(index)).await
    }

    /// Runs with contexts from `contexts`, called with 0 for setup and with
    /// each 1-based copy index.
    ///
    /// # Errors
    ///
    /// Returns an error only for setup failures: missing target, unusable
    /// output directory, or earlier outputs that cannot be removed. Per-copy
    /// failures are reported in the summary.
    pub async fn run_with<F>(&self, contexts: F) -> Result<RunSummary, String>
    where
        F: Fn(usize) -> ServiceContext,
    {
        let config = &self.config;
        let setup = contexts(0);
        if !setup.fs.is_dir(&config.target) {
            return Err(format!("target directory not found: {}", config.target.display()));
        }
        let base = config
            .target
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| format!("cannot derive a project name from {}", config.target.display()))?
            .to_string();
        setup
            .fs
            .create_dir_all(&config.output)
            .map_err(|e| format!("failed to create output directory {}: {e}", config.output.display()))?;

        let names = OutputNames::new(&base)?;
        let kind = copies::purge_previous(&setup, &config.output, &names)?;
        let run_id = Uuid::new_v4().to_string();
        info!(%run_id, target = %config.target.display(), output = %config.output.display(), copies = config.copies, "run started");

        let mut outcomes = Vec::with_capacity(config.copies);
        for copy in 1..=config.copies {
            let ctx = contexts(copy);
            let outcome = match self.build_copy(&ctx, &run_id, &base, &names, copy).await {
                Ok(report) => {
                    info!(copy, stats = %report.stats, "copy finished");
                    CopyOutcome::Completed(report)
                }
                Err(error) => {
                    error!(copy, "copy failed: {error}");
                    CopyOutcome::Failed { copy, error }
                }
            };
            outcomes.push(outcome);
        }

        Ok(RunSummary { run_id, kind, copies: outcomes })
    }

    async fn build_copy(
        &self,
        ctx: &ServiceContext,
        run_id: &str,
        base: &str,
        names: &OutputNames,
        copy: usize,
    ) -> Result<CopyReport, String> {
        let config = &self.config;
        let directory = config.output.join(copy_dir_name(base, copy));
        let snapshot_path = config.output.join(snapshot_name(base, copy));

        let skip = |path: &Path| {
            path == config.output
                || (path.parent() == Some(config.output.as_path())
                    && path.file_name().and_then(|n| n.to_str()).is_some_and(|n| names.matches(n)))
        };
        let files = copies::copy_tree(ctx, &config.target, &directory, &skip)?;
        info!(copy, files, directory = %directory.display(), "project copied");

        let mut ledger = MappingLedger::new();
        let reorganized = reorganize(ctx, &directory, &mut ledger)?;
        if config.rename_ids {
            rename_ids(ctx, &directory, &mut ledger)?;
        }
        if config.rename_globals {
            collect_globals(ctx, &directory, &mut ledger)?;
        }

        let rewrite = ReferenceRewriter::new(&ledger)?.rewrite_tree(ctx, &directory)?;
        let cloaker = KeywordCloaker::from_file(config.keywords.clone());
        let passes = ObfuscationPass::new(ctx, &ledger, &cloaker).process_tree(&directory).await?;

        let stats = ledger.stats();
        let snapshot = LedgerSnapshot { run_id: run_id.to_string(), generated_at: ctx.clock.now(), copy, ledger };
        snapshot.save(ctx, &snapshot_path)?;

        Ok(CopyReport {
            copy,
            directory,
            snapshot: snapshot_path,
            moved: reorganized.migration.moved,
            conflicts: reorganized.migration.conflicts.len(),
            rewrite,
            passes,
            stats,
        })
    }
}
