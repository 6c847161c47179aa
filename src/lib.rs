//! Core library entry for the `sitecloak` CLI.
//!
//! A run copies a static site N times; each copy is reorganized into a random
//! directory layout, every static reference is rewritten to follow the moved
//! files, configured keywords are cloaked in HTML, and the rename decisions
//! are saved as a JSON mapping snapshot beside the copy.

pub mod adapters;
pub mod cli;
pub mod cloak;
pub mod config;
pub mod context;
pub mod ledger;
pub mod logging;
pub mod naming;
pub mod obfuscate;
pub mod ports;
pub mod restructure;
pub mod rewrite;
pub mod run;
pub mod symbols;
pub mod walk;

use clap::error::ErrorKind;
use clap::Parser;

use crate::adapters::live::LiveFileSystem;
use crate::config::EnvDefaults;
use crate::run::{CopyOutcome, RunKind, RunManager, RunSummary};

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when arguments are invalid, the target is
/// missing, or the run cannot be set up. Failures of individual copies are
/// reported but do not make the run fail.
pub fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match cli::Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            return err.print().map_err(|e| format!("failed to print help: {e}"));
        }
        Err(err) => return Err(err.to_string()),
    };
    let Some(target) = cli.target.clone() else {
        return Err(cli::USAGE.to_string());
    };

    // A missing .env file is normal.
    let _ = dotenvy::dotenv();
    logging::init(cli.verbose);

    let cwd = std::env::current_dir().map_err(|e| format!("failed to read working directory: {e}"))?;
    let env = EnvDefaults::from_env()?;
    let config = config::resolve(&cli, &target, &LiveFileSystem, &env, &cwd)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to start runtime: {e}"))?;
    let summary = runtime.block_on(RunManager::new(config).run())?;
    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    let kind = match summary.kind {
        RunKind::First => "first run",
        RunKind::Subsequent => "subsequent run, earlier outputs replaced",
    };
    println!("Run {} ({kind})", summary.run_id);
    for outcome in &summary.copies {
        match outcome {
            CopyOutcome::Completed(report) => println!(
                "  copy {}: {} ({}; {} references updated, {} files processed)",
                report.copy,
                report.directory.display(),
                report.stats,
                report.rewrite.updated,
                report.passes.processed
            ),
            CopyOutcome::Failed { copy, error } => println!("  copy {copy}: failed: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::run;

    #[test]
    fn run_without_target_prints_usage() {
        let err = run(["sitecloak"]).unwrap_err();
        assert!(err.starts_with("Usage: sitecloak"));
    }

    #[test]
    fn run_errors_on_unknown_flag() {
        assert!(run(["sitecloak", "site", "--bogus"]).is_err());
    }

    #[test]
    fn run_errors_on_missing_target_directory() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let missing = temp_dir.path().join("absent");
        let err = run([std::ffi::OsStr::new("sitecloak"), missing.as_os_str()]).unwrap_err();
        assert!(err.contains("target directory not found"));
    }
}
