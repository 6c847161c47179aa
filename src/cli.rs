//! CLI argument definitions.

use std::path::PathBuf;

use clap::Parser;

/// Printed when no target directory is given.
pub const USAGE: &str = "Usage: sitecloak <target-directory> [-o <output-dir>] [-n <count>] [-k <keywords-file>]";

/// Top-level CLI parser for `sitecloak`.
#[derive(Debug, Parser)]
#[command(
    name = "sitecloak",
    version,
    about = "Reorganize a static site into randomized copies and cloak keywords"
)]
pub struct Cli {
    /// Project directory to reorganize. It is copied, never modified.
    pub target: Option<PathBuf>,

    /// Directory for the copies and mapping snapshots [default: parent of target].
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Number of copies to produce (1-10; invalid values mean 1).
    #[arg(short = 'n', long = "copies", value_name = "COUNT", allow_hyphen_values = true)]
    pub copies: Option<String>,

    /// Keyword list, one keyword per line.
    #[arg(short = 'k', long = "keywords", value_name = "FILE")]
    pub keywords: Option<PathBuf>,

    /// YAML config file.
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Seed for reproducible layouts and names.
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Rename DOM ids in HTML, CSS and scripts.
    #[arg(long)]
    pub rename_ids: bool,

    /// Rename top-level script globals.
    #[arg(long)]
    pub rename_globals: bool,

    /// Log at debug level (overridden by `RUST_LOG`).
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::Parser;

    #[test]
    fn parses_full_command_line() {
        let cli = Cli::parse_from([
            "sitecloak", "site", "-o", "out", "-n", "3", "-k", "key.txt", "--seed", "7", "--rename-ids", "-v",
        ]);
        assert_eq!(cli.target.unwrap().to_str(), Some("site"));
        assert_eq!(cli.output.unwrap().to_str(), Some("out"));
        assert_eq!(cli.copies.as_deref(), Some("3"));
        assert_eq!(cli.keywords.unwrap().to_str(), Some("key.txt"));
        assert_eq!(cli.seed, Some(7));
        assert!(cli.rename_ids);
        assert!(!cli.rename_globals);
        assert!(cli.verbose);
    }

    #[test]
    fn target_is_optional_for_usage_handling() {
        let cli = Cli::parse_from(["sitecloak"]);
        assert!(cli.target.is_none());
    }

    #[test]
    fn negative_copy_count_is_accepted_as_text() {
        let cli = Cli::parse_from(["sitecloak", "site", "-n", "-2"]);
        assert_eq!(cli.copies.as_deref(), Some("-2"));
    }
}
