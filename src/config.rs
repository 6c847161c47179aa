//! Run configuration.
//!
//! Precedence, highest first: command-line flags, the YAML file named by
//! `--config`, environment variables (a `.env` file is honoured), built-in
//! defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::cli::Cli;
use crate::ports::FileSystem;
use crate::run::{parse_copy_count, RunConfig, MAX_COPIES};

/// Environment variable naming the keyword list.
pub const KEYWORDS_ENV: &str = "SITECLOAK_KEYWORDS";

/// Environment variable holding the base seed.
pub const SEED_ENV: &str = "SITECLOAK_SEED";

/// Keyword list picked up from the working directory when none is configured.
pub const DEFAULT_KEYWORDS_FILE: &str = "key.txt";

/// Settings accepted in the YAML config file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Output directory.
    pub output: Option<PathBuf>,
    /// Number of copies.
    pub copies: Option<usize>,
    /// Keyword list file.
    pub keywords: Option<PathBuf>,
    /// Base seed.
    pub seed: Option<u64>,
    /// Rename DOM ids.
    pub rename_ids: Option<bool>,
    /// Rename script globals.
    pub rename_globals: Option<bool>,
}

impl FileConfig {
    /// Parses YAML; an empty document is an empty config.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed YAML or unknown keys.
    pub fn parse(yaml: &str) -> Result<Self, String> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(|e| format!("invalid config: {e}"))
    }

    /// Reads and parses a config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(fs: &dyn FileSystem, path: &Path) -> Result<Self, String> {
        let contents = fs
            .read_to_string(path)
            .map_err(|e| format!("failed to read config {}: {e}", path.display()))?;
        Self::parse(&contents).map_err(|e| format!("{}: {e}", path.display()))
    }
}

/// Defaults supplied by the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvDefaults {
    /// From `SITECLOAK_KEYWORDS`.
    pub keywords: Option<PathBuf>,
    /// From `SITECLOAK_SEED`.
    pub seed: Option<u64>,
}

impl EnvDefaults {
    /// Reads the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if `SITECLOAK_SEED` is set but not a `u64`.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads variables through `lookup`; empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns an error if the seed is not a `u64`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let seed = get(SEED_ENV)
            .map(|raw| {
                raw.trim()
                    .parse::<u64>()
                    .map_err(|e| format!("{SEED_ENV} must be an unsigned integer: {e}"))
            })
            .transpose()?;
        Ok(Self { keywords: get(KEYWORDS_ENV).map(PathBuf::from), seed })
    }
}

/// Makes `path` absolute against `cwd` and drops `.` components.
#[must_use]
pub fn absolute(cwd: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() { path.to_path_buf() } else { cwd.join(path) };
    joined.components().collect()
}

/// Resolves the final run configuration for `target`.
///
/// # Errors
///
/// Returns an error if the config file cannot be loaded.
pub fn resolve(
    cli: &Cli,
    target: &Path,
    fs: &dyn FileSystem,
    env: &EnvDefaults,
    cwd: &Path,
) -> Result<RunConfig, String> {
    let file = match &cli.config {
        Some(path) => FileConfig::load(fs, &absolute(cwd, path))?,
        None => FileConfig::default(),
    };

    let target = absolute(cwd, target);
    let output = cli
        .output
        .clone()
        .or(file.output)
        .map_or_else(|| target.parent().unwrap_or(&target).to_path_buf(), |path| absolute(cwd, &path));

    let copies = match (&cli.copies, file.copies) {
        (Some(raw), _) => parse_copy_count(raw),
        (None, Some(count)) => count.clamp(1, MAX_COPIES),
        (None, None) => 1,
    };

    let keywords = cli
        .keywords
        .clone()
        .or(file.keywords)
        .or_else(|| env.keywords.clone())
        .map(|path| absolute(cwd, &path))
        .or_else(|| {
            let fallback = cwd.join(DEFAULT_KEYWORDS_FILE);
            fs.exists(&fallback).then_some(fallback)
        });

    Ok(RunConfig {
        target,
        output,
        copies,
        keywords,
        seed: cli.seed.or(file.seed).or(env.seed),
        rename_ids: cli.rename_ids || file.rename_ids.unwrap_or(false),
        rename_globals: cli.rename_globals || file.rename_globals.unwrap_or(false),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::live::LiveFileSystem;
    use clap::Parser;
    use tempfile::TempDir;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("sitecloak").chain(args.iter().copied()))
    }

    #[test]
    fn defaults_follow_the_target() {
        let temp_dir = TempDir::new().unwrap();
        let cwd = temp_dir.path();
        let config =
            resolve(&cli(&["site"]), Path::new("./site"), &LiveFileSystem, &EnvDefaults::default(), cwd).unwrap();
        assert_eq!(config.target, cwd.join("site"));
        assert_eq!(config.output, cwd.to_path_buf());
        assert_eq!(config.copies, 1);
        assert_eq!(config.keywords, None);
        assert_eq!(config.seed, None);
        assert!(!config.rename_ids);
    }

    #[test]
    fn keyword_file_in_working_directory_is_picked_up() {
        let temp_dir = TempDir::new().unwrap();
        let cwd = temp_dir.path();
        std::fs::write(cwd.join(DEFAULT_KEYWORDS_FILE), "a\n").unwrap();
        let config =
            resolve(&cli(&["site"]), Path::new("site"), &LiveFileSystem, &EnvDefaults::default(), cwd).unwrap();
        assert_eq!(config.keywords, Some(cwd.join(DEFAULT_KEYWORDS_FILE)));
    }

    #[test]
    fn cli_beats_file_beats_environment() {
        let temp_dir = TempDir::new().unwrap();
        let cwd = temp_dir.path();
        std::fs::write(
            cwd.join("cloak.yaml"),
            "output: from-file\ncopies: 40\nkeywords: file-keys.txt\nseed: 5\nrename_globals: true\n",
        )
        .unwrap();
        let env = EnvDefaults { keywords: Some("env-keys.txt".into()), seed: Some(9) };

        let from_file =
            resolve(&cli(&["site", "-c", "cloak.yaml"]), Path::new("site"), &LiveFileSystem, &env, cwd).unwrap();
        assert_eq!(from_file.output, cwd.join("from-file"));
        assert_eq!(from_file.copies, MAX_COPIES);
        assert_eq!(from_file.keywords, Some(cwd.join("file-keys.txt")));
        assert_eq!(from_file.seed, Some(5));
        assert!(from_file.rename_globals);

        let from_cli = resolve(
            &cli(&["site", "-c", "cloak.yaml", "-o", "cli-out", "-n", "2", "-k", "cli-keys.txt", "--seed", "1"]),
            Path::new("site"),
            &LiveFileSystem,
            &env,
            cwd,
        )
        .unwrap();
        assert_eq!(from_cli.output, cwd.join("cli-out"));
        assert_eq!(from_cli.copies, 2);
        assert_eq!(from_cli.keywords, Some(cwd.join("cli-keys.txt")));
        assert_eq!(from_cli.seed, Some(1));

        let from_env = resolve(&cli(&["site"]), Path::new("site"), &LiveFileSystem, &env, cwd).unwrap();
        assert_eq!(from_env.keywords, Some(cwd.join("env-keys.txt")));
        assert_eq!(from_env.seed, Some(9));
    }

    #[test]
    fn unknown_config_keys_are_rejected() {
        let err = FileConfig::parse("copies: 2\ncolour: blue\n").unwrap_err();
        assert!(err.contains("colour"));
        assert_eq!(FileConfig::parse("  \n").unwrap(), FileConfig::default());
    }

    #[test]
    fn environment_seed_must_be_numeric() {
        let env = EnvDefaults::from_lookup(|key| (key == SEED_ENV).then(|| "12".to_string())).unwrap();
        assert_eq!(env, EnvDefaults { keywords: None, seed: Some(12) });
        assert!(EnvDefaults::from_lookup(|key| (key == SEED_ENV).then(|| "abc".to_string())).is_err());
        assert_eq!(EnvDefaults::from_lookup(|_| Some(String::new())).unwrap(), EnvDefaults::default());
    }
}
