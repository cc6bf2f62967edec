//! Command-line interface for es-export
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Configuration loading, environment overrides and validation
//! - Merging arguments into the effective configuration

use clap::Parser;
use std::path::{Path, PathBuf};

use crate::config::{Config, LogLevel};
use crate::error::Result;

/// Export search engine metadata to CSV using parallel sliced scrolls
#[derive(Parser, Debug)]
#[command(
    name = "es-export",
    version,
    about = "Export search engine metadata to CSV",
    long_about = "Runs a query against an index pattern using sliced scroll requests in
parallel and writes the selected hit metadata and _source fields to a CSV file."
)]
pub struct CliArgs {
    /// JSON file containing the search request body
    #[arg(value_name = "QUERY_FILE")]
    pub query_file: PathBuf,

    /// Index name or wildcard pattern to search
    #[arg(value_name = "INDEX_PATTERN")]
    pub index_pattern: String,

    /// Logging level
    #[arg(short = 'l', long = "logging-level", value_enum, default_value = "INFO")]
    pub logging_level: LogLevel,

    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Output CSV file
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Number of slices scrolled in parallel
    #[arg(long, value_name = "N")]
    pub slices: Option<u32>,

    /// Documents requested per page
    #[arg(long = "batch-size", value_name = "N")]
    pub batch_size: Option<u32>,

    /// Base URL of the search engine (e.g. https://es-data-1:9200)
    #[arg(long, value_name = "URL")]
    pub server: Option<String>,

    /// Username for basic authentication
    #[arg(short = 'u', long, value_name = "USERNAME")]
    pub username: Option<String>,

    /// Show an aggregate progress bar
    #[arg(long)]
    pub progress: bool,
}

/// CLI interface handler
pub struct CliInterface {
    /// Parsed command-line arguments
    args: CliArgs,

    /// Effective configuration
    config: Config,
}

impl CliInterface {
    /// Parse the process arguments and build the effective configuration
    ///
    /// # Returns
    /// * `Result<Self>` - CLI interface or a configuration error
    pub fn new() -> Result<Self> {
        let args = CliArgs::parse();
        Self::from_args(args, |key| std::env::var(key).ok())
    }

    /// Build the effective configuration for already-parsed arguments
    ///
    /// # Arguments
    /// * `args` - Parsed arguments
    /// * `env` - Environment lookup
    pub fn from_args<F>(args: CliArgs, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self::load_config(&args, env)?;
        Ok(Self { args, config })
    }

    /// Load configuration from file, then environment, then arguments
    fn load_config<F>(args: &CliArgs, env: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::load_from_file(args.config_file.as_deref())?;
        config.apply_env(env);
        Self::apply_args_to_config(&mut config, args);
        config.validate()?;
        Ok(config)
    }

    /// Apply CLI arguments to override config values
    fn apply_args_to_config(config: &mut Config, args: &CliArgs) {
        config.logging.level = args.logging_level;

        if let Some(ref output) = args.output {
            config.export.output_file = output.clone();
        }
        if let Some(slices) = args.slices {
            config.export.slices = slices;
        }
        if let Some(batch_size) = args.batch_size {
            config.export.batch_size = batch_size;
        }
        if let Some(ref server) = args.server {
            config.server.url = server.clone();
        }
        if let Some(ref username) = args.username {
            config.server.username = username.clone();
        }
    }

    pub fn args(&self) -> &CliArgs {
        &self.args
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn query_file(&self) -> &Path {
        &self.args.query_file
    }

    pub fn index_pattern(&self) -> &str {
        &self.args.index_pattern
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ENV_URL;
    use crate::error::{ConfigError, ExportError};

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn parse(extra: &[&str]) -> CliArgs {
        let mut argv = vec!["es-export", "query.json", "kg__message_*"];
        argv.extend_from_slice(extra);
        CliArgs::try_parse_from(argv).unwrap()
    }

    /// Config file with defaults only, so the user's own file never leaks in
    fn empty_config_file(dir: &tempfile::TempDir) -> String {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "").unwrap();
        path.display().to_string()
    }

    #[test]
    fn test_positional_arguments_required() {
        assert!(CliArgs::try_parse_from(["es-export"]).is_err());
        assert!(CliArgs::try_parse_from(["es-export", "query.json"]).is_err());

        let args = parse(&[]);
        assert_eq!(args.query_file, PathBuf::from("query.json"));
        assert_eq!(args.index_pattern, "kg__message_*");
        assert_eq!(args.logging_level, LogLevel::Info);
        assert!(!args.progress);
    }

    #[test]
    fn test_logging_level_values() {
        assert_eq!(parse(&["-l", "DEBUG"]).logging_level, LogLevel::Debug);
        assert_eq!(parse(&["--logging-level", "WARNING"]).logging_level, LogLevel::Warning);
        assert_eq!(parse(&["-l", "error"]).logging_level, LogLevel::Error);

        let argv = ["es-export", "query.json", "idx", "-l", "TRACE"];
        assert!(CliArgs::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_args_override_config() {
        let dir = tempfile::tempdir().unwrap();
        let config_file = dir.path().join("config.toml");
        std::fs::write(
            &config_file,
            "[server]\nurl = \"http://from-file:9200\"\n[export]\nslices = 4\nbatch_size = 100\n",
        )
        .unwrap();
        let config_arg = config_file.display().to_string();

        let args = parse(&[
            "-c", &config_arg, "--slices", "6", "-o", "meta.csv", "-u", "reader", "-l", "ERROR",
        ]);
        let cli = CliInterface::from_args(args, no_env).unwrap();

        let config = cli.config();
        assert_eq!(config.server.url, "http://from-file:9200");
        assert_eq!(config.server.username, "reader");
        assert_eq!(config.export.slices, 6);
        assert_eq!(config.export.batch_size, 100);
        assert_eq!(config.export.output_file, PathBuf::from("meta.csv"));
        assert_eq!(config.logging.level, LogLevel::Error);
        assert_eq!(cli.index_pattern(), "kg__message_*");
        assert_eq!(cli.query_file(), Path::new("query.json"));
    }

    #[test]
    fn test_precedence_args_env_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_arg = empty_config_file(&dir);
        let env = |key: &str| (key == ENV_URL).then(|| "https://from-env:9200".to_string());

        let cli = CliInterface::from_args(parse(&["-c", &config_arg]), env).unwrap();
        assert_eq!(cli.config().server.url, "https://from-env:9200");

        let args = parse(&["-c", &config_arg, "--server", "https://from-cli:9200"]);
        let cli = CliInterface::from_args(args, env).unwrap();
        assert_eq!(cli.config().server.url, "https://from-cli:9200");
    }

    #[test]
    fn test_invalid_overrides_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config_arg = empty_config_file(&dir);

        let err = CliInterface::from_args(parse(&["-c", &config_arg, "--slices", "0"]), no_env)
            .err()
            .unwrap();
        assert!(matches!(err, ExportError::Config(ConfigError::InvalidValue { .. })));

        let args = parse(&["-c", &config_arg, "--server", "es-data-1:9200"]);
        assert!(CliInterface::from_args(args, no_env).is_err());
    }

    #[test]
    fn test_missing_config_file() {
        let args = parse(&["-c", "/no/such/es-export.toml"]);
        let err = CliInterface::from_args(args, no_env).err().unwrap();
        assert!(matches!(err, ExportError::Config(ConfigError::FileNotFound(_))));
    }
}
