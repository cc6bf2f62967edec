//! Configuration management for es-export
//!
//! Configuration is assembled from, highest precedence first:
//! 1. Command-line arguments
//! 2. Environment variables (`ES_EXPORT_URL`, `ES_EXPORT_USERNAME`, `ES_EXPORT_PASSWORD`)
//! 3. Configuration file (TOML)
//! 4. Default values
//!
//! The resulting [`Config`] is immutable once the run starts and is passed
//! down explicitly to every component.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};
use crate::utils;

/// Environment variable overriding [`ServerConfig::url`]
pub const ENV_URL: &str = "ES_EXPORT_URL";
/// Environment variable overriding [`ServerConfig::username`]
pub const ENV_USERNAME: &str = "ES_EXPORT_USERNAME";
/// Environment variable overriding [`ServerConfig::password`]
pub const ENV_PASSWORD: &str = "ES_EXPORT_PASSWORD";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Search engine connection
    #[serde(default)]
    pub server: ServerConfig,

    /// Export pipeline tuning
    #[serde(default)]
    pub export: ExportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Search engine connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of a data node, `https://` for TLS
    #[serde(default = "default_url")]
    pub url: String,

    /// Basic auth user
    #[serde(default = "default_username")]
    pub username: String,

    /// Basic auth password
    #[serde(default)]
    pub password: String,

    /// Skip TLS certificate validation
    #[serde(default = "default_accept_invalid_certs")]
    pub accept_invalid_certs: bool,

    /// Per-request timeout in seconds, 0 disables it
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

/// Export pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Number of slices scrolled concurrently
    #[serde(default = "default_slices")]
    pub slices: u32,

    /// Documents requested per page
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Hit metadata fields written before the source fields
    #[serde(default = "default_system_fields")]
    pub system_fields: Vec<String>,

    /// Document type (path segment on 5.x, `doc_type` term filter on 7.x)
    #[serde(default = "default_doc_type")]
    pub doc_type: String,

    /// Scroll context keep-alive, in engine time units
    #[serde(default = "default_keep_alive")]
    pub keep_alive: String,

    /// Seconds between per-slice progress lines
    #[serde(default = "default_status_interval")]
    pub status_interval: u64,

    /// Output CSV path
    #[serde(default = "default_output_file")]
    pub output_file: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (debug, info, warning, error)
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Enable timestamps in logs
    #[serde(default = "default_log_timestamps")]
    pub timestamps: bool,
}

/// Log level options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[value(name = "DEBUG", alias = "debug")]
    Debug,
    #[value(name = "INFO", alias = "info")]
    Info,
    #[value(name = "WARNING", alias = "warning")]
    Warning,
    #[value(name = "ERROR", alias = "error")]
    Error,
}

// Default value functions
fn default_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_username() -> String {
    "elastic".to_string()
}

fn default_accept_invalid_certs() -> bool {
    true
}

fn default_timeout() -> u64 {
    120
}

fn default_slices() -> u32 {
    10
}

fn default_batch_size() -> u32 {
    10_000
}

fn default_system_fields() -> Vec<String> {
    vec!["_id".to_string()]
}

fn default_doc_type() -> String {
    "message".to_string()
}

fn default_keep_alive() -> String {
    "1m".to_string()
}

fn default_status_interval() -> u64 {
    20
}

fn default_output_file() -> PathBuf {
    PathBuf::from("output.csv")
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_log_timestamps() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            username: default_username(),
            password: String::new(),
            accept_invalid_certs: default_accept_invalid_certs(),
            timeout: default_timeout(),
        }
    }
}

impl ServerConfig {
    /// Get request timeout, `None` when disabled
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.timeout > 0).then(|| Duration::from_secs(self.timeout))
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            slices: default_slices(),
            batch_size: default_batch_size(),
            system_fields: default_system_fields(),
            doc_type: default_doc_type(),
            keep_alive: default_keep_alive(),
            status_interval: default_status_interval(),
            output_file: default_output_file(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            timestamps: default_log_timestamps(),
        }
    }
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Load configuration from a file
    ///
    /// An explicitly given path must exist. Without one, the default path is
    /// used when present and defaults otherwise.
    ///
    /// # Arguments
    /// * `path` - Optional path to the configuration file (TOML format)
    ///
    /// # Returns
    /// * `Result<Config>` - Loaded configuration or error
    pub fn load_from_file(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) if !p.exists() => {
                return Err(ConfigError::FileNotFound(p.display().to_string()).into());
            }
            Some(p) => p.to_path_buf(),
            None => {
                let default = Self::default_path();
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let content = std::fs::read_to_string(&path)?;
        let mut config = Self::from_toml(&content)?;
        config.export.output_file =
            utils::fs::expand_home(&config.export.output_file.to_string_lossy());
        Ok(config)
    }

    /// Apply environment overrides through a lookup function
    ///
    /// Taking the lookup as a parameter keeps the process environment out of
    /// tests.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_URL) {
            self.server.url = url;
        }
        if let Some(username) = lookup(ENV_USERNAME) {
            self.server.username = username;
        }
        if let Some(password) = lookup(ENV_PASSWORD) {
            self.server.password = password;
        }
    }

    /// Get the default configuration file path
    ///
    /// # Returns
    /// * `PathBuf` - `~/.es-export/config.toml`
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".es-export")
            .join("config.toml")
    }

    /// Validate the configuration
    ///
    /// # Returns
    /// * `Result<()>` - Ok if valid, error otherwise
    pub fn validate(&self) -> Result<()> {
        let url = self.server.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(invalid("server.url", url));
        }
        if self.export.slices == 0 {
            return Err(invalid("export.slices", "0"));
        }
        if self.export.batch_size == 0 {
            return Err(invalid("export.batch_size", "0"));
        }
        if utils::time::parse_duration(&self.export.keep_alive).is_none() {
            return Err(invalid("export.keep_alive", &self.export.keep_alive));
        }
        if self.export.system_fields.iter().any(|f| f.trim().is_empty()) {
            return Err(invalid("export.system_fields", &self.export.system_fields.join(",")));
        }
        Ok(())
    }

    /// Get progress log interval as Duration
    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.export.status_interval)
    }
}

fn invalid(field: &str, value: &str) -> crate::error::ExportError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
    .into()
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warning => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.url, "http://localhost:9200");
        assert_eq!(config.server.username, "elastic");
        assert!(config.server.accept_invalid_certs);
        assert_eq!(config.export.slices, 10);
        assert_eq!(config.export.batch_size, 10_000);
        assert_eq!(config.export.system_fields, vec!["_id"]);
        assert_eq!(config.export.doc_type, "message");
        assert_eq!(config.export.keep_alive, "1m");
        assert_eq!(config.export.output_file, PathBuf::from("output.csv"));
        assert_eq!(config.logging.level, LogLevel::Info);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [server]
            url = "https://es-data-1:9200"

            [export]
            slices = 4
            system_fields = ["_id", "_index"]

            [logging]
            level = "warning"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.url, "https://es-data-1:9200");
        assert_eq!(config.server.username, "elastic");
        assert_eq!(config.export.slices, 4);
        assert_eq!(config.export.batch_size, 10_000);
        assert_eq!(config.export.system_fields, vec!["_id", "_index"]);
        assert_eq!(config.logging.level, LogLevel::Warning);
    }

    #[test]
    fn test_invalid_toml() {
        let err = Config::from_toml("[export]\nslices = \"many\"").unwrap_err();
        assert!(err.to_string().contains("Invalid format"));
    }

    #[test]
    fn test_load_from_missing_explicit_file() {
        let err = Config::load_from_file(Some(Path::new("/no/such/config.toml"))).unwrap_err();
        assert!(matches!(
            err,
            crate::error::ExportError::Config(ConfigError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[export]\nbatch_size = 500\n").unwrap();

        let config = Config::load_from_file(Some(&path)).unwrap();
        assert_eq!(config.export.batch_size, 500);
        assert_eq!(config.export.output_file, PathBuf::from("output.csv"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> =
            HashMap::from([(ENV_URL, "https://other:9200"), (ENV_PASSWORD, "secret")]);

        let mut config = Config::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.url, "https://other:9200");
        assert_eq!(config.server.username, "elastic");
        assert_eq!(config.server.password, "secret");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.export.slices = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.export.keep_alive = "forever".into();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.export.keep_alive = "300000000000000d".into();
        assert!(matches!(
            config.validate(),
            Err(crate::error::ExportError::Config(ConfigError::InvalidValue { .. }))
        ));

        let mut config = Config::default();
        config.server.url = "localhost:9200".into();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.export.system_fields = vec![" ".into()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_request_timeout() {
        let mut config = Config::default();
        assert_eq!(config.server.request_timeout(), Some(Duration::from_secs(120)));
        config.server.timeout = 0;
        assert_eq!(config.server.request_timeout(), None);
    }

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(LogLevel::Warning.to_tracing_level(), tracing::Level::WARN);
        assert_eq!(LogLevel::Debug.to_tracing_level(), tracing::Level::DEBUG);
    }
}
