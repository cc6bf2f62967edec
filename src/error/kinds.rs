use std::{fmt, io};

use super::search::ErrorResponse;

/// Crate-wide `Result` type using [`ExportError`] as the error.
///
/// This alias is re-exported by the parent `error` module and is intended
/// to be used throughout the crate for fallible operations.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Top-level error type for export runs.
///
/// Every variant is fatal to the run; nothing in the pipeline retries.
#[derive(Debug)]
pub enum ExportError {
    /// The engine was unreachable or answered with something unexpected.
    Protocol(ProtocolError),

    /// Malformed configuration or query document.
    Config(ConfigError),

    /// Output sink or input file I/O failure.
    Io(io::Error),

    /// JSON (de)serialization failure outside of response parsing.
    Json(serde_json::Error),

    /// Partition stopped because another partition failed first.
    Cancelled,

    /// A partition task panicked or was aborted.
    Task(String),
}

/// Errors caused by the search engine's behavior.
#[derive(Debug)]
pub enum ProtocolError {
    /// Request could not be sent or the response could not be read.
    Transport(String),

    /// Non-success HTTP status.
    HttpStatus { status: u16, reason: ErrorResponse },

    /// Root endpoint did not report `version.number`.
    MissingVersion,

    /// Engine major version is not one we can talk to.
    UnsupportedVersion(String),

    /// A non-empty page arrived without `_scroll_id`.
    MissingScrollId { partition: u32 },

    /// Scroll context vanished mid-partition (404 on continuation).
    ScrollExpired { partition: u32, reason: ErrorResponse },

    /// Response body did not have the expected shape.
    MalformedResponse(String),
}

/// Configuration and query document errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file not found.
    FileNotFound(String),

    /// Invalid config or query document format.
    InvalidFormat(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },

    /// Query document is incompatible with the detected dialect.
    InvalidQuery(String),
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::Protocol(e) => write!(f, "Protocol error: {e}"),
            ExportError::Config(e) => write!(f, "Configuration error: {e}"),
            ExportError::Io(e) => write!(f, "I/O error: {e}"),
            ExportError::Json(e) => write!(f, "JSON error: {e}"),
            ExportError::Cancelled => write!(f, "Export cancelled"),
            ExportError::Task(msg) => write!(f, "Partition task failed: {msg}"),
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Transport(msg) => write!(f, "Request failed: {msg}"),
            ProtocolError::HttpStatus { status, reason } => {
                write!(f, "Engine returned HTTP {status}: {reason}")
            }
            ProtocolError::MissingVersion => {
                write!(f, "Root endpoint response has no version.number")
            }
            ProtocolError::UnsupportedVersion(version) => {
                write!(f, "Unsupported engine version: {version}")
            }
            ProtocolError::MissingScrollId { partition } => {
                write!(f, "Slice[{partition}] response is missing _scroll_id")
            }
            ProtocolError::ScrollExpired { partition, reason } => {
                write!(f, "Slice[{partition}] scroll context lost: {reason}")
            }
            ProtocolError::MalformedResponse(msg) => write!(f, "Malformed response: {msg}"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "File not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid format: {msg}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
            ConfigError::InvalidQuery(msg) => write!(f, "Invalid query: {msg}"),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Protocol(e) => Some(e),
            ExportError::Config(e) => Some(e),
            ExportError::Io(e) => Some(e),
            ExportError::Json(e) => Some(e),
            ExportError::Cancelled | ExportError::Task(_) => None,
        }
    }
}
impl std::error::Error for ProtocolError {}
impl std::error::Error for ConfigError {}

/* ========================= Conversions to ExportError ========================= */

impl From<io::Error> for ExportError {
    fn from(err: io::Error) -> Self {
        ExportError::Io(err)
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(err: serde_json::Error) -> Self {
        ExportError::Json(err)
    }
}

impl From<reqwest::Error> for ExportError {
    fn from(err: reqwest::Error) -> Self {
        ExportError::Protocol(ProtocolError::Transport(err.to_string()))
    }
}

impl From<ProtocolError> for ExportError {
    fn from(err: ProtocolError) -> Self {
        ExportError::Protocol(err)
    }
}

impl From<ConfigError> for ExportError {
    fn from(err: ConfigError) -> Self {
        ExportError::Config(err)
    }
}

impl From<tokio::task::JoinError> for ExportError {
    fn from(err: tokio::task::JoinError) -> Self {
        ExportError::Task(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_message_includes_reason() {
        let err: ExportError = ProtocolError::HttpStatus {
            status: 400,
            reason: ErrorResponse::from_body(r#"{"error":{"type":"parsing_exception","reason":"bad"}}"#),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Protocol error: Engine returned HTTP 400: parsing_exception: bad"
        );
    }

    #[test]
    fn test_config_error_display() {
        let err: ExportError = ConfigError::InvalidValue {
            field: "export.slices".into(),
            value: "0".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Configuration error: Invalid value '0' for field 'export.slices'"
        );
    }

    #[test]
    fn test_io_error_has_source() {
        use std::error::Error;
        let err = ExportError::from(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        assert!(err.source().is_some());
        assert!(ExportError::Cancelled.source().is_none());
    }

    #[test]
    fn test_json_error_conversion() {
        use std::error::Error;
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ExportError::from(parse_err);
        assert!(matches!(err, ExportError::Json(_)));
        assert!(err.to_string().starts_with("JSON error:"));
        assert!(err.source().is_some());
    }
}
