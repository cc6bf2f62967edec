//! Structured error information extracted from search engine error bodies.
//!
//! The engine reports failures as
//! `{"error": {"root_cause": [{"type": ..., "reason": ...}], "type": ..., "reason": ...}, "status": 400}`.
//! Older releases sometimes return a bare string under `error`. Everything else
//! (proxies, HTML error pages) is kept verbatim.

use serde::Serialize;
use serde_json::Value;

use super::kinds::Result;

/// Longest raw body kept in an error message.
const MAX_RAW_BODY: usize = 512;

/// Error details extracted from an engine response body.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Raw body when it could not be parsed as an engine error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl ErrorResponse {
    /// Parse an engine error body.
    ///
    /// Prefers the first `root_cause` entry, then the top-level `error`
    /// object, then a plain string `error`, and finally the raw text.
    pub fn from_body(body: &str) -> Self {
        let Ok(json) = serde_json::from_str::<Value>(body) else {
            return Self::raw(body);
        };

        match json.get("error") {
            Some(Value::Object(error)) => {
                let cause = error
                    .get("root_cause")
                    .and_then(Value::as_array)
                    .and_then(|causes| causes.first())
                    .and_then(Value::as_object)
                    .unwrap_or(error);

                Self {
                    error_type: cause.get("type").and_then(Value::as_str).map(str::to_owned),
                    reason: cause.get("reason").and_then(Value::as_str).map(str::to_owned),
                    raw: None,
                }
            }
            Some(Value::String(message)) => Self {
                error_type: None,
                reason: Some(message.clone()),
                raw: None,
            },
            _ => Self::raw(body),
        }
    }

    fn raw(body: &str) -> Self {
        let trimmed = body.trim();
        let raw = if trimmed.len() > MAX_RAW_BODY {
            let mut end = MAX_RAW_BODY;
            while !trimmed.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &trimmed[..end])
        } else {
            trimmed.to_string()
        };

        Self {
            error_type: None,
            reason: None,
            raw: (!raw.is_empty()).then_some(raw),
        }
    }

    /// Compact JSON form, used when the error is logged.
    pub fn to_json_compact(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.error_type, &self.reason, &self.raw) {
            (Some(kind), Some(reason), _) => write!(f, "{kind}: {reason}"),
            (Some(kind), None, _) => write!(f, "{kind}"),
            (None, Some(reason), _) => write!(f, "{reason}"),
            (None, None, Some(raw)) => write!(f, "{raw}"),
            (None, None, None) => write!(f, "<empty body>"),
        }
    }
}
