//! Engine dialect detection and version-specific request shaping
//!
//! The 5.x and 7.x lines differ in three places that matter to an export:
//! whether the search path carries a document-type segment, how `hits.total`
//! is shaped, and whether document types must be emulated with a query
//! filter. [`EngineDialect`] is detected once from `GET /` and answers those
//! questions so the rest of the pipeline never inspects versions again.

use serde_json::Value;
use tracing::debug;

use crate::connection::SearchTransport;
use crate::error::{ProtocolError, Result};

/// Supported engine major versions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineDialect {
    /// 5.x: typed search paths, scalar `hits.total`
    V5,
    /// 7.x: typeless paths, `hits.total` as `{value, relation}`
    V7,
}

impl EngineDialect {
    /// Probe the root endpoint and map its version to a dialect
    ///
    /// One request, no retry: without a dialect no other request can be shaped.
    pub async fn detect(transport: &dyn SearchTransport) -> Result<Self> {
        debug!("Getting engine version: /");
        let response = transport.get("/", None).await?;
        if !response.is_success() {
            return Err(response.status_error().into());
        }

        let body = response.json()?;
        let number = body
            .pointer("/version/number")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingVersion)?;

        Self::from_version(number)
    }

    /// Map a full version string (e.g. `7.10.2`) to a dialect
    pub fn from_version(number: &str) -> Result<Self> {
        match number.split('.').next().map(str::trim) {
            Some("5") => Ok(EngineDialect::V5),
            Some("7") => Ok(EngineDialect::V7),
            _ => Err(ProtocolError::UnsupportedVersion(number.to_string()).into()),
        }
    }

    /// Path of the initial scroll search
    ///
    /// # Arguments
    /// * `index_pattern` - Index name or wildcard pattern
    /// * `doc_type` - Document type, used as a path segment on 5.x only
    /// * `keep_alive` - Scroll context keep-alive
    pub fn search_path(&self, index_pattern: &str, doc_type: &str, keep_alive: &str) -> String {
        match self {
            EngineDialect::V5 => {
                format!("/{index_pattern}/{doc_type}/_search?scroll={keep_alive}")
            }
            EngineDialect::V7 => format!("/{index_pattern}/_search?scroll={keep_alive}"),
        }
    }

    /// Read `hits.total` in this dialect's shape
    pub fn total_hits(&self, response: &Value) -> Result<u64> {
        let total = match self {
            EngineDialect::V5 => response.pointer("/hits/total"),
            EngineDialect::V7 => response.pointer("/hits/total/value"),
        };

        total.and_then(Value::as_u64).ok_or_else(|| {
            ProtocolError::MalformedResponse(format!(
                "hits.total missing or not in {} shape",
                self.label()
            ))
            .into()
        })
    }

    /// Document types must be emulated with a `doc_type` term filter
    pub fn requires_type_filter(&self) -> bool {
        matches!(self, EngineDialect::V7)
    }

    /// Exact totals must be requested explicitly
    pub fn requires_track_total_hits(&self) -> bool {
        matches!(self, EngineDialect::V7)
    }

    pub fn label(&self) -> &'static str {
        match self {
            EngineDialect::V5 => "5.x",
            EngineDialect::V7 => "7.x",
        }
    }
}

impl std::fmt::Display for EngineDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
