//! Transport to the search engine
//!
//! Every request the exporter makes goes through [`SearchTransport`], a thin
//! trait over "send a JSON body to a path, get back a status and a body".
//! Status interpretation lives with the callers so that the dialect probe,
//! the first page and continuation pages can each apply their own rules.
//!
//! [`HttpTransport`] is the `reqwest` implementation used by the binary.

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use tracing::{debug, error};

use crate::config::ServerConfig;
use crate::error::{ErrorResponse, ProtocolError, Result};

#[cfg(test)]
pub(crate) mod testing;

/// Status and body of one engine response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == StatusCode::NOT_FOUND.as_u16()
    }

    /// Parse the body as JSON
    pub fn json(&self) -> Result<Value> {
        serde_json::from_str(&self.body).map_err(|e| {
            ProtocolError::MalformedResponse(format!("response body is not JSON: {e}")).into()
        })
    }

    /// Extract the engine's error from the body, logging it in full
    pub fn error_reason(&self) -> ErrorResponse {
        let reason = ErrorResponse::from_body(&self.body);
        match reason.to_json_compact() {
            Ok(summary) => error!("Engine error (HTTP {}): {}", self.status, summary),
            Err(e) => error!("Engine error (HTTP {}): {} ({})", self.status, reason, e),
        }
        debug!("Engine error body: {}", self.body);
        reason
    }

    /// Convert a non-success response into a [`ProtocolError::HttpStatus`]
    pub fn status_error(&self) -> ProtocolError {
        ProtocolError::HttpStatus {
            status: self.status,
            reason: self.error_reason(),
        }
    }
}

/// Request/response seam between the pipeline and the engine
#[async_trait]
pub trait SearchTransport: Send + Sync {
    /// Issue a GET, optionally carrying a JSON body
    ///
    /// # Arguments
    /// * `path` - Path and query string, starting with `/`
    /// * `body` - Request body
    ///
    /// # Returns
    /// * `Result<RawResponse>` - Any HTTP status; only transport failures are errors
    async fn get(&self, path: &str, body: Option<&Value>) -> Result<RawResponse>;

    /// Issue a DELETE with a JSON body
    async fn delete(&self, path: &str, body: &Value) -> Result<RawResponse>;
}

/// `reqwest`-backed transport with fixed base URL and basic auth credentials
pub struct HttpTransport {
    client: Client,
    base_url: String,
    username: String,
    password: String,
}

impl HttpTransport {
    /// Build the HTTP client from server configuration
    ///
    /// # Arguments
    /// * `config` - Server connection settings
    ///
    /// # Returns
    /// * `Result<Self>` - Transport or error if the client cannot be built
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let mut builder =
            Client::builder().danger_accept_invalid_certs(config.accept_invalid_certs);
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<RawResponse> {
        let url = self.url(path);
        debug!("{} {}", method, url);

        let mut request = self
            .client
            .request(method, &url)
            .basic_auth(&self.username, Some(&self.password));
        if let Some(body) = body {
            debug!("Request body: {}", body);
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(RawResponse { status, body })
    }
}

#[async_trait]
impl SearchTransport for HttpTransport {
    async fn get(&self, path: &str, body: Option<&Value>) -> Result<RawResponse> {
        self.send(Method::GET, path, body).await
    }

    async fn delete(&self, path: &str, body: &Value) -> Result<RawResponse> {
        self.send(Method::DELETE, path, Some(body)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_response_status_helpers() {
        assert!(RawResponse::new(200, "{}").is_success());
        assert!(RawResponse::new(201, "{}").is_success());
        assert!(!RawResponse::new(404, "{}").is_success());
        assert!(RawResponse::new(404, "{}").is_not_found());
        assert!(!RawResponse::new(500, "{}").is_not_found());
    }

    #[test]
    fn test_raw_response_json() {
        let value = RawResponse::new(200, r#"{"a": 1}"#).json().unwrap();
        assert_eq!(value["a"], 1);
        assert!(RawResponse::new(200, "not json").json().is_err());
    }

    #[test]
    fn test_status_error_carries_reason() {
        let err = RawResponse::new(503, r#"{"error":{"type":"cluster_block_exception","reason":"blocked"}}"#)
            .status_error();
        assert_eq!(
            err.to_string(),
            "Engine returned HTTP 503: cluster_block_exception: blocked"
        );
    }

    #[test]
    fn test_error_reason_keeps_root_cause_of_full_body() {
        let body = r#"{"error":{"root_cause":[{"type":"query_shard_exception","reason":"bad field"}],"type":"search_phase_execution_exception","reason":"all shards failed","failed_shards":[{"shard":0}]},"status":400}"#;
        let reason = RawResponse::new(400, body).error_reason();
        assert_eq!(reason.error_type.as_deref(), Some("query_shard_exception"));
        assert_eq!(
            reason.to_json_compact().unwrap(),
            r#"{"type":"query_shard_exception","reason":"bad field"}"#
        );
    }

    #[test]
    fn test_http_transport_trims_base_url() {
        let config = ServerConfig {
            url: "https://es-node:9200/".into(),
            ..ServerConfig::default()
        };
        let transport = HttpTransport::new(&config).unwrap();
        assert_eq!(transport.url("/_search/scroll"), "https://es-node:9200/_search/scroll");
    }

    #[test]
    fn test_transport_is_object_safe() {
        fn _accepts_transport(_transport: std::sync::Arc<dyn SearchTransport>) {}
    }
}
