//! Scripted in-memory engine for tests
//!
//! Responses are scripted per slice. Scroll ids follow the pattern
//! `s{slice}-{page}`, so a continuation request can be routed back to the
//! slice and page it belongs to.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{RawResponse, SearchTransport};
use crate::error::{ProtocolError, Result};

/// One request seen by the scripted engine
#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub method: &'static str,
    pub path: String,
    pub body: Option<Value>,
}

pub(crate) struct ScriptedEngine {
    root: RawResponse,
    total_as_object: bool,
    slices: HashMap<u32, Vec<RawResponse>>,
    unreachable: bool,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedEngine {
    /// Engine reporting `version.number`; 5.x uses scalar totals, anything else the object form
    pub fn new(version: &str) -> Self {
        Self {
            root: RawResponse::new(
                200,
                json!({"name": "node-1", "version": {"number": version}}).to_string(),
            ),
            total_as_object: !version.starts_with("5."),
            slices: HashMap::new(),
            unreachable: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every request fails at the transport level
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::new("7.10.2")
        }
    }

    pub fn with_root(mut self, root: RawResponse) -> Self {
        self.root = root;
        self
    }

    /// Script a slice holding `docs`, served `page_size` hits at a time
    pub fn with_slice(mut self, slice: u32, docs: Vec<Value>, page_size: usize) -> Self {
        let total = docs.len() as u64;
        let mut responses: Vec<RawResponse> = docs
            .chunks(page_size.max(1))
            .enumerate()
            .map(|(page, hits)| self.page(slice, page + 1, total, hits.to_vec()))
            .collect();
        let last = responses.len() + 1;
        responses.push(self.page(slice, last, total, Vec::new()));
        self.slices.insert(slice, responses);
        self
    }

    /// Script raw responses for a slice: first page, then continuations in order
    pub fn with_slice_responses(mut self, slice: u32, responses: Vec<RawResponse>) -> Self {
        self.slices.insert(slice, responses);
        self
    }

    /// A page response in this engine's total-hits shape
    pub fn page(&self, slice: u32, page: usize, total: u64, hits: Vec<Value>) -> RawResponse {
        let total = if self.total_as_object {
            json!({"value": total, "relation": "eq"})
        } else {
            json!(total)
        };
        RawResponse::new(
            200,
            json!({
                "_scroll_id": format!("s{slice}-{page}"),
                "took": 1,
                "timed_out": false,
                "hits": {"total": total, "hits": hits}
            })
            .to_string(),
        )
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, method: &'static str, path: &str, body: Option<&Value>) {
        self.requests.lock().unwrap().push(RecordedRequest {
            method,
            path: path.to_string(),
            body: body.cloned(),
        });
    }

    fn scripted(&self, slice: u32, index: usize) -> RawResponse {
        match self.slices.get(&slice).and_then(|r| r.get(index)) {
            Some(response) => response.clone(),
            None => self.page(slice, index + 1, 0, Vec::new()),
        }
    }
}

#[async_trait]
impl SearchTransport for ScriptedEngine {
    async fn get(&self, path: &str, body: Option<&Value>) -> Result<RawResponse> {
        self.record("GET", path, body);
        if self.unreachable {
            return Err(ProtocolError::Transport("connection refused".into()).into());
        }

        if path == "/" {
            return Ok(self.root.clone());
        }

        if path == "/_search/scroll" {
            let scroll_id = body
                .and_then(|b| b.get("scroll_id"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            let (slice, page) = scroll_id
                .strip_prefix('s')
                .and_then(|rest| rest.split_once('-'))
                .and_then(|(s, p)| Some((s.parse::<u32>().ok()?, p.parse::<usize>().ok()?)))
                .unwrap_or((u32::MAX, 0));
            return Ok(self.scripted(slice, page));
        }

        let slice = body
            .and_then(|b| b.pointer("/slice/id"))
            .and_then(Value::as_u64)
            .unwrap_or(0) as u32;
        Ok(self.scripted(slice, 0))
    }

    async fn delete(&self, path: &str, body: &Value) -> Result<RawResponse> {
        self.record("DELETE", path, Some(body));
        if self.unreachable {
            return Err(ProtocolError::Transport("connection refused".into()).into());
        }
        Ok(RawResponse::new(200, r#"{"succeeded":true,"num_freed":1}"#))
    }
}

/// A hit with an `_id` and the given `_source`
pub(crate) fn hit(id: &str, source: Value) -> Value {
    json!({"_index": "messages-1", "_type": "_doc", "_id": id, "_score": null, "_source": source})
}
