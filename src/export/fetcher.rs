//! Per-slice scroll pagination
//!
//! A [`PartitionFetcher`] owns one slice of the result set: it issues the
//! initial scroll search, then continuation requests carrying the latest
//! scroll id, until a page comes back empty. Requests within a slice are
//! strictly sequential.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::connection::SearchTransport;
use crate::dialect::EngineDialect;
use crate::error::{ProtocolError, Result};
use crate::query::QueryPlan;

use super::progress::{ProgressTracker, SnapshotClock};
use super::row::{ProjectedRow, RowProjector};
use super::streaming::StreamingQuery;

/// Continuation endpoint shared by every slice
pub const SCROLL_PATH: &str = "/_search/scroll";

/// Request parameters shared by every slice of one export
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub index_pattern: String,
    pub doc_type: String,
    pub keep_alive: String,
    pub status_interval: Duration,
}

/// Where a fetcher is in its pagination loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPhase {
    /// Initial search not sent yet
    Init,
    /// At least one page delivered; next call continues the scroll
    Paging,
    /// Exhausted
    Done,
    /// A request failed; the fetcher yields nothing more
    Failed,
}

/// Mutable pagination state owned by one slice
#[derive(Debug, Clone)]
pub struct PartitionState {
    pub partition: u32,
    /// Empty before the first response and after the scroll is released
    pub scroll_id: String,
    /// Slice total from the first response
    pub total_hits: u64,
    /// Rows emitted so far
    pub processed: u64,
    clock: SnapshotClock,
}

impl PartitionState {
    pub fn new(partition: u32, status_interval: Duration) -> Self {
        Self {
            partition,
            scroll_id: String::new(),
            total_hits: 0,
            processed: 0,
            clock: SnapshotClock::new(status_interval),
        }
    }
}

/// Counts a slice reports to the coordinator when it finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionSummary {
    pub partition: u32,
    pub total_hits: u64,
    pub processed: u64,
}

/// Scroll-based pager for one slice
pub struct PartitionFetcher {
    transport: Arc<dyn SearchTransport>,
    dialect: EngineDialect,
    /// This slice's own copy of the compiled body
    body: Value,
    projector: Arc<RowProjector>,
    settings: Arc<FetchSettings>,
    tracker: Option<Arc<ProgressTracker>>,
    state: PartitionState,
    phase: FetchPhase,
}

impl PartitionFetcher {
    /// Create a fetcher for `partition`, copying the plan's body for it
    pub fn new(
        partition: u32,
        transport: Arc<dyn SearchTransport>,
        dialect: EngineDialect,
        plan: &QueryPlan,
        projector: Arc<RowProjector>,
        settings: Arc<FetchSettings>,
    ) -> Self {
        Self {
            transport,
            dialect,
            body: plan.body_for_partition(partition),
            projector,
            state: PartitionState::new(partition, settings.status_interval),
            settings,
            tracker: None,
            phase: FetchPhase::Init,
        }
    }

    /// Report processed rows to a shared tracker
    pub fn with_tracker(mut self, tracker: Arc<ProgressTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub fn phase(&self) -> FetchPhase {
        self.phase
    }

    pub fn state(&self) -> &PartitionState {
        &self.state
    }

    pub fn summary(&self) -> PartitionSummary {
        PartitionSummary {
            partition: self.state.partition,
            total_hits: self.state.total_hits,
            processed: self.state.processed,
        }
    }

    /// Initial scroll search
    ///
    /// A 404 means the pattern currently matches no index and counts as an
    /// empty slice.
    async fn first_page(&mut self) -> Result<Vec<Value>> {
        let partition = self.state.partition;
        let path = self.dialect.search_path(
            &self.settings.index_pattern,
            &self.settings.doc_type,
            &self.settings.keep_alive,
        );

        info!("Slice[{}] Starting search...", partition);
        debug!("Slice[{}] query URL: {}", partition, path);

        let response = self.transport.get(&path, Some(&self.body)).await?;
        if response.is_not_found() {
            info!(
                "Slice[{}] No index matches '{}', treating as empty",
                partition, self.settings.index_pattern
            );
            return Ok(Vec::new());
        }
        if !response.is_success() {
            return Err(response.status_error().into());
        }

        let mut json = response.json()?;
        self.state.total_hits = self.dialect.total_hits(&json)?;
        info!("Slice[{}] Total hits: {}", partition, self.state.total_hits);
        if let Some(ref tracker) = self.tracker {
            tracker.add_total(self.state.total_hits);
        }

        self.take_page(&mut json)
    }

    /// Continuation request with the current scroll id
    async fn next_page(&mut self) -> Result<Vec<Value>> {
        let partition = self.state.partition;
        let body = json!({
            "scroll": self.settings.keep_alive,
            "scroll_id": self.state.scroll_id,
        });

        let response = self.transport.get(SCROLL_PATH, Some(&body)).await?;
        if response.is_not_found() {
            return Err(ProtocolError::ScrollExpired {
                partition,
                reason: response.error_reason(),
            }
            .into());
        }
        if !response.is_success() {
            return Err(response.status_error().into());
        }

        let mut json = response.json()?;
        self.take_page(&mut json)
    }

    /// Move the hits out of a page and remember its scroll id
    fn take_page(&mut self, json: &mut Value) -> Result<Vec<Value>> {
        if let Some(scroll_id) = json.get("_scroll_id").and_then(Value::as_str) {
            self.state.scroll_id = scroll_id.to_string();
        }

        let hits = match json.pointer_mut("/hits/hits").map(Value::take) {
            Some(Value::Array(hits)) => hits,
            _ => {
                return Err(ProtocolError::MalformedResponse(format!(
                    "Slice[{}] response has no hits.hits array",
                    self.state.partition
                ))
                .into());
            }
        };

        if !hits.is_empty() && json.get("_scroll_id").and_then(Value::as_str).is_none() {
            return Err(ProtocolError::MissingScrollId {
                partition: self.state.partition,
            }
            .into());
        }

        Ok(hits)
    }

    async fn fetch(&mut self) -> Result<Option<Vec<ProjectedRow>>> {
        let hits = match self.phase {
            FetchPhase::Done | FetchPhase::Failed => return Ok(None),
            FetchPhase::Init => self.first_page().await?,
            FetchPhase::Paging => self.next_page().await?,
        };

        if hits.is_empty() || self.state.total_hits == 0 {
            self.phase = FetchPhase::Done;
            info!(
                "Slice[{}] Completed search, total hits: {}, processed: {}",
                self.state.partition, self.state.total_hits, self.state.processed
            );
            return Ok(None);
        }

        let rows: Vec<ProjectedRow> = hits
            .iter()
            .map(|hit| {
                let row = self.projector.project(hit);
                debug!("values: {:?}", row.values());
                row
            })
            .collect();

        let count = rows.len() as u64;
        self.state.processed += count;
        if let Some(ref tracker) = self.tracker {
            tracker.add(count);
        }
        if let Some(snapshot) = self.state.clock.record(
            count,
            Instant::now(),
            self.state.partition,
            self.state.processed,
            self.state.total_hits,
        ) {
            info!("{}", snapshot);
        }

        self.phase = FetchPhase::Paging;
        Ok(Some(rows))
    }
}

#[async_trait]
impl StreamingQuery for PartitionFetcher {
    async fn next_batch(&mut self) -> Result<Option<Vec<ProjectedRow>>> {
        let result = self.fetch().await;
        if result.is_err() {
            self.phase = FetchPhase::Failed;
        }
        result
    }

    /// Release the scroll context; failures are logged, never returned
    async fn close(&mut self) -> Result<()> {
        if self.phase != FetchPhase::Failed {
            self.phase = FetchPhase::Done;
        }
        if self.state.scroll_id.is_empty() {
            return Ok(());
        }

        let scroll_id = std::mem::take(&mut self.state.scroll_id);
        let body = json!({ "scroll_id": [scroll_id] });
        match self.transport.delete(SCROLL_PATH, &body).await {
            Ok(response) if response.is_success() || response.is_not_found() => {
                debug!("Slice[{}] Cleared scroll context", self.state.partition);
            }
            Ok(response) => warn!(
                "Slice[{}] Failed to clear scroll context: {}",
                self.state.partition,
                response.status_error()
            ),
            Err(e) => warn!(
                "Slice[{}] Failed to clear scroll context: {}",
                self.state.partition, e
            ),
        }
        Ok(())
    }
}
