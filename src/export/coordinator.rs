//! Export coordinator for orchestrating export operations
//!
//! Fans out one [`PartitionFetcher`] per slice, funnels their batches into a
//! single locked sink and folds the per-slice counts into an [`ExportResult`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::connection::SearchTransport;
use crate::dialect::EngineDialect;
use crate::error::{ExportError, Result};
use crate::query::QueryPlan;
use crate::utils::time::{format_duration, rate};

use super::fetcher::{FetchSettings, PartitionFetcher, PartitionSummary};
use super::progress::ProgressTracker;
use super::row::RowProjector;
use super::streaming::StreamingQuery;
use super::writers::{CsvWriter, FormatWriter};

type SharedWriter = Arc<Mutex<Box<dyn FormatWriter>>>;

/// Result of an export operation
#[derive(Debug)]
pub struct ExportResult {
    /// Sum of the slice totals reported by the engine
    pub documents_exported: u64,
    /// Data rows written to the sink
    pub rows_written: u64,
    /// Number of slices scrolled
    pub partitions: u32,
    /// Output path
    pub output_file: PathBuf,
    /// File size in bytes
    pub file_size_bytes: u64,
    /// Time taken for export
    pub elapsed_ms: u64,
    /// Overall throughput
    pub docs_per_sec: f64,
    /// Wall-clock start of the export
    pub started_at: DateTime<Local>,
    /// No fields were configured, so nothing was written
    pub skipped: bool,
}

/// Settings the coordinator needs beyond the plan
#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub system_fields: Vec<String>,
    pub doc_type: String,
    pub keep_alive: String,
    pub status_interval: Duration,
    pub output_file: PathBuf,
    pub progress_bar: bool,
}

impl ExportSettings {
    pub fn from_config(config: &Config, progress_bar: bool) -> Self {
        Self {
            system_fields: config.export.system_fields.clone(),
            doc_type: config.export.doc_type.clone(),
            keep_alive: config.export.keep_alive.clone(),
            status_interval: config.status_interval(),
            output_file: config.export.output_file.clone(),
            progress_bar,
        }
    }
}

/// Coordinator for export operations
pub struct ExportCoordinator {
    transport: Arc<dyn SearchTransport>,
    dialect: EngineDialect,
    settings: ExportSettings,
    /// Cancellation token for aborting export
    cancel_token: Option<CancellationToken>,
}

impl ExportCoordinator {
    /// Create a new export coordinator
    pub fn new(
        transport: Arc<dyn SearchTransport>,
        dialect: EngineDialect,
        settings: ExportSettings,
    ) -> Self {
        Self {
            transport,
            dialect,
            settings,
            cancel_token: None,
        }
    }

    /// Set cancellation token for this export operation
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    /// Export every slice of `plan` into the configured CSV file
    ///
    /// # Returns
    /// * `Result<ExportResult>` - Export statistics, or the first slice failure
    pub async fn export(&self, index_pattern: &str, plan: &QueryPlan) -> Result<ExportResult> {
        let Some(projector) = self.projector(plan) else {
            return Ok(self.skipped());
        };

        let writer = CsvWriter::create(&self.settings.output_file).await?;
        self.run(index_pattern, plan, projector, Box::new(writer)).await
    }

    /// Same as [`export`](Self::export) with a caller-supplied sink
    pub async fn export_with_writer(
        &self,
        index_pattern: &str,
        plan: &QueryPlan,
        writer: Box<dyn FormatWriter>,
    ) -> Result<ExportResult> {
        let Some(projector) = self.projector(plan) else {
            return Ok(self.skipped());
        };

        self.run(index_pattern, plan, projector, writer).await
    }

    fn projector(&self, plan: &QueryPlan) -> Option<RowProjector> {
        info!("System fields: {:?}", self.settings.system_fields);
        info!("Source fields: {:?}", plan.source_fields());

        let projector = RowProjector::new(
            self.settings.system_fields.clone(),
            plan.source_fields().to_vec(),
        );
        if projector.width() == 0 {
            info!("No fields configured to be saved.");
            return None;
        }
        Some(projector)
    }

    fn skipped(&self) -> ExportResult {
        ExportResult {
            documents_exported: 0,
            rows_written: 0,
            partitions: 0,
            output_file: self.settings.output_file.clone(),
            file_size_bytes: 0,
            elapsed_ms: 0,
            docs_per_sec: 0.0,
            started_at: Local::now(),
            skipped: true,
        }
    }

    async fn run(
        &self,
        index_pattern: &str,
        plan: &QueryPlan,
        projector: RowProjector,
        mut writer: Box<dyn FormatWriter>,
    ) -> Result<ExportResult> {
        let start_time = Instant::now();
        let started_at = Local::now();
        let partitions = plan.partitions();

        info!("Searching messages with {} slices...", partitions);

        let header = projector.header();
        writer.write_header(&header).await?;
        debug!("header_fields: {:?}", header);

        let writer: SharedWriter = Arc::new(Mutex::new(writer));
        let projector = Arc::new(projector);
        let tracker = Arc::new(ProgressTracker::new(self.settings.progress_bar));
        let fetch_settings = Arc::new(FetchSettings {
            index_pattern: index_pattern.to_string(),
            doc_type: self.settings.doc_type.clone(),
            keep_alive: self.settings.keep_alive.clone(),
            status_interval: self.settings.status_interval,
        });
        let cancel = self
            .cancel_token
            .as_ref()
            .map(CancellationToken::child_token)
            .unwrap_or_default();

        let mut tasks = JoinSet::new();
        for partition in 0..partitions {
            let fetcher = PartitionFetcher::new(
                partition,
                Arc::clone(&self.transport),
                self.dialect,
                plan,
                Arc::clone(&projector),
                Arc::clone(&fetch_settings),
            )
            .with_tracker(Arc::clone(&tracker));

            tasks.spawn(drain_partition(fetcher, Arc::clone(&writer), cancel.clone()));
        }

        let mut documents_exported = 0u64;
        let mut rows_written = 0u64;
        let mut first_error: Option<ExportError> = None;

        while let Some(joined) = tasks.join_next().await {
            match joined.map_err(ExportError::from).and_then(|outcome| outcome) {
                Ok(summary) => {
                    documents_exported += summary.total_hits;
                    rows_written += summary.processed;
                }
                Err(e) if first_error.is_none() => {
                    error!("Export failed: {}", e);
                    cancel.cancel();
                    first_error = Some(e);
                }
                Err(e) => debug!("Further slice failure after cancellation: {}", e),
            }
        }

        tracker.finish();

        let mut writer = writer.lock().await;
        if let Some(e) = first_error {
            if let Err(flush_err) = writer.finalize().await {
                debug!("Flushing incomplete output failed: {}", flush_err);
            }
            warn!(
                "Output {} is incomplete and must not be used",
                self.settings.output_file.display()
            );
            return Err(e);
        }

        writer.finalize().await?;
        let file_size_bytes = writer.file_size().await?;

        let elapsed = start_time.elapsed();
        let docs_per_sec = rate(documents_exported, elapsed);

        if documents_exported != rows_written {
            warn!(
                "Engine reported {} hits but {} rows were written",
                documents_exported, rows_written
            );
        }

        info!(
            "Found {} messages in {:.2} minutes ({}), docs/sec: {:.0}",
            documents_exported,
            elapsed.as_secs_f64() / 60.0,
            format_duration(elapsed),
            docs_per_sec
        );

        Ok(ExportResult {
            documents_exported,
            rows_written,
            partitions,
            output_file: self.settings.output_file.clone(),
            file_size_bytes,
            elapsed_ms: elapsed.as_millis() as u64,
            docs_per_sec,
            started_at,
            skipped: false,
        })
    }
}

/// Run one slice to completion, then release its scroll context
async fn drain_partition(
    mut fetcher: PartitionFetcher,
    writer: SharedWriter,
    cancel: CancellationToken,
) -> Result<PartitionSummary> {
    let outcome = pump(&mut fetcher, &writer, &cancel).await;
    fetcher.close().await?;
    outcome?;
    Ok(fetcher.summary())
}

async fn pump(
    fetcher: &mut PartitionFetcher,
    writer: &SharedWriter,
    cancel: &CancellationToken,
) -> Result<()> {
    loop {
        let batch = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ExportError::Cancelled),
            batch = fetcher.next_batch() => batch?,
        };

        let Some(rows) = batch else {
            return Ok(());
        };

        // One lock per batch keeps rows from different slices apart.
        writer.lock().await.write_batch(&rows).await?;
    }
}
