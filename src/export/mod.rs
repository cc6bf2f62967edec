//! Parallel export of search results to CSV
//!
//! The result set of one compiled query is split into slices. Each slice is
//! scrolled by its own [`PartitionFetcher`]; the [`ExportCoordinator`] runs
//! them concurrently and serializes their batches into a single sink.

pub mod coordinator;
pub mod fetcher;
pub mod progress;
pub mod row;
pub mod streaming;
pub mod writers;

pub use coordinator::{ExportCoordinator, ExportResult, ExportSettings};
pub use fetcher::{FetchPhase, FetchSettings, PartitionFetcher, PartitionState, PartitionSummary};
pub use progress::{ProgressSnapshot, ProgressTracker};
pub use row::{ProjectedRow, RowProjector};
pub use streaming::StreamingQuery;
pub use writers::{CsvWriter, FormatWriter};
