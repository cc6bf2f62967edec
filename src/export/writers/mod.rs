//! Output sinks for export operations
//!
//! One format today (CSV); the trait keeps the coordinator independent of it
//! and lets tests capture rows in memory.

use async_trait::async_trait;
use std::path::Path;
use tokio::fs::File;
use tokio::io::BufWriter;

use crate::error::Result;

use super::row::ProjectedRow;

pub mod csv;

pub use csv::CsvWriter;

/// Trait for writing projected rows to an output format
#[async_trait]
pub trait FormatWriter: Send {
    /// Write the header row
    ///
    /// # Arguments
    /// * `fields` - Column names in output order
    async fn write_header(&mut self, fields: &[String]) -> Result<()>;

    /// Write a batch of rows
    ///
    /// A batch is written as one unit; callers serialize access so batches
    /// from different partitions never interleave.
    ///
    /// # Returns
    /// * `Result<usize>` - Number of rows written
    async fn write_batch(&mut self, rows: &[ProjectedRow]) -> Result<usize>;

    /// Finalize the output (flush buffers)
    async fn finalize(&mut self) -> Result<()>;

    /// Get the current file size in bytes (if applicable)
    async fn file_size(&self) -> Result<u64>;
}

/// Helper function to create a buffered file writer
///
/// # Arguments
/// * `path` - File path to create (truncated if it exists)
///
/// # Returns
/// * `Result<BufWriter<File>>` - Buffered writer or I/O error
pub(crate) async fn create_writer(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).await?;
    Ok(BufWriter::with_capacity(8 * 1024 * 1024, file)) // 8MB buffer
}
