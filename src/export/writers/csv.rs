//! CSV writer for export operations
//!
//! Comma-delimited, `\r\n`-terminated, minimal quoting: a field is quoted only
//! when it contains a delimiter, a quote or a line break, with inner quotes
//! doubled.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

use crate::error::Result;
use crate::export::row::ProjectedRow;

use super::{FormatWriter, create_writer};

const DELIMITER: char = ',';
const LINE_TERMINATOR: &str = "\r\n";

/// Writer for CSV format
pub struct CsvWriter {
    /// Buffered file writer
    writer: BufWriter<File>,
    /// Path to the output file
    path: PathBuf,
    /// Number of data rows written
    written: u64,
}

impl CsvWriter {
    /// Create (or truncate) the output file
    ///
    /// # Arguments
    /// * `path` - Output file path
    ///
    /// # Returns
    /// * `Result<Self>` - New writer instance or I/O error
    pub async fn create(path: &Path) -> Result<Self> {
        let writer = create_writer(path).await?;

        debug!("Created CSV writer for: {}", path.display());

        Ok(Self {
            writer,
            path: path.to_path_buf(),
            written: 0,
        })
    }

    /// Append one record, terminator included, to `line`
    fn encode_record<S: AsRef<str>>(fields: &[S], line: &mut String) {
        // A lone empty field would otherwise be indistinguishable from a blank line.
        if let [only] = fields {
            if only.as_ref().is_empty() {
                line.push_str("\"\"");
                line.push_str(LINE_TERMINATOR);
                return;
            }
        }

        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                line.push(DELIMITER);
            }
            line.push_str(&Self::escape_csv_value(field.as_ref()));
        }
        line.push_str(LINE_TERMINATOR);
    }

    /// Escape a CSV value if necessary
    ///
    /// # Arguments
    /// * `value` - Value to escape
    ///
    /// # Returns
    /// * `String` - Escaped value
    fn escape_csv_value(value: &str) -> String {
        if value.contains(DELIMITER) || value.contains('"') || value.contains('\n') || value.contains('\r') {
            // Wrap in quotes and escape internal quotes by doubling them
            format!("\"{}\"", value.replace('"', "\"\""))
        } else {
            value.to_string()
        }
    }
}

#[async_trait]
impl FormatWriter for CsvWriter {
    async fn write_header(&mut self, fields: &[String]) -> Result<()> {
        let mut line = String::new();
        Self::encode_record(fields, &mut line);
        self.writer.write_all(line.as_bytes()).await?;
        debug!("Wrote CSV header: {}", fields.join(","));
        Ok(())
    }

    async fn write_batch(&mut self, rows: &[ProjectedRow]) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut buffer = String::with_capacity(rows.len() * 64);
        for row in rows {
            Self::encode_record(row.values(), &mut buffer);
        }
        self.writer.write_all(buffer.as_bytes()).await?;

        self.written += rows.len() as u64;
        debug!("Wrote {} rows to CSV (total: {})", rows.len(), self.written);

        Ok(rows.len())
    }

    async fn finalize(&mut self) -> Result<()> {
        self.writer.flush().await?;

        debug!("Finalized CSV file: {} ({} rows)", self.path.display(), self.written);
        Ok(())
    }

    async fn file_size(&self) -> Result<u64> {
        let metadata = tokio::fs::metadata(&self.path).await?;
        Ok(metadata.len())
    }
}
