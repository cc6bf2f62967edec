//! Streaming abstraction over paginated result sources
//!
//! A source hands out projected rows one bounded batch at a time, so an
//! export never holds more than one page per slice in memory.

use async_trait::async_trait;

use crate::error::Result;

use super::row::ProjectedRow;

/// Trait for streaming query results in batches
#[async_trait]
pub trait StreamingQuery: Send {
    /// Fetch the next batch of rows
    ///
    /// # Returns
    /// * `Result<Option<Vec<ProjectedRow>>>` - Next batch, or None once exhausted
    async fn next_batch(&mut self) -> Result<Option<Vec<ProjectedRow>>>;

    /// Close the query and release server-side resources
    async fn close(&mut self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_streaming_query_trait_object() {
        fn _accepts_streaming_query(_query: Box<dyn StreamingQuery>) {}
    }
}
