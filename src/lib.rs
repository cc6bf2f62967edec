//! Search Engine Metadata Export Library
//!
//! Exports hit metadata and selected `_source` fields from a search engine
//! cluster to CSV, splitting the result set into slices that are scrolled
//! concurrently.
//!
//! # Modules
//!
//! - `cli`: Command-line interface and argument parsing
//! - `config`: Configuration management
//! - `connection`: HTTP transport to the engine
//! - `dialect`: Engine version detection and version-specific request shapes
//! - `error`: Error types and handling
//! - `export`: Slice fetchers, export coordinator and CSV output
//! - `query`: Query document loading and compilation
//! - `utils`: Utility functions and helpers
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use es_export::config::Config;
//! use es_export::connection::HttpTransport;
//! use es_export::dialect::EngineDialect;
//! use es_export::export::{ExportCoordinator, ExportSettings};
//! use es_export::query::{CompileSettings, compile, load_query_document};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let transport = Arc::new(HttpTransport::new(&config.server)?);
//!     let dialect = EngineDialect::detect(transport.as_ref()).await?;
//!
//!     let raw = load_query_document(Path::new("query.json"))?;
//!     let plan = compile(
//!         raw,
//!         dialect,
//!         &CompileSettings {
//!             partitions: config.export.slices,
//!             batch_size: config.export.batch_size,
//!             doc_type: config.export.doc_type.clone(),
//!         },
//!     )?;
//!
//!     let settings = ExportSettings::from_config(&config, false);
//!     let result = ExportCoordinator::new(transport, dialect, settings)
//!         .export("kg__message_*", &plan)
//!         .await?;
//!     println!("Saved {} messages.", result.documents_exported);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod connection;
pub mod dialect;
pub mod error;
pub mod export;
pub mod query;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use connection::{HttpTransport, SearchTransport};
pub use dialect::EngineDialect;
pub use error::{ExportError, Result};
pub use export::{ExportCoordinator, ExportResult};
pub use query::QueryPlan;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
///
/// # Returns
/// * `&str` - Version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
