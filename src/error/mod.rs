//! Error handling for export runs.
//!
//! This module provides:
//! - A small error taxonomy (protocol, configuration, I/O) shared by every component
//! - Structured extraction of the engine's JSON error bodies for readable messages
//!
//! # Example
//!
//! ```rust
//! use es_export::error::{ExportError, ProtocolError, Result};
//!
//! fn probe() -> Result<()> {
//!     Err(ProtocolError::MissingVersion.into())
//! }
//!
//! assert!(matches!(probe(), Err(ExportError::Protocol(_))));
//! ```

pub mod kinds;
pub mod search;

// Re-export commonly used types
pub use kinds::{ConfigError, ExportError, ProtocolError, Result};
pub use search::ErrorResponse;
