//! Domain types for the exporter.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Error types** ([`ExporterError`], [`TunnelError`])
//! - **Result type alias** ([`Result`])
//! - **Batch windows** ([`BatchWindow`]), the unit of work of the export pipeline
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, ExporterError>`]:
//!
//! ```rust
//! use mongo_exporter::domain::{BatchWindow, ExporterError, Result};
//!
//! fn check(window: BatchWindow) -> Result<()> {
//!     if window.limit == 0 {
//!         return Err(ExporterError::batch(window.offset, window.limit, "empty window"));
//!     }
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod result;
pub mod window;

pub use errors::{ExporterError, TunnelError};
pub use result::Result;
pub use window::BatchWindow;
