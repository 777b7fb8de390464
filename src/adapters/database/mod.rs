//! Database abstraction layer
//!
//! This module provides a trait-based abstraction over the source database,
//! so the export pipeline can run against MongoDB or an in-memory store in tests.

pub mod traits;

pub use traits::DocumentStore;
