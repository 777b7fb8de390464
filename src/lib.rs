// Mongo Exporter - MongoDB to dataset bulk export tool
// Copyright (c) 2025 Mongo Exporter Contributors
// Licensed under the MIT License

//! # Mongo Exporter - MongoDB to dataset bulk export
//!
//! Mongo Exporter copies the documents matching a MongoDB query into an
//! append-only sink, such as a JSON lines file or a hosted dataset.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Loading** the export input, with ISO-8601 strings turned into BSON dates
//! - **Tunneling** the database connection through an HTTP CONNECT proxy
//! - **Counting** the matching documents, or trusting a configured estimate
//! - **Exporting** fixed-size batch windows with bounded concurrency
//! - **Tearing down** the session and tunnel on every exit path
//!
//! ## Architecture
//!
//! The crate follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (date normalization, estimation, planning, pipeline)
//! - [`adapters`] - External integrations (MongoDB, proxy tunnel, sinks)
//! - [`domain`] - Error types and batch windows
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mongo_exporter::config::load_config;
//! use mongo_exporter::core::export::ExportCoordinator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("INPUT.json")?;
//!     let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//!     let coordinator = ExportCoordinator::connect(config, shutdown_rx).await?;
//!     let summary = coordinator.execute().await?;
//!
//!     println!("Exported {} documents", summary.documents_exported);
//!     Ok(())
//! }
//! ```
//!
//! ## Batch Windows
//!
//! The result set is split into windows of 1000 documents. The plan always
//! includes the window starting at the counted total, so a count of 2500
//! yields windows at offsets 0, 1000 and 2000, and a count of 0 yields one:
//!
//! ```rust
//! use mongo_exporter::core::export::{plan_batches, BATCH_SIZE};
//!
//! assert_eq!(plan_batches(0, BATCH_SIZE).window_count(), 1);
//! assert_eq!(plan_batches(2500, BATCH_SIZE).window_count(), 3);
//! ```
//!
//! ## Error Handling
//!
//! Every failure is an [`domain::ExporterError`]; each kind maps to a process
//! exit code:
//!
//! ```rust
//! use mongo_exporter::domain::ExporterError;
//!
//! let err = ExporterError::Estimation("count timed out".to_string());
//! assert_eq!(err.exit_code(), 3);
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
