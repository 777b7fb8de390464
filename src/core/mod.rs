//! Core business logic for the exporter.
//!
//! # Modules
//!
//! - [`dates`] - ISO-8601 date normalization for configuration trees
//! - [`export`] - Count estimation, batch planning, the export pipeline and run coordination
//!
//! # Export Workflow
//!
//! 1. **Connect**: Open the proxy tunnel (optional) and the database session
//! 2. **Estimate**: Count the documents matching the filter, or use the configured estimate
//! 3. **Plan**: Split the result set into 1000-document windows
//! 4. **Export**: Fetch and append windows with bounded concurrency, halting on the first failure
//! 5. **Teardown**: Close the session and the tunnel, on every exit path
//! 6. **Report**: Log the export summary
//!
//! # Example
//!
//! ```rust,no_run
//! use mongo_exporter::config::load_config;
//! use mongo_exporter::core::export::ExportCoordinator;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("INPUT.json")?;
//!
//! // Create shutdown signal
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//! let coordinator = ExportCoordinator::connect(config, shutdown_rx).await?;
//! let summary = coordinator.execute().await?;
//!
//! println!("Exported: {}", summary.documents_exported);
//! # Ok(())
//! # }
//! ```

pub mod dates;
pub mod export;
