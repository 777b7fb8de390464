//! Export command implementation
//!
//! This module implements the `export` command, which runs one export of the
//! configured query into the configured sink.

use crate::config::{load_config, ExportConfig};
use crate::core::export::{ExportCoordinator, ExportSummary};
use crate::domain::ExporterError;
use crate::log_error_with_context;
use clap::Args;
use tokio::sync::watch;

/// Arguments for the export command
#[derive(Args, Debug, Default)]
pub struct ExportArgs {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Override the number of batch windows fetched concurrently
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Use this item count instead of counting matching documents
    #[arg(long)]
    pub estimated_items_count: Option<u64>,

    /// Route the database connection through the proxy tunnel
    #[arg(long)]
    pub use_tunnel: bool,

    /// Override the collection to export from
    #[arg(long)]
    pub collection: Option<String>,
}

impl ExportArgs {
    /// Execute the export command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting export command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                log_error_with_context!(&e, "Failed to load configuration");
                eprintln!("{e}");
                return Ok(e.exit_code());
            }
        };

        self.apply_overrides(&mut config);

        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(2);
        }

        if !self.yes && !confirm(&config)? {
            println!("Export cancelled.");
            return Ok(0);
        }

        let coordinator = match ExportCoordinator::connect(config, shutdown_signal).await {
            Ok(c) => c,
            Err(e) => {
                log_error_with_context!(&e, "Failed to initialize export");
                eprintln!("Failed to initialize export: {e}");
                return Ok(e.exit_code());
            }
        };

        match coordinator.execute().await {
            Ok(summary) => {
                print_summary(&summary);
                println!("Done.");
                Ok(0)
            }
            Err(ExporterError::Interrupted(reason)) => {
                tracing::info!(reason = %reason, "Export interrupted by user signal");
                println!();
                println!("Export interrupted: {reason}");
                println!("Records appended so far stay in the sink; a rerun exports everything again.");
                Ok(130)
            }
            Err(e) => {
                log_error_with_context!(&e, "Export failed");
                eprintln!("Export failed: {e}");
                Ok(e.exit_code())
            }
        }
    }

    /// Apply command line overrides on top of the loaded configuration
    pub fn apply_overrides(&self, config: &mut ExportConfig) {
        if let Some(concurrency) = self.concurrency {
            tracing::info!(concurrency, "Overriding concurrency from CLI");
            config.concurrency = concurrency;
        }
        if let Some(estimate) = self.estimated_items_count {
            tracing::info!(estimate, "Overriding item count estimate from CLI");
            config.estimated_items_count = Some(estimate);
        }
        if self.use_tunnel {
            tracing::info!("Enabling tunnel from CLI");
            config.use_tunnel = true;
        }
        if let Some(collection) = &self.collection {
            tracing::info!(collection = %collection, "Overriding collection from CLI");
            config.collection_name = collection.clone();
        }
    }
}

fn confirm(config: &ExportConfig) -> anyhow::Result<bool> {
    use std::io::{self, Write};

    println!("Export Configuration:");
    for line in super::validate::describe(config) {
        println!("  {line}");
    }
    println!();
    print!("Proceed with export? [y/N]: ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

fn print_summary(summary: &ExportSummary) {
    println!();
    println!("Export Summary:");
    println!("  Run: {}", summary.run_id);
    println!("  Collection: {}", summary.collection);
    println!("  Sink: {}", summary.sink);
    println!("  Matching documents: {}", summary.total_count);
    println!("  Batch windows: {}", summary.windows_completed);
    println!("  Documents exported: {}", summary.documents_exported);
    println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{secret_string, ExportInput};
    use mongodb::bson::doc;

    fn config() -> ExportConfig {
        ExportInput {
            query: Some(doc! {}),
            collection_name: Some("orders".to_string()),
            mongo_url: Some(secret_string("mongodb://u:p@db:27017/shop".to_string())),
            ..Default::default()
        }
        .into_config()
        .unwrap()
    }

    #[test]
    fn test_export_args_defaults() {
        let args = ExportArgs::default();

        assert!(!args.yes);
        assert!(args.concurrency.is_none());
        assert!(args.estimated_items_count.is_none());
        assert!(!args.use_tunnel);
    }

    #[test]
    fn test_overrides_applied() {
        let args = ExportArgs {
            yes: true,
            concurrency: Some(3),
            estimated_items_count: Some(1500),
            use_tunnel: false,
            collection: Some("archive".to_string()),
        };
        let mut config = config();

        args.apply_overrides(&mut config);

        assert_eq!(config.concurrency, 3);
        assert_eq!(config.estimated_items_count, Some(1500));
        assert_eq!(config.collection_name, "archive");
        assert!(!config.use_tunnel);
    }

    #[test]
    fn test_invalid_override_fails_validation() {
        let args = ExportArgs {
            concurrency: Some(0),
            ..Default::default()
        };
        let mut config = config();

        args.apply_overrides(&mut config);

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_oversized_estimate_override_fails_validation() {
        let args = ExportArgs {
            estimated_items_count: Some(u64::MAX),
            ..Default::default()
        };
        let mut config = config();
        config.batch_size = 1;

        args.apply_overrides(&mut config);

        let err = config.validate().unwrap_err();
        assert!(err.contains("estimatedItemsCount"), "{err}");
    }

    #[tokio::test]
    async fn test_oversized_estimate_exits_before_connecting() {
        use std::io::Write;

        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        // Nothing listens on this port; reaching the connect step would fail differently
        file.write_all(
            br#"{"mongoUrl": "mongodb://127.0.0.1:1/shop", "collectionName": "orders", "query": {}, "batchSize": 1}"#,
        )
        .unwrap();

        let (_tx, rx) = watch::channel(false);
        let args = ExportArgs {
            yes: true,
            estimated_items_count: Some(u64::MAX),
            ..Default::default()
        };

        let code = args
            .execute(file.path().to_str().unwrap(), rx)
            .await
            .unwrap();
        assert_eq!(code, 2);
    }

    #[tokio::test]
    async fn test_missing_config_returns_configuration_code() {
        let (_tx, rx) = watch::channel(false);
        let args = ExportArgs {
            yes: true,
            ..Default::default()
        };

        let code = args.execute("missing-input.json", rx).await.unwrap();
        assert_eq!(code, 2);
    }
}
