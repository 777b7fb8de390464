//! Validate config command implementation
//!
//! This module implements the `validate-config` command for checking an
//! export input file without connecting to anything.

use crate::config::{load_config, redact_connection_string, ExportConfig, SinkConfig};
use clap::Args;
use secrecy::ExposeSecret;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("Validating input file: {config_path}");
        println!();

        // Loading also validates
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("Configuration is invalid");
                println!("   Error: {e}");
                return Ok(e.exit_code());
            }
        };

        println!("Configuration is valid");
        println!();
        for line in describe(&config) {
            println!("  {line}");
        }
        println!();
        Ok(0)
    }
}

/// Human-readable summary of a configuration, with credentials masked
pub fn describe(config: &ExportConfig) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Connection: {}",
            redact_connection_string(config.mongo_url.expose_secret().as_str())
        ),
        format!(
            "Database: {}",
            config
                .db_name
                .as_deref()
                .unwrap_or("(default of connection string)")
        ),
        format!("Collection: {}", config.collection_name),
        format!("Filter: {}", config.query),
        format!(
            "Projection: {}",
            config
                .projection()
                .map_or_else(|| "(all fields)".to_string(), |p| p.to_string())
        ),
        format!("Concurrency: {}", config.concurrency),
        format!("Batch size: {}", config.batch_size),
        format!("Tunnel: {}", if config.use_tunnel { "enabled" } else { "disabled" }),
    ];

    match config.estimated_items_count {
        Some(estimate) => lines.push(format!("Item count: {estimate} (configured estimate)")),
        None => lines.push(format!(
            "Item count: counted, limit {}s",
            config.count_timeout_secs
        )),
    }

    if config.use_tunnel {
        if let Ok(url) = config.proxy.resolve() {
            lines.push(format!(
                "Proxy: {}:{}",
                url.host_str().unwrap_or_default(),
                url.port_or_known_default().unwrap_or_default()
            ));
        }
    }

    lines.push(match &config.sink {
        SinkConfig::Jsonl { path } => format!("Sink: jsonl file {path}"),
        SinkConfig::Dataset {
            dataset_id,
            base_url,
            ..
        } => format!(
            "Sink: dataset {} at {}",
            dataset_id.as_deref().unwrap_or_default(),
            base_url
        ),
    });
    lines.push(format!("Log level: {}", config.logging.level));

    lines
}
