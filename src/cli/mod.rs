//! CLI interface and argument parsing
//!
//! This module provides the command-line interface using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Mongo Exporter - MongoDB to dataset bulk export tool
#[derive(Parser, Debug)]
#[command(name = "mongo-exporter")]
#[command(version, about, long_about = None)]
#[command(author = "Mongo Exporter Contributors")]
pub struct Cli {
    /// Path to the export input file (JSON or TOML)
    #[arg(short, long, default_value = "INPUT.json", env = "MONGO_EXPORTER_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "MONGO_EXPORTER_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export the documents matching the configured query
    Export(commands::export::ExportArgs),

    /// Validate the input file without connecting
    ValidateConfig(commands::validate::ValidateArgs),

    /// Write a sample input file
    Init(commands::init::InitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_export() {
        let cli = Cli::parse_from(["mongo-exporter", "export"]);
        assert!(matches!(cli.command, Commands::Export(_)));
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["mongo-exporter", "--config", "custom.toml", "export"]);
        assert_eq!(cli.config, "custom.toml");
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["mongo-exporter", "--log-level", "debug", "export"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_cli_parse_export_overrides() {
        let cli = Cli::parse_from([
            "mongo-exporter",
            "export",
            "--yes",
            "--concurrency",
            "4",
            "--estimated-items-count",
            "1500",
            "--use-tunnel",
        ]);
        match cli.command {
            Commands::Export(args) => {
                assert!(args.yes);
                assert_eq!(args.concurrency, Some(4));
                assert_eq!(args.estimated_items_count, Some(1500));
                assert!(args.use_tunnel);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_validate_config() {
        let cli = Cli::parse_from(["mongo-exporter", "validate-config"]);
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }

    #[test]
    fn test_cli_parse_init() {
        let cli = Cli::parse_from(["mongo-exporter", "init", "--output", "input.toml"]);
        match cli.command {
            Commands::Init(args) => assert_eq!(args.output, "input.toml"),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
