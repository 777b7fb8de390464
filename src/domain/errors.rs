//! Domain error types
//!
//! This module defines the error hierarchy for the exporter. Every failure a run
//! can end with is one variant of [`ExporterError`]; none of them expose
//! third-party driver types.

use thiserror::Error;

/// Main exporter error type
///
/// This is the primary error type used throughout the application.
/// Each variant maps to a distinct process exit code (see [`ExporterError::exit_code`]).
#[derive(Debug, Error)]
pub enum ExporterError {
    /// Missing or malformed configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Proxy tunnel could not be established or failed
    #[error("Tunnel error: {0}")]
    Tunnel(#[from] TunnelError),

    /// Database unreachable or authentication failure
    #[error("Connection error: {0}")]
    Connection(String),

    /// The matching document count could not be determined
    #[error("Estimation error: {0}")]
    Estimation(String),

    /// A single batch window failed to fetch or append
    #[error("Batch error at offset {offset} (limit {limit}): {message}")]
    Batch {
        offset: u64,
        limit: u64,
        message: String,
    },

    /// Sink rejected or failed an append
    #[error("Sink error: {0}")]
    Sink(String),

    /// The run was stopped by a shutdown signal
    #[error("Export interrupted: {0}")]
    Interrupted(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

impl ExporterError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            ExporterError::Configuration(_) => 2,
            ExporterError::Estimation(_) => 3,
            ExporterError::Tunnel(_) | ExporterError::Connection(_) => 4,
            ExporterError::Interrupted(_) => 130,
            ExporterError::Batch { .. }
            | ExporterError::Sink(_)
            | ExporterError::Serialization(_)
            | ExporterError::Io(_) => 5,
        }
    }

    /// Wraps a fetch or append failure with the window it happened in
    pub fn batch(offset: u64, limit: u64, cause: impl std::fmt::Display) -> Self {
        ExporterError::Batch {
            offset,
            limit,
            message: cause.to_string(),
        }
    }
}

/// Proxy tunnel errors
#[derive(Debug, Error)]
pub enum TunnelError {
    /// The proxy URL could not be parsed
    #[error("Invalid proxy URL: {0}")]
    InvalidProxyUrl(String),

    /// TCP connection to the proxy failed
    #[error("Proxy unreachable at {address}: {message}")]
    ProxyUnreachable { address: String, message: String },

    /// The proxy refused or garbled the CONNECT handshake
    #[error("CONNECT handshake to {target} failed: {message}")]
    Handshake { target: String, message: String },

    /// The local forwarding endpoint could not be bound
    #[error("Failed to bind local tunnel endpoint: {0}")]
    Bind(String),

    /// The forwarding task did not stop cleanly
    #[error("Tunnel shutdown failed: {0}")]
    Shutdown(String),
}

impl From<std::io::Error> for ExporterError {
    fn from(err: std::io::Error) -> Self {
        ExporterError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ExporterError {
    fn from(err: serde_json::Error) -> Self {
        ExporterError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for ExporterError {
    fn from(err: toml::de::Error) -> Self {
        ExporterError::Configuration(format!("TOML parse error: {err}"))
    }
}

impl From<mongodb::bson::de::Error> for ExporterError {
    fn from(err: mongodb::bson::de::Error) -> Self {
        ExporterError::Configuration(format!("Invalid configuration value: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exporter_error_display() {
        let err = ExporterError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_batch_error_display() {
        let err = ExporterError::batch(2000, 1000, "cursor killed");
        assert_eq!(
            err.to_string(),
            "Batch error at offset 2000 (limit 1000): cursor killed"
        );
    }

    #[test]
    fn test_tunnel_error_conversion() {
        let tunnel_err = TunnelError::Bind("address in use".to_string());
        let err: ExporterError = tunnel_err.into();
        assert!(matches!(err, ExporterError::Tunnel(_)));
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExporterError::Configuration(String::new()).exit_code(), 2);
        assert_eq!(ExporterError::Estimation(String::new()).exit_code(), 3);
        assert_eq!(ExporterError::Connection(String::new()).exit_code(), 4);
        assert_eq!(ExporterError::batch(0, 1000, "x").exit_code(), 5);
        assert_eq!(ExporterError::Sink(String::new()).exit_code(), 5);
        assert_eq!(ExporterError::Interrupted(String::new()).exit_code(), 130);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: ExporterError = io_err.into();
        assert!(matches!(err, ExporterError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: ExporterError = json_err.into();
        assert!(matches!(err, ExporterError::Serialization(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: ExporterError = toml_err.into();
        assert!(matches!(err, ExporterError::Configuration(_)));
        assert!(err.to_string().contains("TOML parse error"));
    }

    #[test]
    fn test_exporter_error_implements_std_error() {
        let err = ExporterError::Sink("Test error".to_string());
        let _: &dyn std::error::Error = &err;
    }
}
