//! Append-only record sinks
//!
//! A sink receives the documents of one batch window per call and stores them
//! in arrival order. Calls may come from several windows concurrently.
//!
//! - [`jsonl`] - JSON lines appended to a local file
//! - [`dataset`] - Items pushed to a hosted dataset over HTTP

pub mod dataset;
pub mod jsonl;

pub use dataset::DatasetSink;
pub use jsonl::JsonlSink;

use crate::config::SinkConfig;
use crate::domain::{ExporterError, Result};
use async_trait::async_trait;
use mongodb::bson::{Bson, Document};
use secrecy::ExposeSecret;
use std::sync::Arc;

/// Destination for exported records
#[async_trait]
pub trait Sink: Send + Sync {
    /// Short human-readable description of the destination
    fn describe(&self) -> String;

    /// Append `records` as one unit
    ///
    /// # Errors
    ///
    /// Returns [`ExporterError::Sink`] if the records could not be stored.
    async fn append(&self, records: Vec<Document>) -> Result<()>;
}

/// Creates the sink selected in the configuration
///
/// # Errors
///
/// Returns an error if the sink cannot be opened or is missing settings.
pub async fn create_sink(config: &SinkConfig) -> Result<Arc<dyn Sink>> {
    match config {
        SinkConfig::Jsonl { path } => {
            let sink = JsonlSink::open(path).await?;
            Ok(Arc::new(sink))
        }
        SinkConfig::Dataset {
            dataset_id,
            token,
            base_url,
            timeout_secs,
        } => {
            let dataset_id = dataset_id.as_deref().ok_or_else(|| {
                ExporterError::Configuration("dataset sink requires a datasetId".to_string())
            })?;
            let token = token.as_ref().ok_or_else(|| {
                ExporterError::Configuration("dataset sink requires a token".to_string())
            })?;
            let sink = DatasetSink::new(
                base_url,
                dataset_id,
                token.expose_secret().as_str(),
                std::time::Duration::from_secs(*timeout_secs),
            )?;
            Ok(Arc::new(sink))
        }
    }
}

/// Renders a document as relaxed extended JSON
pub(crate) fn to_json(record: Document) -> serde_json::Value {
    Bson::Document(record).into_relaxed_extjson()
}
