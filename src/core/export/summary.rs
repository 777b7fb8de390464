//! Export summary and reporting
//!
//! This module defines the structure reporting the result of a finished run.

use crate::core::export::pipeline::PipelineReport;
use chrono::{DateTime, Utc};
use std::time::Duration;
use uuid::Uuid;

/// Summary of an export operation
#[derive(Debug, Clone)]
pub struct ExportSummary {
    /// Identifier of this run, attached to its log lines
    pub run_id: Uuid,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// Collection exported from
    pub collection: String,

    /// Destination the records were appended to
    pub sink: String,

    /// Matching documents as counted or estimated before the export
    pub total_count: u64,

    /// Batch windows planned from the count
    pub windows_planned: u64,

    /// Batch windows that finished
    pub windows_completed: u64,

    /// Append calls made on the sink
    pub appends: u64,

    /// Documents appended
    pub documents_exported: u64,

    /// Duration of the export
    pub duration: Duration,
}

impl ExportSummary {
    /// Create a new empty export summary
    pub fn new(collection: impl Into<String>, sink: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            collection: collection.into(),
            sink: sink.into(),
            total_count: 0,
            windows_planned: 0,
            windows_completed: 0,
            appends: 0,
            documents_exported: 0,
            duration: Duration::from_secs(0),
        }
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Copy the pipeline counters into the summary
    pub fn record_pipeline(&mut self, report: &PipelineReport) {
        self.windows_completed = report.windows_completed;
        self.appends = report.appends;
        self.documents_exported = report.documents_exported;
    }

    /// Documents exported per second
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.documents_exported as f64 / secs
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            run_id = %self.run_id,
            collection = %self.collection,
            sink = %self.sink,
            total_count = self.total_count,
            windows = self.windows_completed,
            appends = self.appends,
            documents = self.documents_exported,
            duration_secs = self.duration.as_secs(),
            docs_per_sec = format!("{:.1}", self.throughput()),
            "Export completed"
        );

        if self.documents_exported != self.total_count {
            tracing::warn!(
                expected = self.total_count,
                exported = self.documents_exported,
                "Exported document count differs from the count taken before the export"
            );
        }
    }
}
