//! Bounded-concurrency export pipeline
//!
//! Each batch window is fetched from the [`DocumentStore`] and appended to the
//! [`Sink`] as one unit. At most `concurrency` windows are in flight at once.
//! Windows are pulled from the plan in order; once a window
//! fails, nothing new is dispatched, the windows already in flight are allowed
//! to settle, and the first failure becomes the result of the run. Failed
//! windows are not retried.

use crate::adapters::database::DocumentStore;
use crate::adapters::sink::Sink;
use crate::domain::{BatchWindow, ExporterError, Result};
use mongodb::bson::Document;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinSet;

/// Counters for one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// Windows handed to a worker
    pub windows_dispatched: u64,

    /// Windows fetched and, when non-empty, appended
    pub windows_completed: u64,

    /// Append calls made on the sink
    pub appends: u64,

    /// Documents appended across all windows
    pub documents_exported: u64,
}

/// Outcome of one window
struct WindowOutcome {
    window: BatchWindow,
    result: Result<usize>,
}

/// Fetches batch windows and appends them to a sink
pub struct ExportPipeline {
    store: Arc<dyn DocumentStore>,
    sink: Arc<dyn Sink>,
    filter: Arc<Document>,
    projection: Option<Arc<Document>>,
    concurrency: usize,
    shutdown: watch::Receiver<bool>,
}

impl ExportPipeline {
    /// Create a new pipeline
    ///
    /// A `concurrency` of 0 is treated as 1.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        sink: Arc<dyn Sink>,
        filter: Document,
        projection: Option<Document>,
        concurrency: usize,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            store,
            sink,
            filter: Arc::new(filter),
            projection: projection.map(Arc::new),
            concurrency: concurrency.max(1),
            shutdown,
        }
    }

    /// Runs every window to completion or until the first failure
    ///
    /// A shutdown signal stops dispatch the same way a failure does and is
    /// reported as [`ExporterError::Interrupted`].
    ///
    /// # Errors
    ///
    /// Returns the first window failure, after all in-flight windows settled.
    pub async fn run<I>(&self, windows: I) -> Result<PipelineReport>
    where
        I: IntoIterator<Item = BatchWindow>,
    {
        let mut pending = windows.into_iter();
        let (total_windows, _) = pending.size_hint();
        let mut in_flight: JoinSet<WindowOutcome> = JoinSet::new();
        let mut report = PipelineReport::default();
        let mut first_error: Option<ExporterError> = None;

        tracing::info!(
            windows = total_windows,
            concurrency = self.concurrency,
            "Starting export pipeline"
        );

        loop {
            if first_error.is_none() && *self.shutdown.borrow() {
                tracing::warn!(
                    pending = pending.size_hint().0,
                    in_flight = in_flight.len(),
                    "Shutdown requested, letting in-flight windows finish"
                );
                first_error = Some(ExporterError::Interrupted(format!(
                    "stopped after dispatching {} of {} windows",
                    report.windows_dispatched, total_windows
                )));
            }

            while first_error.is_none() && in_flight.len() < self.concurrency {
                let Some(window) = pending.next() else {
                    break;
                };
                report.windows_dispatched += 1;
                in_flight.spawn(process_window(
                    Arc::clone(&self.store),
                    Arc::clone(&self.sink),
                    Arc::clone(&self.filter),
                    self.projection.clone(),
                    window,
                ));
            }

            let Some(joined) = in_flight.join_next().await else {
                break;
            };

            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(error = %e, "Batch worker aborted");
                    if first_error.is_none() {
                        first_error = Some(ExporterError::Io(format!("batch worker aborted: {e}")));
                    }
                    continue;
                }
            };

            match outcome.result {
                Ok(appended) => {
                    report.windows_completed += 1;
                    if appended > 0 {
                        report.appends += 1;
                        report.documents_exported += appended as u64;
                    }
                }
                Err(e) => {
                    if first_error.is_none() {
                        tracing::error!(
                            window = %outcome.window,
                            error = %e,
                            in_flight = in_flight.len(),
                            "Batch failed, no further windows will be dispatched"
                        );
                        first_error = Some(e);
                    } else {
                        tracing::warn!(
                            window = %outcome.window,
                            error = %e,
                            "Batch failed after the run was already halted"
                        );
                    }
                }
            }
        }

        match first_error {
            Some(e) => {
                tracing::warn!(
                    dispatched = report.windows_dispatched,
                    completed = report.windows_completed,
                    documents = report.documents_exported,
                    "Export pipeline halted"
                );
                Err(e)
            }
            None => {
                tracing::info!(
                    windows = report.windows_completed,
                    appends = report.appends,
                    documents = report.documents_exported,
                    "Export pipeline finished"
                );
                Ok(report)
            }
        }
    }
}

/// Fetches one window and appends it; empty windows are not appended
async fn process_window(
    store: Arc<dyn DocumentStore>,
    sink: Arc<dyn Sink>,
    filter: Arc<Document>,
    projection: Option<Arc<Document>>,
    window: BatchWindow,
) -> WindowOutcome {
    let result = async {
        let records = store
            .fetch_window(&filter, projection.as_deref(), window)
            .await
            .map_err(|e| into_batch_error(window, e))?;

        let count = records.len();
        if count == 0 {
            tracing::debug!(window = %window, "Window is empty, nothing to append");
            return Ok(0);
        }

        tracing::info!(
            offset = window.offset,
            limit = window.limit,
            documents = count,
            sink = %sink.describe(),
            "Saving {window} items"
        );
        sink.append(records)
            .await
            .map_err(|e| into_batch_error(window, e))?;
        Ok(count)
    }
    .await;

    WindowOutcome { window, result }
}

fn into_batch_error(window: BatchWindow, err: ExporterError) -> ExporterError {
    match err {
        ExporterError::Batch { .. } => err,
        other => ExporterError::batch(window.offset, window.limit, other),
    }
}
