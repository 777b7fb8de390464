//! Count estimation
//!
//! Resolves how many documents match the export filter, which sizes the batch
//! plan.

use crate::adapters::database::DocumentStore;
use crate::domain::{ExporterError, Result};
use mongodb::bson::Document;
use std::time::Duration;

/// Message reported when the count query fails
///
/// A missing index on the filter fields is the most common cause of a count
/// that runs out of time, but not the only one; the underlying error is
/// appended to the message.
pub const INDEX_REQUIRED_MESSAGE: &str =
    "Can not get count for exporting items, you need to create index for your query!";

/// How long past the server-side limit the client keeps waiting for a count
const DEFAULT_COUNT_GRACE: Duration = Duration::from_secs(5);

/// Resolves the total number of matching documents
#[derive(Debug, Clone)]
pub struct CountEstimator {
    estimate: Option<u64>,
    max_time: Duration,
    grace: Duration,
}

impl CountEstimator {
    /// Create a new estimator
    ///
    /// # Arguments
    ///
    /// * `estimate` - Pre-computed count; when set, the database is not queried
    /// * `max_time` - Upper bound for the count query
    pub fn new(estimate: Option<u64>, max_time: Duration) -> Self {
        Self {
            estimate,
            max_time,
            grace: DEFAULT_COUNT_GRACE,
        }
    }

    /// Set how long past `max_time` the client waits before giving up
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Returns the configured estimate or counts the documents matching `filter`
    ///
    /// The count is bounded twice: the server is asked to give up after
    /// `max_time`, and the client stops waiting `grace` later.
    ///
    /// # Errors
    ///
    /// Returns [`ExporterError::Estimation`] if the count fails or times out.
    pub async fn estimate(&self, store: &dyn DocumentStore, filter: &Document) -> Result<u64> {
        if let Some(estimate) = self.estimate {
            tracing::info!(
                estimated_items_count = estimate,
                "Using configured item count estimate"
            );
            return Ok(estimate);
        }

        tracing::debug!(
            collection = %store.collection_name(),
            max_time_secs = self.max_time.as_secs(),
            "Counting matching documents"
        );

        let deadline = self.max_time + self.grace;
        let counted = match tokio::time::timeout(deadline, store.count(filter, self.max_time)).await
        {
            Ok(result) => result,
            Err(_) => Err(ExporterError::Estimation(format!(
                "count did not finish within {}s",
                self.max_time.as_secs()
            ))),
        };

        counted.map_err(|e| {
            let cause = match e {
                ExporterError::Estimation(message) => message,
                other => other.to_string(),
            };
            tracing::error!(error = %cause, "Count query failed");
            ExporterError::Estimation(format!("{INDEX_REQUIRED_MESSAGE} ({cause})"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BatchWindow;
    use async_trait::async_trait;
    use mongodb::bson::doc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingStore {
        result: std::result::Result<u64, String>,
        delay: Duration,
        count_calls: AtomicUsize,
    }

    impl CountingStore {
        fn new(result: std::result::Result<u64, String>) -> Self {
            Self {
                result,
                delay: Duration::ZERO,
                count_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl DocumentStore for CountingStore {
        fn collection_name(&self) -> &str {
            "items"
        }

        async fn count(&self, _filter: &Document, _max_time: Duration) -> Result<u64> {
            self.count_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.result.clone().map_err(ExporterError::Estimation)
        }

        async fn fetch_window(
            &self,
            _filter: &Document,
            _projection: Option<&Document>,
            _window: BatchWindow,
        ) -> Result<Vec<Document>> {
            Ok(Vec::new())
        }

        async fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_configured_estimate_skips_count() {
        let store = CountingStore::new(Ok(42));
        let estimator = CountEstimator::new(Some(7), Duration::from_secs(60));

        let total = estimator.estimate(&store, &doc! {}).await.unwrap();

        assert_eq!(total, 7);
        assert_eq!(store.count_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_counts_when_no_estimate() {
        let store = CountingStore::new(Ok(1500));
        let estimator = CountEstimator::new(None, Duration::from_secs(60));

        let total = estimator.estimate(&store, &doc! {"a": 1}).await.unwrap();

        assert_eq!(total, 1500);
        assert_eq!(store.count_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_count_failure_mentions_index() {
        let store = CountingStore::new(Err("operation exceeded time limit".to_string()));
        let estimator = CountEstimator::new(None, Duration::from_secs(60));

        let err = estimator.estimate(&store, &doc! {}).await.unwrap_err();

        assert!(matches!(err, ExporterError::Estimation(_)));
        let message = err.to_string();
        assert!(message.contains(INDEX_REQUIRED_MESSAGE));
        assert!(message.contains("operation exceeded time limit"));
    }

    #[tokio::test]
    async fn test_unanswered_count_times_out() {
        let mut store = CountingStore::new(Ok(10));
        store.delay = Duration::from_secs(30);
        let estimator = CountEstimator::new(None, Duration::from_millis(20))
            .with_grace(Duration::from_millis(20));

        let err = estimator.estimate(&store, &doc! {}).await.unwrap_err();

        assert!(err.to_string().contains(INDEX_REQUIRED_MESSAGE));
    }
}
