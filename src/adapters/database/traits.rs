//! Database abstraction traits
//!
//! This module defines the trait a document store must implement to be
//! exported from.

use crate::domain::{BatchWindow, Result};
use async_trait::async_trait;
use mongodb::bson::Document;
use std::time::Duration;

/// Read-side access to one collection
///
/// Implementations are shared by every in-flight batch window, so all methods
/// take `&self`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Name of the collection this store reads from
    fn collection_name(&self) -> &str;

    /// Count the documents matching `filter`
    ///
    /// `max_time` bounds how long the server may spend on the count.
    ///
    /// # Errors
    ///
    /// Returns an error if the count fails or times out.
    async fn count(&self, filter: &Document, max_time: Duration) -> Result<u64>;

    /// Fetch the documents of one batch window
    ///
    /// # Arguments
    ///
    /// * `filter` - Query filter, identical for every window of a run
    /// * `projection` - Field projection; `None` returns whole documents
    /// * `window` - The `(offset, limit)` slice to fetch
    ///
    /// # Errors
    ///
    /// Returns an error if the query or cursor iteration fails.
    async fn fetch_window(
        &self,
        filter: &Document,
        projection: Option<&Document>,
        window: BatchWindow,
    ) -> Result<Vec<Document>>;

    /// Release the underlying connection
    ///
    /// Calling this more than once is a no-op after the first call.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection could not be shut down cleanly.
    async fn close(&self) -> Result<()>;
}
