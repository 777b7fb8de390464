//! MongoDB session
//!
//! One [`mongodb::Client`] bound to the database and collection a run exports
//! from. The client is shared by every batch window through the driver's own
//! connection pool.

use crate::adapters::database::traits::DocumentStore;
use crate::config::redact_connection_string;
use crate::domain::{BatchWindow, ExporterError, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::options::{ClientOptions, CountOptions, FindOptions};
use mongodb::{Client, Collection};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const APP_NAME: &str = "mongo-exporter";

/// An open connection to one collection
pub struct MongoSession {
    client: Client,
    collection: Collection<Document>,
    db_name: String,
    collection_name: String,
    closed: AtomicBool,
}

impl MongoSession {
    /// Connect to `connection_string` and select the collection to export
    ///
    /// The database is `db_name` when given, otherwise the default database of
    /// the connection string. A `ping` is sent before returning so that
    /// unreachable servers and bad credentials fail here rather than in the
    /// first count.
    ///
    /// # Errors
    ///
    /// Returns [`ExporterError::Connection`] if the string does not parse, no
    /// database can be selected, or the server does not answer.
    pub async fn open(
        connection_string: &str,
        db_name: Option<&str>,
        collection_name: &str,
    ) -> Result<Self> {
        let redacted = redact_connection_string(connection_string);

        let mut options = ClientOptions::parse(connection_string)
            .await
            .map_err(|e| {
                ExporterError::Connection(format!("Invalid connection string {redacted}: {e}"))
            })?;
        options.app_name = Some(APP_NAME.to_string());

        let client = Client::with_options(options)
            .map_err(|e| ExporterError::Connection(format!("Failed to create client: {e}")))?;

        let database = match db_name {
            Some(name) => client.database(name),
            None => client.default_database().ok_or_else(|| {
                ExporterError::Connection(format!(
                    "No dbName configured and {redacted} names no default database"
                ))
            })?,
        };

        tracing::debug!(server = %redacted, database = %database.name(), "Connecting to MongoDB");

        if let Err(e) = database.run_command(doc! { "ping": 1 }).await {
            client.clone().shutdown().await;
            return Err(ExporterError::Connection(format!(
                "Failed to reach {redacted}: {e}"
            )));
        }

        tracing::info!(
            database = %database.name(),
            collection = %collection_name,
            "Connected to MongoDB"
        );

        Ok(Self {
            collection: database.collection(collection_name),
            db_name: database.name().to_string(),
            collection_name: collection_name.to_string(),
            client,
            closed: AtomicBool::new(false),
        })
    }

    /// Name of the selected database
    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    /// Whether [`DocumentStore::close`] has run
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for MongoSession {
    fn collection_name(&self) -> &str {
        &self.collection_name
    }

    async fn count(&self, filter: &Document, max_time: Duration) -> Result<u64> {
        let mut options = CountOptions::default();
        options.max_time = Some(max_time);

        self.collection
            .count_documents(filter.clone())
            .with_options(options)
            .await
            .map_err(|e| ExporterError::Estimation(e.to_string()))
    }

    async fn fetch_window(
        &self,
        filter: &Document,
        projection: Option<&Document>,
        window: BatchWindow,
    ) -> Result<Vec<Document>> {
        let limit = i64::try_from(window.limit).map_err(|_| {
            ExporterError::batch(window.offset, window.limit, "limit exceeds i64 range")
        })?;

        let mut options = FindOptions::default();
        options.skip = Some(window.offset);
        options.limit = Some(limit);
        options.projection = projection.cloned();
        // Windows far into the result set can sit on the server for a long time
        options.no_cursor_timeout = Some(true);

        let cursor = self
            .collection
            .find(filter.clone())
            .with_options(options)
            .await
            .map_err(|e| ExporterError::batch(window.offset, window.limit, e))?;

        cursor
            .try_collect()
            .await
            .map_err(|e| ExporterError::batch(window.offset, window.limit, e))
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        tracing::debug!(database = %self.db_name, "Closing MongoDB session");
        self.client.clone().shutdown().await;
        Ok(())
    }
}
