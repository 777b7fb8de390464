//! Hosted dataset sink
//!
//! Pushes records to `{baseUrl}/datasets/{datasetId}/items` as a JSON array.
//! The dataset service appends items in the order they are received.

use super::{to_json, Sink};
use crate::config::{secret_string, SecretString};
use crate::domain::{ExporterError, Result};
use async_trait::async_trait;
use mongodb::bson::Document;
use reqwest::{Client, ClientBuilder};
use secrecy::ExposeSecret;
use std::time::Duration;

/// Longest response body quoted in an error message
const MAX_ERROR_BODY: usize = 512;

/// Appends records to a hosted dataset
pub struct DatasetSink {
    client: Client,
    items_url: String,
    dataset_id: String,
    token: SecretString,
}

impl DatasetSink {
    /// Create a new dataset sink
    ///
    /// # Arguments
    ///
    /// * `base_url` - API base URL, e.g. `https://api.apify.com/v2`
    /// * `dataset_id` - Dataset to append to
    /// * `token` - API token sent as a bearer token
    /// * `timeout` - Per-request timeout
    ///
    /// # Errors
    ///
    /// Returns [`ExporterError::Configuration`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, dataset_id: &str, token: &str, timeout: Duration) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                ExporterError::Configuration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            items_url: format!(
                "{}/datasets/{}/items",
                base_url.trim_end_matches('/'),
                dataset_id
            ),
            dataset_id: dataset_id.to_string(),
            token: secret_string(token.to_string()),
        })
    }

    /// Full URL items are posted to
    pub fn items_url(&self) -> &str {
        &self.items_url
    }
}

#[async_trait]
impl Sink for DatasetSink {
    fn describe(&self) -> String {
        format!("dataset {}", self.dataset_id)
    }

    async fn append(&self, records: Vec<Document>) -> Result<()> {
        let items: Vec<serde_json::Value> = records.into_iter().map(to_json).collect();

        let resp = self
            .client
            .post(&self.items_url)
            .bearer_auth(self.token.expose_secret().as_str())
            .json(&items)
            .send()
            .await
            .map_err(|e| ExporterError::Sink(format!("Failed to push items: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let mut body = resp.text().await.unwrap_or_default();
            let cut = body
                .char_indices()
                .nth(MAX_ERROR_BODY)
                .map_or(body.len(), |(idx, _)| idx);
            body.truncate(cut);
            return Err(ExporterError::Sink(format!(
                "Dataset {} rejected {} items with status {status}: {body}",
                self.dataset_id,
                items.len()
            )));
        }

        tracing::trace!(dataset = %self.dataset_id, items = items.len(), "Pushed items");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use mongodb::bson::doc;

    #[tokio::test]
    async fn test_append_posts_json_array_with_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/datasets/ds1/items")
            .match_header("authorization", "Bearer tok")
            .match_body(Matcher::Json(serde_json::json!([{"a": 1}, {"a": 2}])))
            .with_status(201)
            .create_async()
            .await;

        let sink = DatasetSink::new(&server.url(), "ds1", "tok", Duration::from_secs(5)).unwrap();
        sink.append(vec![doc! {"a": 1}, doc! {"a": 2}]).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_is_sink_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/datasets/ds1/items")
            .with_status(403)
            .with_body("forbidden")
            .create_async()
            .await;

        let sink = DatasetSink::new(&server.url(), "ds1", "tok", Duration::from_secs(5)).unwrap();
        let err = sink.append(vec![doc! {"a": 1}]).await.unwrap_err();

        assert!(matches!(err, ExporterError::Sink(_)));
        assert!(err.to_string().contains("403"));
        assert!(err.to_string().contains("forbidden"));
    }

    #[test]
    fn test_items_url_trims_trailing_slash() {
        let sink = DatasetSink::new(
            "https://api.example.com/v2/",
            "abc",
            "tok",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(sink.items_url(), "https://api.example.com/v2/datasets/abc/items");
        assert_eq!(sink.describe(), "dataset abc");
    }
}
