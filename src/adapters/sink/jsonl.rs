//! JSON lines file sink

use super::{to_json, Sink};
use crate::domain::{ExporterError, Result};
use async_trait::async_trait;
use mongodb::bson::Document;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Appends one JSON object per line to a local file
///
/// The file is opened in append mode, so a rerun adds to what a previous run
/// wrote. The records of one append are serialized up front and written to
/// the file in a single `write_all` under the lock, so lines of concurrent
/// windows never interleave.
pub struct JsonlSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlSink {
    /// Opens (or creates) the file at `path` for appending
    ///
    /// Missing parent directories are created.
    ///
    /// # Errors
    ///
    /// Returns [`ExporterError::Sink`] if the file cannot be opened.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                ExporterError::Sink(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| ExporterError::Sink(format!("Failed to open {}: {e}", path.display())))?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Path of the output file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Sink for JsonlSink {
    fn describe(&self) -> String {
        format!("jsonl file {}", self.path.display())
    }

    async fn append(&self, records: Vec<Document>) -> Result<()> {
        let mut buffer = Vec::new();
        for record in records {
            serde_json::to_writer(&mut buffer, &to_json(record))?;
            buffer.push(b'\n');
        }

        let mut file = self.file.lock().await;
        let written = async {
            file.write_all(&buffer).await?;
            file.flush().await
        }
        .await;

        written.map_err(|e| {
            ExporterError::Sink(format!("Failed to write {}: {e}", self.path.display()))
        })
    }
}
