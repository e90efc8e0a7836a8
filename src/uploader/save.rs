//! File save capability.
//!
//! Stands in for the browser's anchor-click/blob-URL save so the workflow
//! controller can be driven without a DOM. The CLI writes to disk; tests use
//! a recording sink.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("could not save {filename}: {source}")]
pub struct SinkError {
    pub filename: String,
    #[source]
    pub source: std::io::Error,
}

#[async_trait]
pub trait FileSink: Send + Sync {
    async fn save(&self, filename: &str, bytes: &[u8]) -> Result<(), SinkError>;
}

/// Saves into a fixed directory.
#[derive(Debug, Clone)]
pub struct DiskSink {
    dir: PathBuf,
}

impl DiskSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl FileSink for DiskSink {
    async fn save(&self, filename: &str, bytes: &[u8]) -> Result<(), SinkError> {
        let path = self.dir.join(filename);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| SinkError {
                filename: filename.to_string(),
                source,
            })
    }
}
