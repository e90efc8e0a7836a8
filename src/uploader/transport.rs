//! HTTP transport between the workflow controller and the gateway.
//!
//! The controller only ever needs two calls — submit the batch, fetch the
//! result — so the trait stays that small. `HttpGateway` is the real
//! implementation; tests script their own.

use async_trait::async_trait;
use axum::http::StatusCode;
use thiserror::Error;
use url::Url;

use crate::api::PROCESS_FILES_PATH;
use crate::api::dto::process::ProcessResponse;
use crate::services::upstream::{DEFAULT_MERGE_TYPE, FILES_FIELD, MERGE_TYPE_FIELD};
use crate::uploader::batch::SelectedFile;

/// Fallback message when a rejection body carries no `detail`.
const PROCESS_FALLBACK: &str = "Failed to process files";
const DOWNLOAD_FALLBACK: &str = "Failed to download file";

#[derive(Debug, Error)]
pub enum TransportError {
    /// The gateway answered with a non-success status; `detail` is whatever
    /// its error body carried.
    #[error("{detail}")]
    Api { status: StatusCode, detail: String },

    /// The request never produced a usable response.
    #[error("request failed: {0}")]
    Network(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.to_string())
    }
}

/// A downloaded result file, plus the header the filename is derived from.
#[derive(Debug, Clone)]
pub struct FetchedFile {
    pub bytes: Vec<u8>,
    pub content_disposition: Option<String>,
}

#[async_trait]
pub trait GatewayTransport: Send + Sync {
    /// Submit the batch for processing; returns the download path the
    /// gateway hands back.
    async fn process(
        &self,
        files: &[SelectedFile],
        merge_type: &str,
    ) -> Result<String, TransportError>;

    /// Fetch a processed result by the path stored from [`process`].
    ///
    /// [`process`]: GatewayTransport::process
    async fn fetch(&self, path: &str) -> Result<FetchedFile, TransportError>;
}

#[derive(Debug, Clone)]
pub struct HttpGateway {
    base: Url,
    client: reqwest::Client,
}

impl HttpGateway {
    pub fn new(base: Url) -> Self {
        Self {
            base,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl GatewayTransport for HttpGateway {
    async fn process(
        &self,
        files: &[SelectedFile],
        merge_type: &str,
    ) -> Result<String, TransportError> {
        let mut form = reqwest::multipart::Form::new();
        for file in files {
            form = form.part(
                FILES_FIELD,
                reqwest::multipart::Part::bytes(file.bytes.clone()).file_name(file.name.clone()),
            );
        }
        let merge_type = if merge_type.is_empty() {
            DEFAULT_MERGE_TYPE
        } else {
            merge_type
        };
        form = form.text(MERGE_TYPE_FIELD, merge_type.to_string());

        let url = self
            .base
            .join(PROCESS_FILES_PATH)
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let response = self.client.post(url).multipart(form).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(String::from))
                .unwrap_or_else(|| PROCESS_FALLBACK.to_string());
            return Err(TransportError::Api { status, detail });
        }

        let body: ProcessResponse = response.json().await?;
        Ok(body.download_url)
    }

    async fn fetch(&self, path: &str) -> Result<FetchedFile, TransportError> {
        let url = if path.starts_with("http") {
            Url::parse(path).map_err(|e| TransportError::Network(e.to_string()))?
        } else {
            self.base
                .join(path)
                .map_err(|e| TransportError::Network(e.to_string()))?
        };

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(TransportError::Api {
                status: response.status(),
                detail: DOWNLOAD_FALLBACK.to_string(),
            });
        }

        let content_disposition = response
            .headers()
            .get(axum::http::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let bytes = response.bytes().await?.to_vec();

        Ok(FetchedFile {
            bytes,
            content_disposition,
        })
    }
}
