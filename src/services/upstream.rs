//! HTTP client seam for the external classification service.
//!
//! The proxy endpoints only ever perform two calls: a multipart POST that
//! forwards uploaded spreadsheets, and a GET that pulls a produced file back.
//! Both buffer the full body; there is no streaming pass-through and no retry.
//!
//! Note:
//! - `UpstreamError` is kept independent from `ApiError` so handlers decide
//!   how each failure maps onto the wire contract.

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{HeaderValue, StatusCode, header};
use thiserror::Error;
use url::Url;

/// Multipart field name for each forwarded file.
pub const FILES_FIELD: &str = "files";
/// Multipart field name for the merge mode.
pub const MERGE_TYPE_FIELD: &str = "merge_type";
/// The only merge mode this flow ever sends; its meaning lives upstream.
pub const DEFAULT_MERGE_TYPE: &str = "vertical";

#[derive(Debug, Error)]
#[error("upstream request failed: {0}")]
pub struct UpstreamError(pub String);

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        Self(e.to_string())
    }
}

/// One file part received from the browser, re-serialized for forwarding.
#[derive(Debug, Clone)]
pub struct UploadPart {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Fully buffered upstream response. Only the two headers the proxy relays
/// are captured; everything else the upstream sends is dropped.
#[derive(Debug)]
pub struct UpstreamReply {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub content_disposition: Option<HeaderValue>,
    pub body: Bytes,
}

#[async_trait]
pub trait UpstreamApi: Send + Sync {
    /// Forward file parts plus the merge mode as a fresh multipart POST.
    async fn process(
        &self,
        url: Url,
        parts: Vec<UploadPart>,
        merge_type: &str,
    ) -> Result<UpstreamReply, UpstreamError>;

    /// Fetch a produced file, buffering the entire body.
    async fn fetch(&self, url: Url) -> Result<UpstreamReply, UpstreamError>;
}

/// `reqwest`-backed implementation used by the running gateway.
#[derive(Debug, Clone, Default)]
pub struct HttpUpstream {
    client: reqwest::Client,
}

impl HttpUpstream {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UpstreamApi for HttpUpstream {
    async fn process(
        &self,
        url: Url,
        parts: Vec<UploadPart>,
        merge_type: &str,
    ) -> Result<UpstreamReply, UpstreamError> {
        let mut form = reqwest::multipart::Form::new();
        for part in parts {
            let mut file = reqwest::multipart::Part::bytes(part.bytes.to_vec())
                .file_name(part.file_name);
            if let Some(content_type) = &part.content_type {
                file = file.mime_str(content_type)?;
            }
            form = form.part(FILES_FIELD, file);
        }
        form = form.text(MERGE_TYPE_FIELD, merge_type.to_string());

        let response = self.client.post(url).multipart(form).send().await?;
        reply_from(response).await
    }

    async fn fetch(&self, url: Url) -> Result<UpstreamReply, UpstreamError> {
        let response = self.client.get(url).send().await?;
        reply_from(response).await
    }
}

async fn reply_from(response: reqwest::Response) -> Result<UpstreamReply, UpstreamError> {
    let status = response.status();
    let content_type = response.headers().get(header::CONTENT_TYPE).cloned();
    let content_disposition = response.headers().get(header::CONTENT_DISPOSITION).cloned();
    let body = response.bytes().await?;

    Ok(UpstreamReply {
        status,
        content_type,
        content_disposition,
        body,
    })
}
