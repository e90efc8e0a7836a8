/*
 * Responsibility
 * - POST /api/process-crimes
 * - Buffer the browser's multipart upload, re-serialize it, forward it to the
 *   external service, and rewrite the returned download URL onto our own
 *   download endpoint so the browser never learns the external address
 * - Attach the route-level CORS header set to every response, errors included
 */
use axum::{
    Json,
    extract::{Multipart, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use tracing::{debug, error};
use url::{Url, form_urlencoded};

use crate::{
    api::DOWNLOAD_FILE_PATH,
    api::dto::process::{ProcessResponse, UpstreamErrorBody, UpstreamProcessBody},
    error::ApiError,
    middleware::cors,
    services::upstream::{DEFAULT_MERGE_TYPE, FILES_FIELD, MERGE_TYPE_FIELD, UploadPart},
    state::AppState,
};

pub const MISSING_BASE_URL: &str = "Server configuration error. API base URL is not defined.";
pub const INVALID_API_URL: &str = "Server configuration error. Invalid API URL.";
pub const UPSTREAM_FALLBACK: &str = "Failed to process files";
pub const GENERIC_FAILURE: &str = "Failed to process files. Please try again.";

/// Path of the processing endpoint on the external service (trailing slash
/// required by it).
const UPSTREAM_PROCESS_PATH: &str = "/process-crimes/";

pub async fn process_crimes(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let cors_headers = state.cors.route_headers(headers.get(header::ORIGIN));

    let mut response = match forward(&state, multipart).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    };
    cors::apply_headers(&mut response, &cors_headers);
    response
}

async fn forward(state: &AppState, mut multipart: Multipart) -> Result<Response, ApiError> {
    let Some(base_url) = state.config.api_base_url.as_deref() else {
        error!("API_BASE_URL is not configured");
        return Err(ApiError::Config(MISSING_BASE_URL));
    };

    let mut parts: Vec<UploadPart> = Vec::new();
    let mut merge_type = DEFAULT_MERGE_TYPE.to_string();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        error!(error = %e, "could not read multipart upload");
        ApiError::Internal(GENERIC_FAILURE)
    })? {
        match field.name() {
            Some(FILES_FIELD) => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(|e| {
                    error!(error = %e, "could not buffer uploaded file");
                    ApiError::Internal(GENERIC_FAILURE)
                })?;
                parts.push(UploadPart {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            Some(MERGE_TYPE_FIELD) => {
                let value = field.text().await.map_err(|e| {
                    error!(error = %e, "could not read merge_type field");
                    ApiError::Internal(GENERIC_FAILURE)
                })?;
                if !value.is_empty() {
                    merge_type = value;
                }
            }
            _ => {}
        }
    }

    let url = resolve_process_url(base_url).map_err(|e| {
        error!(base_url, error = %e, "could not construct upstream process URL");
        ApiError::Config(INVALID_API_URL)
    })?;

    debug!(%url, files = parts.len(), %merge_type, "forwarding process request");

    let reply = state
        .upstream
        .process(url, parts, &merge_type)
        .await
        .map_err(|e| {
            error!(error = %e, "process forward failed");
            ApiError::Internal(GENERIC_FAILURE)
        })?;

    if !reply.status.is_success() {
        let body: UpstreamErrorBody = serde_json::from_slice(&reply.body).map_err(|e| {
            error!(status = %reply.status, error = %e, "unreadable upstream error body");
            ApiError::Internal(GENERIC_FAILURE)
        })?;
        let detail = body.detail.unwrap_or_else(|| UPSTREAM_FALLBACK.to_string());
        error!(status = %reply.status, %detail, "upstream rejected the upload");
        return Err(ApiError::upstream(reply.status, detail));
    }

    let body: UpstreamProcessBody = serde_json::from_slice(&reply.body).map_err(|e| {
        error!(error = %e, "malformed upstream process body");
        ApiError::Internal(GENERIC_FAILURE)
    })?;

    Ok(Json(ProcessResponse {
        download_url: proxied_download_url(&body.download_url),
    })
    .into_response())
}

fn resolve_process_url(base_url: &str) -> Result<Url, url::ParseError> {
    Url::parse(base_url)?.join(UPSTREAM_PROCESS_PATH)
}

/// Rewrite an upstream download URL onto our own download endpoint, with the
/// original percent-encoded as the `path` query parameter.
fn proxied_download_url(upstream_url: &str) -> String {
    let query: String = form_urlencoded::Serializer::new(String::new())
        .append_pair("path", upstream_url)
        .finish();
    format!("{DOWNLOAD_FILE_PATH}?{query}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_url_is_rewritten_onto_our_endpoint() {
        assert_eq!(
            proxied_download_url("https://api/files/x.xlsx"),
            "/api/download-file?path=https%3A%2F%2Fapi%2Ffiles%2Fx.xlsx"
        );
    }

    #[test]
    fn process_url_replaces_the_base_path() {
        let url = resolve_process_url("https://api.example.com/some/mount").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/process-crimes/");
    }

    #[test]
    fn process_url_rejects_a_garbage_base() {
        assert!(resolve_process_url("not a url").is_err());
    }
}
