/*
 * Responsibility
 * - GET /api/download-file?path=<absolute-or-relative>
 * - Resolve the path against the external base URL, buffer the remote file,
 *   and re-emit it with the upstream content-type/content-disposition
 *   (defaulted when absent)
 * - Attach the route-level CORS header set to every response, errors included
 */
use axum::{
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{debug, error};
use url::Url;

use crate::{error::ApiError, middleware::cors, state::AppState};

pub const MISSING_BASE_URL: &str = "Server configuration error. API base URL is not defined.";
pub const INVALID_DOWNLOAD_URL: &str = "Server configuration error. Invalid download URL.";
pub const NO_PATH_PROVIDED: &str = "No file path provided";
pub const UPSTREAM_FALLBACK: &str = "Failed to download file";
pub const GENERIC_FAILURE: &str = "Failed to download file. Please try again.";

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
pub const DEFAULT_DISPOSITION: &str = "attachment; filename=\"processed_crime_stats.xlsx\"";

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub path: Option<String>,
}

pub async fn download_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DownloadQuery>,
) -> Response {
    let cors_headers = state.cors.route_headers(headers.get(header::ORIGIN));

    let mut response = match fetch(&state, query).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    };
    cors::apply_headers(&mut response, &cors_headers);
    response
}

async fn fetch(state: &AppState, query: DownloadQuery) -> Result<Response, ApiError> {
    let Some(base_url) = state.config.api_base_url.as_deref() else {
        error!("API_BASE_URL is not configured");
        return Err(ApiError::Config(MISSING_BASE_URL));
    };

    // An empty `path` is treated like a missing one.
    let path = query
        .path
        .filter(|p| !p.is_empty())
        .ok_or(ApiError::BadRequest(NO_PATH_PROVIDED))?;

    let url = resolve_download_url(&path, base_url).map_err(|e| {
        error!(%path, error = %e, "could not construct download URL");
        ApiError::Config(INVALID_DOWNLOAD_URL)
    })?;

    debug!(%url, "forwarding download request");

    let reply = state.upstream.fetch(url).await.map_err(|e| {
        error!(error = %e, "download forward failed");
        ApiError::Internal(GENERIC_FAILURE)
    })?;

    if !reply.status.is_success() {
        error!(status = %reply.status, "upstream refused the download");
        return Err(ApiError::upstream(reply.status, UPSTREAM_FALLBACK));
    }

    let content_type = reply
        .content_type
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
    let content_disposition = reply
        .content_disposition
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_DISPOSITION));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, content_disposition),
        ],
        reply.body,
    )
        .into_response())
}

/// A `path` starting with `http` is used as-is; anything else resolves
/// against the external base URL.
fn resolve_download_url(path: &str, base_url: &str) -> Result<Url, url::ParseError> {
    if path.starts_with("http") {
        Url::parse(path)
    } else {
        Url::parse(base_url)?.join(path)
    }
}
