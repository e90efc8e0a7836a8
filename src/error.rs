/*
 * Responsibility
 * - App-wide ApiError definition
 * - IntoResponse impl (HTTP status / `{"detail": ...}` JSON body)
 *
 * The `detail` body shape is part of the wire contract with the browser
 * frontend, which reads it for every failure path.
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub detail: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed client input.
    #[error("{0}")]
    BadRequest(&'static str),

    /// Server-side configuration problem (missing/invalid base URL).
    #[error("{0}")]
    Config(&'static str),

    /// Non-success status relayed from the external service.
    #[error("{detail}")]
    Upstream { status: StatusCode, detail: String },

    /// Transport or parse failure, collapsed to a generic retry suggestion.
    #[error("{0}")]
    Internal(&'static str),
}

impl ApiError {
    pub fn upstream(status: StatusCode, detail: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail.to_string()),
            ApiError::Config(detail) => (StatusCode::INTERNAL_SERVER_ERROR, detail.to_string()),
            ApiError::Upstream { status, detail } => (status, detail),
            ApiError::Internal(detail) => (StatusCode::INTERNAL_SERVER_ERROR, detail.to_string()),
        };

        (status, Json(ErrorDetail { detail })).into_response()
    }
}
