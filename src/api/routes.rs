/*
 * Responsibility
 * - URL structure of the gateway API
 * - /health, /process-crimes, /download-file (nested under /api in app.rs)
 * - Preflight OPTIONS is answered by the CORS gate, not per route
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use crate::api::handlers::{
    download_file::download_file, health::health, process_crimes::process_crimes,
};

/// Browser-facing path of the process endpoint.
pub const PROCESS_FILES_PATH: &str = "/api/process-crimes";
/// Browser-facing path of the download endpoint; also the rewrite target for
/// upstream download URLs.
pub const DOWNLOAD_FILE_PATH: &str = "/api/download-file";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/process-crimes", post(process_crimes))
        .route("/download-file", get(download_file))
}
