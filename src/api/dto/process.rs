/*
 * Responsibility
 * - Wire DTOs for the process endpoint and the upstream bodies it interprets
 */
use serde::{Deserialize, Serialize};

/// Body returned to the browser after a successful process call. The
/// `download_url` always points at this gateway's own download endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProcessResponse {
    pub download_url: String,
}

/// Success body of the external service's process endpoint.
#[derive(Debug, Deserialize)]
pub struct UpstreamProcessBody {
    pub download_url: String,
}

/// Error body of the external service; `detail` is optional on the wire.
#[derive(Debug, Deserialize)]
pub struct UpstreamErrorBody {
    pub detail: Option<String>,
}
