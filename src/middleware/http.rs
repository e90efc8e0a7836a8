//! HTTP-level middleware (cross-cutting concerns).
//!
//! This module is for transport/infrastructure concerns that should apply to
//! most (or all) routes.
//!
//! Responsibility:
//! - Request-Id generation + propagation (X-Request-Id)
//! - Access logging / request tracing (TraceLayer)
//! - Body size limits sized for spreadsheet uploads
//!
//! Notes:
//! - No global timeout: the forwarding flow has no timeouts anywhere, so a
//!   slow upstream blocks the corresponding request until it settles.

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::header::HeaderName;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

/// Clients are told 200 MB per file; the transport cap sits above that so the
/// informational limit is the one users actually see.
const MAX_REQUEST_BYTES: usize = 256 * 1024 * 1024;

/// Apply HTTP-level middleware to the given Router.
pub fn apply(router: Router) -> Router {
    let request_id_header = HeaderName::from_static("x-request-id");

    let layers = ServiceBuilder::new()
        // Generate a request id if missing, then propagate it to the response.
        .layer(SetRequestIdLayer::new(
            request_id_header.clone(),
            MakeRequestUuid,
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header))
        // Replace axum's default 2 MiB cap with an upload-sized one.
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BYTES))
        // Access log / tracing for all requests.
        .layer(TraceLayer::new_for_http());

    router.layer(DefaultBodyLimit::disable()).layer(layers)
}
