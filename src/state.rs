/*
 * Responsibility
 * - Shared context bound to the Router (AppState)
 * - Read-only after construction; clones are cheap (Arc inside)
 */
use std::sync::Arc;

use crate::{config::Config, middleware::cors::CorsPolicy, services::upstream::UpstreamApi};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub cors: CorsPolicy,
    pub upstream: Arc<dyn UpstreamApi>,
}

impl AppState {
    pub fn new(config: Arc<Config>, cors: CorsPolicy, upstream: Arc<dyn UpstreamApi>) -> Self {
        Self {
            config,
            cors,
            upstream,
        }
    }
}
