/*
 * Responsibility
 * - Config load → dependency construction → Router assembly
 * - Middleware application (CORS gate, security headers, HTTP stack)
 * - Start via axum::serve()
 */
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{
    api,
    config::Config,
    middleware::{cors, cors::CorsPolicy, http, security_headers},
    services::upstream::HttpUpstream,
    state::AppState,
};

pub async fn run() -> Result<()> {
    init_tracing();

    let config = Config::from_env()?;
    let cors_policy =
        CorsPolicy::from_config(&config).context("FRONTEND_URL is not a valid origin")?;
    let state = AppState::new(Arc::new(config), cors_policy, Arc::new(HttpUpstream::new()));

    let addr = state.config.addr;
    let app = build_router(state);

    info!(%addr, "crimestat gateway listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Router assembly, shared with the integration tests.
pub fn build_router(state: AppState) -> Router {
    let api = api::routes().layer(axum::middleware::from_fn_with_state(
        state.clone(),
        cors::gate,
    ));

    let router = Router::new().nest("/api", api).with_state(state);
    let router = security_headers::apply(router);
    http::apply(router)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
