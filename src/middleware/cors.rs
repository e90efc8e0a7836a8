//! CORS policy for browser clients.
//!
//! Note:
//! - CORS is enforced by browsers. Server-to-server calls are not restricted
//!   by it.
//! - `tower_http::cors::CorsLayer` cannot express this policy: a disallowed
//!   origin is not denied, the canonical frontend origin is substituted in the
//!   `Access-Control-Allow-Origin` header instead. The headers are therefore
//!   computed per request.
//!
//! Responsibility:
//! - Decide the allow-origin value from the incoming `Origin` header and the
//!   static allow-list {frontend URL} ∪ {localhost:3000 in development}.
//! - Produce the route-level header set attached by the proxy handlers.
//! - Produce the broader gate-level header set and run the `/api` request gate
//!   (preflight short-circuit + header back-fill on every response).

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{config::Config, state::AppState};

const LOCALHOST_DEV_ORIGIN: &str = "http://localhost:3000";

/// Preflight results may be cached for 24 hours.
const MAX_AGE_SECS: &str = "86400";

#[derive(Clone, Debug)]
pub struct CorsPolicy {
    frontend_origin: HeaderValue,
    allow_localhost: bool,
}

impl CorsPolicy {
    pub fn from_config(config: &Config) -> Result<Self, header::InvalidHeaderValue> {
        Ok(Self {
            frontend_origin: HeaderValue::from_str(&config.frontend_url)?,
            allow_localhost: config.app_env.is_development(),
        })
    }

    fn is_allowed(&self, origin: &HeaderValue) -> bool {
        origin == &self.frontend_origin
            || (self.allow_localhost && origin == LOCALHOST_DEV_ORIGIN)
    }

    /// Echo an allow-listed origin verbatim; otherwise substitute the frontend
    /// origin. A disallowed origin is never echoed back.
    fn allow_origin(&self, origin: Option<&HeaderValue>) -> HeaderValue {
        match origin {
            Some(origin) if self.is_allowed(origin) => origin.clone(),
            _ => self.frontend_origin.clone(),
        }
    }

    /// Header set attached by the proxy endpoints to each of their responses,
    /// error responses included.
    pub fn route_headers(&self, origin: Option<&HeaderValue>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin(origin));
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, OPTIONS"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type, Authorization"),
        );
        headers.insert(
            header::ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static(MAX_AGE_SECS),
        );
        headers
    }

    /// Broader header set emitted by the `/api` gate.
    pub fn gate_headers(&self, origin: Option<&HeaderValue>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin(origin));
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET,DELETE,PATCH,POST,PUT,OPTIONS"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(
                "X-CSRF-Token, X-Requested-With, Accept, Accept-Version, Content-Length, \
                 Content-MD5, Content-Type, Date, X-Api-Version, Authorization",
            ),
        );
        headers
    }
}

/// Overwrite the response's CORS keys with the given set (handler-level use).
pub fn apply_headers(response: &mut Response, headers: &HeaderMap) {
    for (name, value) in headers {
        response.headers_mut().insert(name, value.clone());
    }
}

/// Request gate for the `/api` subtree.
///
/// - `OPTIONS` short-circuits to a bare 204 carrying the gate header set.
/// - Every other response gets gate headers back-filled for keys the handler
///   did not set itself, so route-level values win where both exist.
pub async fn gate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let origin = request.headers().get(header::ORIGIN).cloned();
    let headers = state.cors.gate_headers(origin.as_ref());

    if request.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        apply_headers(&mut response, &headers);
        return response;
    }

    let mut response = next.run(request).await;
    for (name, value) in &headers {
        if !response.headers().contains_key(name) {
            response.headers_mut().insert(name, value.clone());
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppEnv;
    use std::net::SocketAddr;
    use std::str::FromStr;

    const FRONTEND: &str = "https://crimestats.example.com";

    fn policy(app_env: AppEnv) -> CorsPolicy {
        let config = Config {
            addr: SocketAddr::from_str("0.0.0.0:3000").unwrap(),
            app_env,
            frontend_url: FRONTEND.to_string(),
            api_base_url: None,
        };
        CorsPolicy::from_config(&config).unwrap()
    }

    fn allow_origin(headers: &HeaderMap) -> &str {
        headers
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap()
            .to_str()
            .unwrap()
    }

    #[test]
    fn allowed_origin_is_echoed_verbatim() {
        let policy = policy(AppEnv::Production);
        let origin = HeaderValue::from_static(FRONTEND);
        let headers = policy.route_headers(Some(&origin));
        assert_eq!(allow_origin(&headers), FRONTEND);
    }

    #[test]
    fn disallowed_origin_falls_back_to_frontend() {
        let policy = policy(AppEnv::Production);
        let origin = HeaderValue::from_static("https://evil.example.com");
        let headers = policy.route_headers(Some(&origin));
        assert_eq!(allow_origin(&headers), FRONTEND);
    }

    #[test]
    fn missing_origin_falls_back_to_frontend() {
        let policy = policy(AppEnv::Production);
        let headers = policy.route_headers(None);
        assert_eq!(allow_origin(&headers), FRONTEND);
    }

    #[test]
    fn localhost_is_allowed_only_in_development() {
        let origin = HeaderValue::from_static(LOCALHOST_DEV_ORIGIN);

        let dev = policy(AppEnv::Development).route_headers(Some(&origin));
        assert_eq!(allow_origin(&dev), LOCALHOST_DEV_ORIGIN);

        let prod = policy(AppEnv::Production).route_headers(Some(&origin));
        assert_eq!(allow_origin(&prod), FRONTEND);
    }

    #[test]
    fn route_set_carries_methods_headers_and_max_age() {
        let headers = policy(AppEnv::Production).route_headers(None);
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap(),
            "GET, POST, OPTIONS"
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_HEADERS).unwrap(),
            "Content-Type, Authorization"
        );
        assert_eq!(headers.get(header::ACCESS_CONTROL_MAX_AGE).unwrap(), "86400");
        assert!(headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).is_none());
    }

    #[test]
    fn gate_set_carries_credentials_and_broader_methods() {
        let headers = policy(AppEnv::Production).gate_headers(None);
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
            "true"
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap(),
            "GET,DELETE,PATCH,POST,PUT,OPTIONS"
        );
        assert!(headers.get(header::ACCESS_CONTROL_MAX_AGE).is_none());
    }
}
