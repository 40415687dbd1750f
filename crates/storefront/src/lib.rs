//! Lumen storefront library.
//!
//! Cart, checkout, orders, reviews and wishlist behind a JSON API. Built as a
//! library so the binary, the CLI and the integration tests share one
//! router and one set of services.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{Router, body::Body, http::Request};
use tower_http::trace::TraceLayer;
use tower_sessions::{SessionManagerLayer, SessionStore};

use middleware::RateLimits;
use state::AppState;

/// Build the storefront application.
///
/// Layers, innermost first: sessions, security headers, request id, HTTP
/// tracing. The binary adds the Sentry layers outside these.
pub fn app<S>(
    state: AppState,
    sessions: SessionManagerLayer<S>,
    limits: Option<RateLimits>,
) -> Router
where
    S: SessionStore + Clone,
{
    routes::routes(limits)
        .layer(sessions)
        .layer(axum::middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}
