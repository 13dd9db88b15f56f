//! HTTP front-end for the Beacon RPC gateway.
//!
//! Exposes `POST /{chainId}` for single or batched JSON-RPC 2.0 bodies
//! and `GET /health` for liveness, with open CORS for browser clients.

pub mod middleware;
pub mod router;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use router::AppState;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::limit::RequestBodyLimitLayer;

/// Request bodies above this size are rejected before parsing.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Assembles the service router with its middleware stack.
#[must_use]
pub fn build_app(state: AppState, max_concurrent_requests: usize) -> Router {
    Router::new()
        .route("/health", get(router::handle_health))
        .route("/{chain_id}", post(router::handle_rpc))
        .layer(axum_middleware::from_fn(middleware::cors))
        .layer(ConcurrencyLimitLayer::new(max_concurrent_requests))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}
