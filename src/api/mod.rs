//! HTTP monitoring API
//!
//! Exposes the cache subsystem to the dashboard: a read-only info
//! snapshot, a scoped clear operation, and the cached server list itself.
//! Every route sits behind the shared-secret middleware.

mod auth;
mod routes;

use axum::{middleware, routing::get, routing::post, Router};

use crate::cache::{CacheCoordinator, InfoReporter};

/// Shared state for all API handlers
#[derive(Clone)]
pub struct AppState {
    pub coordinator: CacheCoordinator,
    pub reporter: InfoReporter,
    /// Shared secret expected in the `X-API-Key` header
    pub api_key: String,
}

/// Builds the API router with authentication applied to every route
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/cache/info", get(routes::cache_info))
        .route("/cache/clear", post(routes::cache_clear))
        .route("/servers", get(routes::servers))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ))
        .with_state(state)
}
