//! Shared-secret authentication middleware
//!
//! The dashboard authenticates with a static `X-API-Key` header. Requests
//! with a missing or incorrect key are rejected with 401 before reaching
//! any handler, so the cache subsystem never sees unauthenticated calls.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::debug;

use super::AppState;

/// Header carrying the shared secret
pub const API_KEY_HEADER: &str = "x-api-key";

/// Rejects requests whose `X-API-Key` header doesn't match the configured secret
pub async fn require_api_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let presented = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    match presented {
        Some(key) if key == state.api_key => next.run(req).await,
        _ => {
            debug!(path = %req.uri().path(), "rejected request with missing or bad API key");
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "invalid or missing API key" })),
            )
                .into_response()
        }
    }
}
