//! Handlers for the monitoring endpoints

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use super::AppState;
use crate::cache::InvalidateScope;
use crate::data::ServerOffer;

/// `GET /cache/info` — point-in-time cache and storage snapshot
pub async fn cache_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.reporter.snapshot())
}

/// Body of `POST /cache/clear`
#[derive(Debug, Deserialize)]
pub struct ClearRequest {
    /// One of "all", "memory", "files"
    #[serde(rename = "type")]
    pub scope: InvalidateScope,
}

/// `POST /cache/clear` — scoped invalidation
///
/// Unknown scope values fail `InvalidateScope` deserialization and are
/// rejected with 400 and no state change.
pub async fn cache_clear(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> impl IntoResponse {
    let request: ClearRequest = match serde_json::from_value(body) {
        Ok(request) => request,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("invalid clear request: {e}") })),
            );
        }
    };
    let scope = request.scope;

    match state.coordinator.invalidate(scope) {
        Ok(()) => {
            let message = match scope {
                InvalidateScope::All => "memory and file caches cleared",
                InvalidateScope::Memory => "memory cache cleared",
                InvalidateScope::Files => "file cache cleared",
            };
            (StatusCode::OK, Json(json!({ "message": message })))
        }
        Err(e) => {
            error!(error = %e, "cache clear failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        }
    }
}

/// `GET /servers` response: the cached payload with freshness metadata
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServersResponse {
    pub servers: Vec<ServerOffer>,
    /// Whether any entry was held at all
    pub cached: bool,
    /// Whether the entry is within its TTL (stale entries still serve)
    pub cache_valid: bool,
    /// When the entry was fetched, `null` while cold
    pub timestamp: Option<DateTime<Utc>>,
}

/// `GET /servers` — the cached server list
///
/// Cache-aside: never triggers a fetch; a cold cache answers with an
/// empty list so the dashboard can distinguish "no data yet" from
/// "upstream has zero offers" via the `cached` flag.
pub async fn servers(State(state): State<AppState>) -> impl IntoResponse {
    let response = match state.coordinator.get() {
        Some((servers, valid)) => ServersResponse {
            servers,
            cached: true,
            cache_valid: valid,
            timestamp: state.coordinator.created_at(),
        },
        None => ServersResponse {
            servers: Vec::new(),
            cached: false,
            cache_valid: false,
            timestamp: None,
        },
    };
    Json(response)
}
