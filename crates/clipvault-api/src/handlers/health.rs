//! Health check handler.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

use crate::state::AppState;

/// Liveness probe - process is running and the registry is reachable.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let live_uploads = state.registry.live_count().await;
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "ok", "live_uploads": live_uploads })),
    )
}
