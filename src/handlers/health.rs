use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use super::check_auth;
use crate::errors::AppError;
use crate::state::AppState;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// GET /api/status
#[derive(Serialize)]
pub struct StatusResponse {
    active_count: usize,
    history_count: usize,
    in_flight: usize,
    /// Ids present in both collections after a half-finished move.
    duplicates: Vec<String>,
    store_backend: String,
}

pub async fn status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<StatusResponse>, AppError> {
    check_auth(&headers, &state.sessions)?;

    let snapshot = state.lifecycle.snapshot();
    Ok(Json(StatusResponse {
        active_count: snapshot.active.len(),
        history_count: snapshot.history.len(),
        in_flight: state.lifecycle.in_flight_count(),
        duplicates: snapshot.duplicates(),
        store_backend: state.config.store_backend.clone(),
    }))
}
