use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use super::bookings::{validate_field, LookupQuery};
use super::{check_auth, BookingView, HistoryView};
use crate::errors::AppError;
use crate::models::BookingStatus;
use crate::services::search::{filter_by_free_text, DEFAULT_FIELDS};
use crate::services::store::Collection;
use crate::state::AppState;

// GET /api/history?q=&status=
#[derive(Deserialize)]
pub struct HistoryQuery {
    pub q: Option<String>,
    pub status: Option<String>,
}

pub async fn list_history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoryView>>, AppError> {
    check_auth(&headers, &state.sessions)?;

    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(raw) => match BookingStatus::parse(raw) {
            Some(status) if status.is_terminal() => Some(status),
            _ => {
                return Err(AppError::BadRequest(format!(
                    "status must be confirmed or canceled, got {raw:?}"
                )))
            }
        },
    };

    let history: Vec<_> = state
        .lifecycle
        .history()
        .into_iter()
        .filter(|r| status.map_or(true, |s| r.status == s))
        .collect();
    let found = filter_by_free_text(&history, query.q.as_deref().unwrap_or(""), &DEFAULT_FIELDS);
    Ok(Json(
        found.into_iter().cloned().map(HistoryView::from).collect(),
    ))
}

// GET /api/history/lookup?field=&value=
pub async fn lookup_history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<LookupQuery>,
) -> Result<Json<Vec<HistoryView>>, AppError> {
    check_auth(&headers, &state.sessions)?;
    validate_field(&query.field)?;

    let found = state
        .lifecycle
        .query_history(&query.field, &query.value)
        .await?;
    Ok(Json(found.into_iter().map(HistoryView::from).collect()))
}

// POST /api/history/:id/restore
pub async fn restore_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BookingView>, AppError> {
    check_auth(&headers, &state.sessions)?;

    let record = state.lifecycle.restore(&id).await?;
    Ok(Json(record.into()))
}

// DELETE /api/history/:id
pub async fn delete_history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let claims = check_auth(&headers, &state.sessions)?;

    state
        .lifecycle
        .permanently_delete(&id, Collection::History)
        .await?;
    tracing::info!(id, operator = %claims.email, "history record deleted");
    Ok(Json(serde_json::json!({ "ok": true })))
}
