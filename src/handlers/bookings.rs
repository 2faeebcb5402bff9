use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use super::{check_auth, BookingView, HistoryView};
use crate::errors::AppError;
use crate::models::BookingStatus;
use crate::services::search::{filter_by_free_text, DEFAULT_FIELDS};
use crate::services::store::Collection;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
}

// GET /api/bookings?q=
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<BookingView>>, AppError> {
    check_auth(&headers, &state.sessions)?;

    let active = state.lifecycle.active();
    let found = filter_by_free_text(&active, query.q.as_deref().unwrap_or(""), &DEFAULT_FIELDS);
    Ok(Json(
        found.into_iter().cloned().map(BookingView::from).collect(),
    ))
}

// GET /api/bookings/lookup?field=&value=
#[derive(Deserialize)]
pub struct LookupQuery {
    pub field: String,
    pub value: String,
}

pub async fn lookup_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<LookupQuery>,
) -> Result<Json<Vec<BookingView>>, AppError> {
    check_auth(&headers, &state.sessions)?;
    validate_field(&query.field)?;

    let found = state
        .lifecycle
        .query_active(&query.field, &query.value)
        .await?;
    Ok(Json(found.into_iter().map(BookingView::from).collect()))
}

pub(crate) fn validate_field(field: &str) -> Result<(), AppError> {
    if field.is_empty() || !field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(AppError::BadRequest(format!("invalid field name: {field:?}")));
    }
    Ok(())
}

// POST /api/bookings/:id/confirm
pub async fn confirm_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<HistoryView>, AppError> {
    check_auth(&headers, &state.sessions)?;

    let record = state
        .lifecycle
        .transition(&id, BookingStatus::Confirmed)
        .await?;
    Ok(Json(record.into()))
}

// POST /api/bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<HistoryView>, AppError> {
    check_auth(&headers, &state.sessions)?;

    let record = state
        .lifecycle
        .transition(&id, BookingStatus::Canceled)
        .await?;
    Ok(Json(record.into()))
}

// DELETE /api/bookings/:id
pub async fn delete_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let claims = check_auth(&headers, &state.sessions)?;

    state
        .lifecycle
        .permanently_delete(&id, Collection::Bookings)
        .await?;
    tracing::info!(id, operator = %claims.email, "active booking deleted");
    Ok(Json(serde_json::json!({ "ok": true })))
}
