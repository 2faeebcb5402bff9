pub mod auth;
pub mod bookings;
pub mod calendar;
pub mod events;
pub mod health;
pub mod history;
pub mod reports;

use std::sync::Arc;

use axum::http::{header, HeaderMap};
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use serde::Serialize;

use crate::errors::AppError;
use crate::models::{BookingRecord, HistoryRecord};
use crate::services::session::{SessionClaims, SessionKeys};
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/auth/login", post(auth::login))
        .route("/api/status", get(health::status))
        .route("/api/bookings", get(bookings::list_bookings))
        .route("/api/bookings/lookup", get(bookings::lookup_bookings))
        .route("/api/bookings/:id/confirm", post(bookings::confirm_booking))
        .route("/api/bookings/:id/cancel", post(bookings::cancel_booking))
        .route(
            "/api/bookings/:id",
            axum::routing::delete(bookings::delete_booking),
        )
        .route("/api/history", get(history::list_history))
        .route("/api/history/lookup", get(history::lookup_history))
        .route("/api/history/:id/restore", post(history::restore_booking))
        .route(
            "/api/history/:id",
            axum::routing::delete(history::delete_history),
        )
        .route("/api/calendar", get(calendar::month_view))
        .route("/api/calendar/day/:date", get(calendar::day_view))
        .route("/calendar/:booking_id", get(calendar::download_ics))
        .route("/api/reports", get(reports::get_report))
        .route("/api/events", get(events::events_stream))
        .with_state(state)
}

/// Accepts `Authorization: Bearer <session token>`.
pub fn check_auth(headers: &HeaderMap, sessions: &SessionKeys) -> Result<SessionClaims, AppError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("");
    check_token(token, sessions)
}

/// For clients that cannot set headers (EventSource, calendar apps).
pub fn check_token(token: &str, sessions: &SessionKeys) -> Result<SessionClaims, AppError> {
    sessions.verify(token, Utc::now()).map_err(|e| {
        tracing::debug!(error = %e, "rejected session token");
        AppError::Unauthorized
    })
}

#[derive(Debug, Serialize)]
pub struct BookingView {
    pub id: String,
    pub full_name: String,
    pub part_of_day: &'static str,
    #[serde(flatten)]
    pub booking: BookingRecord,
}

impl From<BookingRecord> for BookingView {
    fn from(booking: BookingRecord) -> Self {
        Self {
            id: booking.id.clone(),
            full_name: booking.full_name(),
            part_of_day: part_of_day(&booking),
            booking,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryView {
    pub id: String,
    pub full_name: String,
    pub part_of_day: &'static str,
    #[serde(flatten)]
    pub record: HistoryRecord,
}

impl From<HistoryRecord> for HistoryView {
    fn from(record: HistoryRecord) -> Self {
        Self {
            id: record.id().to_string(),
            full_name: record.booking.full_name(),
            part_of_day: part_of_day(&record.booking),
            record,
        }
    }
}

fn part_of_day(booking: &BookingRecord) -> &'static str {
    if booking.time.is_morning() {
        "morning"
    } else {
        "afternoon"
    }
}
