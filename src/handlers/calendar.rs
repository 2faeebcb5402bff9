use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{check_auth, check_token, HistoryView};
use crate::errors::AppError;
use crate::models::{BookingStatus, ReportPeriod};
use crate::services::calendar::{
    confirmed_by_date, default_day_part, filter_day_part, generate_ics, DayPart,
};
use crate::state::AppState;

// GET /api/calendar?month=YYYY-MM
#[derive(Deserialize)]
pub struct MonthQuery {
    pub month: Option<String>,
}

#[derive(Serialize)]
pub struct CalendarDay {
    date: NaiveDate,
    count: usize,
    default_part: DayPart,
}

#[derive(Serialize)]
pub struct MonthResponse {
    month: String,
    days: Vec<CalendarDay>,
}

pub async fn month_view(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<MonthQuery>,
) -> Result<Json<MonthResponse>, AppError> {
    check_auth(&headers, &state.sessions)?;

    let month = match query.month.as_deref() {
        Some(raw) => match ReportPeriod::parse(raw) {
            Ok(period @ ReportPeriod::Month { .. }) => period,
            _ => return Err(AppError::BadRequest(format!("month must be YYYY-MM, got {raw:?}"))),
        },
        None => ReportPeriod::current_month(Utc::now().date_naive()),
    };

    let history = state.lifecycle.history();
    let days = confirmed_by_date(&history, month)
        .into_iter()
        .map(|(date, records)| CalendarDay {
            date,
            count: records.len(),
            default_part: default_day_part(&records),
        })
        .collect();

    Ok(Json(MonthResponse {
        month: month.to_string(),
        days,
    }))
}

// GET /api/calendar/day/:date?part=
#[derive(Deserialize)]
pub struct DayQuery {
    pub part: Option<DayPart>,
}

#[derive(Serialize)]
pub struct DayResponse {
    date: NaiveDate,
    part: DayPart,
    bookings: Vec<HistoryView>,
}

pub async fn day_view(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(date): Path<String>,
    Query(query): Query<DayQuery>,
) -> Result<Json<DayResponse>, AppError> {
    check_auth(&headers, &state.sessions)?;

    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("date must be YYYY-MM-DD, got {date:?}")))?;

    let history = state.lifecycle.history();
    let days = confirmed_by_date(&history, ReportPeriod::current_month(date));
    let records = days.get(&date).map(Vec::as_slice).unwrap_or_default();

    let part = query.part.unwrap_or_else(|| default_day_part(records));
    let bookings = filter_day_part(records, part)
        .into_iter()
        .cloned()
        .map(HistoryView::from)
        .collect();

    Ok(Json(DayResponse {
        date,
        part,
        bookings,
    }))
}

// GET /calendar/:id.ics
#[derive(Deserialize)]
pub struct IcsQuery {
    pub token: Option<String>,
}

pub async fn download_ics(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
    Query(query): Query<IcsQuery>,
) -> Result<Response, AppError> {
    match query.token.as_deref() {
        Some(token) => check_token(token, &state.sessions)?,
        None => check_auth(&headers, &state.sessions)?,
    };

    let booking_id = raw_id.strip_suffix(".ics").unwrap_or(&raw_id);
    let record = state
        .lifecycle
        .find_history(booking_id)
        .filter(|r| r.status == BookingStatus::Confirmed)
        .ok_or_else(|| AppError::NotFound(format!("confirmed booking {booking_id}")))?;

    let ics = generate_ics(&record, &state.config.business_name);
    let filename = format!("booking-{booking_id}.ics");

    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        ics,
    )
        .into_response())
}
