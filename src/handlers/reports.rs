use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use super::check_auth;
use crate::errors::AppError;
use crate::models::ReportPeriod;
use crate::services::reports::Aggregates;
use crate::state::AppState;

// GET /api/reports?period=
#[derive(Deserialize)]
pub struct ReportQuery {
    pub period: Option<String>,
}

pub async fn get_report(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Aggregates>, AppError> {
    check_auth(&headers, &state.sessions)?;

    let period = match query.period.as_deref() {
        Some(raw) => ReportPeriod::parse(raw).map_err(|e| AppError::BadRequest(e.to_string()))?,
        None => ReportPeriod::current_month(Utc::now().date_naive()),
    };

    Ok(Json(state.lifecycle.aggregates(period, &state.prices)))
}
