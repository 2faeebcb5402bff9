use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::state::AppState;

// POST /api/auth/login
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    token: String,
    email: String,
    user_id: String,
    expires_at: DateTime<Utc>,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let email = body.email.trim();
    if email.is_empty() || body.password.is_empty() {
        return Err(AppError::BadRequest(
            "email and password are required".to_string(),
        ));
    }

    let session = state.auth.sign_in(email, &body.password).await.map_err(|e| {
        tracing::info!(email, error = %e, "sign-in failed");
        e
    })?;

    let now = Utc::now();
    let token = state.sessions.issue(&session.email, now);
    tracing::info!(email = %session.email, "operator signed in");

    Ok(Json(LoginResponse {
        token,
        email: session.email,
        user_id: session.user_id,
        expires_at: now + state.sessions.ttl(),
    }))
}
