use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::services::auth::AuthError;
use crate::services::lifecycle::LifecycleError;
use crate::services::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized")]
    Unauthorized,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Lifecycle(e) => match e {
                LifecycleError::Validation(_) => StatusCode::BAD_REQUEST,
                LifecycleError::NotFound { .. } => StatusCode::NOT_FOUND,
                LifecycleError::TransitionInProgress(_) => StatusCode::CONFLICT,
                LifecycleError::Transport(e) => store_status(e),
                LifecycleError::PartialFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Store(e) => store_status(e),
            AppError::Auth(AuthError::Transport(_)) => StatusCode::BAD_GATEWAY,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}

fn store_status(e: &StoreError) -> StatusCode {
    match e {
        StoreError::Transport(_) => StatusCode::BAD_GATEWAY,
        StoreError::Database(_) | StoreError::Decode(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::store::Collection;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                AppError::from(LifecycleError::Validation("bad".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::from(LifecycleError::NotFound {
                    id: "x".into(),
                    collection: Collection::Bookings,
                }),
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::from(LifecycleError::TransitionInProgress("x".into())),
                StatusCode::CONFLICT,
            ),
            (
                AppError::from(LifecycleError::Transport(StoreError::Transport("down".into()))),
                StatusCode::BAD_GATEWAY,
            ),
            (
                AppError::from(LifecycleError::PartialFailure {
                    id: "x".into(),
                    written: Collection::History,
                    remaining: Collection::Bookings,
                    error: StoreError::Transport("down".into()),
                }),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (AppError::from(AuthError::WrongSecret), StatusCode::UNAUTHORIZED),
            (
                AppError::from(AuthError::Transport("dns".into())),
                StatusCode::BAD_GATEWAY,
            ),
            (AppError::Unauthorized, StatusCode::UNAUTHORIZED),
        ];

        for (error, expected) in cases {
            assert_eq!(error.status(), expected, "{error}");
        }
    }

    #[test]
    fn test_auth_message_is_operator_facing() {
        let error = AppError::from(AuthError::IdentifierNotFound);
        assert_eq!(error.to_string(), "User not found. Please check your username.");
    }
}
