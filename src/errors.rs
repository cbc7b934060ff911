use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Centralized error types for the application
///
/// All errors in the application are converted to this enum for consistent
/// error handling. Uses `thiserror` for automatic error conversion and
/// display formatting.
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Database connection pool errors
    #[error("Database pool error: {0}")]
    DatabasePool(#[from] r2d2::Error),

    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// Password hashing failures
    #[error("Password hash error: {0}")]
    PasswordHash(String),

    /// Admin token is missing, malformed, expired or has a bad signature.
    /// Callers must treat every failure mode identically (unauthenticated).
    #[error("Invalid admin token")]
    InvalidToken,

    /// Referenced entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Registration request was already approved or rejected
    #[error("Request already processed")]
    AlreadyProcessed,

    /// Malformed input (bad date-time, bad payload)
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::AlreadyProcessed | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Database(_) | Self::DatabasePool(_) | Self::Telegram(_) | Self::PasswordHash(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            log::error!("Request failed: {}", self);
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::InvalidToken => "Invalid token".to_string(),
            Self::Database(_) | Self::DatabasePool(_) | Self::Telegram(_) | Self::PasswordHash(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, axum::Json(json!({ "status": "error", "message": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_error_status_codes() {
        assert_eq!(status_of(AppError::InvalidToken), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AppError::NotFound("request 7".into())), StatusCode::NOT_FOUND);
        assert_eq!(status_of(AppError::AlreadyProcessed), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(AppError::Validation("bad delivery_time".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_internal_errors_are_not_leaked() {
        let response = AppError::PasswordHash("argon2 params".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
