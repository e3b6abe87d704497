use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Path outside the data directory")]
    Forbidden,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Too many failed attempts, retry in {minutes_left} minutes")]
    Blocked { minutes_left: i64 },

    #[error("Submission quota exceeded")]
    SubmissionQuotaExceeded,

    #[error("Current draw number is not set")]
    DrawUnavailable,
}

/// Implement IntoResponse to convert AppError into HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Storage(ref e) => {
                tracing::error!("Storage error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "System error, please try again later".to_string(),
                )
            }
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Admin key is invalid or missing".to_string(),
            ),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "Access to this path is not allowed".to_string(),
            ),
            AppError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{} not found", what)),
            AppError::Blocked { minutes_left } => (
                StatusCode::TOO_MANY_REQUESTS,
                format!(
                    "Too many failed attempts, access is blocked. Try again in {} minutes.",
                    minutes_left
                ),
            ),
            AppError::SubmissionQuotaExceeded => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many submissions, please wait an hour and try again".to_string(),
            ),
            AppError::DrawUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "The current draw number is unavailable, please try again later".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}

/// Result type alias for application results
pub type Result<T> = std::result::Result<T, AppError>;
