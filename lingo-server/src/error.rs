//! Error types for lingo-server HTTP handlers

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::services::SentenceError;

/// Body text of every 500 response
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// API error type
///
/// Serialized as `{"error": "<message>"}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("{0}")]
    BadRequest(String),

    /// Missing or invalid session (401)
    #[error("{0}")]
    Unauthorized(String),

    /// Resource not found (404)
    #[error("{0}")]
    NotFound(String),

    /// Conflict (409), e.g. a taken username
    #[error("{0}")]
    Conflict(String),

    /// Internal server error (500); the message is logged, never returned
    #[error("{0}")]
    Internal(String),
}

impl From<lingo_common::Error> for ApiError {
    fn from(err: lingo_common::Error) -> Self {
        match err {
            lingo_common::Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            lingo_common::Error::Conflict(msg) => ApiError::Conflict(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<SentenceError> for ApiError {
    fn from(err: SentenceError) -> Self {
        match err {
            SentenceError::Validation(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal(msg) => {
                error!("Request failed: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    INTERNAL_ERROR_MESSAGE.to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
