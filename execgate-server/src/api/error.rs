//! API Error Handling
//!
//! Unified error types and conversion for API responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::service::JobError;
use crate::store::StoreError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    ServiceUnavailable(String),
    StoreError(StoreError),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::StoreError(err) => {
                tracing::error!("Store error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::NotFound(_) => ApiError::NotFound(err.to_string()),
            JobError::UnsupportedLanguage(_) | JobError::Validation(_) => {
                ApiError::BadRequest(err.to_string())
            }
            JobError::AlreadyStarted { .. } => ApiError::Conflict(err.to_string()),
            JobError::QueueFull(_) | JobError::DispatcherStopped => {
                ApiError::ServiceUnavailable(err.to_string())
            }
            JobError::Store(err) => ApiError::StoreError(err),
            JobError::CodeStorage(err) => {
                ApiError::InternalError(format!("Failed to store code: {}", err))
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
