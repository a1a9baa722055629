//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Forbidden - valid credentials but not an admin.
    #[error("forbidden")]
    Forbidden,

    /// Bad request - invalid input, including user/course mismatches.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The transaction already left the pending state.
    #[error("failed precondition: {0}")]
    FailedPrecondition(String),

    /// The user already holds an active grant for the course.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry in {retry_after_seconds}s")]
    RateLimited {
        /// Seconds until the current window rolls over.
        retry_after_seconds: i64,
    },

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// External service error.
    #[error("external service error: {0}")]
    ExternalService(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::Forbidden => (StatusCode::FORBIDDEN, "forbidden", self.to_string(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::FailedPrecondition(msg) => (
                StatusCode::CONFLICT,
                "failed_precondition",
                msg.clone(),
                None,
            ),
            Self::AlreadyExists(msg) => {
                (StatusCode::CONFLICT, "already_exists", msg.clone(), None)
            }
            Self::RateLimited {
                retry_after_seconds,
            } => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                self.to_string(),
                Some(serde_json::json!({
                    "retry_after_seconds": retry_after_seconds
                })),
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            Self::ExternalService(msg) => (
                StatusCode::BAD_GATEWAY,
                "external_service_error",
                msg.clone(),
                None,
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<kurspay_store::StoreError> for ApiError {
    fn from(err: kurspay_store::StoreError) -> Self {
        match err {
            kurspay_store::StoreError::NotFound { entity, id } => {
                Self::NotFound(format!("{entity} not found: {id}"))
            }
            kurspay_store::StoreError::NotPending { status } => Self::FailedPrecondition(format!(
                "transaction is {}, expected pending",
                status.as_str()
            )),
            kurspay_store::StoreError::ParticipantMismatch { field } => {
                Self::BadRequest(format!("supplied {field} does not match the transaction"))
            }
            kurspay_store::StoreError::AccessExists { course_id } => {
                Self::AlreadyExists(format!("user already has access to course {course_id}"))
            }
            kurspay_store::StoreError::Database(msg)
            | kurspay_store::StoreError::Serialization(msg) => Self::Internal(msg),
        }
    }
}
