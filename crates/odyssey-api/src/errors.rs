//! Odyssey API error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl. Bodies
//! are `{message}`, plus `errors` for validation failures. Persistence and
//! internal failures are logged server-side and answered with a generic
//! message so driver or query details never reach the client.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use common::types::{FieldViolation, MessageResponse, ValidationErrorResponse};
use thiserror::Error;

/// Message returned for every 500 response.
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred";

/// Odyssey API error type.
///
/// Maps to HTTP status codes:
/// - BadRequest, Validation: 400 Bad Request
/// - Unauthorized: 401 Unauthorized (with `WWW-Authenticate`)
/// - Forbidden: 403 Forbidden
/// - NotFound: 404 Not Found
/// - Conflict: 409 Conflict
/// - RateLimited: 429 Too Many Requests (with `Retry-After`)
/// - Database, Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation failed: {} violation(s)", .0.len())]
    Validation(Vec<FieldViolation>),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rate limit exceeded")]
    RateLimited { retry_after_secs: u64 },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let mut response = match self {
            ApiError::Validation(errors) => {
                let body = ValidationErrorResponse {
                    message: "Validation failed".to_string(),
                    errors,
                };
                (status, Json(body)).into_response()
            }
            ApiError::Database(err) => {
                // Log actual error server-side, return generic message to client
                tracing::error!(
                    target: "odyssey.database",
                    error = %err,
                    "Database operation failed"
                );
                (status, Json(MessageResponse::new(INTERNAL_ERROR_MESSAGE))).into_response()
            }
            ApiError::Internal(err) => {
                tracing::error!(target: "odyssey.internal", error = %err, "Internal error");
                (status, Json(MessageResponse::new(INTERNAL_ERROR_MESSAGE))).into_response()
            }
            ApiError::RateLimited { retry_after_secs } => {
                let mut response = (
                    status,
                    Json(MessageResponse::new(
                        "Too many requests. Please try again later.",
                    )),
                )
                    .into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
                response
            }
            ApiError::BadRequest(message)
            | ApiError::Unauthorized(message)
            | ApiError::Forbidden(message)
            | ApiError::NotFound(message)
            | ApiError::Conflict(message) => {
                (status, Json(MessageResponse::new(message))).into_response()
            }
        };

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer realm=\"odyssey-api\", error=\"invalid_token\""),
            );
        }

        response
    }
}
