//! # Error Handling
//!
//! Application error type and its mapping to HTTP responses. Every error
//! returned from a handler renders as a consistent JSON envelope:
//!
//! ```json
//! {
//!   "error": {
//!     "type": "not_found",
//!     "message": "Meeting not found: abc",
//!     "timestamp": "2025-01-01T12:00:00Z"
//!   }
//! }
//! ```
//!
//! Note that the *live* meeting state never produces `NotFound`: live
//! state is created on demand. `NotFound` only applies to the meeting
//! record store.

use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    /// Server-side failures (lock poisoning, serialization, ...)
    Internal(String),

    /// Client sent invalid or malformed data
    BadRequest(String),

    /// Requested meeting record does not exist
    NotFound(String),

    /// User input failed validation rules
    ValidationError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status, error_type, message) = match self {
            AppError::Internal(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                msg.clone(),
            ),
            AppError::BadRequest(msg) => (
                actix_web::http::StatusCode::BAD_REQUEST,
                "bad_request",
                msg.clone(),
            ),
            AppError::NotFound(msg) => (
                actix_web::http::StatusCode::NOT_FOUND,
                "not_found",
                msg.clone(),
            ),
            AppError::ValidationError(msg) => (
                actix_web::http::StatusCode::BAD_REQUEST,
                "validation_error",
                msg.clone(),
            ),
        };

        HttpResponse::build(status).json(json!({
            "error": {
                "type": error_type,
                "message": message,
                "timestamp": chrono::Utc::now().to_rfc3339()
            }
        }))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON parsing error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_mapping() {
        let not_found = AppError::NotFound("Meeting not found: x".to_string());
        assert_eq!(not_found.error_response().status(), 404);

        let validation = AppError::ValidationError("bad title".to_string());
        assert_eq!(validation.error_response().status(), 400);

        let internal = AppError::Internal("boom".to_string());
        assert_eq!(internal.error_response().status(), 500);
    }

    #[test]
    fn test_display_includes_message() {
        let err = AppError::NotFound("Meeting not found: abc".to_string());
        assert_eq!(err.to_string(), "Not found: Meeting not found: abc");
    }
}
