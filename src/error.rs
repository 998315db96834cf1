//! Crate Error Types
//!
//! This module defines the error taxonomy shared by every request handler
//! and service in the backend, plus its mapping to HTTP responses.
//!
//! # Error Categories
//!
//! - `AuthRequired` - missing or invalid bearer credential
//! - `ValidationFailed` - empty or malformed caller input
//! - `NotFound` - a referenced post or mapping does not exist
//! - `Store` - storage failures, split into transient (`Unavailable`,
//!   safe to retry at the caller) and non-retryable (`Rejected`)
//!
//! Errors are rendered as a JSON body `{"detail": "..."}` with the matching
//! status code, so callers always get enough detail to correct their input.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::store::StoreError;

/// Backend error taxonomy
///
/// Every handler returns `Result<_, Error>`; the `IntoResponse` impl below
/// performs the HTTP mapping in one place.
#[derive(Debug, Error)]
pub enum Error {
    /// No credential was presented, or verification failed
    #[error("authentication required: {0}")]
    AuthRequired(String),

    /// Caller input failed validation (oversized text is truncated rather
    /// than rejected, so this mostly covers empty input)
    #[error("validation failed for '{field}': {message}")]
    ValidationFailed {
        /// The field that failed validation
        field: String,
        /// Human-readable error message
        message: String,
    },

    /// A referenced entity does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Storage failure, propagated unmodified from the store client
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Error {
    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    ///
    /// # Status Code Mapping
    ///
    /// - `AuthRequired` - 401 Unauthorized
    /// - `ValidationFailed` - 400 Bad Request
    /// - `NotFound` - 404 Not Found
    /// - `Store(Unavailable)` - 503 Service Unavailable (retryable)
    /// - `Store(Rejected)` - 500 Internal Server Error (not retryable)
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::AuthRequired(_) => StatusCode::UNAUTHORIZED,
            Self::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Store(StoreError::Rejected(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        } else {
            tracing::debug!("request rejected: {}", self);
        }
        let body = Json(serde_json::json!({ "detail": self.to_string() }));
        (status, body).into_response()
    }
}
