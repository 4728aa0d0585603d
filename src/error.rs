//! Relay error types with HTTP status code mapping.
//!
//! [`RelayError`] covers the request/response surface around the broadcast
//! core: event submission, job lookups and the object-storage endpoints.
//! The broadcast core itself never returns an error.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::JobId;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1001,
///     "message": "invalid upload: only MP3 files are allowed",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see [`RelayError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                       |
/// |-----------|-----------------|-----------------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request / 413 Too Large   |
/// | 2000–2999 | Not Found       | 404 Not Found                     |
/// | 3000–3999 | Server/Upstream | 500 / 502 / 503                   |
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Uploaded file failed validation.
    #[error("invalid upload: {0}")]
    InvalidUpload(String),

    /// Submitted event body could not be parsed.
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    /// Uploaded file exceeds the configured size limit.
    #[error("file too large; maximum size is {limit} bytes")]
    PayloadTooLarge {
        /// Configured maximum in bytes.
        limit: usize,
    },

    /// The relay has neither subscribers nor cached state for this job.
    #[error("job not found: {0}")]
    JobNotFound(JobId),

    /// Object storage credentials are missing.
    #[error("storage service not configured; set SUPABASE_URL and SUPABASE_SERVICE_KEY")]
    StorageNotConfigured,

    /// The object storage service rejected or failed a request.
    #[error("storage error: {0}")]
    Storage(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidUpload(_) => 1001,
            Self::InvalidEvent(_) => 1002,
            Self::PayloadTooLarge { .. } => 1003,
            Self::JobNotFound(_) => 2001,
            Self::Internal(_) => 3000,
            Self::StorageNotConfigured => 3001,
            Self::Storage(_) => 3002,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidUpload(_) | Self::InvalidEvent(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::JobNotFound(_) => StatusCode::NOT_FOUND,
            Self::StorageNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            Self::Storage(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(error = %self, code = self.error_code(), "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_client_errors() {
        assert_eq!(
            RelayError::InvalidUpload("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RelayError::PayloadTooLarge { limit: 1 }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn missing_credentials_are_service_unavailable() {
        let err = RelayError::StorageNotConfigured;
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.error_code(), 3001);
    }

    #[test]
    fn job_not_found_mentions_job() {
        let err = RelayError::JobNotFound(JobId::from("mix-7"));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert!(err.to_string().contains("mix-7"));
    }

    #[test]
    fn into_response_sets_status() {
        let response = RelayError::Storage("bucket missing".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
