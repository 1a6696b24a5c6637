//! Error types for dailycut-gen

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::{FailureReason, RejectionReason};
use crate::services::pipeline::GenerationError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Another generation for this owner/day is running (409)
    #[error("A generation is already in flight for this day")]
    AlreadyInFlight,

    /// Daily generation limit reached (429)
    #[error("Daily generation limit reached")]
    LimitReached,

    /// Every tier of a critical capability failed (502)
    #[error("Upstream capability exhausted: {0}")]
    UpstreamExhausted(String),

    /// Audio synthesis exceeded its timeout (504)
    #[error("Audio synthesis timed out after {0}s")]
    SynthesisTimeout(u64),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),

    /// dailycut-common error
    #[error("Common error: {0}")]
    Common(#[from] dailycut_common::Error),
}

impl From<GenerationError> for ApiError {
    fn from(error: GenerationError) -> Self {
        match error {
            GenerationError::Rejected(RejectionReason::AlreadyInFlight) => ApiError::AlreadyInFlight,
            GenerationError::Rejected(RejectionReason::LimitReached) => ApiError::LimitReached,
            GenerationError::Failed(FailureReason::SynthesisTimeout { elapsed_seconds }) => {
                ApiError::SynthesisTimeout(elapsed_seconds)
            }
            GenerationError::Failed(reason) => ApiError::UpstreamExhausted(reason.to_string()),
            GenerationError::Internal(e) => ApiError::Other(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::AlreadyInFlight => (
                StatusCode::CONFLICT,
                "ALREADY_IN_FLIGHT",
                self.to_string(),
            ),
            ApiError::LimitReached => (
                StatusCode::TOO_MANY_REQUESTS,
                "LIMIT_REACHED",
                self.to_string(),
            ),
            ApiError::UpstreamExhausted(msg) => (StatusCode::BAD_GATEWAY, "UPSTREAM_EXHAUSTED", msg),
            ApiError::SynthesisTimeout(elapsed) => (
                StatusCode::GATEWAY_TIMEOUT,
                "SYNTHESIS_TIMEOUT",
                format!("audio synthesis timed out after {}s", elapsed),
            ),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Other(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
            ),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejections_map_to_client_statuses() {
        let conflict: ApiError =
            GenerationError::Rejected(RejectionReason::AlreadyInFlight).into();
        assert!(matches!(conflict, ApiError::AlreadyInFlight));

        let limited: ApiError = GenerationError::Rejected(RejectionReason::LimitReached).into();
        assert!(matches!(limited, ApiError::LimitReached));
    }

    #[test]
    fn test_synthesis_timeout_keeps_elapsed() {
        let error: ApiError =
            GenerationError::Failed(FailureReason::SynthesisTimeout { elapsed_seconds: 42 })
                .into();
        assert!(matches!(error, ApiError::SynthesisTimeout(42)));
    }

    #[test]
    fn test_compose_exhaustion_is_upstream_error() {
        let error: ApiError =
            GenerationError::Failed(FailureReason::ComposeExhausted { attempts: Vec::new() })
                .into();
        assert!(matches!(error, ApiError::UpstreamExhausted(_)));
    }
}
