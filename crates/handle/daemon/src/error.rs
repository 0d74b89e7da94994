//! Error types for the handle daemon

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use handle_engine::{CodecError, EngineError};
use handle_types::ReferenceError;
use serde::Serialize;
use thiserror::Error;

/// Daemon-level errors
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Server startup error
    #[error("Server error: {0}")]
    Server(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// API-specific errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body is not JSON
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Rejected by the mutation engine
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl ApiError {
    /// HTTP status and machine-readable code
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::UnsupportedMediaType(_) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "UNSUPPORTED_MEDIA_TYPE")
            }
            ApiError::Engine(err) => match err {
                EngineError::MalformedReference(_) => {
                    (StatusCode::BAD_REQUEST, "MALFORMED_REFERENCE")
                }
                EngineError::ValueSetParse(_) => (StatusCode::BAD_REQUEST, "VALUE_SET_PARSE_ERROR"),
                EngineError::UnknownGenerator(_) => (StatusCode::BAD_REQUEST, "UNKNOWN_GENERATOR"),
                EngineError::PreconditionFailed(_) => {
                    (StatusCode::PRECONDITION_FAILED, "PRECONDITION_FAILED")
                }
                EngineError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                EngineError::InvariantViolation(_) => (StatusCode::CONFLICT, "INVARIANT_VIOLATION"),
                EngineError::NameCollision(_) => (StatusCode::CONFLICT, "NAME_COLLISION"),
                EngineError::Upstream(_) => (StatusCode::INTERNAL_SERVER_ERROR, "UPSTREAM_FAILURE"),
            },
        }
    }
}

impl From<ReferenceError> for ApiError {
    fn from(err: ReferenceError) -> Self {
        ApiError::Engine(err.into())
    }
}

impl From<CodecError> for ApiError {
    fn from(err: CodecError) -> Self {
        ApiError::Engine(err.into())
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type alias for daemon operations
pub type DaemonResult<T> = Result<T, DaemonError>;
