//! Engine error types

use crate::codec::CodecError;
use crate::service::ServiceError;
use handle_types::ReferenceError;
use thiserror::Error;

/// Errors raised while planning or applying a mutation
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("Malformed reference: {0}")]
    MalformedReference(String),

    #[error("Value set parse error: {0}")]
    ValueSetParse(#[from] CodecError),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Unknown name generator: {0}")]
    UnknownGenerator(String),

    #[error("Name collision: {0}")]
    NameCollision(String),

    #[error("Upstream failure: {0}")]
    Upstream(#[from] ServiceError),
}

impl From<ReferenceError> for EngineError {
    fn from(err: ReferenceError) -> Self {
        EngineError::MalformedReference(err.to_string())
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
