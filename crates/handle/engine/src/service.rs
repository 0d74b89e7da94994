//! The identifier service collaborator
//!
//! The engine never persists values itself. Everything it decides is
//! requested from an implementation of [`HandleService`], which owns the
//! stored records and answers existence and lookup queries.

use async_trait::async_trait;
use handle_types::{HandleName, ValueRecord};
use serde::Serialize;
use thiserror::Error;

/// Result type for identifier service calls
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Failure categories reported by an identifier service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceErrorKind {
    Internal,
    HandleNotFound,
    HandleAlreadyExists,
    ValuesNotFound,
    ValueAlreadyExists,
    InvalidValue,
    Unavailable,
    InsufficientPermissions,
}

impl ServiceErrorKind {
    /// Numeric response code as used on the resolution protocol
    pub fn code(&self) -> u32 {
        match self {
            ServiceErrorKind::Internal => 2,
            ServiceErrorKind::HandleNotFound => 100,
            ServiceErrorKind::HandleAlreadyExists => 101,
            ServiceErrorKind::ValuesNotFound => 200,
            ServiceErrorKind::ValueAlreadyExists => 201,
            ServiceErrorKind::InvalidValue => 202,
            ServiceErrorKind::Unavailable => 301,
            ServiceErrorKind::InsufficientPermissions => 401,
        }
    }
}

/// Error returned by the identifier service
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} [{}]", .kind.code())]
pub struct ServiceError {
    pub kind: ServiceErrorKind,
    pub message: String,
}

impl ServiceError {
    pub fn new(kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn code(&self) -> u32 {
        self.kind.code()
    }
}

/// Narrow interface of the external identifier service
#[async_trait]
pub trait HandleService: Send + Sync {
    /// Resolve a handle. `None` when the handle does not exist; a non-empty
    /// `indexes` restricts the result to those indexes.
    async fn resolve(
        &self,
        handle: &HandleName,
        indexes: &[u32],
    ) -> ServiceResult<Option<Vec<ValueRecord>>>;

    /// Create a new handle with an initial value set
    async fn create_handle(&self, handle: &HandleName, values: &[ValueRecord]) -> ServiceResult<()>;

    /// Add values at indexes that are currently free
    async fn add_values(&self, handle: &HandleName, values: &[ValueRecord]) -> ServiceResult<()>;

    /// Overwrite values at indexes that are currently taken
    async fn update_values(&self, handle: &HandleName, values: &[ValueRecord]) -> ServiceResult<()>;

    /// Remove the values at the given indexes
    async fn delete_values(&self, handle: &HandleName, indexes: &[u32]) -> ServiceResult<()>;

    /// Remove a handle with all of its values
    async fn delete_handle(&self, handle: &HandleName) -> ServiceResult<()>;
}
