//! Data-access error model.

use thiserror::Error;

/// Result type used across the persistence layer.
pub type DataAccessResult<T> = Result<T, DataAccessError>;

/// Data-access error.
///
/// One taxonomy is shared by the entity model, the serializers and the store
/// orchestration so callers (activities) can translate failures into error codes
/// without knowing which layer raised them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DataAccessError {
    /// Generic backend or integrity failure (malformed key, malformed row, ...).
    #[error("data access failed: {0}")]
    DataAccess(String),

    /// The external id has no current key, or the key resolves to no row.
    #[error("entity not found: {0}")]
    EntityNotFound(String),

    /// A conditional write was rejected because the stored version moved on.
    #[error("stale entity: {0}")]
    StaleEntity(String),

    /// A typed wrapper was built over an entity of another category.
    #[error("entity type mismatch: {0}")]
    TypeMismatch(String),

    /// Malformed or duplicate input, value coercion failure, invalid update.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation is not available for this kind of storage key.
    #[error("not supported: {0}")]
    NotSupported(String),
}

impl DataAccessError {
    pub fn data_access(msg: impl Into<String>) -> Self {
        Self::DataAccess(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::EntityNotFound(msg.into())
    }

    pub fn stale(msg: impl Into<String>) -> Self {
        Self::StaleEntity(msg.into())
    }

    pub fn type_mismatch(msg: impl Into<String>) -> Self {
        Self::TypeMismatch(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn not_supported(msg: impl Into<String>) -> Self {
        Self::NotSupported(msg.into())
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Self::StaleEntity(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::EntityNotFound(_))
    }
}
