//! Activity error codes and their translation from the data-access taxonomy.

use serde_json::json;
use thiserror::Error;

use adstore_core::DataAccessError;

/// Error code reported back to the caller of an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityErrorId {
    InvalidEntityId,
    InvalidJson,
    InvalidRequest,
    EntityNotFound,
    StaleEntity,
    DataAccess,
    TypeMismatch,
    NotSupported,
}

impl ActivityErrorId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityErrorId::InvalidEntityId => "InvalidEntityId",
            ActivityErrorId::InvalidJson => "InvalidJson",
            ActivityErrorId::InvalidRequest => "InvalidRequest",
            ActivityErrorId::EntityNotFound => "EntityNotFound",
            ActivityErrorId::StaleEntity => "StaleEntity",
            ActivityErrorId::DataAccess => "DataAccess",
            ActivityErrorId::TypeMismatch => "TypeMismatch",
            ActivityErrorId::NotSupported => "NotSupported",
        }
    }
}

impl core::fmt::Display for ActivityErrorId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{error_id}: {message}")]
pub struct ActivityError {
    pub error_id: ActivityErrorId,
    pub message: String,
}

impl ActivityError {
    pub fn new(error_id: ActivityErrorId, message: impl Into<String>) -> Self {
        Self {
            error_id,
            message: message.into(),
        }
    }

    pub fn invalid_entity_id(message: impl Into<String>) -> Self {
        Self::new(ActivityErrorId::InvalidEntityId, message)
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        Self::new(ActivityErrorId::InvalidJson, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ActivityErrorId::InvalidRequest, message)
    }

    /// Translate an error raised while interpreting query values. Argument
    /// failures become `InvalidRequest`; everything else maps as usual.
    pub fn from_query_error(err: DataAccessError) -> Self {
        match err {
            DataAccessError::InvalidArgument(msg) => Self::invalid_request(msg),
            other => Self::from(other),
        }
    }

    /// `{"error": <code>, "message": <text>}`
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "error": self.error_id.as_str(),
            "message": self.message,
        })
    }
}

impl From<DataAccessError> for ActivityError {
    fn from(err: DataAccessError) -> Self {
        match err {
            DataAccessError::DataAccess(msg) => Self::new(ActivityErrorId::DataAccess, msg),
            DataAccessError::EntityNotFound(msg) => Self::new(ActivityErrorId::EntityNotFound, msg),
            DataAccessError::StaleEntity(msg) => Self::new(ActivityErrorId::StaleEntity, msg),
            DataAccessError::TypeMismatch(msg) => Self::new(ActivityErrorId::TypeMismatch, msg),
            DataAccessError::InvalidArgument(msg) => Self::new(ActivityErrorId::InvalidJson, msg),
            DataAccessError::NotSupported(msg) => Self::new(ActivityErrorId::NotSupported, msg),
        }
    }
}
