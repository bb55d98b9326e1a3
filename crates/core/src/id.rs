//! Entity identifiers.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DataAccessError;

/// Opaque identifier of an entity.
///
/// Comparisons are by value. The canonical text form is the 36-character
/// lowercase hyphenated uuid.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Create a new identifier.
    ///
    /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
    /// for determinism.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Integer ids occupy the trailing bytes of an otherwise-zero uuid.
    pub fn from_i32(value: i32) -> Self {
        Self::from_i64(i64::from(value))
    }

    pub fn from_i64(value: i64) -> Self {
        let mut bytes = [0u8; 16];
        bytes[8..].copy_from_slice(&value.to_be_bytes());
        Self(Uuid::from_bytes(bytes))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// 32 lowercase hex digits, no hyphens. Used where backends restrict names.
    pub fn as_simple(&self) -> String {
        self.0.simple().to_string()
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for EntityId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

impl From<Uuid> for EntityId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<EntityId> for Uuid {
    fn from(value: EntityId) -> Self {
        value.0
    }
}

impl From<i32> for EntityId {
    fn from(value: i32) -> Self {
        Self::from_i32(value)
    }
}

impl FromStr for EntityId {
    type Err = DataAccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = Uuid::from_str(s.trim())
            .map_err(|e| DataAccessError::invalid_argument(format!("EntityId '{s}': {e}")))?;
        Ok(Self(uuid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_ids_are_value_equal() {
        assert_eq!(EntityId::from_i32(42), EntityId::from(42));
        assert_ne!(EntityId::from_i32(42), EntityId::from_i32(43));
        assert_eq!(EntityId::from_i32(7), EntityId::from_i64(7));
    }

    #[test]
    fn canonical_text_is_fixed_width() {
        let id = EntityId::from_i32(1);
        let text = id.to_string();
        assert_eq!(text.len(), 36);
        assert_eq!(text, "00000000-0000-0000-0000-000000000001");
        assert_eq!(text.parse::<EntityId>().unwrap(), id);
    }

    #[test]
    fn parses_braced_and_simple_forms() {
        let id = EntityId::new();
        let braced = format!("{{{}}}", id);
        assert_eq!(braced.parse::<EntityId>().unwrap(), id);
        assert_eq!(id.as_simple().parse::<EntityId>().unwrap(), id);
    }

    #[test]
    fn rejects_garbage() {
        let err = "not-an-id".parse::<EntityId>().unwrap_err();
        assert!(matches!(err, DataAccessError::InvalidArgument(_)));
    }
}
