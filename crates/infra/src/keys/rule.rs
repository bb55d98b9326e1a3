//! Partition rules: how an entity's attributes select its partition.

use std::fmt::Debug;

use adstore_core::{DataAccessError, DataAccessResult, EntityId, RawEntity};

pub trait KeyRule: Debug + Send + Sync {
    fn partition(&self, parent_id: Option<EntityId>, entity: &RawEntity) -> DataAccessResult<String>;
}

/// Partition by the owning company.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompanyPartitionRule;

impl KeyRule for CompanyPartitionRule {
    fn partition(&self, parent_id: Option<EntityId>, entity: &RawEntity) -> DataAccessResult<String> {
        parent_id.map(|id| id.as_simple()).ok_or_else(|| {
            DataAccessError::data_access(format!(
                "entity {} needs a parent company to build its key",
                entity.describe()
            ))
        })
    }
}

/// Partition by the entity's own external id.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityIdPartitionRule;

impl KeyRule for EntityIdPartitionRule {
    fn partition(&self, _parent_id: Option<EntityId>, entity: &RawEntity) -> DataAccessResult<String> {
        entity
            .external_entity_id
            .map(|id| id.as_simple())
            .ok_or_else(|| DataAccessError::data_access("entity has no ExternalEntityId to build its key"))
    }
}
