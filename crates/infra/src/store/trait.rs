//! Store contracts consumed by the repository.

use std::sync::Arc;

use adstore_core::{BlobEntity, DataAccessResult, EntityCategory, EntityId, RawEntity, StorageKey};

use crate::context::RequestContext;

/// Versioned entity rows.
///
/// Each saved version is a separate row; the index decides which row is
/// current, so rows may outlive the version that pointed at them.
pub trait EntityStore: Send + Sync {
    fn get_entity_by_key(&self, context: &RequestContext, key: &StorageKey) -> DataAccessResult<Option<RawEntity>>;

    /// Write the row addressed by `entity.key`. Writing over an existing row
    /// fails with `StaleEntity`.
    fn save_entity(&self, context: &RequestContext, entity: &RawEntity, is_update: bool) -> DataAccessResult<bool>;

    fn remove_entity(&self, key: &StorageKey) -> DataAccessResult<()>;

    /// User entities in the table `key` addresses whose `UserId` is `user_id`.
    fn get_user_entities_by_user_id(&self, user_id: &str, key: &StorageKey) -> DataAccessResult<Vec<RawEntity>>;

    /// Provision a company table and return its partial key.
    fn setup_new_company(&self, table_name: &str) -> DataAccessResult<StorageKey>;
}

/// The authority on which storage key is current for an external id.
pub trait IndexStore: Send + Sync {
    fn get_storage_key(&self, id: EntityId, storage_account_name: &str) -> DataAccessResult<Option<StorageKey>>;

    /// Summary entity (interface fields and key) for the current version, or
    /// for `version` when given.
    fn get_entity(
        &self,
        id: EntityId,
        storage_account_name: &str,
        version: Option<i32>,
    ) -> DataAccessResult<Option<RawEntity>>;

    /// Record `entity.key` as current. An update requires the stored version
    /// to be the one right before the new key's; an insert requires no entry.
    fn save_entity(&self, entity: &RawEntity, is_update: bool) -> DataAccessResult<()>;

    /// Summaries of the active entities of a category.
    fn get_entity_info_by_category(
        &self,
        storage_account_name: &str,
        category: EntityCategory,
    ) -> DataAccessResult<Vec<RawEntity>>;

    fn set_entity_status(&self, storage_account_name: &str, ids: &[EntityId], active: bool) -> DataAccessResult<()>;
}

pub trait StorageKeyFactory: Send + Sync {
    fn build_new_storage_key(
        &self,
        storage_account_name: &str,
        parent_id: Option<EntityId>,
        entity: &RawEntity,
    ) -> DataAccessResult<StorageKey>;

    /// Key for the next version of the entity stored under `existing`.
    fn build_updated_storage_key(&self, existing: &StorageKey, entity: &RawEntity) -> DataAccessResult<StorageKey>;
}

/// Blob content, immutable by identity.
pub trait BlobStore: Send + Sync {
    fn get_blob_by_key(&self, key: &StorageKey) -> DataAccessResult<Option<BlobEntity>>;

    fn save_blob(&self, blob: &RawEntity) -> DataAccessResult<()>;

    fn remove_blob(&self, key: &StorageKey) -> DataAccessResult<()>;

    fn storage_key_factory(&self) -> &dyn StorageKeyFactory;
}

impl<S> EntityStore for Arc<S>
where
    S: EntityStore + ?Sized,
{
    fn get_entity_by_key(&self, context: &RequestContext, key: &StorageKey) -> DataAccessResult<Option<RawEntity>> {
        (**self).get_entity_by_key(context, key)
    }

    fn save_entity(&self, context: &RequestContext, entity: &RawEntity, is_update: bool) -> DataAccessResult<bool> {
        (**self).save_entity(context, entity, is_update)
    }

    fn remove_entity(&self, key: &StorageKey) -> DataAccessResult<()> {
        (**self).remove_entity(key)
    }

    fn get_user_entities_by_user_id(&self, user_id: &str, key: &StorageKey) -> DataAccessResult<Vec<RawEntity>> {
        (**self).get_user_entities_by_user_id(user_id, key)
    }

    fn setup_new_company(&self, table_name: &str) -> DataAccessResult<StorageKey> {
        (**self).setup_new_company(table_name)
    }
}

impl<S> IndexStore for Arc<S>
where
    S: IndexStore + ?Sized,
{
    fn get_storage_key(&self, id: EntityId, storage_account_name: &str) -> DataAccessResult<Option<StorageKey>> {
        (**self).get_storage_key(id, storage_account_name)
    }

    fn get_entity(
        &self,
        id: EntityId,
        storage_account_name: &str,
        version: Option<i32>,
    ) -> DataAccessResult<Option<RawEntity>> {
        (**self).get_entity(id, storage_account_name, version)
    }

    fn save_entity(&self, entity: &RawEntity, is_update: bool) -> DataAccessResult<()> {
        (**self).save_entity(entity, is_update)
    }

    fn get_entity_info_by_category(
        &self,
        storage_account_name: &str,
        category: EntityCategory,
    ) -> DataAccessResult<Vec<RawEntity>> {
        (**self).get_entity_info_by_category(storage_account_name, category)
    }

    fn set_entity_status(&self, storage_account_name: &str, ids: &[EntityId], active: bool) -> DataAccessResult<()> {
        (**self).set_entity_status(storage_account_name, ids, active)
    }
}

impl<S> StorageKeyFactory for Arc<S>
where
    S: StorageKeyFactory + ?Sized,
{
    fn build_new_storage_key(
        &self,
        storage_account_name: &str,
        parent_id: Option<EntityId>,
        entity: &RawEntity,
    ) -> DataAccessResult<StorageKey> {
        (**self).build_new_storage_key(storage_account_name, parent_id, entity)
    }

    fn build_updated_storage_key(&self, existing: &StorageKey, entity: &RawEntity) -> DataAccessResult<StorageKey> {
        (**self).build_updated_storage_key(existing, entity)
    }
}

impl<S> BlobStore for Arc<S>
where
    S: BlobStore + ?Sized,
{
    fn get_blob_by_key(&self, key: &StorageKey) -> DataAccessResult<Option<BlobEntity>> {
        (**self).get_blob_by_key(key)
    }

    fn save_blob(&self, blob: &RawEntity) -> DataAccessResult<()> {
        (**self).save_blob(blob)
    }

    fn remove_blob(&self, key: &StorageKey) -> DataAccessResult<()> {
        (**self).remove_blob(key)
    }

    fn storage_key_factory(&self) -> &dyn StorageKeyFactory {
        (**self).storage_key_factory()
    }
}
