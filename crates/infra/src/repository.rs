//! Save/update orchestration across the entity, index and blob stores.
//!
//! ```text
//! save_entity
//!   ↓
//! 1. index: current key for (account, id)?
//!   ↓ none                         ↓ some
//! 2. build new key (v0)        2. load stored entity, merge under the filter,
//!   ↓                             build updated key (v+1, fresh row)
//! 3. write the row (entity or blob store)
//!   ↓
//! 4. write the index entry; on failure remove the row from step 3
//! ```
//!
//! The index is the only way a row is ever resolved, so a row written in step
//! 3 whose index write failed is removed before the error reaches the caller.

use chrono::Utc;

use adstore_core::{
    BlobEntity, DataAccessError, DataAccessResult, EntityCategory, EntityFilter, EntityId, RawEntity,
    StorageKey, TableKey, group_associations,
};

use crate::config::StoreConfig;
use crate::context::RequestContext;
use crate::store::{BlobStore, EntityStore, IndexStore, StorageKeyFactory};

pub struct EntityRepository<E, I, K, B> {
    config: StoreConfig,
    entity_store: E,
    index_store: I,
    key_factory: K,
    blob_store: B,
}

impl<E, I, K, B> EntityRepository<E, I, K, B>
where
    E: EntityStore,
    I: IndexStore,
    K: StorageKeyFactory,
    B: BlobStore,
{
    pub fn new(config: StoreConfig, entity_store: E, index_store: I, key_factory: K, blob_store: B) -> Self {
        Self {
            config,
            entity_store,
            index_store,
            key_factory,
            blob_store,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn entity_store(&self) -> &E {
        &self.entity_store
    }

    pub fn index_store(&self) -> &I {
        &self.index_store
    }

    /// Save `entity` as a new entity or as the next version of an existing
    /// one, returning what was persisted (with its new key).
    pub fn save_entity(&self, context: &RequestContext, entity: RawEntity) -> DataAccessResult<RawEntity> {
        let id = entity.id()?;
        entity.category()?;
        let account = context.storage_account_name.as_str();

        match self.index_store.get_storage_key(id, account)? {
            None => self.save_new(context, entity),
            Some(existing) => self.save_update(context, entity, existing),
        }
    }

    fn save_new(&self, context: &RequestContext, mut entity: RawEntity) -> DataAccessResult<RawEntity> {
        let now = Utc::now();
        entity.create_date.get_or_insert(now);
        entity.last_modified_date = Some(now);
        if context.user_id.is_some() {
            entity.last_modified_user = context.user_id.clone();
        }
        entity.schema_version = self.config.schema_version;

        let factory = self.key_factory_for(entity.category()?);
        let key = factory.build_new_storage_key(&context.storage_account_name, context.parent_entity_id, &entity)?;
        entity.local_version = key.local_version();
        entity.key = Some(key);

        tracing::info!(entity = %entity.describe(), "saving new entity");
        self.commit(context, entity, false)
    }

    fn save_update(
        &self,
        context: &RequestContext,
        incoming: RawEntity,
        existing: StorageKey,
    ) -> DataAccessResult<RawEntity> {
        let category = incoming.category()?;
        let factory = self.key_factory_for(category);
        let stored = self.load_by_key(context, &existing)?.ok_or_else(|| {
            DataAccessError::not_found(format!("entity {} has an index entry but no row", incoming.describe()))
        })?;

        let mut merged = merge_entity(stored, incoming, &context.filter)?;
        merged.last_modified_date = Some(Utc::now());
        if context.user_id.is_some() {
            merged.last_modified_user = context.user_id.clone();
        }
        merged.schema_version = self.config.schema_version;

        let key = factory.build_updated_storage_key(&existing, &merged)?;
        merged.local_version = key.local_version();
        merged.key = Some(key);

        tracing::info!(entity = %merged.describe(), version = merged.local_version, "saving entity update");
        self.commit(context, merged, true)
    }

    fn commit(&self, context: &RequestContext, entity: RawEntity, is_update: bool) -> DataAccessResult<RawEntity> {
        let key = entity
            .key
            .clone()
            .ok_or_else(|| DataAccessError::data_access(format!("entity {} has no storage key", entity.describe())))?;

        self.write_row(context, &entity, is_update)?;

        if let Err(err) = self.index_store.save_entity(&entity, is_update) {
            tracing::warn!(entity = %entity.describe(), error = %err, "index save failed; removing orphaned row");
            if let Err(cleanup) = self.remove_row(&key) {
                tracing::error!(entity = %entity.describe(), error = %cleanup, "orphan cleanup failed");
            }
            if err.is_stale() {
                return Err(err);
            }
            return Err(DataAccessError::data_access(format!(
                "index save failed for entity {}: {err}",
                entity.describe()
            )));
        }
        Ok(entity)
    }

    fn key_factory_for(&self, category: EntityCategory) -> &dyn StorageKeyFactory {
        match category {
            EntityCategory::Blob => self.blob_store.storage_key_factory(),
            _ => &self.key_factory,
        }
    }

    fn write_row(&self, context: &RequestContext, entity: &RawEntity, is_update: bool) -> DataAccessResult<()> {
        match entity.key {
            Some(StorageKey::Blob(_)) => self.blob_store.save_blob(entity),
            _ => {
                if self.entity_store.save_entity(context, entity, is_update)? {
                    Ok(())
                } else {
                    Err(DataAccessError::data_access(format!(
                        "entity store declined to write entity {}",
                        entity.describe()
                    )))
                }
            }
        }
    }

    fn remove_row(&self, key: &StorageKey) -> DataAccessResult<()> {
        match key {
            StorageKey::Blob(_) => self.blob_store.remove_blob(key),
            StorageKey::Table(_) => self.entity_store.remove_entity(key),
        }
    }

    fn load_by_key(&self, context: &RequestContext, key: &StorageKey) -> DataAccessResult<Option<RawEntity>> {
        match key {
            StorageKey::Blob(_) => Ok(self.blob_store.get_blob_by_key(key)?.map(BlobEntity::into_raw)),
            StorageKey::Table(_) => self.entity_store.get_entity_by_key(context, key),
        }
    }

    /// Current version of an entity.
    pub fn get_entity(&self, context: &RequestContext, id: EntityId) -> DataAccessResult<RawEntity> {
        let key = self
            .index_store
            .get_storage_key(id, &context.storage_account_name)?
            .ok_or_else(|| DataAccessError::not_found(format!("no current key for entity {id}")))?;
        self.load_by_key(context, &key)?
            .ok_or_else(|| DataAccessError::not_found(format!("entity {id} has an index entry but no row")))
    }

    /// A specific historical version of an entity.
    pub fn get_entity_version(&self, context: &RequestContext, id: EntityId, version: i32) -> DataAccessResult<RawEntity> {
        let summary = self
            .index_store
            .get_entity(id, &context.storage_account_name, Some(version))?
            .ok_or_else(|| DataAccessError::not_found(format!("entity {id} has no version {version}")))?;
        let key = summary
            .key
            .ok_or_else(|| DataAccessError::data_access(format!("index entry for {id} has no key")))?;
        self.load_by_key(context, &key)?
            .ok_or_else(|| DataAccessError::not_found(format!("row for entity {id} version {version} is missing")))
    }

    /// Active entities of a category, optionally narrowed to one external type.
    pub fn get_entities_by_category(
        &self,
        context: &RequestContext,
        category: EntityCategory,
        external_type: Option<&str>,
    ) -> DataAccessResult<Vec<RawEntity>> {
        let summaries = self
            .index_store
            .get_entity_info_by_category(&context.storage_account_name, category)?;

        let mut entities = Vec::with_capacity(summaries.len());
        for summary in summaries {
            if external_type.is_some() && summary.external_type.as_deref() != external_type {
                continue;
            }
            let Some(key) = summary.key.as_ref() else {
                continue;
            };
            match self.load_by_key(context, key)? {
                Some(entity) => entities.push(entity),
                None => tracing::warn!(entity = %summary.describe(), "indexed entity has no row; skipping"),
            }
        }
        Ok(entities)
    }

    pub fn set_entity_status(&self, context: &RequestContext, ids: &[EntityId], active: bool) -> DataAccessResult<()> {
        self.index_store
            .set_entity_status(&context.storage_account_name, ids, active)
    }

    /// User entities with `user_id` in the request's company table.
    pub fn get_user_entities(&self, context: &RequestContext, user_id: &str) -> DataAccessResult<Vec<RawEntity>> {
        let company = context
            .parent_entity_id
            .ok_or_else(|| DataAccessError::invalid_argument("user lookup needs a parent company"))?;
        let key = StorageKey::Table(TableKey::partial(
            context.storage_account_name.clone(),
            self.config.company_table_name(company),
        ));
        self.entity_store.get_user_entities_by_user_id(user_id, &key)
    }

    /// Provision the table for a new company.
    pub fn setup_new_company(&self, company_id: EntityId) -> DataAccessResult<StorageKey> {
        self.entity_store
            .setup_new_company(&self.config.company_table_name(company_id))
    }

    pub fn get_blob(&self, context: &RequestContext, id: EntityId) -> DataAccessResult<BlobEntity> {
        BlobEntity::try_from(self.get_entity(context, id)?)
    }

    pub fn save_blob(&self, context: &RequestContext, blob: BlobEntity) -> DataAccessResult<BlobEntity> {
        BlobEntity::try_from(self.save_entity(context, blob.into_raw())?)
    }
}

/// Entity operations the request handlers depend on.
pub trait Repository: Send + Sync {
    fn save_entity(&self, context: &RequestContext, entity: RawEntity) -> DataAccessResult<RawEntity>;

    fn get_entity(&self, context: &RequestContext, id: EntityId) -> DataAccessResult<RawEntity>;

    fn get_entity_version(&self, context: &RequestContext, id: EntityId, version: i32) -> DataAccessResult<RawEntity>;

    fn get_entities_by_category(
        &self,
        context: &RequestContext,
        category: EntityCategory,
        external_type: Option<&str>,
    ) -> DataAccessResult<Vec<RawEntity>>;

    fn set_entity_status(&self, context: &RequestContext, ids: &[EntityId], active: bool) -> DataAccessResult<()>;
}

impl<E, I, K, B> Repository for EntityRepository<E, I, K, B>
where
    E: EntityStore,
    I: IndexStore,
    K: StorageKeyFactory,
    B: BlobStore,
{
    fn save_entity(&self, context: &RequestContext, entity: RawEntity) -> DataAccessResult<RawEntity> {
        EntityRepository::save_entity(self, context, entity)
    }

    fn get_entity(&self, context: &RequestContext, id: EntityId) -> DataAccessResult<RawEntity> {
        EntityRepository::get_entity(self, context, id)
    }

    fn get_entity_version(&self, context: &RequestContext, id: EntityId, version: i32) -> DataAccessResult<RawEntity> {
        EntityRepository::get_entity_version(self, context, id, version)
    }

    fn get_entities_by_category(
        &self,
        context: &RequestContext,
        category: EntityCategory,
        external_type: Option<&str>,
    ) -> DataAccessResult<Vec<RawEntity>> {
        EntityRepository::get_entities_by_category(self, context, category, external_type)
    }

    fn set_entity_status(&self, context: &RequestContext, ids: &[EntityId], active: bool) -> DataAccessResult<()> {
        EntityRepository::set_entity_status(self, context, ids, active)
    }
}

impl<R> Repository for std::sync::Arc<R>
where
    R: Repository + ?Sized,
{
    fn save_entity(&self, context: &RequestContext, entity: RawEntity) -> DataAccessResult<RawEntity> {
        (**self).save_entity(context, entity)
    }

    fn get_entity(&self, context: &RequestContext, id: EntityId) -> DataAccessResult<RawEntity> {
        (**self).get_entity(context, id)
    }

    fn get_entity_version(&self, context: &RequestContext, id: EntityId, version: i32) -> DataAccessResult<RawEntity> {
        (**self).get_entity_version(context, id, version)
    }

    fn get_entities_by_category(
        &self,
        context: &RequestContext,
        category: EntityCategory,
        external_type: Option<&str>,
    ) -> DataAccessResult<Vec<RawEntity>> {
        (**self).get_entities_by_category(context, category, external_type)
    }

    fn set_entity_status(&self, context: &RequestContext, ids: &[EntityId], active: bool) -> DataAccessResult<()> {
        (**self).set_entity_status(context, ids, active)
    }
}

/// Merge an update into the stored entity.
///
/// Interface fields are taken from `incoming` when set; `CreateDate` stays.
/// Properties of tiers the filter includes are replaced or added, the rest
/// keep their stored values. Association groups are replaced group-wise when
/// the filter includes associations.
pub fn merge_entity(stored: RawEntity, incoming: RawEntity, filter: &EntityFilter) -> DataAccessResult<RawEntity> {
    if incoming.entity_category.is_some() && incoming.entity_category != stored.entity_category {
        return Err(DataAccessError::invalid_argument(format!(
            "cannot change the category of entity {} to {}",
            stored.describe(),
            incoming.describe()
        )));
    }

    let mut merged = stored;
    if incoming.external_name.is_some() {
        merged.external_name = incoming.external_name;
    }
    if incoming.external_type.is_some() {
        merged.external_type = incoming.external_type;
    }

    for property in incoming.properties {
        if !filter.includes(property.filter) {
            continue;
        }
        match merged.properties.iter_mut().find(|p| p.name == property.name) {
            Some(existing) if existing.filter != property.filter => {
                return Err(DataAccessError::invalid_argument(format!(
                    "property '{}' is stored as {} but was sent as {}",
                    property.name, existing.filter, property.filter
                )));
            }
            Some(existing) => *existing = property,
            None => merged.properties.push(property),
        }
    }

    if filter.include_associations() {
        for (group, members) in group_associations(&incoming.associations) {
            merged.associations.retain(|a| !group.matches(a));
            merged.associations.extend(members.into_iter().cloned());
        }
    }
    Ok(merged)
}
