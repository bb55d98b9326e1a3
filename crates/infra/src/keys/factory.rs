//! Key factories for table rows and blobs.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use adstore_core::{
    BlobKey, DataAccessError, DataAccessResult, EntityCategory, EntityId, RawEntity, StorageKey, TableKey,
};

use crate::config::StoreConfig;
use crate::keys::rule::{CompanyPartitionRule, EntityIdPartitionRule, KeyRule};
use crate::store::StorageKeyFactory;

/// Keys for table-style storage: one table per company, partition chosen by
/// the category's [`KeyRule`], a fresh row id per version.
#[derive(Debug, Clone)]
pub struct TableKeyFactory {
    config: StoreConfig,
    rules: HashMap<EntityCategory, Arc<dyn KeyRule>>,
}

impl TableKeyFactory {
    /// Factory with the default rule set.
    pub fn new(config: StoreConfig) -> Self {
        let company: Arc<dyn KeyRule> = Arc::new(CompanyPartitionRule);
        let mut rules: HashMap<EntityCategory, Arc<dyn KeyRule>> = HashMap::new();
        rules.insert(EntityCategory::Company, Arc::new(EntityIdPartitionRule));
        for category in [
            EntityCategory::Campaign,
            EntityCategory::Creative,
            EntityCategory::Partner,
            EntityCategory::User,
        ] {
            rules.insert(category, company.clone());
        }
        Self { config, rules }
    }

    /// Factory with no rules; every category must be registered.
    pub fn without_rules(config: StoreConfig) -> Self {
        Self {
            config,
            rules: HashMap::new(),
        }
    }

    pub fn with_rule(mut self, category: EntityCategory, rule: impl KeyRule + 'static) -> Self {
        self.rules.insert(category, Arc::new(rule));
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// A company owns its table; everything else lives in its parent's.
    fn table_name(&self, category: EntityCategory, parent_id: Option<EntityId>, entity: &RawEntity) -> DataAccessResult<String> {
        let owner = match category {
            EntityCategory::Company => entity.external_entity_id,
            _ => parent_id,
        };
        owner
            .map(|id| self.config.company_table_name(id))
            .ok_or_else(|| DataAccessError::data_access(format!("no company table for entity {}", entity.describe())))
    }
}

fn fresh_row_id() -> String {
    Uuid::new_v4().simple().to_string()
}

impl StorageKeyFactory for TableKeyFactory {
    fn build_new_storage_key(
        &self,
        storage_account_name: &str,
        parent_id: Option<EntityId>,
        entity: &RawEntity,
    ) -> DataAccessResult<StorageKey> {
        let category = entity
            .entity_category
            .ok_or_else(|| DataAccessError::data_access("entity has no EntityCategory to build its key"))?;
        if entity.external_entity_id.is_none() {
            return Err(DataAccessError::data_access("entity has no ExternalEntityId to build its key"));
        }
        let rule = self
            .rules
            .get(&category)
            .ok_or_else(|| DataAccessError::data_access(format!("no key rule configured for category {category}")))?;

        let key = TableKey {
            storage_account_name: storage_account_name.to_string(),
            table_name: self.table_name(category, parent_id, entity)?,
            partition: Some(rule.partition(parent_id, entity)?),
            row_id: Some(fresh_row_id()),
            local_version: 0,
            version_timestamp: None,
        };
        tracing::debug!(entity = %entity.describe(), table = %key.table_name, "built new table key");
        Ok(StorageKey::Table(key))
    }

    fn build_updated_storage_key(&self, existing: &StorageKey, entity: &RawEntity) -> DataAccessResult<StorageKey> {
        let StorageKey::Table(existing) = existing else {
            return Err(DataAccessError::data_access(format!(
                "entity {} is not stored under a table key",
                entity.describe()
            )));
        };
        if existing.is_partial() {
            return Err(DataAccessError::data_access(format!(
                "cannot update entity {} from a partial key",
                entity.describe()
            )));
        }
        let local_version = existing.local_version.checked_add(1).ok_or_else(|| {
            DataAccessError::data_access(format!(
                "entity {} has reached the last version",
                entity.describe()
            ))
        })?;
        Ok(StorageKey::Table(TableKey {
            row_id: Some(fresh_row_id()),
            local_version,
            version_timestamp: None,
            ..existing.clone()
        }))
    }
}

/// Keys for blob storage: one container per company, blob id = entity id.
#[derive(Debug, Clone)]
pub struct BlobKeyFactory {
    config: StoreConfig,
}

impl BlobKeyFactory {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }
}

impl StorageKeyFactory for BlobKeyFactory {
    fn build_new_storage_key(
        &self,
        storage_account_name: &str,
        parent_id: Option<EntityId>,
        entity: &RawEntity,
    ) -> DataAccessResult<StorageKey> {
        let id = entity
            .external_entity_id
            .ok_or_else(|| DataAccessError::data_access("blob has no ExternalEntityId to build its key"))?;
        let owner = parent_id.ok_or_else(|| {
            DataAccessError::data_access(format!("blob {} needs a parent company", entity.describe()))
        })?;
        Ok(StorageKey::Blob(BlobKey {
            storage_account_name: storage_account_name.to_string(),
            container_name: self.config.blob_container_name(owner),
            blob_id: id.as_simple(),
            local_version: 0,
            version_timestamp: None,
        }))
    }

    fn build_updated_storage_key(&self, _existing: &StorageKey, entity: &RawEntity) -> DataAccessResult<StorageKey> {
        Err(DataAccessError::not_supported(format!(
            "blob {} cannot be updated; save a new blob instead",
            entity.describe()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn campaign() -> RawEntity {
        RawEntity::new(EntityId::from_i32(7), EntityCategory::Campaign)
    }

    #[test]
    fn new_key_is_version_zero_in_parent_table() {
        let factory = TableKeyFactory::new(StoreConfig::default());
        let parent = EntityId::from_i32(1);
        let key = factory.build_new_storage_key("acct", Some(parent), &campaign()).unwrap();
        let table = key.as_table().unwrap();
        assert_eq!(table.local_version, 0);
        assert_eq!(table.table_name, StoreConfig::default().company_table_name(parent));
        assert_eq!(table.partition.as_deref(), Some(parent.as_simple().as_str()));
        assert_eq!(table.row_id.as_ref().map(String::len), Some(32));
    }

    #[test]
    fn company_owns_its_table() {
        let factory = TableKeyFactory::new(StoreConfig::default());
        let company = RawEntity::new(EntityId::from_i32(3), EntityCategory::Company);
        let key = factory.build_new_storage_key("acct", None, &company).unwrap();
        let table = key.as_table().unwrap();
        assert_eq!(table.table_name, StoreConfig::default().company_table_name(EntityId::from_i32(3)));
        assert_eq!(table.partition.as_deref(), Some(EntityId::from_i32(3).as_simple().as_str()));
    }

    #[test]
    fn missing_rule_is_a_data_access_error() {
        let factory = TableKeyFactory::without_rules(StoreConfig::default());
        let err = factory
            .build_new_storage_key("acct", Some(EntityId::from_i32(1)), &campaign())
            .unwrap_err();
        assert!(matches!(err, DataAccessError::DataAccess(_)));
    }

    #[test]
    fn updated_key_bumps_version_and_row() {
        let factory = TableKeyFactory::new(StoreConfig::default());
        let mut original = factory
            .build_new_storage_key("acct", Some(EntityId::from_i32(1)), &campaign())
            .unwrap();
        original.set_version_timestamp(Some(chrono::Utc::now()));

        let updated = factory.build_updated_storage_key(&original, &campaign()).unwrap();
        let (old, new) = (original.as_table().unwrap(), updated.as_table().unwrap());
        assert_eq!(new.local_version, old.local_version + 1);
        assert_ne!(new.row_id, old.row_id);
        assert_eq!(new.partition, old.partition);
        assert_eq!(new.table_name, old.table_name);
        assert!(new.version_timestamp.is_none());
    }

    #[test]
    fn last_version_cannot_be_bumped() {
        let factory = TableKeyFactory::new(StoreConfig::default());
        let mut last = TableKey::partial("acct", "company1");
        last.partition = Some("p".into());
        last.row_id = Some("r".into());
        last.local_version = i32::MAX;
        assert!(matches!(
            factory.build_updated_storage_key(&StorageKey::Table(last), &campaign()),
            Err(DataAccessError::DataAccess(_))
        ));
    }

    #[test]
    fn partial_keys_cannot_be_updated() {
        let factory = TableKeyFactory::new(StoreConfig::default());
        let partial = StorageKey::Table(TableKey::partial("acct", "company1"));
        assert!(matches!(
            factory.build_updated_storage_key(&partial, &campaign()),
            Err(DataAccessError::DataAccess(_))
        ));
    }

    #[test]
    fn blob_keys_cannot_be_updated() {
        let factory = BlobKeyFactory::new(StoreConfig::default());
        let blob = RawEntity::new(EntityId::from_i32(5), EntityCategory::Blob);
        let key = factory
            .build_new_storage_key("acct", Some(EntityId::from_i32(1)), &blob)
            .unwrap();
        assert_eq!(key.as_blob().unwrap().blob_id, EntityId::from_i32(5).as_simple());
        assert!(matches!(
            factory.build_updated_storage_key(&key, &blob),
            Err(DataAccessError::NotSupported(_))
        ));
    }
}
