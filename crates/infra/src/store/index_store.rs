//! In-memory index: current key, key history and active flag per entity.

use std::collections::HashMap;
use std::sync::RwLock;

use adstore_core::{
    DataAccessError, DataAccessResult, EntityCategory, EntityId, ExpectedVersion, RawEntity, StorageKey,
};

use super::r#trait::IndexStore;

/// One indexed version: the key as persisted JSON and the interface fields.
#[derive(Debug, Clone)]
struct IndexRecord {
    key_json: String,
    summary: RawEntity,
}

#[derive(Debug, Clone)]
struct IndexEntry {
    history: Vec<IndexRecord>,
    active: bool,
}

impl IndexEntry {
    fn current(&self) -> Option<&IndexRecord> {
        self.history.last()
    }
}

type IndexAddress = (String, EntityId);

fn lock_poisoned<T>(_: T) -> DataAccessError {
    DataAccessError::data_access("lock poisoned")
}

/// In-memory index: the current key per `(account, external id)` plus the
/// keys of earlier versions.
#[derive(Debug, Default)]
pub struct InMemoryIndexStore {
    entries: RwLock<HashMap<IndexAddress, IndexEntry>>,
}

impl InMemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn summary_of(record: &IndexRecord) -> DataAccessResult<RawEntity> {
        let mut summary = record.summary.clone();
        summary.key = Some(StorageKey::from_json(&record.key_json)?);
        Ok(summary)
    }
}

impl IndexStore for InMemoryIndexStore {
    fn get_storage_key(&self, id: EntityId, storage_account_name: &str) -> DataAccessResult<Option<StorageKey>> {
        let entries = self.entries.read().map_err(lock_poisoned)?;
        entries
            .get(&(storage_account_name.to_string(), id))
            .and_then(IndexEntry::current)
            .map(|record| StorageKey::from_json(&record.key_json))
            .transpose()
    }

    fn get_entity(
        &self,
        id: EntityId,
        storage_account_name: &str,
        version: Option<i32>,
    ) -> DataAccessResult<Option<RawEntity>> {
        let entries = self.entries.read().map_err(lock_poisoned)?;
        let Some(entry) = entries.get(&(storage_account_name.to_string(), id)) else {
            return Ok(None);
        };
        let record = match version {
            None => entry.current(),
            Some(v) => entry.history.iter().find(|r| r.summary.local_version == v),
        };
        record.map(Self::summary_of).transpose()
    }

    fn save_entity(&self, entity: &RawEntity, is_update: bool) -> DataAccessResult<()> {
        let key = entity.key.as_ref().ok_or_else(|| {
            DataAccessError::data_access(format!("entity {} has no storage key to index", entity.describe()))
        })?;
        let id = entity
            .external_entity_id
            .ok_or_else(|| DataAccessError::data_access("cannot index an entity without ExternalEntityId"))?;
        let address = (key.storage_account_name().to_string(), id);

        let mut summary = entity.summary();
        summary.key = None;
        summary.local_version = key.local_version();
        let record = IndexRecord {
            key_json: key.to_json()?,
            summary,
        };

        let mut entries = self.entries.write().map_err(lock_poisoned)?;
        let current = entries
            .get(&address)
            .and_then(IndexEntry::current)
            .map(|r| r.summary.local_version);
        ExpectedVersion::for_write(key, is_update)?.check(current)?;

        entries
            .entry(address)
            .or_insert_with(|| IndexEntry {
                history: Vec::new(),
                active: true,
            })
            .history
            .push(record);
        tracing::debug!(entity = %entity.describe(), version = key.local_version(), "index entry saved");
        Ok(())
    }

    fn get_entity_info_by_category(
        &self,
        storage_account_name: &str,
        category: EntityCategory,
    ) -> DataAccessResult<Vec<RawEntity>> {
        let entries = self.entries.read().map_err(lock_poisoned)?;
        let mut found: Vec<(EntityId, RawEntity)> = Vec::new();
        for ((account, id), entry) in entries.iter() {
            if account != storage_account_name || !entry.active {
                continue;
            }
            let Some(record) = entry.current() else { continue };
            if record.summary.entity_category == Some(category) {
                found.push((*id, Self::summary_of(record)?));
            }
        }
        found.sort_by_key(|(id, _)| *id);
        Ok(found.into_iter().map(|(_, summary)| summary).collect())
    }

    fn set_entity_status(&self, storage_account_name: &str, ids: &[EntityId], active: bool) -> DataAccessResult<()> {
        let mut entries = self.entries.write().map_err(lock_poisoned)?;
        // Validate every id before touching any entry.
        if let Some(missing) = ids
            .iter()
            .find(|id| !entries.contains_key(&(storage_account_name.to_string(), **id)))
        {
            return Err(DataAccessError::not_found(format!("no index entry for {missing}")));
        }
        for id in ids {
            if let Some(entry) = entries.get_mut(&(storage_account_name.to_string(), *id)) {
                entry.active = active;
            }
        }
        tracing::info!(count = ids.len(), active, "entity status updated");
        Ok(())
    }
}
