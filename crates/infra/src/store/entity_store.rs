//! In-memory entity store: encoded rows per company table.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use chrono::Utc;

use adstore_core::{
    DataAccessError, DataAccessResult, EntityCategory, PropertyValue, RawEntity, StorageKey, TableKey,
};
use adstore_core::wrappers::USER_ID;

use crate::context::RequestContext;
use crate::row::{EntityRow, decode_row, encode_row};

use super::r#trait::EntityStore;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TableAddress {
    storage_account_name: String,
    table_name: String,
}

impl TableAddress {
    fn of(key: &TableKey) -> Self {
        Self {
            storage_account_name: key.storage_account_name.clone(),
            table_name: key.table_name.clone(),
        }
    }
}

type RowAddress = (String, String);

fn row_address(key: &TableKey) -> DataAccessResult<RowAddress> {
    match (&key.partition, &key.row_id) {
        (Some(partition), Some(row_id)) => Ok((partition.clone(), row_id.clone())),
        _ => Err(DataAccessError::data_access(format!(
            "table key for '{}' is partial",
            key.table_name
        ))),
    }
}

fn require_table(key: &StorageKey) -> DataAccessResult<&TableKey> {
    key.as_table()
        .ok_or_else(|| DataAccessError::data_access("entity store only addresses table keys"))
}

fn lock_poisoned<T>(_: T) -> DataAccessError {
    DataAccessError::data_access("lock poisoned")
}

/// In-memory table store holding encoded rows.
///
/// Tables are created by `setup_new_company` or on first write.
#[derive(Debug, Default)]
pub struct InMemoryEntityStore {
    storage_account_name: String,
    tables: RwLock<HashMap<TableAddress, BTreeMap<RowAddress, EntityRow>>>,
}

impl InMemoryEntityStore {
    pub fn new(storage_account_name: impl Into<String>) -> Self {
        Self {
            storage_account_name: storage_account_name.into(),
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Every row in the table, including versions the index no longer points at.
    pub fn row_count(&self, table_name: &str) -> usize {
        let tables = match self.tables.read() {
            Ok(t) => t,
            Err(_) => return 0,
        };
        tables
            .iter()
            .filter(|(address, _)| address.table_name == table_name)
            .map(|(_, rows)| rows.len())
            .sum()
    }
}

impl EntityStore for InMemoryEntityStore {
    fn get_entity_by_key(&self, _context: &RequestContext, key: &StorageKey) -> DataAccessResult<Option<RawEntity>> {
        let table_key = require_table(key)?;
        let address = row_address(table_key)?;
        let tables = self.tables.read().map_err(lock_poisoned)?;

        let Some(row) = tables.get(&TableAddress::of(table_key)).and_then(|rows| rows.get(&address)) else {
            return Ok(None);
        };
        // The stored key carries the write timestamp; the caller's may not.
        if row.key.local_version() != key.local_version() {
            return Ok(None);
        }
        decode_row(row).map(Some)
    }

    fn save_entity(&self, _context: &RequestContext, entity: &RawEntity, is_update: bool) -> DataAccessResult<bool> {
        let mut row = encode_row(entity)?;
        row.key.set_version_timestamp(Some(Utc::now()));
        let table_key = require_table(&row.key)?.clone();
        let address = row_address(&table_key)?;

        let mut tables = self.tables.write().map_err(lock_poisoned)?;
        let rows = tables.entry(TableAddress::of(&table_key)).or_default();
        if rows.contains_key(&address) {
            return Err(DataAccessError::stale(format!(
                "row {}/{} already exists in table {}",
                address.0, address.1, table_key.table_name
            )));
        }
        rows.insert(address, row);
        tracing::debug!(
            entity = %entity.describe(),
            table = %table_key.table_name,
            version = table_key.local_version,
            is_update,
            "entity row written"
        );
        Ok(true)
    }

    fn remove_entity(&self, key: &StorageKey) -> DataAccessResult<()> {
        let table_key = require_table(key)?;
        let address = row_address(table_key)?;
        let mut tables = self.tables.write().map_err(lock_poisoned)?;
        if let Some(rows) = tables.get_mut(&TableAddress::of(table_key)) {
            rows.remove(&address);
        }
        Ok(())
    }

    fn get_user_entities_by_user_id(&self, user_id: &str, key: &StorageKey) -> DataAccessResult<Vec<RawEntity>> {
        let table_key = require_table(key)?;
        let tables = self.tables.read().map_err(lock_poisoned)?;
        let Some(rows) = tables.get(&TableAddress::of(table_key)) else {
            return Ok(Vec::new());
        };

        // A table keeps every written version; report the newest per entity.
        let mut latest: BTreeMap<_, RawEntity> = BTreeMap::new();
        for row in rows.values() {
            let entity = decode_row(row)?;
            if entity.entity_category != Some(EntityCategory::User) {
                continue;
            }
            let matches = matches!(entity.property_value(USER_ID), Some(PropertyValue::String(id)) if id == user_id);
            let Some(id) = entity.external_entity_id.filter(|_| matches) else {
                continue;
            };
            match latest.get(&id) {
                Some(existing) if existing.local_version >= entity.local_version => {}
                _ => {
                    latest.insert(id, entity);
                }
            }
        }
        Ok(latest.into_values().collect())
    }

    fn setup_new_company(&self, table_name: &str) -> DataAccessResult<StorageKey> {
        let key = TableKey::partial(self.storage_account_name.clone(), table_name);
        let mut tables = self.tables.write().map_err(lock_poisoned)?;
        tables.entry(TableAddress::of(&key)).or_default();
        tracing::info!(table = %table_name, "company table provisioned");
        Ok(StorageKey::Table(key))
    }
}
