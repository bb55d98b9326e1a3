//! In-memory blob store.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;

use adstore_core::{BlobEntity, BlobKey, DataAccessError, DataAccessResult, RawEntity, StorageKey};

use crate::keys::BlobKeyFactory;

use super::r#trait::{BlobStore, StorageKeyFactory};

type BlobAddress = (String, String, String);

fn blob_address(key: &StorageKey) -> DataAccessResult<BlobAddress> {
    let BlobKey {
        storage_account_name,
        container_name,
        blob_id,
        ..
    } = key
        .as_blob()
        .ok_or_else(|| DataAccessError::data_access("blob store only addresses blob keys"))?;
    Ok((storage_account_name.clone(), container_name.clone(), blob_id.clone()))
}

/// In-memory blob container set.
#[derive(Debug)]
pub struct InMemoryBlobStore {
    key_factory: BlobKeyFactory,
    blobs: RwLock<HashMap<BlobAddress, RawEntity>>,
}

impl InMemoryBlobStore {
    pub fn new(key_factory: BlobKeyFactory) -> Self {
        Self {
            key_factory,
            blobs: RwLock::new(HashMap::new()),
        }
    }
}

impl BlobStore for InMemoryBlobStore {
    fn get_blob_by_key(&self, key: &StorageKey) -> DataAccessResult<Option<BlobEntity>> {
        let address = blob_address(key)?;
        let blobs = self
            .blobs
            .read()
            .map_err(|_| DataAccessError::data_access("lock poisoned"))?;
        blobs.get(&address).cloned().map(BlobEntity::try_from).transpose()
    }

    fn save_blob(&self, blob: &RawEntity) -> DataAccessResult<()> {
        let mut stored = BlobEntity::try_from(blob.clone())?.into_raw();
        let key = stored
            .key
            .as_mut()
            .ok_or_else(|| DataAccessError::data_access(format!("blob {} has no storage key", blob.describe())))?;
        key.set_version_timestamp(Some(Utc::now()));
        let address = blob_address(key)?;

        let mut blobs = self
            .blobs
            .write()
            .map_err(|_| DataAccessError::data_access("lock poisoned"))?;
        if blobs.contains_key(&address) {
            return Err(DataAccessError::stale(format!("blob {} already exists", address.2)));
        }
        blobs.insert(address, stored);
        tracing::debug!(blob = %blob.describe(), "blob written");
        Ok(())
    }

    fn remove_blob(&self, key: &StorageKey) -> DataAccessResult<()> {
        let address = blob_address(key)?;
        let mut blobs = self
            .blobs
            .write()
            .map_err(|_| DataAccessError::data_access("lock poisoned"))?;
        blobs.remove(&address);
        Ok(())
    }

    fn storage_key_factory(&self) -> &dyn StorageKeyFactory {
        &self.key_factory
    }
}
