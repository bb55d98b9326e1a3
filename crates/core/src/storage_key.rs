//! Backend storage keys and the optimistic-concurrency version contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DataAccessError, DataAccessResult};

/// Location of one physical version of an entity in a table-style backend.
///
/// `version_timestamp` is backend concurrency metadata and takes no part in
/// equality.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableKey {
    pub storage_account_name: String,
    pub table_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_id: Option<String>,
    #[serde(default)]
    pub local_version: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_timestamp: Option<DateTime<Utc>>,
}

impl TableKey {
    /// Key of a freshly provisioned table: no partition, no row.
    pub fn partial(storage_account_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            storage_account_name: storage_account_name.into(),
            table_name: table_name.into(),
            partition: None,
            row_id: None,
            local_version: 0,
            version_timestamp: None,
        }
    }

    pub fn is_partial(&self) -> bool {
        self.partition.is_none() || self.row_id.is_none()
    }
}

impl PartialEq for TableKey {
    fn eq(&self, other: &Self) -> bool {
        self.storage_account_name == other.storage_account_name
            && self.table_name == other.table_name
            && self.partition == other.partition
            && self.row_id == other.row_id
            && self.local_version == other.local_version
    }
}

/// Location of a blob. Blob content is immutable by identity.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BlobKey {
    pub storage_account_name: String,
    pub container_name: String,
    pub blob_id: String,
    #[serde(default)]
    pub local_version: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_timestamp: Option<DateTime<Utc>>,
}

impl PartialEq for BlobKey {
    fn eq(&self, other: &Self) -> bool {
        self.storage_account_name == other.storage_account_name
            && self.container_name == other.container_name
            && self.blob_id == other.blob_id
            && self.local_version == other.local_version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "KeyType")]
pub enum StorageKey {
    Table(TableKey),
    Blob(BlobKey),
}

impl StorageKey {
    pub fn storage_account_name(&self) -> &str {
        match self {
            StorageKey::Table(k) => &k.storage_account_name,
            StorageKey::Blob(k) => &k.storage_account_name,
        }
    }

    pub fn local_version(&self) -> i32 {
        match self {
            StorageKey::Table(k) => k.local_version,
            StorageKey::Blob(k) => k.local_version,
        }
    }

    pub fn version_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            StorageKey::Table(k) => k.version_timestamp,
            StorageKey::Blob(k) => k.version_timestamp,
        }
    }

    pub fn set_version_timestamp(&mut self, timestamp: Option<DateTime<Utc>>) {
        match self {
            StorageKey::Table(k) => k.version_timestamp = timestamp,
            StorageKey::Blob(k) => k.version_timestamp = timestamp,
        }
    }

    pub fn is_partial(&self) -> bool {
        match self {
            StorageKey::Table(k) => k.is_partial(),
            StorageKey::Blob(k) => k.blob_id.is_empty(),
        }
    }

    /// Equality over every addressing field and the local version.
    pub fn is_equal(&self, other: &StorageKey) -> bool {
        self == other
    }

    pub fn as_table(&self) -> Option<&TableKey> {
        match self {
            StorageKey::Table(k) => Some(k),
            StorageKey::Blob(_) => None,
        }
    }

    pub fn as_blob(&self) -> Option<&BlobKey> {
        match self {
            StorageKey::Blob(k) => Some(k),
            StorageKey::Table(_) => None,
        }
    }

    pub fn to_json(&self) -> DataAccessResult<String> {
        serde_json::to_string(self)
            .map_err(|e| DataAccessError::data_access(format!("storage key serialization failed: {e}")))
    }

    pub fn from_json(text: &str) -> DataAccessResult<Self> {
        let key: StorageKey = serde_json::from_str(text)
            .map_err(|e| DataAccessError::data_access(format!("malformed storage key '{text}': {e}")))?;
        key.validate()?;
        Ok(key)
    }

    fn validate(&self) -> DataAccessResult<()> {
        let missing = |field: &str| {
            Err(DataAccessError::data_access(format!(
                "storage key is missing required field {field}"
            )))
        };
        if self.storage_account_name().is_empty() {
            return missing("StorageAccountName");
        }
        match self {
            StorageKey::Table(k) if k.table_name.is_empty() => missing("TableName"),
            StorageKey::Blob(k) if k.container_name.is_empty() => missing("ContainerName"),
            _ => Ok(()),
        }
    }
}

/// Optimistic concurrency expectation for a conditional write.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Nothing may be stored yet (insert).
    Absent,
    /// The stored version must be exactly this one (update).
    Exact(i32),
}

impl ExpectedVersion {
    /// Expectation for writing `key`: the previous version must be current.
    pub fn for_write(key: &StorageKey, is_update: bool) -> DataAccessResult<Self> {
        if !is_update {
            return Ok(ExpectedVersion::Absent);
        }
        key.local_version()
            .checked_sub(1)
            .map(ExpectedVersion::Exact)
            .ok_or_else(|| {
                DataAccessError::data_access(format!(
                    "version {} has no predecessor",
                    key.local_version()
                ))
            })
    }

    pub fn matches(self, actual: Option<i32>) -> bool {
        match (self, actual) {
            (ExpectedVersion::Absent, None) => true,
            (ExpectedVersion::Exact(v), Some(a)) => v == a,
            _ => false,
        }
    }

    pub fn check(self, actual: Option<i32>) -> DataAccessResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DataAccessError::stale(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual:?})"
            )))
        }
    }
}
