//! Store configuration.

use serde::Deserialize;

use adstore_core::{DataAccessError, DataAccessResult, EntityId};

pub const DEFAULT_STORAGE_ACCOUNT: &str = "defaultaccount";
pub const DEFAULT_SCHEMA_VERSION: i32 = 1;
pub const DEFAULT_COMPANY_TABLE_PREFIX: &str = "company";
pub const DEFAULT_BLOB_CONTAINER_PREFIX: &str = "blobs";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct StoreConfig {
    pub storage_account_name: String,
    /// Rows written with schema version 1 or later carry encoded column names.
    pub schema_version: i32,
    pub company_table_prefix: String,
    pub blob_container_prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_account_name: DEFAULT_STORAGE_ACCOUNT.to_string(),
            schema_version: DEFAULT_SCHEMA_VERSION,
            company_table_prefix: DEFAULT_COMPANY_TABLE_PREFIX.to_string(),
            blob_container_prefix: DEFAULT_BLOB_CONTAINER_PREFIX.to_string(),
        }
    }
}

impl StoreConfig {
    /// Read `ADSTORE_*` variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let storage_account_name = std::env::var("ADSTORE_STORAGE_ACCOUNT").unwrap_or_else(|_| {
            tracing::warn!("ADSTORE_STORAGE_ACCOUNT not set; using {DEFAULT_STORAGE_ACCOUNT}");
            defaults.storage_account_name.clone()
        });

        let schema_version = match std::env::var("ADSTORE_SCHEMA_VERSION") {
            Ok(raw) => raw.trim().parse::<i32>().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "ADSTORE_SCHEMA_VERSION is not an integer; using {DEFAULT_SCHEMA_VERSION}");
                DEFAULT_SCHEMA_VERSION
            }),
            Err(_) => DEFAULT_SCHEMA_VERSION,
        };

        let company_table_prefix = std::env::var("ADSTORE_COMPANY_TABLE_PREFIX")
            .unwrap_or_else(|_| defaults.company_table_prefix.clone());
        let blob_container_prefix = std::env::var("ADSTORE_BLOB_CONTAINER_PREFIX")
            .unwrap_or_else(|_| defaults.blob_container_prefix.clone());

        Self {
            storage_account_name,
            schema_version,
            company_table_prefix,
            blob_container_prefix,
        }
    }

    pub fn from_json(text: &str) -> DataAccessResult<Self> {
        serde_json::from_str(text)
            .map_err(|e| DataAccessError::invalid_argument(format!("invalid store configuration: {e}")))
    }

    /// Table holding a company's entities.
    pub fn company_table_name(&self, company_id: EntityId) -> String {
        format!("{}{}", self.company_table_prefix, company_id.as_simple())
    }

    /// Container holding a company's blobs.
    pub fn blob_container_name(&self, company_id: EntityId) -> String {
        format!("{}{}", self.blob_container_prefix, company_id.as_simple())
    }
}
