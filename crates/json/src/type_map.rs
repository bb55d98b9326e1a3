//! Well-known bag property types.

use std::collections::HashMap;

use adstore_core::PropertyType;
use adstore_core::wrappers::{
    BLOB_BYTES, BLOB_PROPERTY_TYPE, BUDGET, CONTACT_EMAIL, CREATIVE_TYPE, DISPLAY_NAME, END_DATE,
    FULL_NAME, PARTNER_CODE, START_DATE, USER_ID,
};

/// Names whose type is fixed regardless of the JSON token they arrive as.
///
/// Injected into the serializer so different schema versions can carry
/// different tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyTypeMap {
    entries: HashMap<String, PropertyType>,
}

impl PropertyTypeMap {
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, ty: PropertyType) -> Self {
        self.entries.insert(name.into(), ty);
        self
    }

    pub fn get(&self, name: &str) -> Option<PropertyType> {
        self.entries.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for PropertyTypeMap {
    fn default() -> Self {
        Self::empty()
            .with(DISPLAY_NAME, PropertyType::String)
            .with(BUDGET, PropertyType::Double)
            .with(START_DATE, PropertyType::Date)
            .with(END_DATE, PropertyType::Date)
            .with(CREATIVE_TYPE, PropertyType::String)
            .with(USER_ID, PropertyType::String)
            .with(FULL_NAME, PropertyType::String)
            .with(CONTACT_EMAIL, PropertyType::String)
            .with(PARTNER_CODE, PropertyType::String)
            .with(BLOB_BYTES, PropertyType::Binary)
            .with(BLOB_PROPERTY_TYPE, PropertyType::String)
    }
}
