//! Raw entities: identity, interface fields, property bag and associations.

use core::fmt;
use core::str::FromStr;
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::association::Association;
use crate::error::{DataAccessError, DataAccessResult};
use crate::id::EntityId;
use crate::property::{EntityProperty, PropertyFilter};
use crate::storage_key::StorageKey;
use crate::value::{PropertyType, PropertyValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityCategory {
    Company,
    Campaign,
    Creative,
    User,
    Partner,
    Blob,
}

impl EntityCategory {
    pub const ALL: [EntityCategory; 6] = [
        EntityCategory::Company,
        EntityCategory::Campaign,
        EntityCategory::Creative,
        EntityCategory::User,
        EntityCategory::Partner,
        EntityCategory::Blob,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityCategory::Company => "Company",
            EntityCategory::Campaign => "Campaign",
            EntityCategory::Creative => "Creative",
            EntityCategory::User => "User",
            EntityCategory::Partner => "Partner",
            EntityCategory::Blob => "Blob",
        }
    }
}

impl fmt::Display for EntityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityCategory {
    type Err = DataAccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DataAccessError::invalid_argument(format!("unknown entity category '{s}'")))
    }
}

/// The unit of persistence.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawEntity {
    pub external_entity_id: Option<EntityId>,
    pub entity_category: Option<EntityCategory>,
    pub external_name: Option<String>,
    pub external_type: Option<String>,
    pub create_date: Option<DateTime<Utc>>,
    pub last_modified_date: Option<DateTime<Utc>>,
    pub last_modified_user: Option<String>,
    pub local_version: i32,
    pub schema_version: i32,
    pub key: Option<StorageKey>,
    pub properties: Vec<EntityProperty>,
    pub associations: Vec<Association>,
}

impl RawEntity {
    pub fn new(id: EntityId, category: EntityCategory) -> Self {
        Self {
            external_entity_id: Some(id),
            entity_category: Some(category),
            ..Self::default()
        }
    }

    pub fn id(&self) -> DataAccessResult<EntityId> {
        self.external_entity_id
            .ok_or_else(|| DataAccessError::invalid_argument("entity has no ExternalEntityId"))
    }

    pub fn category(&self) -> DataAccessResult<EntityCategory> {
        self.entity_category
            .ok_or_else(|| DataAccessError::invalid_argument("entity has no EntityCategory"))
    }

    /// Category and id for log lines; never fails.
    pub fn describe(&self) -> String {
        let category = self.entity_category.map(|c| c.as_str()).unwrap_or("<none>");
        match self.external_entity_id {
            Some(id) => format!("{category}:{id}"),
            None => format!("{category}:<no id>"),
        }
    }

    pub fn property(&self, name: &str) -> Option<&EntityProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn property_value(&self, name: &str) -> Option<&PropertyValue> {
        self.property(name).map(|p| &p.value)
    }

    /// Replace the property with the same name, or append it.
    pub fn set_property(&mut self, property: EntityProperty) {
        match self.properties.iter_mut().find(|p| p.name == property.name) {
            Some(existing) => *existing = property,
            None => self.properties.push(property),
        }
    }

    pub fn remove_property(&mut self, name: &str) -> Option<EntityProperty> {
        let idx = self.properties.iter().position(|p| p.name == name)?;
        Some(self.properties.remove(idx))
    }

    pub fn properties_in(&self, filter: PropertyFilter) -> impl Iterator<Item = &EntityProperty> {
        self.properties.iter().filter(move |p| p.filter == filter)
    }

    /// First property name that occurs more than once, if any.
    pub fn duplicate_property_name(&self) -> Option<&str> {
        let mut seen = HashSet::new();
        self.properties
            .iter()
            .map(|p| p.name.as_str())
            .find(|name| !seen.insert(*name))
    }

    /// Interface fields that currently hold a value, in table order.
    pub fn interface_values(&self) -> Vec<(&'static str, PropertyValue)> {
        INTERFACE_PROPERTIES
            .iter()
            .filter_map(|p| p.get(self).map(|v| (p.name, v)))
            .collect()
    }

    /// Interface fields and key only; what an index keeps about an entity.
    pub fn summary(&self) -> RawEntity {
        RawEntity {
            properties: Vec::new(),
            associations: Vec::new(),
            ..self.clone()
        }
    }
}

/// A well-known interface field of every entity.
pub struct InterfaceProperty {
    pub name: &'static str,
    pub property_type: PropertyType,
    getter: fn(&RawEntity) -> Option<PropertyValue>,
    setter: fn(&mut RawEntity, PropertyValue),
}

impl InterfaceProperty {
    pub fn get(&self, entity: &RawEntity) -> Option<PropertyValue> {
        (self.getter)(entity)
    }

    /// Store `value` after coercing it to the declared type.
    pub fn set(&self, entity: &mut RawEntity, value: PropertyValue) -> DataAccessResult<()> {
        let value = value.coerce_to(self.property_type).map_err(|e| {
            DataAccessError::invalid_argument(format!("interface property {}: {e}", self.name))
        })?;
        if self.name == ENTITY_CATEGORY {
            // The category setter cannot fail, so validate first.
            value.as_str().unwrap_or_default().parse::<EntityCategory>()?;
        }
        (self.setter)(entity, value);
        Ok(())
    }
}

impl fmt::Debug for InterfaceProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterfaceProperty")
            .field("name", &self.name)
            .field("property_type", &self.property_type)
            .finish()
    }
}

pub const EXTERNAL_ENTITY_ID: &str = "ExternalEntityId";
pub const ENTITY_CATEGORY: &str = "EntityCategory";
pub const EXTERNAL_NAME: &str = "ExternalName";
pub const EXTERNAL_TYPE: &str = "ExternalType";
pub const CREATE_DATE: &str = "CreateDate";
pub const LAST_MODIFIED_DATE: &str = "LastModifiedDate";
pub const LAST_MODIFIED_USER: &str = "LastModifiedUser";
pub const LOCAL_VERSION: &str = "LocalVersion";
pub const SCHEMA_VERSION: &str = "SchemaVersion";

fn get_id(e: &RawEntity) -> Option<PropertyValue> {
    e.external_entity_id.map(|id| PropertyValue::Guid(*id.as_uuid()))
}
fn set_id(e: &mut RawEntity, v: PropertyValue) {
    e.external_entity_id = v.as_guid().map(EntityId::from_uuid);
}
fn get_category(e: &RawEntity) -> Option<PropertyValue> {
    e.entity_category.map(|c| PropertyValue::from(c.as_str()))
}
fn set_category(e: &mut RawEntity, v: PropertyValue) {
    e.entity_category = v.as_str().and_then(|s| s.parse().ok());
}
fn get_external_name(e: &RawEntity) -> Option<PropertyValue> {
    e.external_name.clone().map(PropertyValue::String)
}
fn set_external_name(e: &mut RawEntity, v: PropertyValue) {
    e.external_name = v.as_str().map(str::to_string);
}
fn get_external_type(e: &RawEntity) -> Option<PropertyValue> {
    e.external_type.clone().map(PropertyValue::String)
}
fn set_external_type(e: &mut RawEntity, v: PropertyValue) {
    e.external_type = v.as_str().map(str::to_string);
}
fn get_create_date(e: &RawEntity) -> Option<PropertyValue> {
    e.create_date.map(PropertyValue::Date)
}
fn set_create_date(e: &mut RawEntity, v: PropertyValue) {
    e.create_date = v.as_date();
}
fn get_modified_date(e: &RawEntity) -> Option<PropertyValue> {
    e.last_modified_date.map(PropertyValue::Date)
}
fn set_modified_date(e: &mut RawEntity, v: PropertyValue) {
    e.last_modified_date = v.as_date();
}
fn get_modified_user(e: &RawEntity) -> Option<PropertyValue> {
    e.last_modified_user.clone().map(PropertyValue::String)
}
fn set_modified_user(e: &mut RawEntity, v: PropertyValue) {
    e.last_modified_user = v.as_str().map(str::to_string);
}
fn get_local_version(e: &RawEntity) -> Option<PropertyValue> {
    Some(PropertyValue::Int32(e.local_version))
}
fn set_local_version(e: &mut RawEntity, v: PropertyValue) {
    e.local_version = v.as_i32().unwrap_or_default();
}
fn get_schema_version(e: &RawEntity) -> Option<PropertyValue> {
    Some(PropertyValue::Int32(e.schema_version))
}
fn set_schema_version(e: &mut RawEntity, v: PropertyValue) {
    e.schema_version = v.as_i32().unwrap_or_default();
}

/// The interface fields, consumed alike by the serializer, the deserializer,
/// the regex gate and the row codec.
pub static INTERFACE_PROPERTIES: [InterfaceProperty; 9] = [
    InterfaceProperty { name: EXTERNAL_ENTITY_ID, property_type: PropertyType::Guid, getter: get_id, setter: set_id },
    InterfaceProperty { name: ENTITY_CATEGORY, property_type: PropertyType::String, getter: get_category, setter: set_category },
    InterfaceProperty { name: EXTERNAL_NAME, property_type: PropertyType::String, getter: get_external_name, setter: set_external_name },
    InterfaceProperty { name: EXTERNAL_TYPE, property_type: PropertyType::String, getter: get_external_type, setter: set_external_type },
    InterfaceProperty { name: CREATE_DATE, property_type: PropertyType::Date, getter: get_create_date, setter: set_create_date },
    InterfaceProperty { name: LAST_MODIFIED_DATE, property_type: PropertyType::Date, getter: get_modified_date, setter: set_modified_date },
    InterfaceProperty { name: LAST_MODIFIED_USER, property_type: PropertyType::String, getter: get_modified_user, setter: set_modified_user },
    InterfaceProperty { name: LOCAL_VERSION, property_type: PropertyType::Int32, getter: get_local_version, setter: set_local_version },
    InterfaceProperty { name: SCHEMA_VERSION, property_type: PropertyType::Int32, getter: get_schema_version, setter: set_schema_version },
];

pub fn interface_property(name: &str) -> Option<&'static InterfaceProperty> {
    INTERFACE_PROPERTIES.iter().find(|p| p.name == name)
}
