//! Entity properties and their visibility tiers.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DataAccessError;
use crate::id::EntityId;
use crate::value::{PropertyType, PropertyValue};

/// Visibility tier of a property.
///
/// `Default` properties are always visible to external callers; `System` and
/// `Extended` only when explicitly requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PropertyFilter {
    #[default]
    Default,
    System,
    Extended,
}

impl PropertyFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyFilter::Default => "Default",
            PropertyFilter::System => "System",
            PropertyFilter::Extended => "Extended",
        }
    }
}

impl fmt::Display for PropertyFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyFilter {
    type Err = DataAccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Default" => Ok(PropertyFilter::Default),
            "System" => Ok(PropertyFilter::System),
            "Extended" => Ok(PropertyFilter::Extended),
            other => Err(DataAccessError::invalid_argument(format!(
                "unknown property filter '{other}'"
            ))),
        }
    }
}

/// A named, typed value in an entity's property bag.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityProperty {
    pub name: String,
    pub value: PropertyValue,
    pub filter: PropertyFilter,
    /// The value names a blob entity holding the actual content.
    pub is_blob_ref: bool,
}

impl EntityProperty {
    pub fn new(name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            filter: PropertyFilter::Default,
            is_blob_ref: false,
        }
    }

    pub fn with_filter(
        name: impl Into<String>,
        value: impl Into<PropertyValue>,
        filter: PropertyFilter,
    ) -> Self {
        Self {
            filter,
            ..Self::new(name, value)
        }
    }

    pub fn system(name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Self::with_filter(name, value, PropertyFilter::System)
    }

    pub fn extended(name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Self::with_filter(name, value, PropertyFilter::Extended)
    }

    pub fn blob_ref(name: impl Into<String>, blob_id: EntityId, filter: PropertyFilter) -> Self {
        Self {
            name: name.into(),
            value: PropertyValue::Guid(*blob_id.as_uuid()),
            filter,
            is_blob_ref: true,
        }
    }

    pub fn property_type(&self) -> PropertyType {
        self.value.property_type()
    }

    /// The referenced blob id, if this is a well-formed blob reference.
    pub fn try_blob_ref(&self) -> Option<EntityId> {
        if !self.is_blob_ref {
            return None;
        }
        match &self.value {
            PropertyValue::Guid(id) => Some(EntityId::from_uuid(*id)),
            PropertyValue::String(text) => text.parse().ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_tier() {
        assert_eq!(EntityProperty::new("a", 1).filter, PropertyFilter::Default);
        assert_eq!(EntityProperty::system("a", 1).filter, PropertyFilter::System);
        assert_eq!(EntityProperty::extended("a", 1).filter, PropertyFilter::Extended);
    }

    #[test]
    fn blob_ref_requires_flag_and_guid() {
        let id = EntityId::from_i32(9);
        let prop = EntityProperty::blob_ref("Thumb", id, PropertyFilter::Default);
        assert_eq!(prop.try_blob_ref(), Some(id));

        let mut text_ref = EntityProperty::new("Thumb", id.to_string());
        assert_eq!(text_ref.try_blob_ref(), None);
        text_ref.is_blob_ref = true;
        assert_eq!(text_ref.try_blob_ref(), Some(id));

        let mut bad = EntityProperty::new("Thumb", 3);
        bad.is_blob_ref = true;
        assert_eq!(bad.try_blob_ref(), None);
    }
}
