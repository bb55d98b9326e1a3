//! Typed wrappers over raw entities.
//!
//! A wrapper pins the entity category and offers typed accessors over the
//! property bag; persistence still sees the wrapped [`RawEntity`].

use chrono::{DateTime, Utc};

use crate::entity::{EntityCategory, RawEntity};
use crate::error::{DataAccessError, DataAccessResult};
use crate::id::EntityId;
use crate::property::EntityProperty;
use crate::value::PropertyValue;

macro_rules! entity_wrapper {
    ($t:ident, $category:expr) => {
        #[derive(Debug, Clone, PartialEq)]
        pub struct $t(RawEntity);

        impl $t {
            pub const CATEGORY: EntityCategory = $category;

            pub fn new(id: EntityId) -> Self {
                Self(RawEntity::new(id, Self::CATEGORY))
            }

            pub fn raw(&self) -> &RawEntity {
                &self.0
            }

            pub fn raw_mut(&mut self) -> &mut RawEntity {
                &mut self.0
            }

            pub fn into_raw(self) -> RawEntity {
                self.0
            }
        }

        impl TryFrom<RawEntity> for $t {
            type Error = DataAccessError;

            fn try_from(entity: RawEntity) -> DataAccessResult<Self> {
                match entity.entity_category {
                    Some(c) if c == Self::CATEGORY => Ok(Self(entity)),
                    other => Err(DataAccessError::type_mismatch(format!(
                        "expected a {} entity, found {}",
                        Self::CATEGORY,
                        other.map(|c| c.as_str()).unwrap_or("an uncategorised entity")
                    ))),
                }
            }
        }

        impl From<$t> for RawEntity {
            fn from(value: $t) -> Self {
                value.0
            }
        }
    };
}

entity_wrapper!(CompanyEntity, EntityCategory::Company);
entity_wrapper!(CampaignEntity, EntityCategory::Campaign);
entity_wrapper!(CreativeEntity, EntityCategory::Creative);
entity_wrapper!(UserEntity, EntityCategory::User);
entity_wrapper!(PartnerEntity, EntityCategory::Partner);
entity_wrapper!(BlobEntity, EntityCategory::Blob);

pub const DISPLAY_NAME: &str = "DisplayName";
pub const BUDGET: &str = "Budget";
pub const START_DATE: &str = "StartDate";
pub const END_DATE: &str = "EndDate";
pub const CREATIVE_TYPE: &str = "CreativeType";
pub const USER_ID: &str = "UserId";
pub const FULL_NAME: &str = "FullName";
pub const CONTACT_EMAIL: &str = "ContactEmail";
pub const PARTNER_CODE: &str = "PartnerCode";
pub const BLOB_BYTES: &str = "BlobBytes";
pub const BLOB_PROPERTY_TYPE: &str = "BlobPropertyType";

fn string_of<'a>(entity: &'a RawEntity, name: &str) -> Option<&'a str> {
    entity.property_value(name).and_then(PropertyValue::as_str)
}

impl CompanyEntity {
    pub fn display_name(&self) -> Option<&str> {
        string_of(&self.0, DISPLAY_NAME)
    }
}

impl CampaignEntity {
    pub fn budget(&self) -> Option<f64> {
        self.0.property_value(BUDGET).and_then(PropertyValue::as_f64)
    }

    pub fn set_budget(&mut self, budget: f64) {
        self.0.set_property(EntityProperty::new(BUDGET, budget));
    }

    pub fn start_date(&self) -> Option<DateTime<Utc>> {
        self.0.property_value(START_DATE).and_then(PropertyValue::as_date)
    }

    pub fn end_date(&self) -> Option<DateTime<Utc>> {
        self.0.property_value(END_DATE).and_then(PropertyValue::as_date)
    }
}

impl CreativeEntity {
    pub fn creative_type(&self) -> Option<&str> {
        string_of(&self.0, CREATIVE_TYPE)
    }
}

impl UserEntity {
    pub fn user_id(&self) -> Option<&str> {
        string_of(&self.0, USER_ID)
    }

    pub fn full_name(&self) -> Option<&str> {
        string_of(&self.0, FULL_NAME)
    }

    pub fn contact_email(&self) -> Option<&str> {
        string_of(&self.0, CONTACT_EMAIL)
    }
}

impl PartnerEntity {
    pub fn partner_code(&self) -> Option<&str> {
        string_of(&self.0, PARTNER_CODE)
    }
}

impl BlobEntity {
    pub fn with_bytes(id: EntityId, bytes: Vec<u8>, blob_property_type: impl Into<String>) -> Self {
        let mut blob = Self::new(id);
        blob.0.set_property(EntityProperty::new(BLOB_BYTES, bytes));
        blob.0
            .set_property(EntityProperty::new(BLOB_PROPERTY_TYPE, blob_property_type.into()));
        blob
    }

    pub fn blob_bytes(&self) -> Option<&[u8]> {
        self.0.property_value(BLOB_BYTES).and_then(PropertyValue::as_bytes)
    }

    pub fn blob_property_type(&self) -> Option<&str> {
        string_of(&self.0, BLOB_PROPERTY_TYPE)
    }
}
