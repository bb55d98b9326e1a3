//! `adstore-core`: the entity model shared by every persistence backend.
//!
//! Entities are property bags with three visibility tiers, typed interface
//! fields and grouped associations; storage keys carry the version used for
//! optimistic concurrency. No IO happens in this crate.

pub mod association;
pub mod encoding;
pub mod entity;
pub mod error;
pub mod filter;
pub mod id;
pub mod property;
pub mod storage_key;
pub mod value;
pub mod wrappers;

pub use association::{Association, AssociationGroupKey, AssociationType, group_associations};
pub use encoding::{AZURE_NAME_ENCODER, NameEncoder, XML_NAME_ENCODER, decode_storage_name, encode_storage_name};
pub use entity::{EntityCategory, INTERFACE_PROPERTIES, InterfaceProperty, RawEntity, interface_property};
pub use error::{DataAccessError, DataAccessResult};
pub use filter::{EntityFilter, EntityQueries, Paging, QueryValues};
pub use id::EntityId;
pub use property::{EntityProperty, PropertyFilter};
pub use storage_key::{BlobKey, ExpectedVersion, StorageKey, TableKey};
pub use value::{PropertyType, PropertyValue};
pub use wrappers::{
    BlobEntity, CampaignEntity, CompanyEntity, CreativeEntity, PartnerEntity, UserEntity,
};
