//! `adstore-json`: the JSON wire format for entities.
//!
//! Interface fields sit at the top level; each enabled property tier gets its
//! own bag and associations are grouped by external name.

pub mod bag;
pub mod coerce;
mod collection;
pub mod serializer;
pub mod type_map;

pub use bag::{ASSOCIATIONS, EXTENDED_PROPERTIES, PROPERTIES, SYSTEM_PROPERTIES, build_property_bag_map};
pub use coerce::{BARE_PRECEDENCE, QUOTED_PRECEDENCE, to_json_value, try_coerce, try_infer};
pub use serializer::EntityJsonSerializer;
pub use type_map::PropertyTypeMap;
