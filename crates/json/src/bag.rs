//! Mapping between JSON bag names and property tiers.

use adstore_core::{EntityFilter, PropertyFilter};

pub const PROPERTIES: &str = "Properties";
pub const SYSTEM_PROPERTIES: &str = "SystemProperties";
pub const EXTENDED_PROPERTIES: &str = "ExtendedProperties";
pub const ASSOCIATIONS: &str = "Associations";

/// Bag name → tier for every tier the filter enables, in wire order.
///
/// Both the serializer and the deserializer read the bag layout from here so
/// the wire shape and the in-memory tiers cannot drift apart.
pub fn build_property_bag_map(filter: &EntityFilter) -> Vec<(&'static str, PropertyFilter)> {
    let mut map = vec![(PROPERTIES, PropertyFilter::Default)];
    if filter.includes(PropertyFilter::System) {
        map.push((SYSTEM_PROPERTIES, PropertyFilter::System));
    }
    if filter.includes(PropertyFilter::Extended) {
        map.push((EXTENDED_PROPERTIES, PropertyFilter::Extended));
    }
    map
}

/// Every bag name, whatever tiers are enabled.
pub fn is_bag_name(name: &str) -> bool {
    matches!(name, PROPERTIES | SYSTEM_PROPERTIES | EXTENDED_PROPERTIES)
}
