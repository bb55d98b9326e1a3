//! Entity ⇄ JSON.
//!
//! Wire shape: interface fields flat at the top level, one sub-object per
//! enabled tier (`Properties`, `SystemProperties`, `ExtendedProperties`) and,
//! when associations are enabled, an `Associations` object keyed by external
//! name whose members are a single association object or an array of them.

use std::collections::HashSet;
use std::fmt;

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde_json::{Map, Number, Value};

use adstore_core::{
    Association, AssociationType, DataAccessError, DataAccessResult, EntityFilter, EntityProperty,
    PropertyValue, RawEntity, interface_property,
};

use crate::bag::{ASSOCIATIONS, build_property_bag_map, is_bag_name};
use crate::coerce::{to_json_value, try_coerce, try_infer};
use crate::type_map::PropertyTypeMap;

pub const TARGET_ENTITY_ID: &str = "TargetEntityId";
pub const TARGET_ENTITY_CATEGORY: &str = "TargetEntityCategory";
pub const TARGET_EXTERNAL_TYPE: &str = "TargetExternalType";
pub const ASSOCIATION_TYPE: &str = "AssociationType";
pub const DETAILS: &str = "Details";

#[derive(Debug, Clone, Default)]
pub struct EntityJsonSerializer {
    type_map: PropertyTypeMap,
}

impl EntityJsonSerializer {
    pub fn new(type_map: PropertyTypeMap) -> Self {
        Self { type_map }
    }

    pub fn type_map(&self) -> &PropertyTypeMap {
        &self.type_map
    }

    /// Serialize `entity`, failing with `InvalidArgument` when the filter's
    /// query constraints reject it.
    pub fn serialize(&self, entity: &RawEntity, filter: &EntityFilter) -> DataAccessResult<String> {
        match self.try_serialize(entity, filter)? {
            Some(json) => Ok(json),
            None => {
                let err = DataAccessError::invalid_argument(format!(
                    "entity {} does not match the query constraints",
                    entity.describe()
                ));
                tracing::error!(entity = %entity.describe(), error = %err, "entity serialization rejected");
                Err(err)
            }
        }
    }

    /// `Ok(None)` when the query constraints reject the entity; no partial
    /// JSON is ever produced.
    pub fn try_serialize(&self, entity: &RawEntity, filter: &EntityFilter) -> DataAccessResult<Option<String>> {
        let result = self.serialize_inner(entity, filter);
        if let Err(err) = &result {
            tracing::error!(entity = %entity.describe(), error = %err, "entity serialization failed");
        }
        result
    }

    fn serialize_inner(&self, entity: &RawEntity, filter: &EntityFilter) -> DataAccessResult<Option<String>> {
        if !filter.queries().check_property_regex_match(entity)? {
            tracing::debug!(entity = %entity.describe(), "entity filtered out by query constraints");
            return Ok(None);
        }
        let root = self.to_json_map(entity, filter)?;
        let json = serde_json::to_string(&Value::Object(root))
            .map_err(|e| DataAccessError::invalid_argument(format!("json encoding failed: {e}")))?;
        Ok(Some(json))
    }

    /// Structured form of [`serialize`](Self::serialize), without the query gate.
    pub fn to_json_map(&self, entity: &RawEntity, filter: &EntityFilter) -> DataAccessResult<Map<String, Value>> {
        let mut root = Map::new();
        for (name, value) in entity.interface_values() {
            root.insert(name.to_string(), to_json_value(&value)?);
        }

        if let Some(name) = entity.duplicate_property_name() {
            return Err(DataAccessError::invalid_argument(format!(
                "duplicate property name '{name}'"
            )));
        }

        for (bag, tier) in build_property_bag_map(filter) {
            let mut members = Map::new();
            for property in entity.properties_in(tier) {
                members.insert(property.name.clone(), to_json_value(&property.value)?);
            }
            root.insert(bag.to_string(), Value::Object(members));
        }

        if filter.include_associations() && !entity.associations.is_empty() {
            let associations = associations_to_json(&entity.associations, filter)?;
            if !associations.is_empty() {
                root.insert(ASSOCIATIONS.to_string(), Value::Object(associations));
            }
        }
        Ok(root)
    }

    pub fn deserialize(&self, json: &str, filter: &EntityFilter) -> DataAccessResult<RawEntity> {
        let mut entity = RawEntity::default();
        match self.deserialize_into(json, filter, &mut entity) {
            Ok(()) => Ok(entity),
            Err(err) => {
                tracing::error!(entity = %entity.describe(), error = %err, "entity deserialization failed");
                Err(err)
            }
        }
    }

    fn deserialize_into(&self, json: &str, filter: &EntityFilter, entity: &mut RawEntity) -> DataAccessResult<()> {
        let members: OrderedMembers = serde_json::from_str(json)
            .map_err(|e| DataAccessError::invalid_argument(format!("invalid entity json: {e}")))?;

        let bag_map = build_property_bag_map(filter);
        let mut seen = HashSet::new();

        for (name, value) in members.0 {
            let reserved = interface_property(&name).is_some() || is_bag_name(&name) || name == ASSOCIATIONS;
            if reserved && !seen.insert(name.clone()) {
                return Err(DataAccessError::invalid_argument(format!(
                    "duplicate member '{name}' in entity json"
                )));
            }

            if let Some(field) = interface_property(&name) {
                let value = value.into_value();
                let coerced = try_coerce(field.property_type, &value).ok_or_else(|| {
                    DataAccessError::invalid_argument(format!(
                        "'{value}' is not a valid {} value for {name}",
                        field.property_type
                    ))
                })?;
                field.set(entity, coerced)?;
            } else if let Some((_, tier)) = bag_map.iter().find(|(bag, _)| *bag == name) {
                let MemberValue::Object(bag) = value else {
                    tracing::debug!(bag = %name, "skipping property bag that is not an object");
                    continue;
                };
                if let Some(duplicate) = duplicate_key(&bag) {
                    return Err(DataAccessError::invalid_argument(format!(
                        "duplicate property '{duplicate}' in {name}"
                    )));
                }
                for (property_name, raw) in bag {
                    let value = self.resolve_value(&property_name, &raw).ok_or_else(|| {
                        DataAccessError::invalid_argument(format!(
                            "no valid value for property '{property_name}'"
                        ))
                    })?;
                    entity
                        .properties
                        .push(EntityProperty::with_filter(property_name, value, *tier));
                }
            } else if name == ASSOCIATIONS {
                if !filter.include_associations() {
                    continue;
                }
                let MemberValue::Object(groups) = value else {
                    tracing::debug!("skipping Associations member that is not an object");
                    continue;
                };
                if let Some(duplicate) = duplicate_key(&groups) {
                    return Err(DataAccessError::invalid_argument(format!(
                        "duplicate association group '{duplicate}'"
                    )));
                }
                entity.associations.extend(associations_from_json(groups)?);
            } else {
                tracing::debug!(member = %name, "ignoring unknown entity json member");
            }
        }

        if let Some(name) = entity.duplicate_property_name() {
            return Err(DataAccessError::invalid_argument(format!(
                "duplicate property name '{name}'"
            )));
        }
        Ok(())
    }

    /// Schema type when the name is well known, otherwise type precedence.
    fn resolve_value(&self, name: &str, raw: &Value) -> Option<PropertyValue> {
        match self.type_map.get(name) {
            Some(ty) => try_coerce(ty, raw),
            None => try_infer(raw),
        }
    }
}

fn associations_to_json(associations: &[Association], filter: &EntityFilter) -> DataAccessResult<Map<String, Value>> {
    let mut groups: Vec<(String, Vec<&Association>)> = Vec::new();
    for association in associations {
        let name = association.external_name.clone().unwrap_or_default();
        match groups.iter_mut().find(|(n, _)| *n == name) {
            Some((_, members)) => members.push(association),
            None => groups.push((name, vec![association])),
        }
    }

    let mut out = Map::new();
    for (name, members) in groups {
        if !filter.queries().association_name_matches(&name)? {
            continue;
        }
        let value = match members.as_slice() {
            [single] => association_to_json(single),
            many => Value::Array(many.iter().map(|a| association_to_json(a)).collect()),
        };
        out.insert(name, value);
    }
    Ok(out)
}

fn association_to_json(association: &Association) -> Value {
    let mut obj = Map::new();
    obj.insert(TARGET_ENTITY_ID.to_string(), Value::String(association.target_entity_id.to_string()));
    if let Some(category) = &association.target_entity_category {
        obj.insert(TARGET_ENTITY_CATEGORY.to_string(), Value::String(category.clone()));
    }
    if let Some(external_type) = &association.target_external_type {
        obj.insert(TARGET_EXTERNAL_TYPE.to_string(), Value::String(external_type.clone()));
    }
    if let Some(association_type) = association.association_type {
        obj.insert(ASSOCIATION_TYPE.to_string(), Value::String(association_type.to_string()));
    }
    if let Some(details) = &association.details {
        obj.insert(DETAILS.to_string(), Value::String(details.clone()));
    }
    Value::Object(obj)
}

/// Each member is one association or an array of associations sharing the
/// member key as external name (the empty key meaning "no name").
fn associations_from_json(groups: Vec<(String, Value)>) -> DataAccessResult<Vec<Association>> {
    let mut associations = Vec::new();
    let mut malformed = Vec::new();

    for (key, member) in groups {
        let name = if key.is_empty() { None } else { Some(key.clone()) };
        if let Some(association) = association_from_json(name.clone(), &member) {
            associations.push(association);
            continue;
        }
        let parsed = match &member {
            Value::Array(items) => items
                .iter()
                .map(|item| association_from_json(name.clone(), item))
                .collect::<Option<Vec<_>>>(),
            _ => None,
        };
        match parsed {
            Some(list) => associations.extend(list),
            None => malformed.push(key),
        }
    }

    if !malformed.is_empty() {
        return Err(DataAccessError::invalid_argument(format!(
            "malformed associations: {}",
            malformed.join(", ")
        )));
    }
    Ok(associations)
}

fn association_from_json(external_name: Option<String>, value: &Value) -> Option<Association> {
    let Value::Object(obj) = value else {
        return None;
    };
    let target_entity_id = obj.get(TARGET_ENTITY_ID)?.as_str()?.parse().ok()?;

    let optional_string = |field: &str| -> Option<Option<String>> {
        match obj.get(field) {
            None | Some(Value::Null) => Some(None),
            Some(Value::String(s)) => Some(Some(s.clone())),
            Some(_) => None,
        }
    };
    let association_type = match optional_string(ASSOCIATION_TYPE)? {
        Some(text) => Some(text.parse::<AssociationType>().ok()?),
        None => None,
    };

    Some(Association {
        external_name,
        target_entity_id,
        target_entity_category: optional_string(TARGET_ENTITY_CATEGORY)?,
        target_external_type: optional_string(TARGET_EXTERNAL_TYPE)?,
        association_type,
        details: optional_string(DETAILS)?,
    })
}

fn duplicate_key(entries: &[(String, Value)]) -> Option<&str> {
    let mut seen = HashSet::new();
    entries
        .iter()
        .map(|(key, _)| key.as_str())
        .find(|key| !seen.insert(*key))
}

/// Top-level object members in input order, duplicates preserved.
struct OrderedMembers(Vec<(String, MemberValue)>);

/// A top-level member value. Object members keep their own keys in input
/// order, duplicates included; anything else is a plain JSON value.
enum MemberValue {
    Object(Vec<(String, Value)>),
    Other(Value),
}

impl MemberValue {
    /// Plain JSON form. A repeated object key keeps its last value.
    fn into_value(self) -> Value {
        match self {
            MemberValue::Object(entries) => Value::Object(entries.into_iter().collect()),
            MemberValue::Other(value) => value,
        }
    }
}

fn ordered_entries<'de, A>(mut map: A) -> Result<Vec<(String, Value)>, A::Error>
where
    A: MapAccess<'de>,
{
    let mut entries = Vec::new();
    while let Some((key, value)) = map.next_entry::<String, Value>()? {
        entries.push((key, value));
    }
    Ok(entries)
}

impl<'de> Deserialize<'de> for OrderedMembers {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct MembersVisitor;

        impl<'de> Visitor<'de> for MembersVisitor {
            type Value = OrderedMembers;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut members = Vec::new();
                while let Some((key, value)) = map.next_entry::<String, MemberValue>()? {
                    members.push((key, value));
                }
                Ok(OrderedMembers(members))
            }
        }

        deserializer.deserialize_map(MembersVisitor)
    }
}

impl<'de> Deserialize<'de> for MemberValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct MemberVisitor;

        impl<'de> Visitor<'de> for MemberVisitor {
            type Value = MemberValue;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON value")
            }

            fn visit_map<A>(self, map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                ordered_entries(map).map(MemberValue::Object)
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut items = Vec::new();
                while let Some(item) = seq.next_element::<Value>()? {
                    items.push(item);
                }
                Ok(MemberValue::Other(Value::Array(items)))
            }

            fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(MemberValue::Other(Value::Bool(v)))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(MemberValue::Other(Value::Number(v.into())))
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(MemberValue::Other(Value::Number(v.into())))
            }

            fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(MemberValue::Other(Number::from_f64(v).map_or(Value::Null, Value::Number)))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(MemberValue::Other(Value::String(v.to_string())))
            }

            fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(MemberValue::Other(Value::String(v)))
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(MemberValue::Other(Value::Null))
            }

            fn visit_none<E>(self) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(MemberValue::Other(Value::Null))
            }
        }

        deserializer.deserialize_any(MemberVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adstore_core::{EntityCategory, EntityId, PropertyFilter, QueryValues};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn sample_entity() -> RawEntity {
        let mut entity = RawEntity::new(EntityId::from_i32(100), EntityCategory::Campaign);
        entity.external_name = Some("Spring".into());
        entity.create_date = Some(Utc.with_ymd_and_hms(2021, 3, 1, 12, 0, 0).unwrap());
        entity.properties.push(EntityProperty::new("Budget", 250.5));
        entity.properties.push(EntityProperty::system("Owner", "ops"));
        entity.properties.push(EntityProperty::extended("Color", "blue"));
        entity.associations.push(
            Association::new("Advertiser", EntityId::from_i32(1))
                .with_category("Company")
                .with_type(AssociationType::Relationship),
        );
        entity.associations.push(
            Association::new("Creatives", EntityId::from_i32(2))
                .with_category("Creative")
                .with_type(AssociationType::Child),
        );
        entity.associations.push(
            Association::new("Creatives", EntityId::from_i32(3))
                .with_category("Creative")
                .with_type(AssociationType::Child),
        );
        entity
    }

    #[test]
    fn round_trip_with_all_tiers_and_associations() {
        let serializer = EntityJsonSerializer::default();
        let filter = EntityFilter::allow_all();
        let entity = sample_entity();

        let json = serializer.serialize(&entity, &filter).unwrap();
        let back = serializer.deserialize(&json, &filter).unwrap();

        assert_eq!(back.external_entity_id, entity.external_entity_id);
        assert_eq!(back.entity_category, entity.entity_category);
        assert_eq!(back.create_date, entity.create_date);
        assert_eq!(back.properties, entity.properties);
        assert_eq!(back.associations, entity.associations);
    }

    #[test]
    fn association_groups_serialize_as_object_or_array() {
        let serializer = EntityJsonSerializer::default();
        let map = serializer.to_json_map(&sample_entity(), &EntityFilter::allow_all()).unwrap();
        let associations = map[ASSOCIATIONS].as_object().unwrap();
        assert!(associations["Advertiser"].is_object());
        assert!(associations["Advertiser"].get("ExternalName").is_none());
        assert_eq!(associations["Creatives"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn hidden_tiers_and_associations_are_omitted() {
        let serializer = EntityJsonSerializer::default();
        let map = serializer.to_json_map(&sample_entity(), &EntityFilter::default_only()).unwrap();
        assert!(map.contains_key("Properties"));
        assert!(!map.contains_key("SystemProperties"));
        assert!(!map.contains_key("ExtendedProperties"));
        assert!(!map.contains_key(ASSOCIATIONS));
        assert_eq!(map["Properties"]["Budget"], json!(250.5));
        assert_eq!(map["ExternalEntityId"], json!(EntityId::from_i32(100).to_string()));
    }

    #[test]
    fn duplicate_property_names_fail() {
        let mut entity = sample_entity();
        entity.properties.push(EntityProperty::extended("Budget", 1.0));
        let err = EntityJsonSerializer::default()
            .serialize(&entity, &EntityFilter::allow_all())
            .unwrap_err();
        assert!(matches!(err, DataAccessError::InvalidArgument(_)));
    }

    #[test]
    fn regex_gate_rejects_without_partial_output() {
        let serializer = EntityJsonSerializer::default();
        let query: QueryValues = [("ExternalName".to_string(), "^Autumn".to_string())].into();
        let filter = EntityFilter::from_query(&query);
        assert_eq!(serializer.try_serialize(&sample_entity(), &filter).unwrap(), None);
        assert!(matches!(
            serializer.serialize(&sample_entity(), &filter),
            Err(DataAccessError::InvalidArgument(_))
        ));
    }

    #[test]
    fn association_query_filters_groups() {
        let serializer = EntityJsonSerializer::default();
        let query: QueryValues = [
            ("Flags".to_string(), "WithAssociations".to_string()),
            ("associations".to_string(), "^Creat".to_string()),
        ]
        .into();
        let filter = EntityFilter::from_query(&query);
        let map = serializer.to_json_map(&sample_entity(), &filter).unwrap();
        let associations = map[ASSOCIATIONS].as_object().unwrap();
        assert!(associations.contains_key("Creatives"));
        assert!(!associations.contains_key("Advertiser"));
    }

    #[test]
    fn string_properties_embed_structured_documents() {
        let mut entity = RawEntity::new(EntityId::from_i32(1), EntityCategory::Creative);
        entity.properties.push(EntityProperty::extended("Layout", r#" {"w": 300, "h": 250}"#));
        let filter = EntityFilter::allow_all();
        let map = EntityJsonSerializer::default().to_json_map(&entity, &filter).unwrap();
        assert_eq!(map["ExtendedProperties"]["Layout"], json!({"w": 300, "h": 250}));
    }

    #[test]
    fn deserialize_applies_type_precedence_and_schema() {
        let json = json!({
            "ExternalEntityId": EntityId::from_i32(5).to_string(),
            "EntityCategory": "Campaign",
            "Properties": {
                "Count": 42,
                "Launch": "2020-01-01T00:00:00Z",
                "Code": "42",
                "Budget": "99.5"
            }
        })
        .to_string();
        let entity = EntityJsonSerializer::default()
            .deserialize(&json, &EntityFilter::default_only())
            .unwrap();

        assert_eq!(entity.property_value("Count"), Some(&PropertyValue::Double(42.0)));
        assert!(matches!(entity.property_value("Launch"), Some(PropertyValue::Date(_))));
        assert_eq!(entity.property_value("Code"), Some(&PropertyValue::String("42".into())));
        assert_eq!(entity.property_value("Budget"), Some(&PropertyValue::Double(99.5)));
    }

    #[test]
    fn null_bag_values_are_rejected() {
        let json = r#"{"EntityCategory":"User","Properties":{"Nick":null}}"#;
        let err = EntityJsonSerializer::default()
            .deserialize(json, &EntityFilter::default_only())
            .unwrap_err();
        assert!(matches!(err, DataAccessError::InvalidArgument(_)));
    }

    #[test]
    fn duplicate_interface_members_fail() {
        let json = r#"{"ExternalName":"a","ExternalName":"b"}"#;
        assert!(EntityJsonSerializer::default()
            .deserialize(json, &EntityFilter::default_only())
            .is_err());
    }

    #[test]
    fn repeated_bag_properties_fail() {
        let json = r#"{"EntityCategory":"User","Properties":{"Nick":"a","Nick":"b"}}"#;
        let err = EntityJsonSerializer::default()
            .deserialize(json, &EntityFilter::default_only())
            .unwrap_err();
        let DataAccessError::InvalidArgument(msg) = err else { panic!("expected argument error") };
        assert!(msg.contains("Nick"));
        assert!(msg.contains("Properties"));
    }

    #[test]
    fn repeated_association_groups_fail() {
        let target = EntityId::from_i32(1);
        let json = format!(
            r#"{{"Associations":{{"X":{{"TargetEntityId":"{target}"}},"X":{{"TargetEntityId":"{target}"}}}}}}"#
        );
        let err = EntityJsonSerializer::default()
            .deserialize(&json, &EntityFilter::allow_all())
            .unwrap_err();
        let DataAccessError::InvalidArgument(msg) = err else { panic!("expected argument error") };
        assert!(msg.contains("'X'"));
    }

    #[test]
    fn member_order_survives_nested_scanning() {
        let json = r#"{"EntityCategory":"User","Properties":{"B":1,"A":[1,{"k":null}],"C":true}}"#;
        let entity = EntityJsonSerializer::default()
            .deserialize(json, &EntityFilter::default_only())
            .unwrap();
        let names: Vec<&str> = entity.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A", "C"]);
        assert_eq!(entity.property_value("A"), Some(&PropertyValue::String(r#"[1,{"k":null}]"#.into())));
        assert_eq!(entity.property_value("C"), Some(&PropertyValue::Bool(true)));
    }

    #[test]
    fn disabled_or_malformed_bags_are_skipped() {
        let json = r#"{"EntityCategory":"User","Properties":[1,2],"ExtendedProperties":{"Secret":"x"}}"#;
        let entity = EntityJsonSerializer::default()
            .deserialize(json, &EntityFilter::default_only())
            .unwrap();
        assert!(entity.properties.is_empty());

        let filter = EntityFilter::new([PropertyFilter::Extended], false);
        let entity = EntityJsonSerializer::default().deserialize(json, &filter).unwrap();
        assert_eq!(entity.properties_in(PropertyFilter::Extended).count(), 1);
    }

    #[test]
    fn malformed_associations_name_the_offending_keys() {
        let json = json!({
            "Associations": {
                "Good": {"TargetEntityId": EntityId::from_i32(1).to_string()},
                "Bad": 5,
                "AlsoBad": [{"TargetEntityId": "nope"}]
            }
        })
        .to_string();
        let err = EntityJsonSerializer::default()
            .deserialize(&json, &EntityFilter::allow_all())
            .unwrap_err();
        let DataAccessError::InvalidArgument(msg) = err else { panic!("expected argument error") };
        assert!(msg.contains("Bad"));
        assert!(msg.contains("AlsoBad"));
    }

    #[test]
    fn non_object_json_is_an_argument_error() {
        assert!(matches!(
            EntityJsonSerializer::default().deserialize("[1]", &EntityFilter::default_only()),
            Err(DataAccessError::InvalidArgument(_))
        ));
    }
}
