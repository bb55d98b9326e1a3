//! Row codec: an entity as the flat row of named cells a table backend keeps.
//!
//! Column names are storage-encoded from schema version 1 on. Each
//! association group is one column named after its compound key:
//!
//! ```text
//! Assoc_<ExternalName>_<TargetEntityCategory>_<TargetExternalType>_<AssociationType>
//! ```
//!
//! where a segment is `N` when unset or `S` followed by the Azure-encoded
//! value. Escapes in an encoded value are `_` plus four hex digits, so a `_`
//! followed by `N` or `S` is always a separator. The cell holds the group's
//! targets as a JSON array.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use adstore_core::{
    AZURE_NAME_ENCODER, Association, AssociationGroupKey, AssociationType, DataAccessError, DataAccessResult,
    EntityId, EntityProperty, PropertyFilter, PropertyType, PropertyValue, RawEntity, StorageKey,
    decode_storage_name, encode_storage_name, group_associations, interface_property,
};

pub const ASSOCIATION_COLUMN_PREFIX: &str = "Assoc_";

const UNSET_SEGMENT: char = 'N';
const SET_SEGMENT: char = 'S';

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowCell {
    pub value: String,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    pub filter: PropertyFilter,
    pub blob_ref: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRow {
    pub key: StorageKey,
    pub schema_version: i32,
    pub columns: Vec<(String, RowCell)>,
}

impl EntityRow {
    pub fn cell(&self, column: &str) -> Option<&RowCell> {
        self.columns.iter().find(|(name, _)| name == column).map(|(_, cell)| cell)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AssociationTarget {
    target_entity_id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

fn column_name(schema_version: i32, name: &str) -> String {
    if schema_version >= 1 {
        encode_storage_name(name)
    } else {
        name.to_string()
    }
}

pub fn encode_row(entity: &RawEntity) -> DataAccessResult<EntityRow> {
    let key = entity.key.clone().ok_or_else(|| {
        DataAccessError::data_access(format!("entity {} has no storage key", entity.describe()))
    })?;
    if let Some(name) = entity.duplicate_property_name() {
        return Err(DataAccessError::invalid_argument(format!("duplicate property name '{name}'")));
    }

    let schema_version = entity.schema_version;
    let mut columns = Vec::with_capacity(entity.properties.len() + 9);

    for (name, value) in entity.interface_values() {
        columns.push((
            column_name(schema_version, name),
            RowCell {
                value: value.serialization_value(),
                property_type: value.property_type(),
                filter: PropertyFilter::Default,
                blob_ref: false,
            },
        ));
    }

    for property in &entity.properties {
        if interface_property(&property.name).is_some() {
            return Err(DataAccessError::invalid_argument(format!(
                "property name '{}' is reserved for an interface field",
                property.name
            )));
        }
        if schema_version < 1 && property.name.starts_with(ASSOCIATION_COLUMN_PREFIX) {
            return Err(DataAccessError::invalid_argument(format!(
                "property name '{}' collides with association columns",
                property.name
            )));
        }
        columns.push((
            column_name(schema_version, &property.name),
            RowCell {
                value: property.value.serialization_value(),
                property_type: property.property_type(),
                filter: property.filter,
                blob_ref: property.is_blob_ref,
            },
        ));
    }

    for (group, members) in group_associations(&entity.associations) {
        let targets: Vec<AssociationTarget> = members
            .iter()
            .map(|a| AssociationTarget {
                target_entity_id: a.target_entity_id,
                details: a.details.clone(),
            })
            .collect();
        let value = serde_json::to_string(&targets)
            .map_err(|e| DataAccessError::data_access(format!("association encoding failed: {e}")))?;
        columns.push((
            association_column_name(&group),
            RowCell {
                value,
                property_type: PropertyType::String,
                filter: PropertyFilter::Default,
                blob_ref: false,
            },
        ));
    }

    Ok(EntityRow {
        key,
        schema_version,
        columns,
    })
}

pub fn decode_row(row: &EntityRow) -> DataAccessResult<RawEntity> {
    let mut entity = RawEntity {
        key: Some(row.key.clone()),
        ..RawEntity::default()
    };
    let mut seen = HashSet::new();

    for (column, cell) in &row.columns {
        if !seen.insert(column.as_str()) {
            return Err(DataAccessError::data_access(format!("duplicate column '{column}' in row")));
        }

        if let Some(encoded_key) = column.strip_prefix(ASSOCIATION_COLUMN_PREFIX) {
            entity.associations.extend(decode_association_column(encoded_key, &cell.value)?);
            continue;
        }

        let name = if row.schema_version >= 1 {
            decode_storage_name(column)
                .map_err(|e| DataAccessError::data_access(format!("malformed column name '{column}': {e}")))?
        } else {
            column.clone()
        };
        let value = PropertyValue::parse(cell.property_type, &cell.value)
            .map_err(|e| DataAccessError::data_access(format!("malformed value in column '{name}': {e}")))?;

        match interface_property(&name) {
            Some(field) => field
                .set(&mut entity, value)
                .map_err(|e| DataAccessError::data_access(format!("malformed interface column '{name}': {e}")))?,
            None => entity.properties.push(EntityProperty {
                name,
                value,
                filter: cell.filter,
                is_blob_ref: cell.blob_ref,
            }),
        }
    }
    Ok(entity)
}

pub fn association_column_name(group: &AssociationGroupKey) -> String {
    let segments = [
        group.external_name.as_deref(),
        group.target_entity_category.as_deref(),
        group.target_external_type.as_deref(),
        group.association_type.map(|t| t.as_str()),
    ];
    let encoded: Vec<String> = segments
        .iter()
        .map(|segment| match segment {
            None => UNSET_SEGMENT.to_string(),
            Some(value) => format!("{SET_SEGMENT}{}", AZURE_NAME_ENCODER.encode(value)),
        })
        .collect();
    format!("{ASSOCIATION_COLUMN_PREFIX}{}", encoded.join("_"))
}

fn parse_association_column(encoded: &str) -> DataAccessResult<AssociationGroupKey> {
    let malformed = || DataAccessError::data_access(format!("malformed association column '{encoded}'"));
    let bytes = encoded.as_bytes();
    let mut pos = 0;
    let mut segments: Vec<Option<String>> = Vec::with_capacity(4);

    for index in 0..4 {
        if index > 0 {
            if bytes.get(pos) != Some(&b'_') {
                return Err(malformed());
            }
            pos += 1;
        }
        match bytes.get(pos).map(|b| *b as char) {
            Some(UNSET_SEGMENT) => {
                segments.push(None);
                pos += 1;
            }
            Some(SET_SEGMENT) => {
                pos += 1;
                let start = pos;
                while pos < bytes.len() {
                    if bytes[pos] == b'_' {
                        match bytes.get(pos + 1) {
                            Some(b) if b.is_ascii_hexdigit() => pos += 5,
                            _ => break,
                        }
                    } else {
                        pos += 1;
                    }
                }
                let raw = encoded.get(start..pos.min(bytes.len())).ok_or_else(malformed)?;
                let value = AZURE_NAME_ENCODER.decode(raw).map_err(|_| malformed())?;
                segments.push(Some(value));
            }
            _ => return Err(malformed()),
        }
    }
    if pos != bytes.len() {
        return Err(malformed());
    }

    let association_type = match segments[3].take() {
        Some(text) => Some(text.parse::<AssociationType>().map_err(|_| malformed())?),
        None => None,
    };
    Ok(AssociationGroupKey {
        external_name: segments[0].take(),
        target_entity_category: segments[1].take(),
        target_external_type: segments[2].take(),
        association_type,
    })
}

fn decode_association_column(encoded: &str, value: &str) -> DataAccessResult<Vec<Association>> {
    let group = parse_association_column(encoded)?;
    let targets: Vec<AssociationTarget> = serde_json::from_str(value).map_err(|e| {
        DataAccessError::data_access(format!("malformed association targets in '{encoded}': {e}"))
    })?;
    Ok(targets
        .into_iter()
        .map(|target| Association {
            external_name: group.external_name.clone(),
            target_entity_id: target.target_entity_id,
            target_entity_category: group.target_entity_category.clone(),
            target_external_type: group.target_external_type.clone(),
            association_type: group.association_type,
            details: target.details,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use adstore_core::{EntityCategory, TableKey};
    use proptest::prelude::*;

    fn key() -> StorageKey {
        StorageKey::Table(TableKey {
            partition: Some("p".into()),
            row_id: Some("r".into()),
            ..TableKey::partial("acct", "company1")
        })
    }

    fn entity(schema_version: i32) -> RawEntity {
        let mut entity = RawEntity::new(EntityId::from_i32(11), EntityCategory::Creative);
        entity.schema_version = schema_version;
        entity.key = Some(key());
        entity.external_type = Some("Banner".into());
        entity.properties.push(EntityProperty::new("Width_px", 300));
        entity.properties.push(EntityProperty::system("ad server", "alpha"));
        entity
            .properties
            .push(EntityProperty::blob_ref("Image", EntityId::from_i32(12), PropertyFilter::Extended));
        entity.associations.push(
            Association::new("Owner_Campaign", EntityId::from_i32(1))
                .with_category("Campaign")
                .with_type(AssociationType::Relationship)
                .with_details("primary"),
        );
        entity.associations.push(Association::to_target(EntityId::from_i32(2)));
        entity.associations.push(Association::to_target(EntityId::from_i32(3)));
        entity
    }

    #[test]
    fn row_round_trip_restores_entity() {
        for schema_version in [0, 1] {
            let original = entity(schema_version);
            let row = encode_row(&original).unwrap();
            assert_eq!(decode_row(&row).unwrap(), original);
        }
    }

    #[test]
    fn schema_one_encodes_column_names() {
        let row = encode_row(&entity(1)).unwrap();
        assert!(row.cell("Width.005F005Fpx").is_some());
        assert!(row.cell("Width_px").is_none());

        let row = encode_row(&entity(0)).unwrap();
        assert!(row.cell("Width_px").is_some());
    }

    #[test]
    fn association_column_names_mark_unset_segments() {
        let group = Association::to_target(EntityId::from_i32(1)).group_key();
        assert_eq!(association_column_name(&group), "Assoc_N_N_N_N");

        let group = Association::new("a_b", EntityId::from_i32(1)).with_category("").group_key();
        assert_eq!(association_column_name(&group), "Assoc_Sa_005Fb_S_N_N");
        assert_eq!(parse_association_column("Sa_005Fb_S_N_N").unwrap(), group);
    }

    #[test]
    fn malformed_association_columns_are_rejected() {
        for bad in ["", "N_N_N", "N_N_N_N_N", "X_N_N_N", "N_N_N_SBogus", "Sa_00_N_N_N"] {
            assert!(
                matches!(parse_association_column(bad), Err(DataAccessError::DataAccess(_))),
                "{bad}"
            );
        }
        let mut row = encode_row(&entity(1)).unwrap();
        row.columns.push(("Assoc_N_N_N_N".into(), row.columns[0].1.clone()));
        assert!(decode_row(&row).is_err());
    }

    #[test]
    fn reserved_property_names_are_rejected() {
        let mut e = entity(1);
        e.properties.push(EntityProperty::new("ExternalName", "x"));
        assert!(matches!(encode_row(&e), Err(DataAccessError::InvalidArgument(_))));

        let mut e = entity(0);
        e.properties.push(EntityProperty::new("Assoc_fake", "x"));
        assert!(encode_row(&e).is_err());
    }

    #[test]
    fn bad_cell_values_are_data_access_errors() {
        let mut row = encode_row(&entity(1)).unwrap();
        row.columns.push((
            "Broken".into(),
            RowCell {
                value: "not-a-number".into(),
                property_type: PropertyType::Int32,
                filter: PropertyFilter::Default,
                blob_ref: false,
            },
        ));
        assert!(matches!(decode_row(&row), Err(DataAccessError::DataAccess(_))));
    }

    proptest! {
        #[test]
        fn association_column_names_round_trip(
            name in proptest::option::of(".*"),
            category in proptest::option::of(".*"),
            external_type in proptest::option::of(".*"),
        ) {
            let group = AssociationGroupKey {
                external_name: name,
                target_entity_category: category,
                target_external_type: external_type,
                association_type: Some(AssociationType::Child),
            };
            let column = association_column_name(&group);
            let encoded = column.strip_prefix(ASSOCIATION_COLUMN_PREFIX).unwrap();
            prop_assert_eq!(parse_association_column(encoded).unwrap(), group);
        }
    }
}
