//! Associations: typed edges from one entity to another.

use core::fmt;
use core::str::FromStr;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::DataAccessError;
use crate::id::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AssociationType {
    Child,
    Relationship,
}

impl AssociationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssociationType::Child => "Child",
            AssociationType::Relationship => "Relationship",
        }
    }
}

impl fmt::Display for AssociationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssociationType {
    type Err = DataAccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("Child") {
            Ok(AssociationType::Child)
        } else if s.eq_ignore_ascii_case("Relationship") {
            Ok(AssociationType::Relationship)
        } else {
            Err(DataAccessError::invalid_argument(format!(
                "unknown association type '{s}'"
            )))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Association {
    pub external_name: Option<String>,
    pub target_entity_id: EntityId,
    pub target_entity_category: Option<String>,
    pub target_external_type: Option<String>,
    pub association_type: Option<AssociationType>,
    pub details: Option<String>,
}

impl Association {
    pub fn new(external_name: impl Into<String>, target_entity_id: EntityId) -> Self {
        Self {
            external_name: Some(external_name.into()),
            target_entity_id,
            target_entity_category: None,
            target_external_type: None,
            association_type: None,
            details: None,
        }
    }

    /// Association with every grouping field unset.
    pub fn to_target(target_entity_id: EntityId) -> Self {
        Self {
            external_name: None,
            target_entity_id,
            target_entity_category: None,
            target_external_type: None,
            association_type: None,
            details: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.target_entity_category = Some(category.into());
        self
    }

    pub fn with_external_type(mut self, external_type: impl Into<String>) -> Self {
        self.target_external_type = Some(external_type.into());
        self
    }

    pub fn with_type(mut self, association_type: AssociationType) -> Self {
        self.association_type = Some(association_type);
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn group_key(&self) -> AssociationGroupKey {
        AssociationGroupKey {
            external_name: self.external_name.clone(),
            target_entity_category: self.target_entity_category.clone(),
            target_external_type: self.target_external_type.clone(),
            association_type: self.association_type,
        }
    }
}

/// Compound key addressing one multi-valued association group.
///
/// An unset field is a value of its own: it equals other unset fields and
/// nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssociationGroupKey {
    pub external_name: Option<String>,
    pub target_entity_category: Option<String>,
    pub target_external_type: Option<String>,
    pub association_type: Option<AssociationType>,
}

impl AssociationGroupKey {
    pub fn matches(&self, association: &Association) -> bool {
        self.external_name == association.external_name
            && self.target_entity_category == association.target_entity_category
            && self.target_external_type == association.target_external_type
            && self.association_type == association.association_type
    }
}

/// Group associations by their compound key, in first-seen order.
pub fn group_associations(associations: &[Association]) -> Vec<(AssociationGroupKey, Vec<&Association>)> {
    let mut index: HashMap<AssociationGroupKey, usize> = HashMap::new();
    let mut groups: Vec<(AssociationGroupKey, Vec<&Association>)> = Vec::new();
    for association in associations {
        let key = association.group_key();
        match index.get(&key) {
            Some(&slot) => groups[slot].1.push(association),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, vec![association]));
            }
        }
    }
    groups
}
