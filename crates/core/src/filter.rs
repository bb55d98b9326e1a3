//! Entity filters: which property tiers and associations a (de)serialization
//! pass includes, plus ad-hoc regex constraints taken from query parameters.

use std::collections::BTreeMap;

use regex::Regex;

use crate::entity::{INTERFACE_PROPERTIES, RawEntity};
use crate::error::{DataAccessError, DataAccessResult};
use crate::property::PropertyFilter;

/// Request query parameters, as received.
pub type QueryValues = BTreeMap<String, String>;

pub const FLAGS_KEY: &str = "flags";
pub const ASSOCIATIONS_KEY: &str = "associations";
pub const NUM_OBJECTS_KEY: &str = "numobjects";
pub const TOP_KEY: &str = "top";
pub const SKIP_KEY: &str = "skip";

pub const WITH_SYSTEM_PROPERTIES: &str = "WithSystemProperties";
pub const WITH_EXTENDED_PROPERTIES: &str = "WithExtendedProperties";
pub const WITH_ASSOCIATIONS: &str = "WithAssociations";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityFilter {
    filters: Vec<PropertyFilter>,
    include_associations: bool,
    queries: EntityQueries,
}

impl EntityFilter {
    /// `Default` is always included, whatever `filters` holds.
    pub fn new(filters: impl IntoIterator<Item = PropertyFilter>, include_associations: bool) -> Self {
        let mut all = vec![PropertyFilter::Default];
        for f in filters {
            if !all.contains(&f) {
                all.push(f);
            }
        }
        Self {
            filters: all,
            include_associations,
            queries: EntityQueries::default(),
        }
    }

    pub fn default_only() -> Self {
        Self::new([], false)
    }

    pub fn allow_all() -> Self {
        Self::new([PropertyFilter::System, PropertyFilter::Extended], true)
    }

    /// Build a filter from query parameters.
    ///
    /// Flags are found by substring containment in the upper-cased `Flags`
    /// value, so a flag name embedded in a longer word still turns it on.
    pub fn from_query(query: &QueryValues) -> Self {
        let queries = EntityQueries::from_query(query);
        let flags = queries.get(FLAGS_KEY).unwrap_or_default().to_uppercase();

        let mut filters = Vec::new();
        if flags.contains(&WITH_SYSTEM_PROPERTIES.to_uppercase()) {
            filters.push(PropertyFilter::System);
        }
        if flags.contains(&WITH_EXTENDED_PROPERTIES.to_uppercase()) {
            filters.push(PropertyFilter::Extended);
        }
        let include_associations = flags.contains(&WITH_ASSOCIATIONS.to_uppercase());

        Self {
            queries,
            ..Self::new(filters, include_associations)
        }
    }

    pub fn with_queries(mut self, queries: EntityQueries) -> Self {
        self.queries = queries;
        self
    }

    pub fn filters(&self) -> &[PropertyFilter] {
        &self.filters
    }

    pub fn includes(&self, filter: PropertyFilter) -> bool {
        self.filters.contains(&filter)
    }

    pub fn include_associations(&self) -> bool {
        self.include_associations
    }

    pub fn queries(&self) -> &EntityQueries {
        &self.queries
    }
}

impl Default for EntityFilter {
    fn default() -> Self {
        Self::default_only()
    }
}

/// Ad-hoc query constraints, keyed by lower-cased parameter name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityQueries {
    values: BTreeMap<String, String>,
}

/// Skip-then-take paging window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Paging {
    pub skip: Option<usize>,
    pub take: Option<usize>,
}

impl Paging {
    pub fn is_empty(&self) -> bool {
        self.skip.is_none() && self.take.is_none()
    }
}

impl EntityQueries {
    pub fn from_query(query: &QueryValues) -> Self {
        Self {
            values: query
                .iter()
                .map(|(k, v)| (k.to_lowercase(), v.clone()))
                .collect(),
        }
    }

    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_lowercase(), value.into());
    }

    /// Case-insensitive lookup.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&key.to_lowercase()).map(String::as_str)
    }

    /// Every interface property named by a query key must regex-match that
    /// key's value. Unnamed properties are unconstrained; unset values match
    /// as the empty string.
    pub fn check_property_regex_match(&self, entity: &RawEntity) -> DataAccessResult<bool> {
        for property in INTERFACE_PROPERTIES.iter() {
            let Some(pattern) = self.values.get(&property.name.to_lowercase()) else {
                continue;
            };
            let value = property
                .get(entity)
                .map(|v| v.serialization_value())
                .unwrap_or_default();
            if !compile(property.name, pattern)?.is_match(&value) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Whether an association group with this external name may be emitted.
    pub fn association_name_matches(&self, external_name: &str) -> DataAccessResult<bool> {
        match self.values.get(ASSOCIATIONS_KEY) {
            Some(pattern) => Ok(compile(ASSOCIATIONS_KEY, pattern)?.is_match(external_name)),
            None => Ok(true),
        }
    }

    /// `numobjects` and `top` are synonyms for take; `numobjects` wins if both
    /// are present.
    pub fn paging(&self) -> DataAccessResult<Paging> {
        let take = match self.get(NUM_OBJECTS_KEY) {
            Some(v) => Some(parse_count(NUM_OBJECTS_KEY, v)?),
            None => self.get(TOP_KEY).map(|v| parse_count(TOP_KEY, v)).transpose()?,
        };
        let skip = self.get(SKIP_KEY).map(|v| parse_count(SKIP_KEY, v)).transpose()?;
        Ok(Paging { skip, take })
    }
}

fn compile(key: &str, pattern: &str) -> DataAccessResult<Regex> {
    Regex::new(pattern).map_err(|e| {
        DataAccessError::invalid_argument(format!("invalid query expression for '{key}': {e}"))
    })
}

fn parse_count(key: &str, value: &str) -> DataAccessResult<usize> {
    value.trim().parse().map_err(|_| {
        DataAccessError::invalid_argument(format!("query parameter '{key}' must be a non-negative integer"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityCategory;
    use crate::id::EntityId;

    fn query(pairs: &[(&str, &str)]) -> QueryValues {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn default_tier_is_always_present() {
        let filter = EntityFilter::from_query(&QueryValues::new());
        assert_eq!(filter.filters(), &[PropertyFilter::Default]);
        assert!(!filter.include_associations());
    }

    #[test]
    fn flags_enable_tiers_case_insensitively() {
        let filter = EntityFilter::from_query(&query(&[(
            "Flags",
            "withsystemproperties,WithAssociations",
        )]));
        assert!(filter.includes(PropertyFilter::System));
        assert!(!filter.includes(PropertyFilter::Extended));
        assert!(filter.include_associations());
    }

    // Known quirk: flags are matched by substring, so a flag embedded in a
    // longer word is still honoured.
    #[test]
    fn flags_match_by_substring() {
        let filter = EntityFilter::from_query(&query(&[("flags", "NoWithExtendedPropertiesPlease")]));
        assert!(filter.includes(PropertyFilter::Extended));
    }

    #[test]
    fn regex_gate_constrains_only_named_interface_properties() {
        let mut entity = RawEntity::new(EntityId::from_i32(1), EntityCategory::Campaign);
        entity.external_name = Some("Spring Sale".into());

        let pass = EntityQueries::from_query(&query(&[("ExternalName", "^Spring"), ("Budget", "^9")]));
        assert!(pass.check_property_regex_match(&entity).unwrap());

        let fail = EntityQueries::from_query(&query(&[("externalname", "^Spring"), ("entitycategory", "User")]));
        assert!(!fail.check_property_regex_match(&entity).unwrap());

        let unset = EntityQueries::from_query(&query(&[("externaltype", ".+")]));
        assert!(!unset.check_property_regex_match(&entity).unwrap());
    }

    #[test]
    fn invalid_regex_is_an_argument_error() {
        let entity = RawEntity::new(EntityId::from_i32(1), EntityCategory::Campaign);
        let queries = EntityQueries::from_query(&query(&[("ExternalName", "(")]));
        assert!(matches!(
            queries.check_property_regex_match(&entity),
            Err(DataAccessError::InvalidArgument(_))
        ));
    }

    #[test]
    fn association_names_filter() {
        let queries = EntityQueries::from_query(&query(&[("Associations", "^Creat")]));
        assert!(queries.association_name_matches("Creatives").unwrap());
        assert!(!queries.association_name_matches("Owners").unwrap());
        assert!(EntityQueries::default().association_name_matches("x").unwrap());
    }

    #[test]
    fn paging_parameters() {
        let q = EntityQueries::from_query(&query(&[("Top", "5"), ("SKIP", "2")]));
        assert_eq!(q.paging().unwrap(), Paging { skip: Some(2), take: Some(5) });

        let q = EntityQueries::from_query(&query(&[("numObjects", "3"), ("top", "9")]));
        assert_eq!(q.paging().unwrap().take, Some(3));

        assert!(EntityQueries::default().paging().unwrap().is_empty());
        let bad = EntityQueries::from_query(&query(&[("skip", "-1")]));
        assert!(bad.paging().is_err());
    }
}
