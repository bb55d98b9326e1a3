//! The activity contract: a request of string values in, a result out.

use std::collections::BTreeMap;

use adstore_core::{EntityFilter, EntityId, QueryValues};
use adstore_infra::RequestContext;

use crate::error::ActivityError;

pub const PAYLOAD: &str = "Payload";
pub const ENTITY_ID: &str = "EntityId";
pub const ENTITY_IDS: &str = "EntityIds";
pub const PARENT_ENTITY_ID: &str = "ParentEntityId";
pub const AUTH_USER_ID: &str = "AuthUserId";
pub const ACTIVE: &str = "Active";

pub const ENTITY_CATEGORY_FILTER: &str = "EntityCategoryFilter";
pub const EXTERNAL_TYPE_FILTER: &str = "ExternalTypeFilter";
pub const VERSION_FILTER: &str = "VersionFilter";

pub const ENTITY_RESULT: &str = "Entity";
pub const ENTITIES_RESULT: &str = "Entities";

/// Values returned by a successful activity, keyed like request values.
pub type ActivityValues = BTreeMap<String, String>;

pub type ActivityResult = Result<ActivityValues, ActivityError>;

/// A request handler.
pub trait Activity: Send + Sync {
    fn name(&self) -> &'static str;

    fn process(&self, request: &ActivityRequest) -> ActivityResult;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityRequest {
    pub values: BTreeMap<String, String>,
    pub query_values: QueryValues,
}

impl ActivityRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_values.insert(key.into(), value.into());
        self
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Case-insensitive, like every other query lookup.
    pub fn query(&self, key: &str) -> Option<&str> {
        self.query_values
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn entity_id(&self) -> Result<EntityId, ActivityError> {
        let raw = self
            .value(ENTITY_ID)
            .ok_or_else(|| ActivityError::invalid_entity_id(format!("{ENTITY_ID} is required")))?;
        parse_entity_id(raw)
    }

    pub fn optional_entity_id(&self) -> Result<Option<EntityId>, ActivityError> {
        self.value(ENTITY_ID).map(parse_entity_id).transpose()
    }

    pub fn parent_entity_id(&self) -> Result<Option<EntityId>, ActivityError> {
        self.value(PARENT_ENTITY_ID).map(parse_entity_id).transpose()
    }

    /// Request context for `storage_account_name`, with the filter built from
    /// the query values.
    pub fn context(&self, storage_account_name: &str) -> Result<RequestContext, ActivityError> {
        let mut context =
            RequestContext::new(storage_account_name).with_filter(EntityFilter::from_query(&self.query_values));
        if let Some(parent) = self.parent_entity_id()? {
            context = context.with_parent(parent);
        }
        if let Some(user) = self.value(AUTH_USER_ID) {
            context = context.with_user(user);
        }
        Ok(context)
    }
}

pub(crate) fn parse_entity_id(raw: &str) -> Result<EntityId, ActivityError> {
    raw.parse()
        .map_err(|_| ActivityError::invalid_entity_id(format!("'{raw}' is not a valid entity id")))
}

pub(crate) fn single_value(key: &str, value: String) -> ActivityValues {
    let mut values = ActivityValues::new();
    values.insert(key.to_string(), value);
    values
}
