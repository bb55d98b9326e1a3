//! Per-request context threaded through the stores.

use adstore_core::{EntityFilter, EntityId};

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub storage_account_name: String,
    /// Company whose table the request addresses.
    pub parent_entity_id: Option<EntityId>,
    /// Authenticated user, recorded as `LastModifiedUser` on writes.
    pub user_id: Option<String>,
    pub filter: EntityFilter,
}

impl RequestContext {
    pub fn new(storage_account_name: impl Into<String>) -> Self {
        Self {
            storage_account_name: storage_account_name.into(),
            parent_entity_id: None,
            user_id: None,
            filter: EntityFilter::default_only(),
        }
    }

    pub fn with_parent(mut self, parent_entity_id: EntityId) -> Self {
        self.parent_entity_id = Some(parent_entity_id);
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_filter(mut self, filter: EntityFilter) -> Self {
        self.filter = filter;
        self
    }
}
