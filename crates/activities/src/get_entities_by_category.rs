//! List the active entities of a category the caller may see.

use std::sync::Arc;

use adstore_core::EntityCategory;
use adstore_infra::{AllowAllAccess, Repository, ResourceAccessHandler, filter_visible};
use adstore_json::EntityJsonSerializer;

use crate::activity::{
    Activity, ActivityRequest, ActivityResult, ENTITIES_RESULT, ENTITY_CATEGORY_FILTER, EXTERNAL_TYPE_FILTER,
    single_value,
};
use crate::error::ActivityError;

pub struct GetEntitiesByCategoryActivity<R> {
    repository: R,
    serializer: EntityJsonSerializer,
    storage_account_name: String,
    access: Arc<dyn ResourceAccessHandler>,
}

impl<R: Repository> GetEntitiesByCategoryActivity<R> {
    pub fn new(repository: R, serializer: EntityJsonSerializer, storage_account_name: impl Into<String>) -> Self {
        Self {
            repository,
            serializer,
            storage_account_name: storage_account_name.into(),
            access: Arc::new(AllowAllAccess),
        }
    }

    pub fn with_access_handler(mut self, access: Arc<dyn ResourceAccessHandler>) -> Self {
        self.access = access;
        self
    }

    fn run(&self, request: &ActivityRequest) -> ActivityResult {
        let category: EntityCategory = request
            .query(ENTITY_CATEGORY_FILTER)
            .ok_or_else(|| ActivityError::invalid_request(format!("{ENTITY_CATEGORY_FILTER} is required")))?
            .parse()
            .map_err(ActivityError::from_query_error)?;
        let external_type = request.query(EXTERNAL_TYPE_FILTER);
        let context = request.context(&self.storage_account_name)?;

        let candidates = self
            .repository
            .get_entities_by_category(&context, category, external_type)?;
        let mut visible = filter_visible(&candidates, self.access.as_ref(), &context);
        // Paging windows need a stable order.
        visible.sort_by_key(|entity| entity.external_entity_id);

        let json = self
            .serializer
            .serialize_collection(&visible, &context.filter)
            .map_err(ActivityError::from_query_error)?;
        tracing::debug!(%category, candidates = candidates.len(), visible = visible.len(), "listed entities");
        Ok(single_value(ENTITIES_RESULT, json))
    }
}

impl<R: Repository> Activity for GetEntitiesByCategoryActivity<R> {
    fn name(&self) -> &'static str {
        "GetEntitiesByCategory"
    }

    fn process(&self, request: &ActivityRequest) -> ActivityResult {
        self.run(request).inspect_err(|err| {
            tracing::warn!(activity = self.name(), error = %err, "activity failed");
        })
    }
}
