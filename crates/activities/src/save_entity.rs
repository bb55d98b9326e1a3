//! Create or update an entity from a JSON payload.

use adstore_core::{EntityFilter, EntityId};
use adstore_infra::Repository;
use adstore_json::EntityJsonSerializer;

use crate::activity::{Activity, ActivityRequest, ActivityResult, ENTITY_RESULT, PAYLOAD, single_value};
use crate::error::ActivityError;

/// The payload is read through the request's filter, so tiers the caller did
/// not ask for are neither parsed nor touched on update. The response echoes
/// the saved entity under the same tiers, without the query constraints.
pub struct SaveEntityActivity<R> {
    repository: R,
    serializer: EntityJsonSerializer,
    storage_account_name: String,
}

impl<R: Repository> SaveEntityActivity<R> {
    pub fn new(repository: R, serializer: EntityJsonSerializer, storage_account_name: impl Into<String>) -> Self {
        Self {
            repository,
            serializer,
            storage_account_name: storage_account_name.into(),
        }
    }

    fn run(&self, request: &ActivityRequest) -> ActivityResult {
        let payload = request
            .value(PAYLOAD)
            .ok_or_else(|| ActivityError::invalid_json(format!("{PAYLOAD} is required")))?;
        let context = request.context(&self.storage_account_name)?;
        let route_id = request.optional_entity_id()?;

        let mut entity = self.serializer.deserialize(payload, &context.filter)?;
        match (route_id, entity.external_entity_id) {
            (Some(route), Some(body)) if route != body => {
                return Err(ActivityError::invalid_entity_id(format!(
                    "payload id {body} does not match requested id {route}"
                )));
            }
            (Some(route), None) => entity.external_entity_id = Some(route),
            (None, None) => entity.external_entity_id = Some(EntityId::new()),
            _ => {}
        }

        tracing::info!(entity = %entity.describe(), "saving entity");
        let saved = self.repository.save_entity(&context, entity)?;

        let response_filter = EntityFilter::new(
            context.filter.filters().iter().copied(),
            context.filter.include_associations(),
        );
        let json = self.serializer.serialize(&saved, &response_filter)?;
        Ok(single_value(ENTITY_RESULT, json))
    }
}

impl<R: Repository> Activity for SaveEntityActivity<R> {
    fn name(&self) -> &'static str {
        "SaveEntity"
    }

    fn process(&self, request: &ActivityRequest) -> ActivityResult {
        self.run(request).inspect_err(|err| {
            tracing::warn!(activity = self.name(), error = %err, "activity failed");
        })
    }
}
