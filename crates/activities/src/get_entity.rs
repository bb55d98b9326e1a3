//! Fetch one entity, optionally pinned to a historical version.

use adstore_infra::Repository;
use adstore_json::EntityJsonSerializer;

use crate::activity::{Activity, ActivityRequest, ActivityResult, ENTITY_RESULT, VERSION_FILTER, single_value};
use crate::error::{ActivityError, ActivityErrorId};

pub struct GetEntityActivity<R> {
    repository: R,
    serializer: EntityJsonSerializer,
    storage_account_name: String,
}

impl<R: Repository> GetEntityActivity<R> {
    pub fn new(repository: R, serializer: EntityJsonSerializer, storage_account_name: impl Into<String>) -> Self {
        Self {
            repository,
            serializer,
            storage_account_name: storage_account_name.into(),
        }
    }

    fn run(&self, request: &ActivityRequest) -> ActivityResult {
        let id = request.entity_id()?;
        let context = request.context(&self.storage_account_name)?;
        let version = request.query(VERSION_FILTER).map(parse_version).transpose()?;

        let entity = match version {
            Some(version) => self.repository.get_entity_version(&context, id, version)?,
            None => self.repository.get_entity(&context, id)?,
        };

        let json = self
            .serializer
            .try_serialize(&entity, &context.filter)
            .map_err(ActivityError::from_query_error)?
            .ok_or_else(|| {
                ActivityError::new(
                    ActivityErrorId::EntityNotFound,
                    format!("entity {id} does not match the query constraints"),
                )
            })?;
        Ok(single_value(ENTITY_RESULT, json))
    }
}

impl<R: Repository> Activity for GetEntityActivity<R> {
    fn name(&self) -> &'static str {
        "GetEntity"
    }

    fn process(&self, request: &ActivityRequest) -> ActivityResult {
        self.run(request).inspect_err(|err| {
            tracing::warn!(activity = self.name(), error = %err, "activity failed");
        })
    }
}

fn parse_version(raw: &str) -> Result<i32, ActivityError> {
    match raw.trim().parse::<i32>() {
        Ok(version) if version >= 0 => Ok(version),
        _ => Err(ActivityError::invalid_request(format!(
            "{VERSION_FILTER} must be a non-negative integer, got '{raw}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_filter_must_be_non_negative() {
        assert_eq!(parse_version(" 2 ").unwrap(), 2);
        assert_eq!(parse_version("-1").unwrap_err().error_id, ActivityErrorId::InvalidRequest);
        assert_eq!(parse_version("latest").unwrap_err().error_id, ActivityErrorId::InvalidRequest);
    }
}
