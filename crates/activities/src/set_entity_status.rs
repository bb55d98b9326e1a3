//! Activate or deactivate a batch of entities.

use adstore_core::EntityId;
use adstore_infra::Repository;

use crate::activity::{
    ACTIVE, Activity, ActivityRequest, ActivityResult, ENTITY_IDS, parse_entity_id, single_value,
};
use crate::error::ActivityError;

pub struct SetEntityStatusActivity<R> {
    repository: R,
    storage_account_name: String,
}

impl<R: Repository> SetEntityStatusActivity<R> {
    pub fn new(repository: R, storage_account_name: impl Into<String>) -> Self {
        Self {
            repository,
            storage_account_name: storage_account_name.into(),
        }
    }

    fn run(&self, request: &ActivityRequest) -> ActivityResult {
        let ids = requested_ids(request)?;
        let active = match request.value(ACTIVE).map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("true") => true,
            Some("false") => false,
            _ => return Err(ActivityError::invalid_request(format!("{ACTIVE} must be 'true' or 'false'"))),
        };
        let context = request.context(&self.storage_account_name)?;

        self.repository.set_entity_status(&context, &ids, active)?;
        tracing::info!(count = ids.len(), active, "entity status updated");
        Ok(single_value(ACTIVE, active.to_string()))
    }
}

impl<R: Repository> Activity for SetEntityStatusActivity<R> {
    fn name(&self) -> &'static str {
        "SetEntityStatus"
    }

    fn process(&self, request: &ActivityRequest) -> ActivityResult {
        self.run(request).inspect_err(|err| {
            tracing::warn!(activity = self.name(), error = %err, "activity failed");
        })
    }
}

/// `EntityIds` (comma separated) or, failing that, a single `EntityId`.
fn requested_ids(request: &ActivityRequest) -> Result<Vec<EntityId>, ActivityError> {
    let Some(raw) = request.value(ENTITY_IDS) else {
        return Ok(vec![request.entity_id()?]);
    };
    let ids = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_entity_id)
        .collect::<Result<Vec<_>, _>>()?;
    if ids.is_empty() {
        return Err(ActivityError::invalid_entity_id(format!("{ENTITY_IDS} names no entities")));
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::ENTITY_ID;
    use crate::error::ActivityErrorId;

    #[test]
    fn ids_come_from_the_list_or_the_single_value() {
        let a = EntityId::from_i32(1);
        let b = EntityId::from_i32(2);

        let listed = ActivityRequest::new().with_value(ENTITY_IDS, format!("{a}, {b},"));
        assert_eq!(requested_ids(&listed).unwrap(), vec![a, b]);

        let single = ActivityRequest::new().with_value(ENTITY_ID, a.to_string());
        assert_eq!(requested_ids(&single).unwrap(), vec![a]);

        let empty = ActivityRequest::new().with_value(ENTITY_IDS, " , ");
        assert_eq!(requested_ids(&empty).unwrap_err().error_id, ActivityErrorId::InvalidEntityId);

        let bad = ActivityRequest::new().with_value(ENTITY_IDS, format!("{a},zzz"));
        assert_eq!(requested_ids(&bad).unwrap_err().error_id, ActivityErrorId::InvalidEntityId);
    }
}
