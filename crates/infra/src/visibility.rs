//! Access-control fan-out over candidate entities.

use rayon::prelude::*;

use adstore_core::RawEntity;

use crate::context::RequestContext;

/// Authorization predicate. It may be invoked concurrently, and more than
/// once for the same entity.
pub trait ResourceAccessHandler: Send + Sync {
    fn check_access(&self, context: &RequestContext, entity: &RawEntity) -> bool;
}

/// Grants everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllAccess;

impl ResourceAccessHandler for AllowAllAccess {
    fn check_access(&self, _context: &RequestContext, _entity: &RawEntity) -> bool {
        true
    }
}

/// Entities the handler lets the caller see. Output order is unspecified.
pub fn filter_visible(
    entities: &[RawEntity],
    handler: &dyn ResourceAccessHandler,
    context: &RequestContext,
) -> Vec<RawEntity> {
    let visible: Vec<RawEntity> = entities
        .par_iter()
        .filter(|entity| handler.check_access(context, entity))
        .cloned()
        .collect();
    tracing::debug!(candidates = entities.len(), visible = visible.len(), "visibility check complete");
    visible
}
