//! Entity collections as a JSON array, honouring the filter's paging window.

use adstore_core::{DataAccessResult, EntityFilter, RawEntity};

use crate::serializer::EntityJsonSerializer;

impl EntityJsonSerializer {
    /// Serialize each entity and join the results into a JSON array.
    ///
    /// Entities the query constraints reject contribute nothing. Skip and
    /// take count positions in `entities` before rejected items are dropped,
    /// so a page may hold fewer than `take` items.
    pub fn serialize_collection<'a, I>(&self, entities: I, filter: &EntityFilter) -> DataAccessResult<String>
    where
        I: IntoIterator<Item = &'a RawEntity>,
    {
        let paging = filter.queries().paging()?;
        let window = entities
            .into_iter()
            .skip(paging.skip.unwrap_or(0))
            .take(paging.take.unwrap_or(usize::MAX));

        let mut items = Vec::new();
        for entity in window {
            if let Some(json) = self.try_serialize(entity, filter)? {
                items.push(json);
            }
        }
        tracing::debug!(count = items.len(), ?paging, "serialized entity collection");
        Ok(format!("[{}]", items.join(", ")))
    }
}
