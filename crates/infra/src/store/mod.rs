//! Store contracts and their in-memory implementations.

pub mod blob_store;
pub mod entity_store;
pub mod index_store;
pub mod r#trait;

pub use blob_store::InMemoryBlobStore;
pub use entity_store::InMemoryEntityStore;
pub use index_store::InMemoryIndexStore;
pub use r#trait::{BlobStore, EntityStore, IndexStore, StorageKeyFactory};
