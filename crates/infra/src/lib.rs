//! Storage layer: store contracts, key construction, the row codec, the
//! in-memory backends and the repository that orchestrates them.

pub mod config;
pub mod context;
pub mod keys;
pub mod repository;
pub mod row;
pub mod store;
pub mod visibility;


pub use config::StoreConfig;
pub use context::RequestContext;
pub use keys::{BlobKeyFactory, CompanyPartitionRule, EntityIdPartitionRule, KeyRule, TableKeyFactory};
pub use repository::{EntityRepository, Repository, merge_entity};
pub use store::{
    BlobStore, EntityStore, InMemoryBlobStore, InMemoryEntityStore, InMemoryIndexStore, IndexStore,
    StorageKeyFactory,
};
pub use visibility::{AllowAllAccess, ResourceAccessHandler, filter_visible};

/// Repository over the in-memory backends.
pub type InMemoryRepository = EntityRepository<
    std::sync::Arc<InMemoryEntityStore>,
    std::sync::Arc<InMemoryIndexStore>,
    TableKeyFactory,
    InMemoryBlobStore,
>;

/// Wire a repository over fresh in-memory backends.
pub fn in_memory_repository(config: StoreConfig) -> InMemoryRepository {
    EntityRepository::new(
        config.clone(),
        std::sync::Arc::new(InMemoryEntityStore::new(config.storage_account_name.clone())),
        std::sync::Arc::new(InMemoryIndexStore::new()),
        TableKeyFactory::new(config.clone()),
        InMemoryBlobStore::new(BlobKeyFactory::new(config)),
    )
}
