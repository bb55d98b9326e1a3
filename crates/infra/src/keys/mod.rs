//! Storage key construction.

pub mod factory;
pub mod rule;

pub use factory::{BlobKeyFactory, TableKeyFactory};
pub use rule::{CompanyPartitionRule, EntityIdPartitionRule, KeyRule};
