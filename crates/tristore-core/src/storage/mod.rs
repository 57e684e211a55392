//! Storage layer.
//!
//! The index only needs ordered tables with range scans and batched writes.
//! [`TableStore`] is that seam; [`SledStore`] implements it with one sled
//! tree per table.

mod config;
mod indexer;
mod sled_store;
mod store;

pub use config::StorageConfig;
pub use indexer::QuadIndexer;
pub use sled_store::SledStore;
pub use store::{KeyValue, Mutation, RowScan, TableBatch, TableStore};
