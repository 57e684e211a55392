//! tristore core - RDF quad layouts, pattern ranges, and subject joins.
//!
//! Quads are stored three times, once per [`TableLayout`] (SPO, PO, OSP),
//! in ordered key-value tables. A [`TriplePatternStrategy`] turns a partially
//! bound pattern into one contiguous key range of the right layout, the
//! [`QueryEngine`] scans and decodes it, and [`HashJoin`] / [`IterativeJoin`]
//! intersect subjects across patterns. The [`CardinalityEstimator`] orders
//! joins from collected statistics.

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod codec;
pub mod error;
pub mod iter;
pub mod model;
pub mod query;
pub mod storage;
pub mod strategy;

pub use codec::{EncodedRow, TableLayout, TripleCodec, TypeRegistry};
pub use error::Error;
pub use iter::{close_all, CloseableIterator};
pub use model::{Iri, PatternTerm, Quad, QuadFragment, TriplePattern, Value, ValueRange};
pub use query::{
    CardinalityEstimator, HashJoin, IterativeJoin, Join, JoinAlgorithm, JoinResults, QueryEngine,
    QueryPlan,
};
pub use storage::{QuadIndexer, SledStore, StorageConfig, TableStore};
pub use strategy::{ByteRange, RowRegex, TriplePatternStrategy};
