//! Subject joins over several triple patterns.
//!
//! Two algorithms answer the same questions:
//! - [`HashJoin`]: scans every pattern once and intersects subject sets in
//!   memory. Fast for modest result sets; the whole key set is resident.
//! - [`IterativeJoin`]: streams the first pattern and probes the rest per
//!   subject. Memory is bounded by the number of patterns.

mod hash;
mod iterative;

pub use hash::HashJoin;
pub use iterative::IterativeJoin;

use crate::error::Error;
use crate::iter::CloseableIterator;
use crate::model::{Iri, QuadFragment, Value};

use super::engine::QueryEngine;

/// Closeable stream of join results.
pub type JoinResults<T> = Box<dyn CloseableIterator<Item = Result<T, Error>> + Send>;

/// Joins that return every subject matching all given patterns.
///
/// Result sets agree across algorithms, the multiplicity does not:
/// [`HashJoin`] yields each subject once, while [`IterativeJoin`] can yield a
/// subject again from `join_predicates` when its rows for the first predicate
/// are separated by other subjects in PO order (several objects). Collect into
/// a set when duplicates matter. `join_predicate_objects` never repeats.
pub trait Join {
    /// Subjects having every predicate, as subject-only fragments.
    fn join_predicates(&self, predicates: &[Iri]) -> Result<JoinResults<QuadFragment>, Error>;

    /// Subjects having every `(predicate, object)` pair.
    fn join_predicate_objects(&self, pairs: &[(Iri, Value)]) -> Result<JoinResults<Iri>, Error>;
}

/// Caller-selected join algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinAlgorithm {
    /// In-memory round-counter intersection.
    Hash,
    /// Streaming nested loop with existence probes.
    Iterative,
}

/// Above this many estimated outer subjects the hash table is not worth holding.
const HASH_JOIN_MAX_KEYS: f64 = 100_000.0;

impl JoinAlgorithm {
    /// Pick an algorithm from the estimated cardinality of the first pattern.
    pub fn select(estimated_outer: f64) -> Self {
        if estimated_outer <= HASH_JOIN_MAX_KEYS {
            JoinAlgorithm::Hash
        } else {
            JoinAlgorithm::Iterative
        }
    }

    /// Build a join over the engine's tables.
    pub fn build(self, engine: QueryEngine) -> Box<dyn Join + Send + Sync> {
        match self {
            JoinAlgorithm::Hash => Box::new(HashJoin::new(engine)),
            JoinAlgorithm::Iterative => Box::new(IterativeJoin::new(engine)),
        }
    }
}
