//! Statistics used by the cardinality estimator.
//!
//! Counts are keyed by the bound positions of a pattern: single positions
//! (S, P, O) and pairs (SP, PO, SO). Join selectivities are kept per
//! predicate pair for subject joins.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::codec::{TripleCodec, COMPONENT_DELIM};
use crate::error::Error;
use crate::iter::CloseableIterator;
use crate::model::{Iri, Quad, TriplePattern, Value};
use crate::storage::{Mutation, StorageConfig, TableStore};
use crate::strategy::{prefix_end, ByteRange};

use super::engine::QueryEngine;

/// Returned for a pattern with no bound position.
pub const UNBOUNDED_CARDINALITY: f64 = f64::MAX;

/// Returned when no statistic exists for the bound positions.
///
/// The largest `f64` below [`UNBOUNDED_CARDINALITY`]. Stored counts are `u64`
/// and never reach either sentinel.
pub const UNKNOWN_CARDINALITY: f64 = 1.797_693_134_862_315_5e308;

/// Which bound positions a count refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CardinalityOf {
    Subject,
    Predicate,
    Object,
    SubjectPredicate,
    PredicateObject,
    SubjectObject,
}

impl CardinalityOf {
    pub const ALL: [CardinalityOf; 6] = [
        CardinalityOf::Subject,
        CardinalityOf::Predicate,
        CardinalityOf::Object,
        CardinalityOf::SubjectPredicate,
        CardinalityOf::PredicateObject,
        CardinalityOf::SubjectObject,
    ];

    /// Number of values identifying one count.
    pub fn arity(&self) -> usize {
        match self {
            CardinalityOf::Subject | CardinalityOf::Predicate | CardinalityOf::Object => 1,
            _ => 2,
        }
    }

    fn tag(&self) -> &'static str {
        match self {
            CardinalityOf::Subject => "s",
            CardinalityOf::Predicate => "p",
            CardinalityOf::Object => "o",
            CardinalityOf::SubjectPredicate => "sp",
            CardinalityOf::PredicateObject => "po",
            CardinalityOf::SubjectObject => "so",
        }
    }
}

/// Read access to collected statistics.
///
/// Subjects and predicates are passed as [`Value::Iri`].
pub trait StatisticsSource: Send + Sync {
    /// Number of stored quads with the given values in the given positions.
    fn cardinality(&self, of: CardinalityOf, values: &[Value]) -> Result<Option<u64>, Error>;

    /// Total number of stored quads.
    fn table_size(&self) -> Result<Option<u64>, Error>;

    /// Selectivity of a subject join between two predicates.
    fn join_selectivity(&self, left: &Iri, right: &Iri) -> Result<Option<f64>, Error>;
}

fn ordered<'a>(left: &'a Iri, right: &'a Iri) -> (&'a Iri, &'a Iri) {
    if left <= right {
        (left, right)
    } else {
        (right, left)
    }
}

/// Statistics held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStatistics {
    cardinalities: HashMap<(CardinalityOf, Vec<Value>), u64>,
    table_size: Option<u64>,
    selectivities: HashMap<(Iri, Iri), f64>,
}

impl InMemoryStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cardinality(mut self, of: CardinalityOf, values: Vec<Value>, count: u64) -> Self {
        self.cardinalities.insert((of, values), count);
        self
    }

    pub fn with_table_size(mut self, size: u64) -> Self {
        self.table_size = Some(size);
        self
    }

    pub fn with_join_selectivity(mut self, left: Iri, right: Iri, selectivity: f64) -> Self {
        let (a, b) = ordered(&left, &right);
        self.selectivities.insert((a.clone(), b.clone()), selectivity);
        self
    }
}

impl StatisticsSource for InMemoryStatistics {
    fn cardinality(&self, of: CardinalityOf, values: &[Value]) -> Result<Option<u64>, Error> {
        Ok(self.cardinalities.get(&(of, values.to_vec())).copied())
    }

    fn table_size(&self) -> Result<Option<u64>, Error> {
        Ok(self.table_size)
    }

    fn join_selectivity(&self, left: &Iri, right: &Iri) -> Result<Option<f64>, Error> {
        let (a, b) = ordered(left, right);
        Ok(self.selectivities.get(&(a.clone(), b.clone())).copied())
    }
}

const CARDINALITY_PREFIX: &str = "card";
const SELECTIVITY_PREFIX: &str = "sel";
const TABLE_SIZE_KEY: &[u8] = b"size";

/// Statistics persisted in a table of the backing store.
///
/// Keys are `card 0x00 tag 0x00 value [0x00 value]`, `sel 0x00 p 0x00 p`
/// and `size`, with values encoded as in object position. Counts are
/// big-endian `u64`, selectivities big-endian `f64` bits.
pub struct StatisticsStore {
    store: Arc<dyn TableStore>,
    codec: Arc<TripleCodec>,
    table: String,
}

impl StatisticsStore {
    pub fn new(
        store: Arc<dyn TableStore>,
        codec: Arc<TripleCodec>,
        config: &StorageConfig,
    ) -> Self {
        Self {
            store,
            codec,
            table: config.statistics_table(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn cardinality_key(&self, of: CardinalityOf, values: &[Value]) -> Result<Vec<u8>, Error> {
        if values.len() != of.arity() {
            return Err(Error::Encoding(format!(
                "{:?} statistics take {} values, got {}",
                of,
                of.arity(),
                values.len()
            )));
        }
        let mut key = Vec::new();
        key.extend_from_slice(CARDINALITY_PREFIX.as_bytes());
        key.push(COMPONENT_DELIM);
        key.extend_from_slice(of.tag().as_bytes());
        for value in values {
            key.push(COMPONENT_DELIM);
            key.extend(self.codec.encode_value(value)?);
        }
        Ok(key)
    }

    fn selectivity_key(&self, left: &Iri, right: &Iri) -> Result<Vec<u8>, Error> {
        let (a, b) = ordered(left, right);
        let mut key = Vec::new();
        key.extend_from_slice(SELECTIVITY_PREFIX.as_bytes());
        key.push(COMPONENT_DELIM);
        key.extend(self.codec.encode_iri(a)?);
        key.push(COMPONENT_DELIM);
        key.extend(self.codec.encode_iri(b)?);
        Ok(key)
    }

    /// Replace the stored statistics with a new snapshot.
    pub fn replace(&self, snapshot: &StatisticsSnapshot) -> Result<(), Error> {
        let mut fresh: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();
        for ((of, values), count) in &snapshot.cardinalities {
            fresh.insert(self.cardinality_key(*of, values)?, count.to_be_bytes().to_vec());
        }
        for ((left, right), selectivity) in &snapshot.selectivities {
            fresh.insert(
                self.selectivity_key(left, right)?,
                selectivity.to_bits().to_be_bytes().to_vec(),
            );
        }
        fresh.insert(TABLE_SIZE_KEY.to_vec(), snapshot.table_size.to_be_bytes().to_vec());

        let mut mutations = Vec::new();
        let mut scan = self.store.scan(&self.table, &ByteRange::full(), None)?;
        let stale: Result<Vec<Vec<u8>>, Error> = scan
            .by_ref()
            .filter_map(|kv| match kv {
                Ok((key, _)) if fresh.contains_key(&key) => None,
                Ok((key, _)) => Some(Ok(key)),
                Err(err) => Some(Err(err)),
            })
            .collect();
        scan.close()?;
        mutations.extend(stale?.into_iter().map(Mutation::delete));
        mutations.extend(fresh.into_iter().map(|(key, value)| Mutation::put(key, value)));

        debug!(table = %self.table, writes = mutations.len(), "Replacing statistics");
        self.store.write(&self.table, mutations)
    }

    /// Number of stored cardinality entries of one kind.
    pub fn count_entries(&self, of: CardinalityOf) -> Result<usize, Error> {
        let mut prefix = CARDINALITY_PREFIX.as_bytes().to_vec();
        prefix.push(COMPONENT_DELIM);
        prefix.extend_from_slice(of.tag().as_bytes());
        prefix.push(COMPONENT_DELIM);
        let range = ByteRange::new(prefix.clone(), prefix_end(&prefix));
        let mut scan = self.store.scan(&self.table, &range, None)?;
        let mut count = 0;
        for kv in scan.by_ref() {
            kv?;
            count += 1;
        }
        scan.close()?;
        Ok(count)
    }
}

fn read_u64(bytes: &[u8]) -> Result<u64, Error> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| Error::InvalidKey("statistic is not 8 bytes".to_string()))?;
    Ok(u64::from_be_bytes(raw))
}

impl StatisticsSource for StatisticsStore {
    fn cardinality(&self, of: CardinalityOf, values: &[Value]) -> Result<Option<u64>, Error> {
        let key = self.cardinality_key(of, values)?;
        self.store.get(&self.table, &key)?.map(|v| read_u64(&v)).transpose()
    }

    fn table_size(&self) -> Result<Option<u64>, Error> {
        self.store.get(&self.table, TABLE_SIZE_KEY)?.map(|v| read_u64(&v)).transpose()
    }

    fn join_selectivity(&self, left: &Iri, right: &Iri) -> Result<Option<f64>, Error> {
        let key = self.selectivity_key(left, right)?;
        self.store
            .get(&self.table, &key)?
            .map(|v| read_u64(&v).map(f64::from_bits))
            .transpose()
    }
}

/// A complete set of statistics computed in one pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatisticsSnapshot {
    pub cardinalities: HashMap<(CardinalityOf, Vec<Value>), u64>,
    pub selectivities: HashMap<(Iri, Iri), f64>,
    pub table_size: u64,
}

impl StatisticsSnapshot {
    pub fn cardinality(&self, of: CardinalityOf, values: &[Value]) -> Option<u64> {
        self.cardinalities.get(&(of, values.to_vec())).copied()
    }
}

/// Recomputes statistics from the SPO table.
pub struct StatisticsCollector {
    engine: QueryEngine,
}

impl StatisticsCollector {
    pub fn new(engine: QueryEngine) -> Self {
        Self { engine }
    }

    /// Scan every quad and compute a fresh snapshot.
    ///
    /// Counts are held in memory for the duration of the scan.
    #[instrument(skip(self))]
    pub fn collect(&self) -> Result<StatisticsSnapshot, Error> {
        let mut tally = Tally::default();
        let mut scan = self.engine.query(&TriplePattern::any())?;
        let counted = scan.by_ref().try_for_each(|quad| quad.map(|quad| tally.add(quad)));
        scan.close()?;
        counted?;
        Ok(tally.finish())
    }

    /// Collect a snapshot and persist it.
    #[instrument(skip(self, target))]
    pub fn refresh(&self, target: &StatisticsStore) -> Result<StatisticsSnapshot, Error> {
        let snapshot = self.collect()?;
        target.replace(&snapshot)?;
        let predicates = snapshot
            .cardinalities
            .keys()
            .filter(|(of, _)| *of == CardinalityOf::Predicate)
            .count();
        info!(
            quads = snapshot.table_size,
            predicates,
            predicate_pairs = snapshot.selectivities.len(),
            "Statistics refreshed"
        );
        Ok(snapshot)
    }
}

/// Running counts of one collection pass.
///
/// The SPO table is read in subject order, so per-subject predicate counts
/// are folded into the pair products whenever the subject changes.
#[derive(Default)]
struct Tally {
    snapshot: StatisticsSnapshot,
    products: HashMap<(Iri, Iri), u64>,
    subject: Option<Iri>,
    per_subject: BTreeMap<Iri, u64>,
}

impl Tally {
    fn add(&mut self, quad: Quad) {
        if self.subject.as_ref() != Some(&quad.subject) {
            self.fold_subject();
            self.subject = Some(quad.subject.clone());
        }
        *self.per_subject.entry(quad.predicate.clone()).or_insert(0) += 1;

        let s = Value::Iri(quad.subject);
        let p = Value::Iri(quad.predicate);
        let o = quad.object;
        self.bump(CardinalityOf::Subject, vec![s.clone()]);
        self.bump(CardinalityOf::Predicate, vec![p.clone()]);
        self.bump(CardinalityOf::Object, vec![o.clone()]);
        self.bump(CardinalityOf::SubjectPredicate, vec![s.clone(), p.clone()]);
        self.bump(CardinalityOf::PredicateObject, vec![p, o.clone()]);
        self.bump(CardinalityOf::SubjectObject, vec![s, o]);
        self.snapshot.table_size += 1;
    }

    fn bump(&mut self, of: CardinalityOf, values: Vec<Value>) {
        *self.snapshot.cardinalities.entry((of, values)).or_insert(0) += 1;
    }

    /// Add `c(p1) * c(p2)` of the current subject for every pair `p1 < p2`.
    fn fold_subject(&mut self) {
        let entries: Vec<_> = self.per_subject.iter().collect();
        for (i, (left, left_count)) in entries.iter().enumerate() {
            for (right, right_count) in &entries[i + 1..] {
                *self
                    .products
                    .entry(((*left).clone(), (*right).clone()))
                    .or_insert(0) += *left_count * *right_count;
            }
        }
        self.per_subject.clear();
    }

    fn finish(mut self) -> StatisticsSnapshot {
        self.fold_subject();
        let mut snapshot = self.snapshot;
        for ((left, right), product) in self.products {
            let left_count =
                snapshot.cardinality(CardinalityOf::Predicate, &[Value::Iri(left.clone())]);
            let right_count =
                snapshot.cardinality(CardinalityOf::Predicate, &[Value::Iri(right.clone())]);
            if let (Some(l), Some(r)) = (left_count, right_count) {
                snapshot
                    .selectivities
                    .insert((left, right), product as f64 / (l as f64 * r as f64));
            }
        }
        snapshot
    }
}
