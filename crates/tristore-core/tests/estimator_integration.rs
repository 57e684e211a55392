//! Statistics collection and join ordering over an indexed store.

use std::sync::Arc;

use tristore_core::model::{Iri, Quad, QuadFragment, TriplePattern, Value};
use tristore_core::query::{
    optimize, CardinalityOf, StatisticsCollector, StatisticsSource, StatisticsStore,
};
use tristore_core::{
    CardinalityEstimator, CloseableIterator, Error, JoinAlgorithm, QuadIndexer, QueryEngine,
    QueryPlan, SledStore, StorageConfig, TableStore, TripleCodec, TypeRegistry,
};

const TYPE: &str = "urn:type";
const NAME: &str = "urn:name";
const RARE: &str = "urn:rare";

struct TestContext {
    engine: QueryEngine,
    indexer: QuadIndexer,
    statistics: StatisticsStore,
    _storage_dir: tempfile::TempDir,
}

impl TestContext {
    fn new() -> Self {
        let storage_dir = tempfile::tempdir().unwrap();
        let config = StorageConfig::new(storage_dir.path());
        let store: Arc<dyn TableStore> = Arc::new(SledStore::open(&config).unwrap());
        let codec = Arc::new(TripleCodec::new(Arc::new(TypeRegistry::with_defaults())));

        Self {
            engine: QueryEngine::new(store.clone(), codec.clone(), &config),
            indexer: QuadIndexer::new(store.clone(), codec.clone(), &config),
            statistics: StatisticsStore::new(store, codec, &config),
            _storage_dir: storage_dir,
        }
    }

    fn refresh(&self) {
        StatisticsCollector::new(self.engine.clone())
            .refresh(&self.statistics)
            .unwrap();
    }
}

fn subject(i: usize) -> String {
    format!("urn:subject:{:03}", i)
}

/// 100 typed subjects, the first 50 named, the first 2 rare.
fn catalog_quads() -> Vec<Quad> {
    let mut quads = Vec::new();
    for i in 0..100 {
        quads.push(Quad::new(subject(i), TYPE, Value::iri("urn:Thing")));
        if i < 50 {
            quads.push(Quad::new(subject(i), NAME, Value::string(format!("name {}", i))));
        }
        if i < 2 {
            quads.push(Quad::new(subject(i), RARE, Value::boolean(true)));
        }
    }
    quads
}

fn p(name: &str) -> QueryPlan {
    QueryPlan::pattern(TriplePattern::any().with_predicate(Iri::from(name)))
}

#[test]
fn test_collected_statistics_drive_estimates() {
    let ctx = TestContext::new();
    ctx.indexer.add(&catalog_quads()).unwrap();
    ctx.refresh();

    assert_eq!(ctx.statistics.table_size().unwrap(), Some(152));
    let estimator = CardinalityEstimator::new(&ctx.statistics);
    assert_eq!(estimator.cardinality(&p(TYPE)).unwrap(), 100.0);
    assert_eq!(estimator.cardinality(&p(NAME)).unwrap(), 50.0);

    let by_subject = TriplePattern::any()
        .with_subject(Iri::from(subject(0)))
        .with_predicate(Iri::from(NAME));
    assert_eq!(estimator.pattern_cardinality(&by_subject).unwrap(), 1.0);

    // Unbound and unknown patterns both fall back to the table size.
    assert_eq!(estimator.pattern_cardinality(&TriplePattern::any()).unwrap(), 152.0);
    assert_eq!(estimator.cardinality(&p("urn:missing")).unwrap(), 152.0);

    // 50 shared subjects over card(type) * card(name).
    let selectivity = ctx
        .statistics
        .join_selectivity(&Iri::from(NAME), &Iri::from(TYPE))
        .unwrap()
        .unwrap();
    assert!((selectivity - 0.01).abs() < 1e-9);
    let join = QueryPlan::join(p(NAME), p(TYPE));
    assert!((estimator.cardinality(&join).unwrap() - 100.0).abs() < 1e-9);
}

#[test]
fn test_refresh_tracks_removals() {
    let ctx = TestContext::new();
    let quads = catalog_quads();
    ctx.indexer.add(&quads).unwrap();
    ctx.refresh();

    let rare: Vec<Quad> = quads.into_iter().filter(|q| q.predicate.as_str() == RARE).collect();
    ctx.indexer.remove(&rare).unwrap();
    ctx.refresh();

    assert_eq!(ctx.statistics.table_size().unwrap(), Some(150));
    assert_eq!(
        ctx.statistics
            .cardinality(CardinalityOf::Predicate, &[Value::iri(RARE)])
            .unwrap(),
        None
    );
    assert_eq!(
        ctx.statistics
            .join_selectivity(&Iri::from(TYPE), &Iri::from(RARE))
            .unwrap(),
        None
    );
}

#[test]
fn test_optimized_order_and_execution() {
    let ctx = TestContext::new();
    ctx.indexer.add(&catalog_quads()).unwrap();
    ctx.refresh();
    let estimator = CardinalityEstimator::new(&ctx.statistics);

    let plan = QueryPlan::join(QueryPlan::join(p(TYPE), p(NAME)), p(RARE));
    let optimized = optimize(plan, &estimator).unwrap();
    // join(rare, type) = 2 + 2 * 100 * 0.01 is the first cheapest pair (tied with
    // join(rare, name)); name then joins at 4 + 4 * 50 * 0.01.
    assert_eq!(optimized, QueryPlan::join(QueryPlan::join(p(RARE), p(TYPE)), p(NAME)));
    assert!((estimator.cardinality(&optimized).unwrap() - 6.0).abs() < 1e-9);

    let predicates: Vec<Iri> = optimized
        .leaf_patterns()
        .iter()
        .filter_map(|leaf| leaf.predicate.constant().cloned())
        .collect();
    let first = optimized.leaf_patterns()[0].clone();
    let algorithm = JoinAlgorithm::select(estimator.pattern_cardinality(&first).unwrap());
    assert_eq!(algorithm, JoinAlgorithm::Hash);

    let mut results = algorithm.build(ctx.engine.clone()).join_predicates(&predicates).unwrap();
    let mut found = results.by_ref().collect::<Result<Vec<QuadFragment>, Error>>().unwrap();
    results.close().unwrap();
    found.sort();
    let expected: Vec<QuadFragment> = (0..2)
        .map(|i| QuadFragment::subject_only(Iri::from(subject(i))))
        .collect();
    assert_eq!(found, expected);
}

#[test]
fn test_empty_store_estimates_zero() {
    let ctx = TestContext::new();
    let estimator = CardinalityEstimator::new(&ctx.statistics);
    assert_eq!(estimator.cardinality(&p(TYPE)).unwrap(), 0.0);

    ctx.refresh();
    assert_eq!(ctx.statistics.table_size().unwrap(), Some(0));
    assert_eq!(estimator.cardinality(&QueryPlan::pattern(TriplePattern::any())).unwrap(), 0.0);
}
