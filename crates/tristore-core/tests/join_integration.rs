//! Integration tests for indexing, pattern queries and subject joins.

use std::collections::BTreeSet;
use std::sync::Arc;

use tristore_core::model::{Iri, PatternTerm, Quad, QuadFragment, TriplePattern, Value};
use tristore_core::{
    CloseableIterator, Error, HashJoin, IterativeJoin, Join, JoinAlgorithm, JoinResults,
    QuadIndexer, QueryEngine, SledStore, StorageConfig, TableLayout, TableStore, TripleCodec,
    TypeRegistry,
};

struct TestContext {
    engine: QueryEngine,
    indexer: QuadIndexer,
    _storage_dir: tempfile::TempDir,
}

impl TestContext {
    fn new(hashed: bool) -> Self {
        let storage_dir = tempfile::tempdir().unwrap();
        let config = StorageConfig::new(storage_dir.path()).with_hashed_layouts(hashed);
        let store: Arc<dyn TableStore> = Arc::new(SledStore::open(&config).unwrap());
        let codec = Arc::new(TripleCodec::new(Arc::new(TypeRegistry::with_defaults())));

        Self {
            engine: QueryEngine::new(store.clone(), codec.clone(), &config),
            indexer: QuadIndexer::new(store, codec, &config),
            _storage_dir: storage_dir,
        }
    }

    fn with_quads(hashed: bool, quads: &[Quad]) -> Self {
        let ctx = Self::new(hashed);
        ctx.indexer.add(quads).unwrap();
        ctx
    }

    fn joins(&self) -> Vec<Box<dyn Join + Send + Sync>> {
        vec![
            Box::new(HashJoin::new(self.engine.clone())),
            Box::new(IterativeJoin::new(self.engine.clone())),
        ]
    }

    fn scan(&self, pattern: &TriplePattern) -> Vec<Quad> {
        let mut scan = self.engine.query(pattern).unwrap();
        let quads = scan.by_ref().collect::<Result<Vec<_>, Error>>().unwrap();
        scan.close().unwrap();
        quads
    }
}

fn iri(s: &str) -> Iri {
    Iri::from(s)
}

fn drain<T>(mut results: JoinResults<T>) -> Vec<T> {
    let items = results.by_ref().collect::<Result<Vec<_>, Error>>().unwrap();
    results.close().unwrap();
    items
}

fn subjects(fragments: Vec<QuadFragment>) -> BTreeSet<Iri> {
    fragments
        .into_iter()
        .map(|fragment| {
            assert!(fragment.predicate.is_none() && fragment.object.is_none());
            fragment.subject.unwrap()
        })
        .collect()
}

/// Two subjects sharing predicates, in two graphs.
fn two_subject_quads() -> Vec<Quad> {
    vec![
        Quad::new("urn:subj1", "urn:pred1", Value::string("obj1")),
        Quad::new("urn:subj1", "urn:pred2", Value::string("obj2")),
        Quad::new("urn:subj1", "urn:pred2", Value::string("obj2")).in_context("urn:graph"),
        Quad::new("urn:subj2", "urn:pred1", Value::string("obj1")),
        Quad::new("urn:subj2", "urn:pred3", Value::integer(7)),
    ]
}

/// Four subjects with predicates one..four; `urn:s3` lacks `urn:three`.
fn four_subject_quads() -> Vec<Quad> {
    let mut quads = Vec::new();
    for s in ["urn:s1", "urn:s2", "urn:s3", "urn:s4"] {
        for p in ["urn:one", "urn:two", "urn:three", "urn:four"] {
            if s == "urn:s3" && p == "urn:three" {
                continue;
            }
            quads.push(Quad::new(s, p, Value::string(p.trim_start_matches("urn:"))));
        }
    }
    quads
}

#[test]
fn test_pattern_queries_per_layout() {
    for hashed in [false, true] {
        let ctx = TestContext::with_quads(hashed, &two_subject_quads());

        let by_subject = TriplePattern::any().with_subject(iri("urn:subj1"));
        assert_eq!(ctx.scan(&by_subject).len(), 3);

        let by_predicate = TriplePattern::any().with_predicate(iri("urn:pred1"));
        let found: BTreeSet<Iri> = ctx.scan(&by_predicate).into_iter().map(|q| q.subject).collect();
        assert_eq!(found, [iri("urn:subj1"), iri("urn:subj2")].into());

        let by_object = TriplePattern::any().with_object(Value::integer(7));
        let quads = ctx.scan(&by_object);
        assert_eq!(quads.len(), 1);
        assert_eq!(quads[0].subject, iri("urn:subj2"));
        assert_eq!(quads[0].object, Value::integer(7));

        let in_graph = TriplePattern::any()
            .with_subject(iri("urn:subj1"))
            .with_context(iri("urn:graph"));
        let quads = ctx.scan(&in_graph);
        assert_eq!(quads.len(), 1);
        assert_eq!(quads[0].context, Some(iri("urn:graph")));

        assert_eq!(ctx.scan(&TriplePattern::any()).len(), 5);
    }
}

#[test]
fn test_query_uses_the_matching_layout() {
    let ctx = TestContext::with_quads(false, &two_subject_quads());
    let cases = [
        (TriplePattern::any().with_subject(iri("urn:subj1")), TableLayout::Spo),
        (TriplePattern::any().with_predicate(iri("urn:pred1")), TableLayout::Po),
        (TriplePattern::any().with_object(Value::string("obj1")), TableLayout::Osp),
    ];
    for (pattern, layout) in cases {
        let mut scan = ctx.engine.query(&pattern).unwrap();
        assert_eq!(scan.layout(), layout);
        scan.close().unwrap();
    }
}

#[test]
fn test_object_range_query() {
    let quads: Vec<Quad> = (0..10)
        .map(|n| Quad::new(format!("urn:item{}", n), "urn:rank", Value::integer(n)))
        .collect();
    for hashed in [false, true] {
        let ctx = TestContext::with_quads(hashed, &quads);
        let pattern = TriplePattern::any()
            .with_predicate(iri("urn:rank"))
            .with_object(PatternTerm::range(Value::integer(3), Value::integer(6)));
        let ranks: Vec<Value> = ctx.scan(&pattern).into_iter().map(|q| q.object).collect();
        assert_eq!(ranks, vec![Value::integer(3), Value::integer(4), Value::integer(5)]);
    }
}

#[test]
fn test_two_subject_predicate_join() {
    for hashed in [false, true] {
        let ctx = TestContext::with_quads(hashed, &two_subject_quads());
        for join in ctx.joins() {
            let both = join.join_predicates(&[iri("urn:pred1"), iri("urn:pred2")]).unwrap();
            assert_eq!(subjects(drain(both)), [iri("urn:subj1")].into());

            let shared = join.join_predicates(&[iri("urn:pred1")]).unwrap();
            assert_eq!(subjects(drain(shared)), [iri("urn:subj1"), iri("urn:subj2")].into());

            let none = join.join_predicates(&[iri("urn:pred2"), iri("urn:pred3")]).unwrap();
            assert!(drain(none).is_empty());
        }
    }
}

#[test]
fn test_two_subject_predicate_object_join() {
    for hashed in [false, true] {
        let ctx = TestContext::with_quads(hashed, &two_subject_quads());
        for join in ctx.joins() {
            let pairs = [
                (iri("urn:pred1"), Value::string("obj1")),
                (iri("urn:pred3"), Value::integer(7)),
            ];
            let found: Vec<Iri> = drain(join.join_predicate_objects(&pairs).unwrap());
            assert_eq!(found, vec![iri("urn:subj2")]);

            // Same predicate, different object.
            let wrong_object = [(iri("urn:pred3"), Value::integer(8))];
            assert!(drain(join.join_predicate_objects(&wrong_object).unwrap()).is_empty());
        }
    }
}

#[test]
fn test_same_predicate_pairs_join() {
    let quads = [
        Quad::new("urn:subj1", "urn:pred", Value::string("1")),
        Quad::new("urn:subj1", "urn:pred", Value::string("2")),
        Quad::new("urn:subj2", "urn:pred", Value::string("1")),
        Quad::new("urn:subj2", "urn:pred", Value::string("2")),
        Quad::new("urn:subj3", "urn:pred", Value::string("1")),
    ];
    let pairs = [
        (iri("urn:pred"), Value::string("1")),
        (iri("urn:pred"), Value::string("2")),
    ];
    for hashed in [false, true] {
        let ctx = TestContext::with_quads(hashed, &quads);
        for join in ctx.joins() {
            let mut found = drain(join.join_predicate_objects(&pairs).unwrap());
            found.sort();
            assert_eq!(found, vec![iri("urn:subj1"), iri("urn:subj2")]);
        }
    }
}

#[test]
fn test_four_way_join_excludes_partial_subject() {
    let predicates = ["urn:one", "urn:two", "urn:three", "urn:four"].map(iri);
    for hashed in [false, true] {
        let ctx = TestContext::with_quads(hashed, &four_subject_quads());
        for join in ctx.joins() {
            let found = subjects(drain(join.join_predicates(&predicates).unwrap()));
            assert_eq!(found, ["urn:s1", "urn:s2", "urn:s4"].map(iri).into());

            let pairs: Vec<(Iri, Value)> = predicates
                .iter()
                .map(|p| (p.clone(), Value::string(p.as_str().trim_start_matches("urn:"))))
                .collect();
            let found: BTreeSet<Iri> = drain(join.join_predicate_objects(&pairs).unwrap())
                .into_iter()
                .collect();
            assert_eq!(found, ["urn:s1", "urn:s2", "urn:s4"].map(iri).into());

            let without_three = [iri("urn:one"), iri("urn:two"), iri("urn:four")];
            let found = subjects(drain(join.join_predicates(&without_three).unwrap()));
            assert_eq!(found.len(), 4);
        }
    }
}

#[test]
fn test_hash_and_iterative_agree() {
    let mut quads = four_subject_quads();
    // Repeats in other graphs must not change membership.
    quads.push(Quad::new("urn:s1", "urn:one", Value::string("one")).in_context("urn:g1"));
    quads.push(Quad::new("urn:s2", "urn:two", Value::string("two")).in_context("urn:g2"));
    quads.push(Quad::new("urn:s5", "urn:one", Value::string("other")));

    let predicate_sets: [&[&str]; 4] = [
        &["urn:one"],
        &["urn:one", "urn:two"],
        &["urn:two", "urn:three", "urn:one"],
        &["urn:one", "urn:missing"],
    ];

    for hashed in [false, true] {
        let ctx = TestContext::with_quads(hashed, &quads);
        let hash = HashJoin::new(ctx.engine.clone());
        let iterative = IterativeJoin::new(ctx.engine.clone());

        for set in predicate_sets {
            let predicates: Vec<Iri> = set.iter().copied().map(iri).collect();
            let expected = subjects(drain(hash.join_predicates(&predicates).unwrap()));
            let actual = subjects(drain(iterative.join_predicates(&predicates).unwrap()));
            assert_eq!(expected, actual, "predicates {:?}", set);
        }

        let pairs = [
            (iri("urn:one"), Value::string("one")),
            (iri("urn:two"), Value::string("two")),
        ];
        let expected: BTreeSet<Iri> = drain(hash.join_predicate_objects(&pairs).unwrap())
            .into_iter()
            .collect();
        let actual: BTreeSet<Iri> = drain(iterative.join_predicate_objects(&pairs).unwrap())
            .into_iter()
            .collect();
        assert_eq!(expected, actual);
        assert_eq!(expected.len(), 4);
    }
}

#[test]
fn test_pattern_without_matches_empties_join() {
    let ctx = TestContext::with_quads(false, &four_subject_quads());
    for join in ctx.joins() {
        let first_empty = [iri("urn:missing"), iri("urn:one")];
        assert!(drain(join.join_predicates(&first_empty).unwrap()).is_empty());
        let last_empty = [iri("urn:one"), iri("urn:missing")];
        assert!(drain(join.join_predicates(&last_empty).unwrap()).is_empty());
        assert!(drain(join.join_predicates(&[]).unwrap()).is_empty());
        assert!(drain(join.join_predicate_objects(&[]).unwrap()).is_empty());
    }
}

#[test]
fn test_removed_quads_leave_joins() {
    let ctx = TestContext::with_quads(false, &four_subject_quads());
    ctx.indexer
        .remove(&[Quad::new("urn:s1", "urn:two", Value::string("two"))])
        .unwrap();
    for join in ctx.joins() {
        let results = join.join_predicates(&[iri("urn:one"), iri("urn:two")]).unwrap();
        let found = subjects(drain(results));
        assert_eq!(found, ["urn:s2", "urn:s3", "urn:s4"].map(iri).into());
    }
}

#[test]
fn test_join_algorithm_build() {
    let ctx = TestContext::with_quads(true, &two_subject_quads());
    assert_eq!(JoinAlgorithm::select(10.0), JoinAlgorithm::Hash);
    assert_eq!(JoinAlgorithm::select(1e9), JoinAlgorithm::Iterative);
    for algorithm in [JoinAlgorithm::Hash, JoinAlgorithm::Iterative] {
        let join = algorithm.build(ctx.engine.clone());
        let found = subjects(drain(join.join_predicates(&[iri("urn:pred2")]).unwrap()));
        assert_eq!(found, [iri("urn:subj1")].into());
    }
}

#[test]
fn test_closing_an_iterative_join_early() {
    let ctx = TestContext::with_quads(false, &four_subject_quads());
    let join = IterativeJoin::new(ctx.engine.clone());
    let mut results = join.join_predicates(&[iri("urn:one"), iri("urn:four")]).unwrap();
    assert!(results.next().is_some());
    results.close().unwrap();
    assert!(results.next().is_none());
}
