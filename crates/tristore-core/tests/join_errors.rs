//! Join behaviour when the backing store fails mid-scan.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tristore_core::model::{Iri, Quad, Value};
use tristore_core::storage::{KeyValue, Mutation, RowScan, TableBatch};
use tristore_core::{
    ByteRange, CloseableIterator, Error, HashJoin, IterativeJoin, Join, QuadIndexer, QueryEngine,
    RowRegex, SledStore, StorageConfig, TableLayout, TableStore, TripleCodec, TypeRegistry,
};

/// Delegates to sled, but scans of one table fail after `fail_after` rows.
struct FailingStore {
    inner: SledStore,
    failing_table: String,
    fail_after: usize,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl TableStore for FailingStore {
    fn scan(
        &self,
        table: &str,
        range: &ByteRange,
        filter: Option<&RowRegex>,
    ) -> Result<RowScan, Error> {
        let inner = self.inner.scan(table, range, filter)?;
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FailingScan {
            inner,
            remaining: (table == self.failing_table).then_some(self.fail_after),
            done: false,
            closed: Some(self.closed.clone()),
        }))
    }

    fn write(&self, table: &str, mutations: Vec<Mutation>) -> Result<(), Error> {
        self.inner.write(table, mutations)
    }

    fn write_all(&self, batches: Vec<TableBatch>) -> Result<(), Error> {
        self.inner.write_all(batches)
    }
}

struct FailingScan {
    inner: RowScan,
    /// Rows left before the injected failure; `None` never fails.
    remaining: Option<usize>,
    done: bool,
    /// Taken on first close.
    closed: Option<Arc<AtomicUsize>>,
}

impl Iterator for FailingScan {
    type Item = Result<KeyValue, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.remaining.as_mut() {
            Some(0) => {
                self.done = true;
                Some(Err(Error::backing_store("injected failure")))
            }
            Some(remaining) => {
                *remaining -= 1;
                self.inner.next()
            }
            None => self.inner.next(),
        }
    }
}

impl CloseableIterator for FailingScan {
    fn close(&mut self) -> Result<(), Error> {
        if let Some(closed) = self.closed.take() {
            closed.fetch_add(1, Ordering::SeqCst);
        }
        self.done = true;
        self.inner.close()
    }
}

struct TestContext {
    engine: QueryEngine,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl TestContext {
    fn new(failing_layout: TableLayout, fail_after: usize) -> Self {
        let config = StorageConfig::temporary();
        let sled = SledStore::open(&config).unwrap();
        let codec = Arc::new(TripleCodec::new(Arc::new(TypeRegistry::with_defaults())));
        QuadIndexer::new(Arc::new(sled.clone()), codec.clone(), &config)
            .add(&quads())
            .unwrap();

        let opened = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicUsize::new(0));
        let store = FailingStore {
            inner: sled,
            failing_table: config.table_name(failing_layout),
            fail_after,
            opened: opened.clone(),
            closed: closed.clone(),
        };
        Self {
            engine: QueryEngine::new(Arc::new(store), codec, &config),
            opened,
            closed,
        }
    }

    fn assert_all_closed(&self) {
        let opened = self.opened.load(Ordering::SeqCst);
        assert!(opened > 0);
        assert_eq!(opened, self.closed.load(Ordering::SeqCst));
    }
}

fn quads() -> Vec<Quad> {
    let mut quads = Vec::new();
    for s in ["urn:s1", "urn:s2", "urn:s3"] {
        quads.push(Quad::new(s, "urn:p", Value::string("x")));
        quads.push(Quad::new(s, "urn:q", Value::string("y")));
    }
    quads
}

fn predicates() -> [Iri; 2] {
    [Iri::from("urn:p"), Iri::from("urn:q")]
}

#[test]
fn test_iterative_probe_failure_ends_stream() {
    let ctx = TestContext::new(TableLayout::Spo, 0);
    let join = IterativeJoin::new(ctx.engine.clone());
    let mut results = join.join_predicates(&predicates()).unwrap();

    match results.next() {
        Some(Err(err)) => assert!(err.is_backing_store()),
        other => panic!("expected a backing store error, got {:?}", other),
    }
    assert!(results.next().is_none());
    results.close().unwrap();
    ctx.assert_all_closed();
}

#[test]
fn test_iterative_outer_failure_after_first_subject() {
    let ctx = TestContext::new(TableLayout::Po, 1);
    let join = IterativeJoin::new(ctx.engine.clone());
    let mut results = join.join_predicates(&predicates()).unwrap();

    let first = results.next().unwrap().unwrap();
    assert_eq!(first.subject, Some(Iri::from("urn:s1")));
    match results.next() {
        Some(Err(err)) => assert!(err.is_backing_store()),
        other => panic!("expected a backing store error, got {:?}", other),
    }
    assert!(results.next().is_none());
    results.close().unwrap();
    ctx.assert_all_closed();
}

#[test]
fn test_hash_join_reports_scan_failure() {
    let ctx = TestContext::new(TableLayout::Po, 2);
    let join = HashJoin::new(ctx.engine.clone());

    let err = join.join_predicates(&predicates()).err().unwrap();
    assert!(err.is_backing_store());
    ctx.assert_all_closed();

    let pairs = [(Iri::from("urn:p"), Value::string("x"))];
    let err = join.join_predicate_objects(&pairs).err().unwrap();
    assert!(err.is_backing_store());
    ctx.assert_all_closed();
}
