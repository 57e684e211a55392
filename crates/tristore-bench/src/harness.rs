//! Benchmark harness helpers.

use std::sync::{Arc, Once};

use tracing::info;
use tristore_core::model::{Iri, Quad};
use tristore_core::{
    CloseableIterator, Error, JoinAlgorithm, JoinResults, QuadIndexer, QueryEngine, SledStore,
    StorageConfig, TableStore, TripleCodec, TypeRegistry,
};

use crate::fixtures::{generate_quads, Scale};

/// Quads written per indexer call during population.
const BATCH_SIZE: usize = 1_000;

static LOGGING: Once = Once::new();

/// Install a `RUST_LOG`-driven subscriber once per process.
pub fn init_logging() {
    LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// Isolated store for one benchmark run.
pub struct TestContext {
    pub engine: QueryEngine,
    pub indexer: QuadIndexer,
    _storage_dir: tempfile::TempDir,
}

impl TestContext {
    /// Create an empty context over plain or hashed layouts.
    pub fn new(hashed: bool) -> Self {
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

    /// Create a context populated with generated quads.
    pub fn with_scale(scale: Scale, hashed: bool) -> Self {
        let ctx = Self::new(hashed);
        let quads = generate_quads(scale);
        populate(&ctx.indexer, &quads);
        info!(?scale, hashed, quads = quads.len(), "Benchmark store populated");
        ctx
    }

    /// Run a predicate join to completion and return the match count.
    pub fn count_predicate_join(&self, algorithm: JoinAlgorithm, predicates: &[Iri]) -> usize {
        let results = algorithm
            .build(self.engine.clone())
            .join_predicates(predicates)
            .unwrap();
        drain(results)
    }
}

/// Index quads in fixed-size batches.
pub fn populate(indexer: &QuadIndexer, quads: &[Quad]) {
    for chunk in quads.chunks(BATCH_SIZE) {
        indexer.add(chunk).unwrap();
    }
}

fn drain<T>(mut results: JoinResults<T>) -> usize {
    let count = results
        .by_ref()
        .map(|item| item.map(|_| 1))
        .sum::<Result<usize, Error>>()
        .unwrap();
    results.close().unwrap();
    count
}
