//! Write path: keeps the three layout tables in step.

use std::sync::Arc;

use tracing::{debug, instrument};

use super::store::{Mutation, TableBatch, TableStore};
use super::StorageConfig;
use crate::codec::{TableLayout, TripleCodec};
use crate::error::Error;
use crate::model::Quad;

/// Writes and removes quads in every layout at once.
pub struct QuadIndexer {
    store: Arc<dyn TableStore>,
    codec: Arc<TripleCodec>,
    tables: [(TableLayout, String); 3],
    hashed: bool,
}

impl QuadIndexer {
    pub fn new(
        store: Arc<dyn TableStore>,
        codec: Arc<TripleCodec>,
        config: &StorageConfig,
    ) -> Self {
        Self {
            store,
            codec,
            tables: TableLayout::ALL.map(|layout| (layout, config.table_name(layout))),
            hashed: config.hashed_layouts,
        }
    }

    /// Index quads. Re-adding a stored quad is a no-op.
    #[instrument(skip(self, quads), fields(count = quads.len()))]
    pub fn add(&self, quads: &[Quad]) -> Result<(), Error> {
        let batches = self.batches(quads, |key| Mutation::put(key, Vec::new()))?;
        self.store.write_all(batches)?;
        debug!("Indexed quads");
        Ok(())
    }

    /// Remove quads. Absent quads are ignored.
    #[instrument(skip(self, quads), fields(count = quads.len()))]
    pub fn remove(&self, quads: &[Quad]) -> Result<(), Error> {
        let batches = self.batches(quads, Mutation::delete)?;
        self.store.write_all(batches)?;
        debug!("Removed quads");
        Ok(())
    }

    pub fn is_hashed(&self) -> bool {
        self.hashed
    }

    /// Encode every quad before anything is written, so one bad quad
    /// rejects the whole call.
    fn batches(
        &self,
        quads: &[Quad],
        mutation: impl Fn(Vec<u8>) -> Mutation,
    ) -> Result<Vec<TableBatch>, Error> {
        let mut per_layout: [Vec<Mutation>; 3] = Default::default();
        for quad in quads {
            let rows = self.codec.encode(quad, self.hashed)?;
            for (i, (layout, _)) in self.tables.iter().enumerate() {
                if let Some(row) = rows.get(layout) {
                    per_layout[i].push(mutation(row.storage_key()));
                }
            }
        }

        Ok(self
            .tables
            .iter()
            .zip(per_layout)
            .map(|((_, table), mutations)| TableBatch::new(table.clone(), mutations))
            .collect())
    }
}
