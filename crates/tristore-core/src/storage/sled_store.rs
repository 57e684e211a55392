//! sled-backed table store.

use std::collections::BTreeMap;

use regex::bytes::Regex;
use sled::transaction::TransactionResult;
use sled::{Db, Transactional, Tree};
use tracing::{debug, info};

use super::store::{KeyValue, Mutation, RowScan, TableBatch, TableStore};
use super::StorageConfig;
use crate::error::Error;
use crate::iter::{CloseableIterator, MaterializedResults};
use crate::strategy::{ByteRange, RowRegex};

/// Tables stored as sled trees of one database.
#[derive(Clone)]
pub struct SledStore {
    db: Db,
}

impl SledStore {
    /// Open or create a store with the given configuration.
    pub fn open(config: &StorageConfig) -> Result<Self, Error> {
        config.validate()?;
        let db = config.to_sled_config().open()?;
        info!(
            path = %config.path.display(),
            temporary = config.temporary,
            recovered = db.was_recovered(),
            "Opened sled store"
        );
        Ok(Self { db })
    }

    /// Number of entries in a table.
    pub fn len(&self, table: &str) -> Result<usize, Error> {
        Ok(self.tree(table)?.len())
    }

    fn tree(&self, table: &str) -> Result<Tree, Error> {
        Ok(self.db.open_tree(table)?)
    }
}

impl std::fmt::Debug for SledStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledStore")
            .field("trees", &self.db.tree_names().len())
            .finish()
    }
}

impl TableStore for SledStore {
    fn scan(
        &self,
        table: &str,
        range: &ByteRange,
        filter: Option<&RowRegex>,
    ) -> Result<RowScan, Error> {
        if range.is_empty() {
            return Ok(Box::new(MaterializedResults::<Result<KeyValue, Error>>::empty()));
        }

        let filter = filter.map(RowRegex::compile).transpose()?;
        let tree = self.tree(table)?;
        debug!(table, range = ?range, filtered = filter.is_some(), "Starting scan");

        Ok(Box::new(SledScan {
            iter: Some(tree.range(range.start.clone()..range.end.clone())),
            filter,
        }))
    }

    fn write(&self, table: &str, mutations: Vec<Mutation>) -> Result<(), Error> {
        if mutations.is_empty() {
            return Ok(());
        }

        let tree = self.tree(table)?;
        let count = mutations.len();
        let mut batch = sled::Batch::default();
        for mutation in mutations {
            match mutation {
                Mutation::Put { key, value } => batch.insert(key, value),
                Mutation::Delete { key } => batch.remove(key),
            }
        }
        tree.apply_batch(batch)?;
        debug!(table, count, "Applied batch");
        Ok(())
    }

    fn write_all(&self, batches: Vec<TableBatch>) -> Result<(), Error> {
        // sled needs one transactional view per distinct tree.
        let mut grouped: BTreeMap<String, Vec<Mutation>> = BTreeMap::new();
        for batch in batches {
            grouped.entry(batch.table).or_default().extend(batch.mutations);
        }
        grouped.retain(|_, mutations| !mutations.is_empty());
        if grouped.is_empty() {
            return Ok(());
        }

        let trees = grouped
            .keys()
            .map(|table| self.tree(table))
            .collect::<Result<Vec<_>, Error>>()?;

        let result: TransactionResult<(), Error> = trees.as_slice().transaction(|views| {
            for (view, mutations) in views.iter().zip(grouped.values()) {
                for mutation in mutations {
                    match mutation {
                        Mutation::Put { key, value } => {
                            view.insert(key.as_slice(), value.as_slice())?;
                        }
                        Mutation::Delete { key } => {
                            view.remove(key.as_slice())?;
                        }
                    }
                }
            }
            Ok(())
        });
        result?;

        debug!(tables = grouped.len(), "Committed multi-table write");
        Ok(())
    }
}

/// Lazy range scan over one tree.
struct SledScan {
    iter: Option<sled::Iter>,
    filter: Option<Regex>,
}

impl Iterator for SledScan {
    type Item = Result<KeyValue, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let iter = self.iter.as_mut()?;
            match iter.next() {
                None => {
                    self.iter = None;
                    return None;
                }
                Some(Err(err)) => return Some(Err(err.into())),
                Some(Ok((key, value))) => {
                    if let Some(filter) = &self.filter {
                        if !filter.is_match(&key) {
                            continue;
                        }
                    }
                    return Some(Ok((key.to_vec(), value.to_vec())));
                }
            }
        }
    }
}

impl CloseableIterator for SledScan {
    fn close(&mut self) -> Result<(), Error> {
        self.iter = None;
        Ok(())
    }
}
