//! The ordered key-value table abstraction the index is built on.

use crate::error::Error;
use crate::iter::CloseableIterator;
use crate::strategy::{ByteRange, RowRegex};

/// A stored `(key, value)` pair.
pub type KeyValue = (Vec<u8>, Vec<u8>);

/// Lazily produced scan results in key order.
pub type RowScan = Box<dyn CloseableIterator<Item = Result<KeyValue, Error>> + Send>;

/// A single write against one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

impl Mutation {
    pub fn put(key: Vec<u8>, value: Vec<u8>) -> Self {
        Mutation::Put { key, value }
    }

    pub fn delete(key: Vec<u8>) -> Self {
        Mutation::Delete { key }
    }

    pub fn key(&self) -> &[u8] {
        match self {
            Mutation::Put { key, .. } | Mutation::Delete { key } => key,
        }
    }
}

/// Mutations addressed to one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableBatch {
    pub table: String,
    pub mutations: Vec<Mutation>,
}

impl TableBatch {
    pub fn new(table: impl Into<String>, mutations: Vec<Mutation>) -> Self {
        Self {
            table: table.into(),
            mutations,
        }
    }
}

/// Named, byte-ordered tables with range scans.
///
/// Implementations must be safe to share between threads; every scan is
/// independent of every other.
pub trait TableStore: Send + Sync {
    /// Scan `[range.start, range.end)` in key order, keeping only keys that
    /// match `filter` in full.
    fn scan(
        &self,
        table: &str,
        range: &ByteRange,
        filter: Option<&RowRegex>,
    ) -> Result<RowScan, Error>;

    /// Apply mutations to one table.
    fn write(&self, table: &str, mutations: Vec<Mutation>) -> Result<(), Error>;

    /// Apply batches across tables. Every batch lands or none does.
    fn write_all(&self, batches: Vec<TableBatch>) -> Result<(), Error>;

    /// Point lookup.
    fn get(&self, table: &str, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        let mut upper = key.to_vec();
        upper.push(0x00);
        let mut scan = self.scan(table, &ByteRange::new(key.to_vec(), upper), None)?;
        let found = match scan.next() {
            Some(Ok((found_key, value))) if found_key == key => Some(value),
            Some(Ok(_)) | None => None,
            Some(Err(err)) => {
                let _ = scan.close();
                return Err(err);
            }
        };
        scan.close()?;
        Ok(found)
    }
}
