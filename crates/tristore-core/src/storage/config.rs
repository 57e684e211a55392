//! Storage configuration.

use std::path::PathBuf;

use serde::Deserialize;

use crate::codec::TableLayout;
use crate::error::Error;

/// Configuration for the quad store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database directory.
    pub path: PathBuf,

    /// Page cache capacity in bytes.
    pub cache_capacity: u64,

    /// Flush interval in milliseconds. None means flush on every write.
    pub flush_every_ms: Option<u64>,

    /// Enable zstd compression.
    pub compression: bool,

    /// Temporary database (deleted on drop).
    pub temporary: bool,

    /// Prefix of every table name.
    pub table_prefix: String,

    /// Prepend a digest of the leading component to every row.
    pub hashed_layouts: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./tristore_data"),
            cache_capacity: 256 * 1024 * 1024, // 256MB
            flush_every_ms: Some(1000),        // Flush every second
            compression: true,
            temporary: false,
            table_prefix: "tristore_".to_string(),
            hashed_layouts: false,
        }
    }
}

impl StorageConfig {
    /// Create a new configuration with the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Create a temporary configuration for testing.
    pub fn temporary() -> Self {
        Self {
            path: PathBuf::from(""),
            temporary: true,
            ..Default::default()
        }
    }

    /// Set the table name prefix.
    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into();
        self
    }

    /// Use hash-prefixed layouts.
    pub fn with_hashed_layouts(mut self, hashed: bool) -> Self {
        self.hashed_layouts = hashed;
        self
    }

    /// Check values that sled does not validate itself.
    pub fn validate(&self) -> Result<(), Error> {
        if self.table_prefix.is_empty() {
            return Err(Error::Config("table_prefix must not be empty".to_string()));
        }
        if !self.temporary && self.path.as_os_str().is_empty() {
            return Err(Error::Config("path must be set for persistent stores".to_string()));
        }
        Ok(())
    }

    /// Name of the table holding rows of one layout.
    pub fn table_name(&self, layout: TableLayout) -> String {
        format!("{}{}", self.table_prefix, layout.name())
    }

    /// Name of the statistics table.
    pub fn statistics_table(&self) -> String {
        format!("{}stats", self.table_prefix)
    }

    /// Convert to sled configuration.
    pub(crate) fn to_sled_config(&self) -> sled::Config {
        let mut config = sled::Config::new()
            .cache_capacity(self.cache_capacity)
            .use_compression(self.compression);

        if self.temporary {
            config = config.temporary(true);
        } else {
            config = config.path(&self.path);
        }

        if let Some(ms) = self.flush_every_ms {
            config = config.flush_every_ms(Some(ms));
        }

        config
    }
}
