//! Core error types.

use thiserror::Error;

/// Boxed cause carried by [`Error::BackingStore`].
pub type StoreCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Core index and query errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Failure reported by the underlying key-value store.
    #[error("backing store failure: {0}")]
    BackingStore(#[source] StoreCause),

    /// A term or literal that cannot be order-preservingly encoded.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// A stored key that does not parse under its table layout.
    #[error("invalid key format: {0}")]
    InvalidKey(String),

    /// No strategy can serve the pattern as a contiguous range.
    #[error("unsupported triple pattern")]
    UnsupportedPattern,

    /// A row regex that failed to compile.
    #[error("invalid row regex: {0}")]
    InvalidRegex(#[from] regex::Error),

    /// A row regex built for a different layout or hash mode than the scan.
    #[error("row regex for {found} keys cannot filter a scan of {expected} keys")]
    MismatchedRegex { expected: String, found: String },

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Wrap an arbitrary backend failure.
    pub fn backing_store(cause: impl Into<StoreCause>) -> Self {
        Error::BackingStore(cause.into())
    }

    /// Whether this error originated in the backing store.
    pub fn is_backing_store(&self) -> bool {
        matches!(self, Error::BackingStore(_))
    }
}

impl From<sled::Error> for Error {
    fn from(err: sled::Error) -> Self {
        Error::BackingStore(Box::new(err))
    }
}

impl From<sled::transaction::TransactionError<Error>> for Error {
    fn from(err: sled::transaction::TransactionError<Error>) -> Self {
        match err {
            sled::transaction::TransactionError::Abort(e) => e,
            sled::transaction::TransactionError::Storage(e) => e.into(),
        }
    }
}
