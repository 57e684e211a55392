//! Iterators that hold backend resources until closed.

use crate::error::Error;

/// An iterator over scan or join results that must be closed.
///
/// Dropping an iterator still releases its resources, but only `close`
/// reports failures. Closing is idempotent; a closed iterator yields `None`.
pub trait CloseableIterator: Iterator {
    /// Release underlying resources.
    fn close(&mut self) -> Result<(), Error>;
}

impl<I: CloseableIterator + ?Sized> CloseableIterator for Box<I> {
    fn close(&mut self) -> Result<(), Error> {
        (**self).close()
    }
}

/// Close every iterator, then return the first failure if any.
pub fn close_all(results: impl IntoIterator<Item = Result<(), Error>>) -> Result<(), Error> {
    let mut first = None;
    for result in results {
        if let Err(err) = result {
            first.get_or_insert(err);
        }
    }
    match first {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Results already collected in memory.
#[derive(Debug)]
pub struct MaterializedResults<T> {
    items: std::vec::IntoIter<T>,
    closed: bool,
}

impl<T> MaterializedResults<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: items.into_iter(),
            closed: false,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl<T> Iterator for MaterializedResults<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.closed {
            return None;
        }
        self.items.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.closed {
            (0, Some(0))
        } else {
            self.items.size_hint()
        }
    }
}

impl<T> CloseableIterator for MaterializedResults<T> {
    fn close(&mut self) -> Result<(), Error> {
        self.closed = true;
        self.items = Vec::new().into_iter();
        Ok(())
    }
}
