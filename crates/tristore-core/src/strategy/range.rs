//! Byte ranges over a table's key space.

use std::fmt;

/// Half-open key range `[start, end)`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ByteRange {
    pub start: Vec<u8>,
    pub end: Vec<u8>,
}

impl ByteRange {
    pub fn new(start: Vec<u8>, end: Vec<u8>) -> Self {
        Self { start, end }
    }

    /// Every key with the given prefix.
    pub fn prefix(prefix: Vec<u8>) -> Self {
        let end = prefix_end(&prefix);
        Self { start: prefix, end }
    }

    /// The whole table. Stored keys are UTF-8 text and never contain `0xff`.
    pub fn full() -> Self {
        Self {
            start: Vec::new(),
            end: vec![0xff],
        }
    }

    /// Whether a stored key falls inside the range.
    pub fn contains(&self, key: &[u8]) -> bool {
        key >= self.start.as_slice() && key < self.end.as_slice()
    }

    /// Whether no key can fall inside the range.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

impl fmt::Debug for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteRange")
            .field("start", &String::from_utf8_lossy(&self.start))
            .field("end", &String::from_utf8_lossy(&self.end))
            .finish()
    }
}

/// Smallest key greater than every key starting with `prefix`.
///
/// Increments the last byte that is not `0xff`, dropping trailing `0xff` bytes.
pub fn prefix_end(prefix: &[u8]) -> Vec<u8> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < 0xff {
            end.push(last + 1);
            return end;
        }
    }
    vec![0xff]
}
