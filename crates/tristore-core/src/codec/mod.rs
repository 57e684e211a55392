//! Triple codec: quads to per-layout rows and back.
//!
//! Row layout for every table:
//!
//! ```text
//! [hash:32]? [first] 0x00 [second] 0x00 [third] 0x01 [column_family] 0x01 [column_qualifier]
//! ```
//!
//! Subjects and predicates are raw IRI bytes; objects are a one-byte datatype
//! marker followed by an order-preserving payload. No component may contain
//! bytes `0x00..=0x02`, so the delimiters always parse unambiguously and a
//! byte-wise comparison of two rows equals a component-wise comparison of
//! their terms.

mod layout;
mod registry;
mod triple;

pub use layout::{Position, TableLayout};
pub use registry::{
    BooleanEncoder, DateTimeEncoder, DoubleEncoder, IntegerEncoder, StringEncoder, TypeEncoder,
    TypeRegistry, CUSTOM_MARKER, IRI_MARKER,
};
pub use triple::{hash_prefix, EncodedRow, RowComponents, TripleCodec};

use crate::error::Error;

/// Separates the three row components.
pub const COMPONENT_DELIM: u8 = 0x00;

/// Terminates the row and separates the column family from the qualifier.
pub const CELL_DELIM: u8 = 0x01;

/// Separates the lexical form from the datatype IRI of an unregistered literal.
pub const DATATYPE_DELIM: u8 = 0x02;

/// Length of the hex digest prepended to hash-prefixed rows.
pub const HASH_PREFIX_LEN: usize = 32;

/// Reject text that would collide with the row delimiters.
pub(crate) fn check_text(text: &str, what: &str) -> Result<(), Error> {
    if let Some(pos) = text.bytes().position(|b| b <= DATATYPE_DELIM) {
        return Err(Error::Encoding(format!(
            "{} contains reserved byte 0x{:02x} at offset {}",
            what,
            text.as_bytes()[pos],
            pos
        )));
    }
    Ok(())
}

/// Interpret stored bytes as UTF-8.
pub(crate) fn utf8(bytes: &[u8], what: &str) -> Result<String, Error> {
    String::from_utf8(bytes.to_vec())
        .map_err(|_| Error::InvalidKey(format!("{} is not UTF-8", what)))
}
