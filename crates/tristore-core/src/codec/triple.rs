//! Quad encoding for the SPO, PO and OSP tables.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{
    check_text, utf8, Position, TableLayout, TypeRegistry, CELL_DELIM, COMPONENT_DELIM,
    CUSTOM_MARKER, DATATYPE_DELIM, HASH_PREFIX_LEN, IRI_MARKER,
};
use crate::error::Error;
use crate::model::{Iri, Quad, Value};

/// One encoded cell: row key plus column coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedRow {
    /// Row key, including the hash prefix on hash-prefixed tables.
    pub row: Vec<u8>,
    /// Context IRI bytes, empty for the default graph.
    pub column_family: Vec<u8>,
    /// Column qualifier, empty for plain statements.
    pub column_qualifier: Vec<u8>,
    /// Cell value, empty for plain statements.
    pub value: Vec<u8>,
}

impl EncodedRow {
    /// Key under which the cell is stored in an ordered key-value table.
    ///
    /// Format: `[row][0x01][column_family][0x01][column_qualifier]`
    pub fn storage_key(&self) -> Vec<u8> {
        let mut key = Vec::with_capacity(
            self.row.len() + self.column_family.len() + self.column_qualifier.len() + 2,
        );
        key.extend_from_slice(&self.row);
        key.push(CELL_DELIM);
        key.extend_from_slice(&self.column_family);
        key.push(CELL_DELIM);
        key.extend_from_slice(&self.column_qualifier);
        key
    }

    /// Split a stored key/value pair back into its cell coordinates.
    pub fn from_storage(key: &[u8], value: &[u8]) -> Result<Self, Error> {
        let row_end = key
            .iter()
            .position(|b| *b == CELL_DELIM)
            .ok_or_else(|| Error::InvalidKey("missing row terminator".to_string()))?;
        let cells = &key[row_end + 1..];
        let family_end = cells
            .iter()
            .position(|b| *b == CELL_DELIM)
            .ok_or_else(|| Error::InvalidKey("missing column family terminator".to_string()))?;

        Ok(Self {
            row: key[..row_end].to_vec(),
            column_family: cells[..family_end].to_vec(),
            column_qualifier: cells[family_end + 1..].to_vec(),
            value: value.to_vec(),
        })
    }
}

/// Raw component slices of a row, by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowComponents<'a> {
    pub subject: &'a [u8],
    pub predicate: &'a [u8],
    pub object: &'a [u8],
}

/// Fixed-length hex digest of a leading component.
pub fn hash_prefix(leading: &[u8]) -> Vec<u8> {
    let digest = blake3::hash(leading);
    hex::encode(&digest.as_bytes()[..HASH_PREFIX_LEN / 2]).into_bytes()
}

/// Encodes quads into table rows and decodes rows back into quads.
#[derive(Debug, Clone)]
pub struct TripleCodec {
    registry: Arc<TypeRegistry>,
}

impl TripleCodec {
    /// Create a codec over an explicit datatype registry.
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self { registry }
    }

    /// The datatype registry.
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Encode an IRI in subject or predicate position.
    pub fn encode_iri(&self, iri: &Iri) -> Result<Vec<u8>, Error> {
        check_text(iri.as_str(), "IRI")?;
        Ok(iri.as_bytes().to_vec())
    }

    /// Encode an object value as `marker ‖ payload`.
    pub fn encode_value(&self, value: &Value) -> Result<Vec<u8>, Error> {
        match value {
            Value::Iri(iri) => {
                let mut buf = Vec::with_capacity(iri.as_bytes().len() + 1);
                buf.push(IRI_MARKER);
                buf.extend(self.encode_iri(iri)?);
                Ok(buf)
            }
            Value::Literal { datatype, lexical } => {
                match self.registry.for_datatype(datatype.as_str()) {
                    Some(encoder) => {
                        let payload = encoder.encode(lexical)?;
                        let mut buf = Vec::with_capacity(payload.len() + 1);
                        buf.push(encoder.marker());
                        buf.extend(payload);
                        Ok(buf)
                    }
                    None => {
                        check_text(lexical, "literal")?;
                        check_text(datatype.as_str(), "datatype IRI")?;
                        let mut buf =
                            Vec::with_capacity(lexical.len() + datatype.as_str().len() + 2);
                        buf.push(CUSTOM_MARKER);
                        buf.extend_from_slice(lexical.as_bytes());
                        buf.push(DATATYPE_DELIM);
                        buf.extend_from_slice(datatype.as_bytes());
                        Ok(buf)
                    }
                }
            }
        }
    }

    /// Decode an object value.
    pub fn decode_value(&self, bytes: &[u8]) -> Result<Value, Error> {
        let (&marker, payload) = bytes
            .split_first()
            .ok_or_else(|| Error::InvalidKey("empty object".to_string()))?;

        match marker {
            IRI_MARKER => Ok(Value::Iri(Iri::new(utf8(payload, "object IRI")?))),
            CUSTOM_MARKER => {
                let split = payload
                    .iter()
                    .position(|b| *b == DATATYPE_DELIM)
                    .ok_or_else(|| {
                        Error::InvalidKey("custom literal without datatype".to_string())
                    })?;
                Ok(Value::literal(
                    utf8(&payload[split + 1..], "datatype IRI")?,
                    utf8(&payload[..split], "literal")?,
                ))
            }
            _ => {
                let encoder = self.registry.for_marker(marker).ok_or_else(|| {
                    Error::InvalidKey(format!("unknown datatype marker 0x{:02x}", marker))
                })?;
                Ok(Value::literal(encoder.datatype(), encoder.decode(payload)?))
            }
        }
    }

    /// Re-encode a value into the lexical form it will decode to.
    pub fn canonicalize(&self, value: &Value) -> Result<Value, Error> {
        self.decode_value(&self.encode_value(value)?)
    }

    /// Encode a quad into one row per layout.
    pub fn encode(
        &self,
        quad: &Quad,
        hashed: bool,
    ) -> Result<BTreeMap<TableLayout, EncodedRow>, Error> {
        let components = self.encode_components(quad)?;
        let column_family = self.encode_context(quad.context.as_ref())?;

        Ok(TableLayout::ALL
            .iter()
            .map(|layout| {
                let row = assemble_row(*layout, hashed, &components);
                (
                    *layout,
                    EncodedRow {
                        row,
                        column_family: column_family.clone(),
                        column_qualifier: Vec::new(),
                        value: Vec::new(),
                    },
                )
            })
            .collect())
    }

    /// Encode a quad for a single layout.
    pub fn encode_row(
        &self,
        layout: TableLayout,
        hashed: bool,
        quad: &Quad,
    ) -> Result<EncodedRow, Error> {
        let components = self.encode_components(quad)?;
        Ok(EncodedRow {
            row: assemble_row(layout, hashed, &components),
            column_family: self.encode_context(quad.context.as_ref())?,
            column_qualifier: Vec::new(),
            value: Vec::new(),
        })
    }

    /// Decode a stored cell of the given layout.
    pub fn decode(
        &self,
        layout: TableLayout,
        hashed: bool,
        cell: &EncodedRow,
    ) -> Result<Quad, Error> {
        let parts = self.split_row(layout, hashed, &cell.row)?;
        let context = if cell.column_family.is_empty() {
            None
        } else {
            Some(Iri::new(utf8(&cell.column_family, "context")?))
        };

        Ok(Quad {
            subject: Iri::new(utf8(parts.subject, "subject")?),
            predicate: Iri::new(utf8(parts.predicate, "predicate")?),
            object: self.decode_value(parts.object)?,
            context,
        })
    }

    /// Split a row into its component bytes without decoding them.
    pub fn split_row<'a>(
        &self,
        layout: TableLayout,
        hashed: bool,
        row: &'a [u8],
    ) -> Result<RowComponents<'a>, Error> {
        let plain = if hashed {
            if row.len() < HASH_PREFIX_LEN {
                return Err(Error::InvalidKey("row shorter than hash prefix".to_string()));
            }
            &row[HASH_PREFIX_LEN..]
        } else {
            row
        };

        let mut parts = plain.splitn(3, |b| *b == COMPONENT_DELIM);
        let (first, second, third) = match (parts.next(), parts.next(), parts.next()) {
            (Some(a), Some(b), Some(c)) => (a, b, c),
            _ => {
                return Err(Error::InvalidKey(format!(
                    "{} row does not have three components",
                    layout
                )))
            }
        };

        let mut subject: &[u8] = &[];
        let mut predicate: &[u8] = &[];
        let mut object: &[u8] = &[];
        for (position, bytes) in layout.order().into_iter().zip([first, second, third]) {
            match position {
                Position::Subject => subject = bytes,
                Position::Predicate => predicate = bytes,
                Position::Object => object = bytes,
            }
        }

        Ok(RowComponents {
            subject,
            predicate,
            object,
        })
    }

    fn encode_components(&self, quad: &Quad) -> Result<[Vec<u8>; 3], Error> {
        Ok([
            self.encode_iri(&quad.subject)?,
            self.encode_iri(&quad.predicate)?,
            self.encode_value(&quad.object)?,
        ])
    }

    fn encode_context(&self, context: Option<&Iri>) -> Result<Vec<u8>, Error> {
        match context {
            Some(iri) if iri.as_str().is_empty() => {
                Err(Error::Encoding("context IRI must not be empty".to_string()))
            }
            Some(iri) => self.encode_iri(iri),
            None => Ok(Vec::new()),
        }
    }
}

/// Concatenate `[subject, predicate, object]` bytes in layout order.
fn assemble_row(layout: TableLayout, hashed: bool, components: &[Vec<u8>; 3]) -> Vec<u8> {
    let ordered = layout.order().map(|position| match position {
        Position::Subject => &components[0],
        Position::Predicate => &components[1],
        Position::Object => &components[2],
    });

    let len: usize = ordered.iter().map(|c| c.len()).sum::<usize>() + 2;
    let mut row = Vec::with_capacity(len + if hashed { HASH_PREFIX_LEN } else { 0 });
    if hashed {
        row.extend(hash_prefix(ordered[0]));
    }
    row.extend_from_slice(ordered[0]);
    row.push(COMPONENT_DELIM);
    row.extend_from_slice(ordered[1]);
    row.push(COMPONENT_DELIM);
    row.extend_from_slice(ordered[2]);
    row
}
