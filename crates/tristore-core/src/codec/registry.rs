//! Datatype registry for order-preserving literal encodings.
//!
//! The registry is an explicit value built once at startup and handed to the
//! [`TripleCodec`](super::TripleCodec). Each encoder owns one datatype IRI and
//! one marker byte; the marker leads the encoded object so that all literals
//! of a datatype are contiguous in every layout.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};

use super::{check_text, utf8, DATATYPE_DELIM};
use crate::error::Error;
use crate::model::xsd;

/// Marker for IRIs in object position.
pub const IRI_MARKER: u8 = b'I';

/// Marker for literals whose datatype has no registered encoder.
pub const CUSTOM_MARKER: u8 = b'c';

const SIGN_BIT_64: u64 = 0x8000_0000_0000_0000;

/// Width of the hex payload used by the numeric encoders.
const SORTABLE_WIDTH: usize = 16;

/// Converts a datatype's lexical form to and from sortable bytes.
pub trait TypeEncoder: fmt::Debug + Send + Sync {
    /// Datatype IRI served by this encoder.
    fn datatype(&self) -> &str;

    /// Marker byte written ahead of the payload.
    fn marker(&self) -> u8;

    /// Encode a lexical form. Malformed or out-of-domain input is an error.
    fn encode(&self, lexical: &str) -> Result<Vec<u8>, Error>;

    /// Decode a payload back to the canonical lexical form.
    fn decode(&self, payload: &[u8]) -> Result<String, Error>;
}

/// Sign-flip an `i64` and render it as fixed-width lowercase hex.
///
/// Lowercase hex digits sort in numeric order, so the result sorts like the
/// signed integer.
fn sortable_i64(n: i64) -> Vec<u8> {
    format!("{:016x}", (n as u64) ^ SIGN_BIT_64).into_bytes()
}

fn sortable_u64_from_hex(payload: &[u8]) -> Result<u64, Error> {
    let is_hex = payload.iter().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
    if payload.len() != SORTABLE_WIDTH || !is_hex {
        return Err(Error::InvalidKey(format!(
            "expected {} hex digits in numeric payload",
            SORTABLE_WIDTH
        )));
    }
    let text = utf8(payload, "numeric payload")?;
    u64::from_str_radix(&text, 16).map_err(|e| Error::InvalidKey(format!("numeric payload: {}", e)))
}

fn unsortable_i64(payload: &[u8]) -> Result<i64, Error> {
    Ok((sortable_u64_from_hex(payload)? ^ SIGN_BIT_64) as i64)
}

/// IEEE 754 bits arranged so that unsigned comparison matches float order.
fn sortable_f64(n: f64) -> Vec<u8> {
    let bits = n.to_bits();
    let sortable = if bits & SIGN_BIT_64 != 0 {
        !bits
    } else {
        bits ^ SIGN_BIT_64
    };
    format!("{:016x}", sortable).into_bytes()
}

fn unsortable_f64(payload: &[u8]) -> Result<f64, Error> {
    let sortable = sortable_u64_from_hex(payload)?;
    let bits = if sortable & SIGN_BIT_64 != 0 {
        sortable ^ SIGN_BIT_64
    } else {
        !sortable
    };
    Ok(f64::from_bits(bits))
}

/// `xsd:string`: raw UTF-8, lexical order.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringEncoder;

impl TypeEncoder for StringEncoder {
    fn datatype(&self) -> &str {
        xsd::STRING
    }

    fn marker(&self) -> u8 {
        b's'
    }

    fn encode(&self, lexical: &str) -> Result<Vec<u8>, Error> {
        check_text(lexical, "string literal")?;
        Ok(lexical.as_bytes().to_vec())
    }

    fn decode(&self, payload: &[u8]) -> Result<String, Error> {
        utf8(payload, "string literal")
    }
}

/// Integer datatypes stored as sign-flipped 64-bit hex.
#[derive(Debug, Clone, Copy)]
pub struct IntegerEncoder {
    datatype: &'static str,
    marker: u8,
    min: i64,
    max: i64,
}

impl IntegerEncoder {
    /// `xsd:integer`, limited to the 64-bit range.
    pub fn integer() -> Self {
        Self {
            datatype: xsd::INTEGER,
            marker: b'n',
            min: i64::MIN,
            max: i64::MAX,
        }
    }

    /// `xsd:long`.
    pub fn long() -> Self {
        Self {
            datatype: xsd::LONG,
            marker: b'l',
            min: i64::MIN,
            max: i64::MAX,
        }
    }

    /// `xsd:int`.
    pub fn int() -> Self {
        Self {
            datatype: xsd::INT,
            marker: b'i',
            min: i64::from(i32::MIN),
            max: i64::from(i32::MAX),
        }
    }
}

impl TypeEncoder for IntegerEncoder {
    fn datatype(&self) -> &str {
        self.datatype
    }

    fn marker(&self) -> u8 {
        self.marker
    }

    fn encode(&self, lexical: &str) -> Result<Vec<u8>, Error> {
        let n: i64 = lexical.parse().map_err(|_| {
            Error::Encoding(format!("invalid <{}> literal {:?}", self.datatype, lexical))
        })?;
        if n < self.min || n > self.max {
            return Err(Error::Encoding(format!(
                "<{}> literal {} out of range",
                self.datatype, n
            )));
        }
        Ok(sortable_i64(n))
    }

    fn decode(&self, payload: &[u8]) -> Result<String, Error> {
        Ok(unsortable_i64(payload)?.to_string())
    }
}

/// Floating point datatypes stored as sortable IEEE 754 bits.
#[derive(Debug, Clone, Copy)]
pub struct DoubleEncoder {
    datatype: &'static str,
    marker: u8,
}

impl DoubleEncoder {
    /// `xsd:double`.
    pub fn double() -> Self {
        Self {
            datatype: xsd::DOUBLE,
            marker: b'd',
        }
    }

    /// `xsd:float`, widened to 64 bits.
    pub fn float() -> Self {
        Self {
            datatype: xsd::FLOAT,
            marker: b'f',
        }
    }
}

impl TypeEncoder for DoubleEncoder {
    fn datatype(&self) -> &str {
        self.datatype
    }

    fn marker(&self) -> u8 {
        self.marker
    }

    fn encode(&self, lexical: &str) -> Result<Vec<u8>, Error> {
        let n: f64 = lexical.parse().map_err(|_| {
            Error::Encoding(format!("invalid <{}> literal {:?}", self.datatype, lexical))
        })?;
        // NaN has no place in a total order and infinities have no stable lexical form.
        if !n.is_finite() {
            return Err(Error::Encoding(format!(
                "<{}> literal {:?} is not finite",
                self.datatype, lexical
            )));
        }
        Ok(sortable_f64(n))
    }

    fn decode(&self, payload: &[u8]) -> Result<String, Error> {
        Ok(unsortable_f64(payload)?.to_string())
    }
}

/// `xsd:boolean`: `0` sorts before `1`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanEncoder;

impl TypeEncoder for BooleanEncoder {
    fn datatype(&self) -> &str {
        xsd::BOOLEAN
    }

    fn marker(&self) -> u8 {
        b'b'
    }

    fn encode(&self, lexical: &str) -> Result<Vec<u8>, Error> {
        match lexical {
            "true" | "1" => Ok(vec![b'1']),
            "false" | "0" => Ok(vec![b'0']),
            _ => Err(Error::Encoding(format!("invalid boolean literal {:?}", lexical))),
        }
    }

    fn decode(&self, payload: &[u8]) -> Result<String, Error> {
        match payload {
            b"1" => Ok("true".to_string()),
            b"0" => Ok("false".to_string()),
            _ => Err(Error::InvalidKey("invalid boolean payload".to_string())),
        }
    }
}

/// `xsd:dateTime`: epoch milliseconds, decoded as UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeEncoder;

impl TypeEncoder for DateTimeEncoder {
    fn datatype(&self) -> &str {
        xsd::DATE_TIME
    }

    fn marker(&self) -> u8 {
        b't'
    }

    fn encode(&self, lexical: &str) -> Result<Vec<u8>, Error> {
        let parsed = DateTime::parse_from_rfc3339(lexical).map_err(|e| {
            Error::Encoding(format!("invalid dateTime literal {:?}: {}", lexical, e))
        })?;
        Ok(sortable_i64(parsed.timestamp_millis()))
    }

    fn decode(&self, payload: &[u8]) -> Result<String, Error> {
        let millis = unsortable_i64(payload)?;
        let at = DateTime::<Utc>::from_timestamp_millis(millis)
            .ok_or_else(|| Error::InvalidKey(format!("dateTime {} out of range", millis)))?;
        Ok(at.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

/// Datatype IRI and marker lookup for literal encoders.
pub struct TypeRegistry {
    by_datatype: HashMap<String, Arc<dyn TypeEncoder>>,
    by_marker: HashMap<u8, Arc<dyn TypeEncoder>>,
}

impl TypeRegistry {
    /// A registry without any encoders. Every literal is stored as custom.
    pub fn empty() -> Self {
        Self {
            by_datatype: HashMap::new(),
            by_marker: HashMap::new(),
        }
    }

    /// The XML Schema encoders.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        let defaults: [Arc<dyn TypeEncoder>; 8] = [
            Arc::new(StringEncoder),
            Arc::new(IntegerEncoder::integer()),
            Arc::new(IntegerEncoder::long()),
            Arc::new(IntegerEncoder::int()),
            Arc::new(DoubleEncoder::double()),
            Arc::new(DoubleEncoder::float()),
            Arc::new(BooleanEncoder),
            Arc::new(DateTimeEncoder),
        ];
        for encoder in defaults {
            registry.insert(encoder);
        }
        registry
    }

    /// Register an additional encoder.
    ///
    /// Fails if the marker is reserved or already taken, or if the datatype
    /// already has an encoder.
    pub fn register(&mut self, encoder: Arc<dyn TypeEncoder>) -> Result<(), Error> {
        let marker = encoder.marker();
        if marker <= DATATYPE_DELIM
            || marker == IRI_MARKER
            || marker == CUSTOM_MARKER
            || marker == 0xff
        {
            return Err(Error::Config(format!("marker 0x{:02x} is reserved", marker)));
        }
        if let Some(existing) = self.by_marker.get(&marker) {
            return Err(Error::Config(format!(
                "marker 0x{:02x} already used by <{}>",
                marker,
                existing.datatype()
            )));
        }
        if self.by_datatype.contains_key(encoder.datatype()) {
            return Err(Error::Config(format!(
                "datatype <{}> already registered",
                encoder.datatype()
            )));
        }
        self.insert(encoder);
        Ok(())
    }

    fn insert(&mut self, encoder: Arc<dyn TypeEncoder>) {
        self.by_marker.insert(encoder.marker(), Arc::clone(&encoder));
        self.by_datatype.insert(encoder.datatype().to_string(), encoder);
    }

    /// Encoder for a datatype IRI.
    pub fn for_datatype(&self, datatype: &str) -> Option<&Arc<dyn TypeEncoder>> {
        self.by_datatype.get(datatype)
    }

    /// Encoder for a marker byte.
    pub fn for_marker(&self, marker: u8) -> Option<&Arc<dyn TypeEncoder>> {
        self.by_marker.get(&marker)
    }

    /// Marker a literal of this datatype is stored under.
    pub fn marker_for(&self, datatype: &str) -> u8 {
        self.for_datatype(datatype)
            .map(|encoder| encoder.marker())
            .unwrap_or(CUSTOM_MARKER)
    }

    /// Number of registered datatypes.
    pub fn len(&self) -> usize {
        self.by_datatype.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_datatype.is_empty()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut datatypes: Vec<&str> = self.by_datatype.keys().map(String::as_str).collect();
        datatypes.sort_unstable();
        f.debug_struct("TypeRegistry")
            .field("datatypes", &datatypes)
            .finish()
    }
}
