//! IRIs and typed object values.

use std::fmt;

/// XML Schema datatype IRIs with a registered order-preserving encoding.
pub mod xsd {
    pub const STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
    pub const INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
    pub const LONG: &str = "http://www.w3.org/2001/XMLSchema#long";
    pub const INT: &str = "http://www.w3.org/2001/XMLSchema#int";
    pub const DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
    pub const FLOAT: &str = "http://www.w3.org/2001/XMLSchema#float";
    pub const BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
    pub const DATE_TIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";
}

/// An IRI.
///
/// IRIs compare by their UTF-8 bytes, which is also the order they take in
/// every table layout.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Iri(String);

impl Iri {
    /// Create an IRI from any string.
    pub fn new(iri: impl Into<String>) -> Self {
        Self(iri.into())
    }

    /// The IRI text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The IRI bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Consume into the owned string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.0)
    }
}

impl fmt::Display for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Iri {
    fn from(iri: &str) -> Self {
        Self(iri.to_string())
    }
}

impl From<String> for Iri {
    fn from(iri: String) -> Self {
        Self(iri)
    }
}

impl AsRef<str> for Iri {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// An object value: an IRI or a typed literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Value {
    /// IRI reference.
    Iri(Iri),
    /// Literal with its datatype IRI and lexical form.
    Literal { datatype: Iri, lexical: String },
}

impl Value {
    /// IRI value.
    pub fn iri(iri: impl Into<Iri>) -> Self {
        Value::Iri(iri.into())
    }

    /// Literal with an explicit datatype.
    pub fn literal(datatype: impl Into<Iri>, lexical: impl Into<String>) -> Self {
        Value::Literal {
            datatype: datatype.into(),
            lexical: lexical.into(),
        }
    }

    /// `xsd:string` literal.
    pub fn string(lexical: impl Into<String>) -> Self {
        Self::literal(xsd::STRING, lexical)
    }

    /// `xsd:integer` literal in canonical form.
    pub fn integer(n: i64) -> Self {
        Self::literal(xsd::INTEGER, n.to_string())
    }

    /// `xsd:double` literal in canonical form.
    pub fn double(n: f64) -> Self {
        Self::literal(xsd::DOUBLE, n.to_string())
    }

    /// `xsd:boolean` literal.
    pub fn boolean(b: bool) -> Self {
        Self::literal(xsd::BOOLEAN, b.to_string())
    }

    /// The IRI, if this value is one.
    pub fn as_iri(&self) -> Option<&Iri> {
        match self {
            Value::Iri(iri) => Some(iri),
            Value::Literal { .. } => None,
        }
    }

    /// The datatype IRI, if this value is a literal.
    pub fn datatype(&self) -> Option<&Iri> {
        match self {
            Value::Iri(_) => None,
            Value::Literal { datatype, .. } => Some(datatype),
        }
    }
}

impl From<Iri> for Value {
    fn from(iri: Iri) -> Self {
        Value::Iri(iri)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Iri(iri) => write!(f, "<{}>", iri),
            Value::Literal { datatype, lexical } => write!(f, "\"{}\"^^<{}>", lexical, datatype),
        }
    }
}
