//! RDF data model: IRIs, typed values, quads, and triple patterns.

mod pattern;
mod quad;
mod value;

pub use pattern::{PatternTerm, TermKind, TriplePattern, ValueRange};
pub use quad::{Quad, QuadFragment};
pub use value::{xsd, Iri, Value};
