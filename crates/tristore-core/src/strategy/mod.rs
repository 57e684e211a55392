//! Triple pattern strategies: which layout serves a pattern, and over which range.
//!
//! There is one strategy per `(layout, hashed?)` pair. A strategy reads the
//! pattern's term kinds in its layout's row order and accepts the pattern only
//! if that shape is in its table, so that the answer is exactly one
//! contiguous key range.

mod range;
mod row_regex;

pub use range::{prefix_end, ByteRange};
pub use row_regex::RowRegex;

use crate::codec::{hash_prefix, Position, TableLayout, TripleCodec, CELL_DELIM, COMPONENT_DELIM};
use crate::error::Error;
use crate::model::{PatternTerm, TermKind, TriplePattern};

use row_regex::RegexParts;

use TermKind::{Constant, Range, Unbound};

/// Shapes, in layout order, that a plain layout serves as one range.
///
/// A prefix of constants, at most one range, then unbound positions. The last
/// entry is the sole range over the leading position.
const PLAIN_SHAPES: [[TermKind; 3]; 6] = [
    [Constant, Constant, Constant],
    [Constant, Constant, Range],
    [Constant, Constant, Unbound],
    [Constant, Range, Unbound],
    [Constant, Unbound, Unbound],
    [Range, Unbound, Unbound],
];

/// Shapes a hash-prefixed layout serves: the hashed leading position must be a constant.
const HASHED_SHAPES: [[TermKind; 3]; 5] = [
    [Constant, Constant, Constant],
    [Constant, Constant, Range],
    [Constant, Constant, Unbound],
    [Constant, Range, Unbound],
    [Constant, Unbound, Unbound],
];

/// The closed set of layout strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriplePatternStrategy {
    SpoPlain,
    SpoHashed,
    PoPlain,
    PoHashed,
    OspPlain,
    OspHashed,
}

/// A term encoded into row bytes.
enum EncodedTerm {
    Unbound,
    Constant(Vec<u8>),
    Range(Vec<u8>, Vec<u8>),
}

impl TriplePatternStrategy {
    pub const ALL: [TriplePatternStrategy; 6] = [
        TriplePatternStrategy::SpoPlain,
        TriplePatternStrategy::SpoHashed,
        TriplePatternStrategy::PoPlain,
        TriplePatternStrategy::PoHashed,
        TriplePatternStrategy::OspPlain,
        TriplePatternStrategy::OspHashed,
    ];

    pub fn new(layout: TableLayout, hashed: bool) -> Self {
        match (layout, hashed) {
            (TableLayout::Spo, false) => TriplePatternStrategy::SpoPlain,
            (TableLayout::Spo, true) => TriplePatternStrategy::SpoHashed,
            (TableLayout::Po, false) => TriplePatternStrategy::PoPlain,
            (TableLayout::Po, true) => TriplePatternStrategy::PoHashed,
            (TableLayout::Osp, false) => TriplePatternStrategy::OspPlain,
            (TableLayout::Osp, true) => TriplePatternStrategy::OspHashed,
        }
    }

    /// The three strategies of one storage mode, in selection order.
    pub fn for_mode(hashed: bool) -> [TriplePatternStrategy; 3] {
        TableLayout::ALL.map(|layout| Self::new(layout, hashed))
    }

    pub fn layout(&self) -> TableLayout {
        match self {
            TriplePatternStrategy::SpoPlain | TriplePatternStrategy::SpoHashed => TableLayout::Spo,
            TriplePatternStrategy::PoPlain | TriplePatternStrategy::PoHashed => TableLayout::Po,
            TriplePatternStrategy::OspPlain | TriplePatternStrategy::OspHashed => TableLayout::Osp,
        }
    }

    pub fn is_hashed(&self) -> bool {
        matches!(
            self,
            TriplePatternStrategy::SpoHashed
                | TriplePatternStrategy::PoHashed
                | TriplePatternStrategy::OspHashed
        )
    }

    /// Supported term-kind shapes, in layout order.
    pub fn shapes(&self) -> &'static [[TermKind; 3]] {
        if self.is_hashed() {
            &HASHED_SHAPES
        } else {
            &PLAIN_SHAPES
        }
    }

    /// Whether this strategy can answer the pattern with one contiguous range.
    ///
    /// The context position never affects the answer; it lives in the column
    /// family and is filtered after the scan.
    pub fn handles(&self, pattern: &TriplePattern) -> bool {
        let shape = self.layout().order().map(|position| kind_at(pattern, position));
        self.shapes().contains(&shape)
    }

    /// Compute the scan range for a pattern.
    ///
    /// Returns `Ok(None)` when the pattern is not handled. Encoding failures
    /// of bound terms are errors.
    pub fn define_range(
        &self,
        codec: &TripleCodec,
        pattern: &TriplePattern,
    ) -> Result<Option<(TableLayout, ByteRange)>, Error> {
        if !self.handles(pattern) {
            return Ok(None);
        }

        let layout = self.layout();
        let order = layout.order();
        let terms = order
            .iter()
            .map(|position| encode_position(codec, pattern, *position))
            .collect::<Result<Vec<_>, Error>>()?;

        let mut prefix = Vec::new();
        if self.is_hashed() {
            // Shape table guarantees a constant leading term.
            if let EncodedTerm::Constant(leading) = &terms[0] {
                prefix.extend(hash_prefix(leading));
            }
        }

        for (i, term) in terms.into_iter().enumerate() {
            let terminal = i == order.len() - 1;
            match term {
                EncodedTerm::Constant(bytes) => {
                    prefix.extend(bytes);
                    prefix.push(if terminal { CELL_DELIM } else { COMPONENT_DELIM });
                }
                EncodedTerm::Range(start, end) => {
                    let mut start_key = prefix.clone();
                    start_key.extend(start);
                    let mut end_key = prefix;
                    end_key.extend(end);
                    return Ok(Some((layout, ByteRange::new(start_key, end_key))));
                }
                EncodedTerm::Unbound => break,
            }
        }

        Ok(Some((layout, ByteRange::prefix(prefix))))
    }

    /// Build a key regex post-filter for this layout.
    ///
    /// Each argument is a regular expression over that position's stored text;
    /// `object_marker` restricts the object to a datatype marker. The object
    /// expression runs over the encoded payload after the marker, which for
    /// numeric datatypes is fixed-width hex. Returns `None` when nothing is
    /// requested.
    pub fn build_regex(
        &self,
        subject: Option<&str>,
        predicate: Option<&str>,
        object: Option<&str>,
        context: Option<&str>,
        object_marker: Option<u8>,
    ) -> Option<RowRegex> {
        row_regex::assemble(
            self.layout(),
            self.is_hashed(),
            RegexParts {
                subject,
                predicate,
                object,
                context,
                object_marker,
            },
        )
    }
}

fn kind_at(pattern: &TriplePattern, position: Position) -> TermKind {
    match position {
        Position::Subject => pattern.subject.kind(),
        Position::Predicate => pattern.predicate.kind(),
        Position::Object => pattern.object.kind(),
    }
}

fn encode_position(
    codec: &TripleCodec,
    pattern: &TriplePattern,
    position: Position,
) -> Result<EncodedTerm, Error> {
    match position {
        Position::Subject => encode_iri_term(codec, &pattern.subject),
        Position::Predicate => encode_iri_term(codec, &pattern.predicate),
        Position::Object => match &pattern.object {
            PatternTerm::Unbound => Ok(EncodedTerm::Unbound),
            PatternTerm::Constant(value) => Ok(EncodedTerm::Constant(codec.encode_value(value)?)),
            PatternTerm::Range(range) => Ok(EncodedTerm::Range(
                codec.encode_value(&range.start)?,
                codec.encode_value(&range.end)?,
            )),
        },
    }
}

fn encode_iri_term(
    codec: &TripleCodec,
    term: &PatternTerm<crate::model::Iri>,
) -> Result<EncodedTerm, Error> {
    match term {
        PatternTerm::Unbound => Ok(EncodedTerm::Unbound),
        PatternTerm::Constant(iri) => Ok(EncodedTerm::Constant(codec.encode_iri(iri)?)),
        PatternTerm::Range(range) => Ok(EncodedTerm::Range(
            codec.encode_iri(&range.start)?,
            codec.encode_iri(&range.end)?,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::TypeRegistry;
    use crate::model::{Iri, Value};
    use std::sync::Arc;

    fn codec() -> TripleCodec {
        TripleCodec::new(Arc::new(TypeRegistry::with_defaults()))
    }

    fn iri(s: &str) -> PatternTerm<Iri> {
        PatternTerm::Constant(Iri::from(s))
    }

    #[test]
    fn test_mode_selection_order() {
        assert_eq!(
            TriplePatternStrategy::for_mode(false),
            [
                TriplePatternStrategy::SpoPlain,
                TriplePatternStrategy::PoPlain,
                TriplePatternStrategy::OspPlain
            ]
        );
        assert!(TriplePatternStrategy::for_mode(true).iter().all(|s| s.is_hashed()));
    }

    #[test]
    fn test_context_does_not_affect_handles() {
        let pattern = TriplePattern::any()
            .with_subject(iri("urn:s"))
            .with_context(iri("urn:g"));
        assert!(TriplePatternStrategy::SpoPlain.handles(&pattern));
        let unbound = TriplePattern::any().with_context(iri("urn:g"));
        assert!(TriplePatternStrategy::ALL.iter().all(|s| !s.handles(&unbound)));
    }

    #[test]
    fn test_prefix_range_bytes() {
        let codec = codec();
        let pattern = TriplePattern::any().with_subject(iri("urn:s")).with_predicate(iri("urn:p"));
        let (layout, range) = TriplePatternStrategy::SpoPlain
            .define_range(&codec, &pattern)
            .unwrap()
            .unwrap();
        assert_eq!(layout, TableLayout::Spo);
        assert_eq!(range.start, b"urn:s\x00urn:p\x00".to_vec());
        assert_eq!(range.end, b"urn:s\x00urn:p\x01".to_vec());
    }

    #[test]
    fn test_fully_bound_range_ends_at_row() {
        let codec = codec();
        let pattern = TriplePattern::new(iri("urn:s"), iri("urn:p"), Value::string("x").into());
        let (_, range) = TriplePatternStrategy::SpoPlain
            .define_range(&codec, &pattern)
            .unwrap()
            .unwrap();
        assert_eq!(range.start, b"urn:s\x00urn:p\x00sx\x01".to_vec());
        assert_eq!(range.end, b"urn:s\x00urn:p\x00sx\x02".to_vec());
    }

    #[test]
    fn test_unhandled_range_is_none() {
        let codec = codec();
        let pattern = TriplePattern::any().with_predicate(iri("urn:p"));
        assert!(TriplePatternStrategy::SpoPlain
            .define_range(&codec, &pattern)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_hashed_range_starts_with_digest() {
        let codec = codec();
        let pattern = TriplePattern::any().with_predicate(iri("urn:p"));
        let (_, range) = TriplePatternStrategy::PoHashed
            .define_range(&codec, &pattern)
            .unwrap()
            .unwrap();
        let mut expected = hash_prefix(b"urn:p");
        expected.extend_from_slice(b"urn:p\x00");
        assert_eq!(range.start, expected);
    }

    #[test]
    fn test_build_regex_shapes() {
        assert!(TriplePatternStrategy::SpoPlain
            .build_regex(None, None, None, None, None)
            .is_none());

        let regex = TriplePatternStrategy::SpoPlain
            .build_regex(Some("urn:a.*"), None, None, None, None)
            .unwrap();
        assert_eq!(regex.layout(), TableLayout::Spo);
        assert!(!regex.is_hashed());
        let compiled = regex.compile().unwrap();
        assert!(compiled.is_match(b"urn:abc\x00urn:p\x00sx\x01\x01"));
        assert!(!compiled.is_match(b"urn:b\x00urn:p\x00sx\x01\x01"));

        let hashed = TriplePatternStrategy::SpoHashed
            .build_regex(None, Some("urn:p"), None, None, None)
            .unwrap();
        let mut key = hash_prefix(b"urn:s");
        key.extend_from_slice(b"urn:s\x00urn:p\x00sx\x01\x01");
        assert!(hashed.compile().unwrap().is_match(&key));
        assert!(hashed.is_hashed());
    }

    #[test]
    fn test_build_regex_object_marker_and_context() {
        let po = TriplePatternStrategy::PoPlain;
        let regex = po
            .build_regex(None, None, Some("1.*"), Some("urn:g1"), Some(b's'))
            .unwrap()
            .compile()
            .unwrap();
        assert!(regex.is_match(b"urn:p\x00s10\x00urn:s\x01urn:g1\x01"));
        assert!(!regex.is_match(b"urn:p\x00s10\x00urn:s\x01urn:g2\x01"));
        assert!(!regex.is_match(b"urn:p\x00Iurn:10\x00urn:s\x01urn:g1\x01"));
        assert!(!regex.is_match(b"urn:p\x00s20\x00urn:s\x01urn:g1\x01"));
    }
}
