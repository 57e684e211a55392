//! Triple patterns: each position is unbound, a constant, or a half-open range.

use super::{Iri, Value};

/// Half-open interval `[start, end)` over a term's encoded order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValueRange<T> {
    pub start: T,
    pub end: T,
}

impl<T> ValueRange<T> {
    pub fn new(start: T, end: T) -> Self {
        Self { start, end }
    }
}

/// The kind of term occupying a pattern position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermKind {
    Unbound,
    Constant,
    Range,
}

/// One position of a triple pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternTerm<T> {
    /// Matches any term.
    Unbound,
    /// Matches exactly this term.
    Constant(T),
    /// Matches terms inside the range.
    Range(ValueRange<T>),
}

impl<T> Default for PatternTerm<T> {
    fn default() -> Self {
        PatternTerm::Unbound
    }
}

impl<T> PatternTerm<T> {
    /// Range term over `[start, end)`.
    pub fn range(start: T, end: T) -> Self {
        PatternTerm::Range(ValueRange::new(start, end))
    }

    pub fn kind(&self) -> TermKind {
        match self {
            PatternTerm::Unbound => TermKind::Unbound,
            PatternTerm::Constant(_) => TermKind::Constant,
            PatternTerm::Range(_) => TermKind::Range,
        }
    }

    pub fn is_unbound(&self) -> bool {
        matches!(self, PatternTerm::Unbound)
    }

    /// The constant, if this term is one.
    pub fn constant(&self) -> Option<&T> {
        match self {
            PatternTerm::Constant(value) => Some(value),
            _ => None,
        }
    }

    /// Map the bound values into another term type.
    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> PatternTerm<U> {
        match self {
            PatternTerm::Unbound => PatternTerm::Unbound,
            PatternTerm::Constant(value) => PatternTerm::Constant(f(value)),
            PatternTerm::Range(range) => PatternTerm::range(f(&range.start), f(&range.end)),
        }
    }
}

impl PatternTerm<Iri> {
    /// Range covering every IRI that starts with `prefix`.
    ///
    /// Returns `None` when no IRI sorts after the prefix family.
    pub fn iri_prefix(prefix: &str) -> Option<Self> {
        let end = prefix_successor(prefix)?;
        Some(PatternTerm::range(Iri::from(prefix), Iri::from(end)))
    }
}

impl From<Iri> for PatternTerm<Iri> {
    fn from(iri: Iri) -> Self {
        PatternTerm::Constant(iri)
    }
}

impl From<Value> for PatternTerm<Value> {
    fn from(value: Value) -> Self {
        PatternTerm::Constant(value)
    }
}

impl From<Iri> for PatternTerm<Value> {
    fn from(iri: Iri) -> Self {
        PatternTerm::Constant(Value::Iri(iri))
    }
}

/// Smallest string greater than every string with the given prefix.
fn prefix_successor(prefix: &str) -> Option<String> {
    let mut chars: Vec<char> = prefix.chars().collect();
    while let Some(last) = chars.pop() {
        let mut code = last as u32 + 1;
        while code <= char::MAX as u32 {
            if let Some(next) = char::from_u32(code) {
                chars.push(next);
                return Some(chars.into_iter().collect());
            }
            // Skip the surrogate gap.
            code += 1;
        }
    }
    None
}

/// A triple pattern with an optional context constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TriplePattern {
    pub subject: PatternTerm<Iri>,
    pub predicate: PatternTerm<Iri>,
    pub object: PatternTerm<Value>,
    pub context: PatternTerm<Iri>,
}

impl TriplePattern {
    /// Pattern with every position unbound.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn new(
        subject: PatternTerm<Iri>,
        predicate: PatternTerm<Iri>,
        object: PatternTerm<Value>,
    ) -> Self {
        Self {
            subject,
            predicate,
            object,
            context: PatternTerm::Unbound,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<PatternTerm<Iri>>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn with_predicate(mut self, predicate: impl Into<PatternTerm<Iri>>) -> Self {
        self.predicate = predicate.into();
        self
    }

    pub fn with_object(mut self, object: impl Into<PatternTerm<Value>>) -> Self {
        self.object = object.into();
        self
    }

    pub fn with_context(mut self, context: impl Into<PatternTerm<Iri>>) -> Self {
        self.context = context.into();
        self
    }

    /// Whether subject, predicate and object are all unbound.
    pub fn is_unbound(&self) -> bool {
        self.subject.is_unbound() && self.predicate.is_unbound() && self.object.is_unbound()
    }
}
