//! Quads and partial quads.

use super::{Iri, Value};

/// A triple plus an optional named-graph context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Quad {
    pub subject: Iri,
    pub predicate: Iri,
    pub object: Value,
    pub context: Option<Iri>,
}

impl Quad {
    /// Create a quad in the default graph.
    pub fn new(
        subject: impl Into<Iri>,
        predicate: impl Into<Iri>,
        object: impl Into<Value>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            context: None,
        }
    }

    /// Place the quad in a named graph.
    pub fn in_context(mut self, context: impl Into<Iri>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// A quad with any position left open.
///
/// Predicate-only joins report their matches as `(subject, None, None)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuadFragment {
    pub subject: Option<Iri>,
    pub predicate: Option<Iri>,
    pub object: Option<Value>,
    pub context: Option<Iri>,
}

impl QuadFragment {
    /// Fragment carrying only a subject.
    pub fn subject_only(subject: Iri) -> Self {
        Self {
            subject: Some(subject),
            ..Default::default()
        }
    }
}

impl From<Quad> for QuadFragment {
    fn from(quad: Quad) -> Self {
        Self {
            subject: Some(quad.subject),
            predicate: Some(quad.predicate),
            object: Some(quad.object),
            context: quad.context,
        }
    }
}
