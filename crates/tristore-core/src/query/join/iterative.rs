//! Streaming nested-loop join with existence probes.

use tracing::{debug, warn};

use super::{Join, JoinResults};
use crate::error::Error;
use crate::iter::{CloseableIterator, MaterializedResults};
use crate::model::{Iri, QuadFragment, TriplePattern, Value};
use crate::query::engine::{QuadScan, QueryEngine};

/// Nested-loop join over subjects.
///
/// The first pattern is scanned on the PO table and drives the join. Every
/// other pattern is checked per subject with a point probe on the SPO table,
/// stopping at the first miss. Output follows the outer scan order.
///
/// Adjacent repeats of a subject in the outer scan are emitted once. With a
/// predicate-only first pattern, rows are ordered by object first, so a
/// subject with several objects can be emitted again later in the stream.
#[derive(Debug, Clone)]
pub struct IterativeJoin {
    engine: QueryEngine,
}

impl IterativeJoin {
    pub fn new(engine: QueryEngine) -> Self {
        Self { engine }
    }

    fn start<T: Send + 'static>(
        &self,
        patterns: Vec<(Iri, Option<Value>)>,
        emit: fn(Iri) -> T,
    ) -> Result<JoinResults<T>, Error> {
        let mut patterns = patterns.into_iter();
        let Some((predicate, object)) = patterns.next() else {
            return Ok(Box::new(MaterializedResults::<Result<T, Error>>::empty()));
        };

        let outer = self.engine.query(&pattern(None, predicate, object))?;
        let probes: Vec<_> = patterns.collect();
        debug!(probes = probes.len(), "Starting iterative join");

        Ok(Box::new(IterativeResults {
            engine: self.engine.clone(),
            outer: Some(outer),
            probes,
            last: None,
            emit,
        }))
    }
}

fn pattern(subject: Option<&Iri>, predicate: Iri, object: Option<Value>) -> TriplePattern {
    let mut pattern = TriplePattern::any().with_predicate(predicate);
    if let Some(subject) = subject {
        pattern = pattern.with_subject(subject.clone());
    }
    if let Some(object) = object {
        pattern = pattern.with_object(object);
    }
    pattern
}

impl Join for IterativeJoin {
    fn join_predicates(&self, predicates: &[Iri]) -> Result<JoinResults<QuadFragment>, Error> {
        let patterns = predicates.iter().map(|p| (p.clone(), None)).collect();
        self.start(patterns, QuadFragment::subject_only)
    }

    fn join_predicate_objects(&self, pairs: &[(Iri, Value)]) -> Result<JoinResults<Iri>, Error> {
        let patterns = pairs
            .iter()
            .map(|(p, o)| (p.clone(), Some(o.clone())))
            .collect();
        self.start(patterns, |subject| subject)
    }
}

/// Lazily produced join output.
struct IterativeResults<T> {
    engine: QueryEngine,
    /// `None` once exhausted, failed or closed.
    outer: Option<QuadScan>,
    probes: Vec<(Iri, Option<Value>)>,
    last: Option<Iri>,
    emit: fn(Iri) -> T,
}

impl<T> IterativeResults<T> {
    fn matches_all(&self, subject: &Iri) -> Result<bool, Error> {
        for (predicate, object) in &self.probes {
            let probe = pattern(Some(subject), predicate.clone(), object.clone());
            if !self.engine.contains_match(&probe)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn abort(&mut self, err: Error) -> Option<Result<T, Error>> {
        if let Some(mut outer) = self.outer.take() {
            if let Err(close_err) = outer.close() {
                warn!(error = %close_err, "Failed to close outer scan after join error");
            }
        }
        Some(Err(err))
    }
}

impl<T> Iterator for IterativeResults<T> {
    type Item = Result<T, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let outer = self.outer.as_mut()?;
            let subject = match outer.next() {
                Some(Ok(quad)) => quad.subject,
                Some(Err(err)) => return self.abort(err),
                None => {
                    let mut outer = self.outer.take()?;
                    return outer.close().err().map(Err);
                }
            };

            if self.last.as_ref() == Some(&subject) {
                continue;
            }
            self.last = Some(subject.clone());

            match self.matches_all(&subject) {
                Ok(true) => return Some(Ok((self.emit)(subject))),
                Ok(false) => continue,
                Err(err) => return self.abort(err),
            }
        }
    }
}

impl<T> CloseableIterator for IterativeResults<T> {
    fn close(&mut self) -> Result<(), Error> {
        match self.outer.take() {
            Some(mut outer) => outer.close(),
            None => Ok(()),
        }
    }
}
