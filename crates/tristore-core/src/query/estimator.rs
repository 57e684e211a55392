//! Cardinality estimation for join ordering.

use tracing::trace;

use crate::error::Error;
use crate::model::{PatternTerm, TriplePattern, Value};

use super::plan::{FilterCondition, QueryPlan};
use super::statistics::{
    CardinalityOf, StatisticsSource, UNBOUNDED_CARDINALITY, UNKNOWN_CARDINALITY,
};

/// Join selectivity used when no pair statistic applies.
pub const DEFAULT_JOIN_SELECTIVITY: f64 = 1.0;

/// Estimates result sizes of plans from collected statistics.
pub struct CardinalityEstimator<'a> {
    statistics: &'a dyn StatisticsSource,
}

impl<'a> CardinalityEstimator<'a> {
    pub fn new(statistics: &'a dyn StatisticsSource) -> Self {
        Self { statistics }
    }

    /// Statistic lookup for a pattern without sentinel remapping.
    ///
    /// Returns [`UNBOUNDED_CARDINALITY`] when no position is a constant and
    /// [`UNKNOWN_CARDINALITY`] when the statistic is missing. Ranges count as
    /// unbound.
    pub fn raw_pattern_cardinality(&self, pattern: &TriplePattern) -> Result<f64, Error> {
        let Some((of, values)) = statistic_key(pattern) else {
            return Ok(UNBOUNDED_CARDINALITY);
        };
        Ok(match self.statistics.cardinality(of, &values)? {
            Some(count) => count as f64,
            None => UNKNOWN_CARDINALITY,
        })
    }

    /// Estimated rows for a pattern. Both sentinels become the table size.
    pub fn pattern_cardinality(&self, pattern: &TriplePattern) -> Result<f64, Error> {
        let raw = self.raw_pattern_cardinality(pattern)?;
        if raw == UNBOUNDED_CARDINALITY || raw == UNKNOWN_CARDINALITY {
            return self.table_size();
        }
        Ok(raw)
    }

    /// Estimated rows produced by a plan.
    pub fn cardinality(&self, plan: &QueryPlan) -> Result<f64, Error> {
        let estimate = match plan {
            QueryPlan::Pattern(pattern) => self.pattern_cardinality(pattern)?,
            QueryPlan::Filter { condition, input } => {
                self.cardinality(input)? * filter_selectivity(condition)
            }
            QueryPlan::Join(left, right) => {
                let l = self.cardinality(left)?;
                let r = self.cardinality(right)?;
                l + l * r * self.selectivity(left, right)?
            }
        };
        trace!(estimate, "Estimated plan cardinality");
        Ok(estimate)
    }

    /// Smallest stored selectivity between any leaf of `left` and any leaf of
    /// `right`, falling back to [`DEFAULT_JOIN_SELECTIVITY`].
    pub fn selectivity(&self, left: &QueryPlan, right: &QueryPlan) -> Result<f64, Error> {
        let mut best: Option<f64> = None;
        for l in left.leaf_patterns() {
            let Some(lp) = l.predicate.constant() else {
                continue;
            };
            for r in right.leaf_patterns() {
                let Some(rp) = r.predicate.constant() else {
                    continue;
                };
                if let Some(selectivity) = self.statistics.join_selectivity(lp, rp)? {
                    best = Some(best.map_or(selectivity, |b| b.min(selectivity)));
                }
            }
        }
        Ok(best.unwrap_or(DEFAULT_JOIN_SELECTIVITY))
    }

    /// Stored table size; an empty or unrefreshed store counts as zero rows.
    fn table_size(&self) -> Result<f64, Error> {
        Ok(self.statistics.table_size()?.unwrap_or(0) as f64)
    }
}

/// Pick the statistic matching the constant positions of a pattern.
fn statistic_key(pattern: &TriplePattern) -> Option<(CardinalityOf, Vec<Value>)> {
    let subject = pattern.subject.constant().cloned().map(Value::Iri);
    let predicate = pattern.predicate.constant().cloned().map(Value::Iri);
    let object = match &pattern.object {
        PatternTerm::Constant(value) => Some(value.clone()),
        _ => None,
    };

    match (subject, predicate, object) {
        (Some(s), Some(p), _) => Some((CardinalityOf::SubjectPredicate, vec![s, p])),
        (Some(s), None, Some(o)) => Some((CardinalityOf::SubjectObject, vec![s, o])),
        (Some(s), None, None) => Some((CardinalityOf::Subject, vec![s])),
        (None, Some(p), Some(o)) => Some((CardinalityOf::PredicateObject, vec![p, o])),
        (None, Some(p), None) => Some((CardinalityOf::Predicate, vec![p])),
        (None, None, Some(o)) => Some((CardinalityOf::Object, vec![o])),
        (None, None, None) => None,
    }
}

/// Heuristic fraction of rows a filter keeps.
pub fn filter_selectivity(condition: &FilterCondition) -> f64 {
    match condition {
        FilterCondition::Eq { .. } => 0.1,
        FilterCondition::Ne { .. } => 0.9,
        FilterCondition::Lt { .. } | FilterCondition::Le { .. } => 0.3,
        FilterCondition::Gt { .. } | FilterCondition::Ge { .. } => 0.3,
        FilterCondition::Regex { pattern, .. } => {
            if pattern.starts_with('^') {
                0.1 // Anchored prefix
            } else {
                0.5
            }
        }
        FilterCondition::And(conditions) => conditions.iter().map(filter_selectivity).product(),
        FilterCondition::Or(conditions) => conditions
            .iter()
            .map(filter_selectivity)
            .sum::<f64>()
            .min(1.0),
    }
}
