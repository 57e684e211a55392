//! In-memory subject intersection with per-round counters.

use std::collections::HashMap;

use tracing::{debug, instrument, trace};

use super::{Join, JoinResults};
use crate::error::Error;
use crate::iter::{close_all, CloseableIterator, MaterializedResults};
use crate::model::{Iri, QuadFragment, TriplePattern, Value};
use crate::query::engine::{QuadScan, QueryEngine};

/// Hash join over subjects.
///
/// Algorithm, for patterns `0..n`:
/// 1. Round 0 inserts every subject of pattern 0 with counter 0.
/// 2. Round `r` bumps the counter of subjects already present from `r - 1`
///    to `r`; new subjects are ignored.
/// 3. After round `r`, subjects whose counter is not `r` are evicted.
///
/// Results are exposed only after the last round.
#[derive(Debug, Clone)]
pub struct HashJoin {
    engine: QueryEngine,
}

impl HashJoin {
    pub fn new(engine: QueryEngine) -> Self {
        Self { engine }
    }

    #[instrument(skip(self, patterns), fields(patterns = patterns.len()))]
    fn intersect(&self, patterns: &[TriplePattern]) -> Result<Vec<Iri>, Error> {
        let mut table: HashMap<Iri, usize> = HashMap::new();

        for (round, pattern) in patterns.iter().enumerate() {
            let mut scan = self.engine.query(pattern)?;
            let counted = count_round(&mut scan, &mut table, round);
            close_all([counted, scan.close()])?;

            if round > 0 {
                table.retain(|_, counter| *counter == round);
            }
            trace!(round, surviving = table.len(), "Finished join round");

            if table.is_empty() {
                break;
            }
        }

        debug!(results = table.len(), "Hash join complete");
        Ok(table.into_keys().collect())
    }
}

fn count_round(
    scan: &mut QuadScan,
    table: &mut HashMap<Iri, usize>,
    round: usize,
) -> Result<(), Error> {
    for quad in scan.by_ref() {
        let subject = quad?.subject;
        if round == 0 {
            table.entry(subject).or_insert(0);
        } else if let Some(counter) = table.get_mut(&subject) {
            if *counter == round - 1 {
                *counter = round;
            }
        }
    }
    Ok(())
}

impl Join for HashJoin {
    fn join_predicates(&self, predicates: &[Iri]) -> Result<JoinResults<QuadFragment>, Error> {
        let patterns: Vec<TriplePattern> = predicates
            .iter()
            .map(|p| TriplePattern::any().with_predicate(p.clone()))
            .collect();
        let results: Vec<Result<QuadFragment, Error>> = self
            .intersect(&patterns)?
            .into_iter()
            .map(|subject| Ok(QuadFragment::subject_only(subject)))
            .collect();
        Ok(Box::new(MaterializedResults::new(results)))
    }

    fn join_predicate_objects(&self, pairs: &[(Iri, Value)]) -> Result<JoinResults<Iri>, Error> {
        let patterns: Vec<TriplePattern> = pairs
            .iter()
            .map(|(p, o)| TriplePattern::any().with_predicate(p.clone()).with_object(o.clone()))
            .collect();
        let results: Vec<Result<Iri, Error>> =
            self.intersect(&patterns)?.into_iter().map(Ok).collect();
        Ok(Box::new(MaterializedResults::new(results)))
    }
}
