//! Logical plans handed to the estimator and rewriters.

use crate::model::{TriplePattern, Value};

/// A filter over a variable bound by the plan below it.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterCondition {
    Eq { variable: String, value: Value },
    Ne { variable: String, value: Value },
    Lt { variable: String, value: Value },
    Le { variable: String, value: Value },
    Gt { variable: String, value: Value },
    Ge { variable: String, value: Value },
    Regex { variable: String, pattern: String },
    And(Vec<FilterCondition>),
    Or(Vec<FilterCondition>),
}

/// Conjunctive query plan.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryPlan {
    /// Scan of one triple pattern.
    Pattern(TriplePattern),
    /// Rows of `input` that satisfy `condition`.
    Filter {
        condition: FilterCondition,
        input: Box<QueryPlan>,
    },
    /// Subject join of two sub-plans.
    Join(Box<QueryPlan>, Box<QueryPlan>),
}

impl QueryPlan {
    pub fn pattern(pattern: TriplePattern) -> Self {
        QueryPlan::Pattern(pattern)
    }

    pub fn filter(condition: FilterCondition, input: QueryPlan) -> Self {
        QueryPlan::Filter {
            condition,
            input: Box::new(input),
        }
    }

    pub fn join(left: QueryPlan, right: QueryPlan) -> Self {
        QueryPlan::Join(Box::new(left), Box::new(right))
    }

    /// Left-deep join over `plans` in the given order. `None` for no plans.
    pub fn join_all(plans: impl IntoIterator<Item = QueryPlan>) -> Option<Self> {
        plans.into_iter().reduce(QueryPlan::join)
    }

    pub fn is_join(&self) -> bool {
        matches!(self, QueryPlan::Join(..))
    }

    /// Every triple pattern in the plan, left to right.
    pub fn leaf_patterns(&self) -> Vec<&TriplePattern> {
        let mut leaves = Vec::new();
        self.collect_patterns(&mut leaves);
        leaves
    }

    fn collect_patterns<'a>(&'a self, out: &mut Vec<&'a TriplePattern>) {
        match self {
            QueryPlan::Pattern(pattern) => out.push(pattern),
            QueryPlan::Filter { input, .. } => input.collect_patterns(out),
            QueryPlan::Join(left, right) => {
                left.collect_patterns(out);
                right.collect_patterns(out);
            }
        }
    }

    /// Split a join tree into its non-join operands, left to right.
    pub(crate) fn into_join_operands(self) -> Vec<QueryPlan> {
        match self {
            QueryPlan::Join(left, right) => {
                let mut operands = (*left).into_join_operands();
                operands.extend((*right).into_join_operands());
                operands
            }
            other => vec![other],
        }
    }
}
