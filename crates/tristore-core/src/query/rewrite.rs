//! Plan rewriters run before execution.

use tracing::debug;

use crate::error::Error;

use super::estimator::CardinalityEstimator;
use super::plan::QueryPlan;

/// Rebuild every join tree as a left-deep chain, keeping operand order.
///
/// `join(join(1, 2), join(3, 4))` becomes `join(join(join(1, 2), 3), 4)`.
pub fn to_left_deep(plan: QueryPlan) -> QueryPlan {
    match plan {
        QueryPlan::Join(left, right) => (*right)
            .into_join_operands()
            .into_iter()
            .map(to_left_deep)
            .fold(to_left_deep(*left), QueryPlan::join),
        QueryPlan::Filter { condition, input } => {
            QueryPlan::filter(condition, to_left_deep(*input))
        }
        pattern => pattern,
    }
}

/// Copy a filter over a join of two patterns onto both patterns.
///
/// `filter(c, join(p1, p2))` becomes `join(filter(c, p1), filter(c, p2))`.
/// Other shapes are left alone, but their children are still visited.
pub fn push_down_filters(plan: QueryPlan) -> QueryPlan {
    match plan {
        QueryPlan::Filter { condition, input } => match *input {
            QueryPlan::Join(left, right)
                if matches!(*left, QueryPlan::Pattern(_))
                    && matches!(*right, QueryPlan::Pattern(_)) =>
            {
                QueryPlan::join(
                    QueryPlan::filter(condition.clone(), *left),
                    QueryPlan::filter(condition, *right),
                )
            }
            other => QueryPlan::filter(condition, push_down_filters(other)),
        },
        QueryPlan::Join(left, right) => {
            QueryPlan::join(push_down_filters(*left), push_down_filters(*right))
        }
        pattern => pattern,
    }
}

/// Greedy left-deep join ordering by estimated cardinality.
///
/// The cheapest pair of operands is joined first, then the operand that keeps
/// the running join cheapest is appended until none remain.
pub fn reorder_joins(
    plan: QueryPlan,
    estimator: &CardinalityEstimator<'_>,
) -> Result<QueryPlan, Error> {
    match plan {
        QueryPlan::Join(..) => {
            let operands = plan
                .into_join_operands()
                .into_iter()
                .map(|operand| reorder_joins(operand, estimator))
                .collect::<Result<Vec<_>, Error>>()?;
            greedy_order(operands, estimator)
        }
        QueryPlan::Filter { condition, input } => {
            Ok(QueryPlan::filter(condition, reorder_joins(*input, estimator)?))
        }
        pattern => Ok(pattern),
    }
}

/// Filter pushdown, then left-deep normalization, then join reordering.
pub fn optimize(plan: QueryPlan, estimator: &CardinalityEstimator<'_>) -> Result<QueryPlan, Error> {
    let plan = to_left_deep(push_down_filters(plan));
    let plan = reorder_joins(plan, estimator)?;
    debug!(cost = estimator.cardinality(&plan)?, "Optimized plan");
    Ok(plan)
}

/// Order join operands. `operands` holds at least two plans.
fn greedy_order(
    mut operands: Vec<QueryPlan>,
    estimator: &CardinalityEstimator<'_>,
) -> Result<QueryPlan, Error> {
    // (cost, left, right) over both orientations of every pair.
    let mut best = (f64::INFINITY, 0, 1);
    for i in 0..operands.len() {
        for j in i + 1..operands.len() {
            for (left, right) in [(i, j), (j, i)] {
                let candidate = QueryPlan::join(operands[left].clone(), operands[right].clone());
                let cost = estimator.cardinality(&candidate)?;
                if cost < best.0 {
                    best = (cost, left, right);
                }
            }
        }
    }

    let (_, left, right) = best;
    // Remove the later index first so the earlier one stays valid.
    let (first, second) = if left < right { (left, right) } else { (right, left) };
    let later = operands.remove(second);
    let earlier = operands.remove(first);
    let mut current = if left < right {
        QueryPlan::join(earlier, later)
    } else {
        QueryPlan::join(later, earlier)
    };

    while !operands.is_empty() {
        let mut next = (f64::INFINITY, 0);
        for (k, operand) in operands.iter().enumerate() {
            let candidate = QueryPlan::join(current.clone(), operand.clone());
            let cost = estimator.cardinality(&candidate)?;
            if cost < next.0 {
                next = (cost, k);
            }
        }
        current = QueryPlan::join(current, operands.remove(next.1));
    }

    Ok(current)
}
