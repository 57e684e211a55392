//! Query side: pattern scans, joins and join-order estimation.

pub mod engine;
pub mod estimator;
pub mod join;
pub mod plan;
pub mod rewrite;
pub mod statistics;

pub use engine::{QuadScan, QueryEngine, ScanPlan};
pub use estimator::{filter_selectivity, CardinalityEstimator, DEFAULT_JOIN_SELECTIVITY};
pub use join::{HashJoin, IterativeJoin, Join, JoinAlgorithm, JoinResults};
pub use plan::{FilterCondition, QueryPlan};
pub use rewrite::{optimize, push_down_filters, reorder_joins, to_left_deep};
pub use statistics::{
    CardinalityOf, InMemoryStatistics, StatisticsCollector, StatisticsSnapshot, StatisticsSource,
    StatisticsStore, UNBOUNDED_CARDINALITY, UNKNOWN_CARDINALITY,
};
