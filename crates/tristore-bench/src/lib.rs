//! tristore Benchmark Suite
//!
//! Criterion benchmarks for the tristore index.
//!
//! # Benchmark Categories
//!
//! - **Index**: Quad insertion into plain and hashed layouts, pattern scans
//! - **Join**: Hash vs iterative subject joins at different selectivities

pub mod fixtures;
pub mod harness;

pub use fixtures::{generate_quads, Scale};
pub use harness::{init_logging, TestContext};
