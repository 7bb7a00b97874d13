//! spliceio testing suite
//!
//! This crate holds the cross-crate integration tests and benchmarks for the splice engine,
//! plus the shared helpers they use to build data files and engines.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Unified test utilities
///
/// Deterministic data generation, scratch files and engine constructors shared by the
/// integration tests and benchmarks.
pub mod test_utils;

pub use test_utils::*;
