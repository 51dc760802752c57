//! # Castle Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Fixture catalogs, targets and snapshots
//! - Determinism test harness
//! - Schedule invariant checkers
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod determinism;
pub mod fixtures;
pub mod invariants;

/// Re-export proptest for convenience.
pub use proptest;
