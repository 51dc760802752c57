//! Error types for the scheduling engine.

use thiserror::Error;

use crate::data::BuildingKind;

/// Result type alias using [`SolverError`].
pub type Result<T> = std::result::Result<T, SolverError>;

/// Top-level error type for all scheduler errors.
///
/// Unaffordable or blocked actions are not errors: the engine simply defers
/// them. Only broken accounting and runaway runs surface here.
#[derive(Debug, Error)]
pub enum SolverError {
    /// A resource or food counter left its legal range.
    #[error("Invariant violated at t={time}s: {detail}")]
    InvariantViolation {
        /// Simulated time of the violation, in seconds.
        time: u64,
        /// Human-readable description.
        detail: String,
    },

    /// The event loop hit its iteration ceiling.
    #[error("Scheduler did not converge after {iterations} iterations")]
    DidNotConverge {
        /// Number of events processed before giving up.
        iterations: u64,
    },

    /// A building was requested that the catalog does not define.
    #[error("Unknown building: {0}")]
    UnknownBuilding(BuildingKind),

    /// A building level was requested that the catalog does not define.
    #[error("Missing level data for {building} level {level}")]
    MissingLevelData {
        /// Building type.
        building: BuildingKind,
        /// Requested level.
        level: u32,
    },

    /// State could not be encoded or decoded.
    #[error("Serialization failed: {0}")]
    Serialization(String),
}
