//! Solver tuning knobs.

use serde::{Deserialize, Serialize};

/// Configuration for a solver run.
///
/// All fields have defaults, so a scenario file may name only the ones it
/// wants to change.
///
/// # Example RON
///
/// ```ron
/// SolverConfig(
///     max_iterations: 500000,
///     training_food_headroom: 5,
/// )
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Events processed before the run is abandoned.
    pub max_iterations: u64,
    /// Spare food required before the training queue considers a unit.
    pub training_food_headroom: u32,
    /// Production bonus added per production technology, in percent.
    pub production_tech_bonus_percent: u32,
    /// How many prerequisite substitutions may be chained.
    pub resolve_depth: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1_000_000,
            training_food_headroom: 5,
            production_tech_bonus_percent: 5,
            resolve_depth: 4,
        }
    }
}

impl SolverConfig {
    /// Production bonus step as a fraction.
    #[must_use]
    pub fn production_tech_bonus(&self) -> f64 {
        f64::from(self.production_tech_bonus_percent) / 100.0
    }
}

/// Castle figures the army composition planner works from.
///
/// Defaults describe a fully built castle: the food left after buildings,
/// the combined output of three level-30 producers and a market 25 fields
/// away.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositionConfig {
    /// Food available for units.
    pub food_capacity: u32,
    /// Resources produced per hour, all of which go to the market.
    pub production_per_hour: u32,
    /// One-way distance to the market in fields.
    pub market_distance: u32,
    /// Silver received per resource sold.
    pub silver_per_resource: f64,
}

impl Default for CompositionConfig {
    fn default() -> Self {
        Self {
            food_capacity: 4265,
            production_per_hour: 1161,
            market_distance: 25,
            silver_per_resource: 0.02,
        }
    }
}

impl CompositionConfig {
    /// Fields travelled to the market and back.
    #[must_use]
    pub fn round_trip_fields(&self) -> u32 {
        self.market_distance.saturating_mul(2)
    }
}
