//! # Castle Core
//!
//! Deterministic build-order scheduler for a castle economy.
//!
//! Given building, technology, mission and unit catalogs, a starting castle
//! and target building levels, the [`solver`] plans upgrades, research,
//! unit training and tavern missions until every target is reached, then
//! spends what is left on research and defenders.
//!
//! This crate contains **only** deterministic logic:
//! - No IO (catalog files are loaded by `castle_tools`)
//! - No randomness
//! - Fixed-point resource accounting
//!
//! Two runs over the same inputs produce identical schedules.
//!
//! ## Crate Structure
//!
//! - [`data`] - Catalog definitions
//! - [`state`] - Mutable simulation state and snapshots
//! - [`events`] - Deterministic event queue
//! - [`roi`] - Upgrade ranking heuristics
//! - [`prerequisites`] - Blocking-upgrade substitution
//! - [`missions`] - Tavern mission bookkeeping
//! - [`solver`] - The event-driven scheduler
//! - [`solution`] - Schedule output
//! - [`composition`] - Defender and cart mix for a finished castle

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod actions;
pub mod army;
pub mod composition;
pub mod config;
pub mod data;
pub mod error;
pub mod events;
pub mod math;
pub mod missions;
pub mod prerequisites;
pub mod resources;
pub mod roi;
pub mod solution;
pub mod solver;
pub mod state;

pub use config::{CompositionConfig, SolverConfig};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::actions::{Action, BuildingAction, ResearchAction, StartMission, TrainingAction};
    pub use crate::army::{Army, DefenseTotals};
    pub use crate::config::SolverConfig;
    pub use crate::data::{
        BuildingData, BuildingKind, BuildingLevel, Catalog, MissionData, TargetLevels, TechData,
        UnitData, UnitKind,
    };
    pub use crate::error::{Result, SolverError};
    pub use crate::math::Fixed;
    pub use crate::resources::{Costs, ResourceKind};
    pub use crate::solution::Solution;
    pub use crate::solver::Solver;
    pub use crate::state::{GameSnapshot, SimulationState};
}
