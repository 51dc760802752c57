//! The mutable simulation state.
//!
//! [`SimulationState`] is the single aggregate the decision engine mutates.
//! Everything else in the crate either reads it or produces new actions
//! from it. It derives `Clone` so a driver can re-run a scenario from an
//! identical starting point, and it can be hashed and round-tripped through
//! bincode for determinism checks.
//!
//! # Example
//!
//! ```
//! use castle_core::data::{BuildingData, BuildingKind, BuildingLevel, Catalog};
//! use castle_core::resources::{Costs, ResourceKind};
//! use castle_core::state::{GameSnapshot, SimulationState};
//!
//! let lumberjack = BuildingData {
//!     kind: BuildingKind::Lumberjack,
//!     levels: vec![BuildingLevel {
//!         costs: Costs::ZERO,
//!         build_time: 0,
//!         production_rate: Some(36),
//!         storage_capacity: None,
//!         required_tech: None,
//!     }],
//! };
//! let catalog = Catalog::new(vec![lumberjack], vec![], vec![], vec![]);
//!
//! let mut state = SimulationState::from_snapshot(&catalog, &GameSnapshot::default(), 0);
//! state.advance_to(3600);
//! assert_eq!(state.resource_whole(ResourceKind::Wood), 36);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::actions::{BuildingAction, ResearchAction, TrainingAction};
use crate::army::Army;
use crate::data::{is_production_tech, BuildingKind, Catalog, Reward, TargetLevels, UnitRequirement};
use crate::error::{Result, SolverError};
use crate::math::{
    fixed_from_u32, fixed_serde, hours_from_seconds, whole_units, Fixed, SECONDS_PER_HOUR,
};
use crate::resources::{Costs, ResourceKind, Stockpile, StorageCaps};

/// Building level assumed when a snapshot does not mention a building.
pub const DEFAULT_BUILDING_LEVEL: u32 = 1;

/// Integer view of a castle, used as both scenario input and final output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GameSnapshot {
    /// Building levels; absent buildings are at level 1.
    #[serde(default)]
    pub building_levels: BTreeMap<BuildingKind, u32>,

    /// Whole-unit stockpiles.
    #[serde(default)]
    pub resources: BTreeMap<ResourceKind, u32>,

    /// Completed technologies.
    #[serde(default)]
    pub researched: BTreeSet<String>,

    /// Food already consumed.
    #[serde(default)]
    pub food_used: u32,

    /// Food capacity at snapshot time. Ignored on input; derived from the farm.
    #[serde(default)]
    pub food_capacity: u32,

    /// Units at home.
    #[serde(default)]
    pub army: Army,
}

/// A mission currently in flight.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunningMission {
    /// Mission name.
    pub mission: String,
    /// Start time in seconds.
    pub start: u64,
    /// Completion time in seconds.
    pub end: u64,
    /// Resources paid at start.
    pub costs: Costs,
    /// Units committed until `end`.
    pub units: Vec<UnitRequirement>,
    /// Rewards credited at `end`.
    pub rewards: Vec<Reward>,
}

/// All mutable quantities of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    pub(crate) now: u64,

    pub(crate) building_free_at: u64,
    pub(crate) research_free_at: u64,
    pub(crate) training_free_at: u64,

    pub(crate) pending_building: Option<BuildingAction>,
    pub(crate) pending_research: Option<ResearchAction>,
    pub(crate) pending_training: Option<TrainingAction>,

    pub(crate) building_levels: BTreeMap<BuildingKind, u32>,

    pub(crate) resources: Stockpile,
    pub(crate) production_rates: Stockpile,
    pub(crate) storage_caps: StorageCaps,
    #[serde(with = "fixed_serde")]
    pub(crate) production_bonus: Fixed,
    #[serde(with = "fixed_serde")]
    pub(crate) production_bonus_step: Fixed,

    pub(crate) food_used: u32,
    pub(crate) food_capacity: u32,

    pub(crate) researched: BTreeSet<String>,

    pub(crate) army: Army,
    pub(crate) units_on_mission: Army,
    pub(crate) running_missions: Vec<RunningMission>,
}

impl SimulationState {
    /// Build the initial state for a run.
    ///
    /// Production rates, storage caps and food capacity are derived from the
    /// snapshot's building levels. Technologies referenced by the catalog but
    /// not defined in it are marked researched so they never block anything.
    /// Production technologies already researched raise the bonus by
    /// `bonus_percent` each.
    #[must_use]
    pub fn from_snapshot(catalog: &Catalog, snapshot: &GameSnapshot, bonus_percent: u32) -> Self {
        let step = fixed_from_u32(bonus_percent) / Fixed::from_num(100);
        let mut state = Self {
            now: 0,
            building_free_at: 0,
            research_free_at: 0,
            training_free_at: 0,
            pending_building: None,
            pending_research: None,
            pending_training: None,
            building_levels: snapshot.building_levels.clone(),
            resources: Stockpile::default(),
            production_rates: Stockpile::default(),
            storage_caps: StorageCaps::UNBOUNDED,
            production_bonus: Fixed::ONE,
            production_bonus_step: step,
            food_used: snapshot.food_used,
            food_capacity: 0,
            researched: snapshot.researched.clone(),
            army: snapshot.army,
            units_on_mission: Army::new(),
            running_missions: Vec::new(),
        };

        for kind in ResourceKind::ALL {
            let amount = snapshot.resources.get(&kind).copied().unwrap_or(0);
            state.resources[kind] = fixed_from_u32(amount);
        }

        for name in catalog.referenced_techs() {
            if catalog.tech(name).is_none() && !state.researched.contains(name) {
                tracing::warn!(tech = name, "Technology missing from catalog, treating as researched");
                state.researched.insert(name.to_string());
            }
        }

        let boosters = state
            .researched
            .iter()
            .filter(|t| is_production_tech(t))
            .count();
        for _ in 0..boosters {
            state.production_bonus += step;
        }

        for kind in BuildingKind::ALL {
            state.refresh_building_effects(catalog, kind);
        }
        state.cap_resources();
        state
    }

    /// Current simulated time in seconds.
    #[must_use]
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Current level of a building.
    #[must_use]
    pub fn level(&self, kind: BuildingKind) -> u32 {
        self.building_levels
            .get(&kind)
            .copied()
            .unwrap_or(DEFAULT_BUILDING_LEVEL)
    }

    /// Current stockpiles.
    #[must_use]
    pub fn resources(&self) -> &Stockpile {
        &self.resources
    }

    /// Whole units of one resource.
    #[must_use]
    pub fn resource_whole(&self, kind: ResourceKind) -> u32 {
        whole_units(self.resources[kind])
    }

    /// Hourly production rates before the bonus.
    #[must_use]
    pub fn production_rates(&self) -> &Stockpile {
        &self.production_rates
    }

    /// Storage ceilings.
    #[must_use]
    pub fn storage_caps(&self) -> &StorageCaps {
        &self.storage_caps
    }

    /// Multiplier applied to all production.
    #[must_use]
    pub fn production_bonus(&self) -> Fixed {
        self.production_bonus
    }

    /// Food consumed so far.
    #[must_use]
    pub fn food_used(&self) -> u32 {
        self.food_used
    }

    /// Current food capacity.
    #[must_use]
    pub fn food_capacity(&self) -> u32 {
        self.food_capacity
    }

    /// Spare food capacity.
    #[must_use]
    pub fn food_headroom(&self) -> u32 {
        self.food_capacity.saturating_sub(self.food_used)
    }

    /// Whether a technology is done.
    #[must_use]
    pub fn is_researched(&self, tech: &str) -> bool {
        self.researched.contains(tech)
    }

    /// Completed technologies.
    #[must_use]
    pub fn researched(&self) -> &BTreeSet<String> {
        &self.researched
    }

    /// Units at home.
    #[must_use]
    pub fn army(&self) -> &Army {
        &self.army
    }

    /// Units away on missions.
    #[must_use]
    pub fn units_on_mission(&self) -> &Army {
        &self.units_on_mission
    }

    /// Units owned, at home or away.
    #[must_use]
    pub fn total_army(&self) -> Army {
        self.army.combined(&self.units_on_mission)
    }

    /// Missions in flight.
    #[must_use]
    pub fn running_missions(&self) -> &[RunningMission] {
        &self.running_missions
    }

    /// Whether a mission with this name is in flight.
    #[must_use]
    pub fn is_mission_running(&self, name: &str) -> bool {
        self.running_missions.iter().any(|m| m.mission == name)
    }

    /// Time the building queue becomes free.
    #[must_use]
    pub fn building_free_at(&self) -> u64 {
        self.building_free_at
    }

    /// Time the research queue becomes free.
    #[must_use]
    pub fn research_free_at(&self) -> u64 {
        self.research_free_at
    }

    /// Time the training queue becomes free.
    #[must_use]
    pub fn training_free_at(&self) -> u64 {
        self.training_free_at
    }

    /// Whether the building queue can accept an action now.
    #[must_use]
    pub fn building_idle(&self) -> bool {
        self.pending_building.is_none() && self.now >= self.building_free_at
    }

    /// Whether the research queue can accept an action now.
    #[must_use]
    pub fn research_idle(&self) -> bool {
        self.pending_research.is_none() && self.now >= self.research_free_at
    }

    /// Whether the training queue can accept an action now.
    #[must_use]
    pub fn training_idle(&self) -> bool {
        self.pending_training.is_none() && self.now >= self.training_free_at
    }

    /// Whether the stockpiles cover the resource part of `costs`.
    #[must_use]
    pub fn can_afford(&self, costs: &Costs) -> bool {
        ResourceKind::ALL.into_iter().all(|kind| {
            let cost = costs.resource(kind);
            cost == 0 || self.resources[kind] >= fixed_from_u32(cost)
        })
    }

    /// Whether `food` more units of food fit under the capacity.
    #[must_use]
    pub fn can_afford_food(&self, food: u32) -> bool {
        self.food_used
            .checked_add(food)
            .is_some_and(|used| used <= self.food_capacity)
    }

    /// Whether both resources and food cover `costs`.
    #[must_use]
    pub fn can_afford_all(&self, costs: &Costs) -> bool {
        self.can_afford(costs) && self.can_afford_food(costs.food)
    }

    /// Seconds until the resource part of `costs` is affordable at current
    /// rates.
    ///
    /// Returns `Some(0)` when already affordable and `None` when it never
    /// will be: a needed resource has no production, or the cost exceeds the
    /// storage ceiling.
    #[must_use]
    pub fn wait_time_for(&self, costs: &Costs) -> Option<u64> {
        let mut wait = 0u64;
        for kind in ResourceKind::ALL {
            let cost = costs.resource(kind);
            if cost == 0 {
                continue;
            }
            let needed = fixed_from_u32(cost);
            let available = self.resources[kind];
            if available >= needed {
                continue;
            }
            if cost > self.storage_caps[kind] {
                return None;
            }
            let per_hour = self.production_rates[kind].saturating_mul(self.production_bonus);
            if per_hour <= Fixed::ZERO {
                return None;
            }
            let hours = (needed - available).checked_div(per_hour)?;
            let seconds = hours.saturating_mul(Fixed::saturating_from_num(SECONDS_PER_HOUR));
            let secs = seconds.floor().saturating_to_num::<u64>().saturating_add(1);
            wait = wait.max(secs);
        }
        Some(wait)
    }

    /// Move the clock forward to `time`, accumulating production.
    ///
    /// Each resource gains `rate x hours x bonus`, capped at its storage
    /// ceiling. Earlier times are ignored.
    pub fn advance_to(&mut self, time: u64) {
        if time <= self.now {
            return;
        }
        let hours = hours_from_seconds(time - self.now);
        self.now = time;

        for kind in ResourceKind::ALL {
            let rate = self.production_rates[kind];
            if rate <= Fixed::ZERO {
                continue;
            }
            let produced = rate
                .saturating_mul(hours)
                .saturating_mul(self.production_bonus);
            self.resources[kind] = self.resources[kind].saturating_add(produced);
        }
        self.cap_resources();
    }

    /// Move the clock forward by `seconds`.
    pub fn advance_by(&mut self, seconds: u64) {
        self.advance_to(self.now.saturating_add(seconds));
    }

    /// Add to a stockpile, respecting the storage ceiling.
    pub(crate) fn credit(&mut self, kind: ResourceKind, amount: Fixed) {
        self.resources[kind] = self.resources[kind].saturating_add(amount);
        self.cap_resources();
    }

    /// Pay for an action.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::InvariantViolation`] if a stockpile would go
    /// negative or food used would pass the capacity.
    pub(crate) fn deduct(&mut self, costs: &Costs) -> Result<()> {
        for kind in ResourceKind::ALL {
            let remaining = self.resources[kind] - fixed_from_u32(costs.resource(kind));
            if remaining < Fixed::ZERO {
                return Err(self.violation(format!(
                    "{kind} would drop to {remaining} after paying {}",
                    costs.resource(kind)
                )));
            }
            self.resources[kind] = remaining;
        }

        self.food_used = self.food_used.saturating_add(costs.food);
        if self.food_used > self.food_capacity {
            return Err(self.violation(format!(
                "food used {} exceeds capacity {}",
                self.food_used, self.food_capacity
            )));
        }
        Ok(())
    }

    /// Set a building's level and refresh what depends on it.
    pub(crate) fn set_level(&mut self, catalog: &Catalog, kind: BuildingKind, level: u32) {
        self.building_levels.insert(kind, level);
        self.refresh_building_effects(catalog, kind);
    }

    /// Mark a technology researched, bumping the bonus for boosters.
    pub(crate) fn mark_researched(&mut self, tech: &str) {
        if self.researched.insert(tech.to_string()) && is_production_tech(tech) {
            self.production_bonus += self.production_bonus_step;
        }
    }

    /// Whether every target level has been reached.
    #[must_use]
    pub fn all_targets_met(&self, targets: &TargetLevels) -> bool {
        targets.iter().all(|(&kind, &target)| self.level(kind) >= target)
    }

    /// Targets not yet reached, with their current level.
    #[must_use]
    pub fn unmet_targets(&self, targets: &TargetLevels) -> BTreeMap<BuildingKind, u32> {
        targets
            .iter()
            .filter(|(&kind, &target)| self.level(kind) < target)
            .map(|(&kind, _)| (kind, self.level(kind)))
            .collect()
    }

    /// Check the accounting invariants.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::InvariantViolation`] describing the first
    /// broken invariant.
    pub fn check_invariants(&self) -> Result<()> {
        for kind in ResourceKind::ALL {
            if self.resources[kind] < Fixed::ZERO {
                return Err(self.violation(format!("{kind} is negative")));
            }
        }
        if self.food_used > self.food_capacity {
            return Err(self.violation(format!(
                "food used {} exceeds capacity {}",
                self.food_used, self.food_capacity
            )));
        }
        Ok(())
    }

    /// Integer snapshot of the current state.
    #[must_use]
    pub fn to_snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            building_levels: self.building_levels.clone(),
            resources: ResourceKind::ALL
                .into_iter()
                .map(|k| (k, self.resource_whole(k)))
                .collect(),
            researched: self.researched.clone(),
            food_used: self.food_used,
            food_capacity: self.food_capacity,
            army: self.total_army(),
        }
    }

    /// Compute a hash of the full state for determinism checks.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.now.hash(&mut hasher);
        self.building_free_at.hash(&mut hasher);
        self.research_free_at.hash(&mut hasher);
        self.training_free_at.hash(&mut hasher);
        self.pending_building.hash(&mut hasher);
        self.pending_research.hash(&mut hasher);
        self.pending_training.hash(&mut hasher);

        // BTreeMap/BTreeSet iterate in key order
        self.building_levels.hash(&mut hasher);
        for kind in ResourceKind::ALL {
            self.resources[kind].to_bits().hash(&mut hasher);
            self.production_rates[kind].to_bits().hash(&mut hasher);
            self.storage_caps[kind].hash(&mut hasher);
        }
        self.production_bonus.to_bits().hash(&mut hasher);
        self.food_used.hash(&mut hasher);
        self.food_capacity.hash(&mut hasher);
        self.researched.hash(&mut hasher);
        self.army.hash(&mut hasher);
        self.units_on_mission.hash(&mut hasher);
        self.running_missions.hash(&mut hasher);

        hasher.finish()
    }

    /// Serialize state to bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| SolverError::Serialization(format!("Failed to serialize state: {e}")))
    }

    /// Deserialize state from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| SolverError::Serialization(format!("Failed to deserialize state: {e}")))
    }

    fn violation(&self, detail: String) -> SolverError {
        SolverError::InvariantViolation {
            time: self.now,
            detail,
        }
    }

    fn cap_resources(&mut self) {
        for kind in ResourceKind::ALL {
            let cap = fixed_from_u32(self.storage_caps[kind]);
            if self.resources[kind] > cap {
                self.resources[kind] = cap;
            }
        }
    }

    /// Re-derive the rate, ceiling or food capacity a building controls.
    fn refresh_building_effects(&mut self, catalog: &Catalog, kind: BuildingKind) {
        let level = self.level(kind);
        let data = catalog.building(kind);

        if let Some(resource) = kind.produces() {
            let rate = data.and_then(|b| b.production_rate(level)).unwrap_or(0);
            self.production_rates[resource] = fixed_from_u32(rate);
        } else if let Some(resource) = kind.stores() {
            match data.and_then(|b| b.storage_capacity(level)) {
                Some(cap) => self.storage_caps[resource] = cap,
                None => {
                    tracing::warn!(building = %kind, level, "No storage capacity defined, leaving {resource} uncapped");
                    self.storage_caps[resource] = u32::MAX;
                }
            }
        } else if kind == BuildingKind::Farm {
            match data.and_then(|b| b.storage_capacity(level)) {
                Some(cap) => self.food_capacity = cap,
                None => tracing::warn!(level, "No farm capacity defined for this level"),
            }
        }
    }
}
