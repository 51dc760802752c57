//! Substitution of blocking upgrades.
//!
//! A desired upgrade can be blocked by food capacity, by a storage ceiling
//! below one of its costs, or by a technology that is not researched yet.
//! The resolver swaps in the upgrade that clears the blocker, so callers
//! always get back either something startable or nothing.

use crate::actions::BuildingAction;
use crate::data::{BuildingKind, Catalog, TechData};
use crate::resources::ResourceKind;
use crate::state::SimulationState;

/// Where a chain of substitutions ends.
#[derive(Debug)]
enum Resolution<'a> {
    Start(BuildingAction),
    /// The chain ends at a technology whose library level is met.
    Research(&'a TechData),
    Wait,
}

/// Turns desired upgrades into the upgrades that must happen first.
#[derive(Debug, Clone, Copy)]
pub struct PrerequisiteResolver<'a> {
    catalog: &'a Catalog,
    max_depth: u32,
}

impl<'a> PrerequisiteResolver<'a> {
    /// Create a resolver that chains at most `max_depth` substitutions.
    #[must_use]
    pub fn new(catalog: &'a Catalog, max_depth: u32) -> Self {
        Self { catalog, max_depth }
    }

    /// Return the upgrade to run in place of `action`.
    ///
    /// Checks, in order:
    /// 1. food: the farm must reach a level covering the new food total
    /// 2. storage: each cost must fit under its store's capacity
    /// 3. technology: a missing technology needs its library level first
    ///
    /// A substitute is always the blocking building's next level and is
    /// resolved again with the same rules. `None` means the upgrade has to
    /// wait: no covering level exists, the technology is waiting on the
    /// research queue, or the chain got too deep.
    #[must_use]
    pub fn resolve(&self, state: &SimulationState, action: BuildingAction) -> Option<BuildingAction> {
        match self.resolve_at(state, action, 0) {
            Resolution::Start(action) => Some(action),
            Resolution::Research(_) | Resolution::Wait => None,
        }
    }

    /// The technology the research queue must finish before `action`, or
    /// the substitute standing in for it, can start.
    ///
    /// Only technologies whose library level is already met are returned.
    #[must_use]
    pub fn blocking_tech(&self, state: &SimulationState, action: BuildingAction) -> Option<&'a TechData> {
        match self.resolve_at(state, action, 0) {
            Resolution::Research(tech) => Some(tech),
            Resolution::Start(_) | Resolution::Wait => None,
        }
    }

    fn resolve_at(&self, state: &SimulationState, action: BuildingAction, depth: u32) -> Resolution<'a> {
        if depth > self.max_depth {
            tracing::trace!(building = %action.building, depth, "Prerequisite chain too deep");
            return Resolution::Wait;
        }

        let Some(food_needed) = state.food_used().checked_add(action.costs.food) else {
            return Resolution::Wait;
        };
        if food_needed > state.food_capacity() {
            return match self.substitute_for_capacity(state, &action, BuildingKind::Farm, food_needed) {
                Some(farm) => self.resolve_at(state, farm, depth + 1),
                None => Resolution::Wait,
            };
        }

        for resource in ResourceKind::ALL {
            let cost = action.costs.resource(resource);
            if cost > state.storage_caps()[resource] {
                let store = BuildingKind::store_of(resource);
                return match self.substitute_for_capacity(state, &action, store, cost) {
                    Some(upgrade) => self.resolve_at(state, upgrade, depth + 1),
                    None => Resolution::Wait,
                };
            }
        }

        let required = self
            .catalog
            .building(action.building)
            .and_then(|b| b.required_tech(action.to_level));
        if let Some(name) = required {
            if !state.is_researched(name) {
                // Unknown technologies never block
                if let Some(tech) = self.catalog.tech(name) {
                    let library = state.level(BuildingKind::Library);
                    if library >= tech.required_library_level {
                        return Resolution::Research(tech);
                    }
                    if action.building == BuildingKind::Library {
                        return Resolution::Wait;
                    }
                    return match BuildingAction::next_level(self.catalog, BuildingKind::Library, library) {
                        Some(upgrade) => self.resolve_at(state, upgrade, depth + 1),
                        None => Resolution::Wait,
                    };
                }
            }
        }

        Resolution::Start(action)
    }

    /// Next level of `building` if some level above the current one holds
    /// `needed`.
    fn substitute_for_capacity(
        &self,
        state: &SimulationState,
        blocked: &BuildingAction,
        building: BuildingKind,
        needed: u32,
    ) -> Option<BuildingAction> {
        // Upgrading the blocker cannot unblock itself
        if blocked.building == building {
            return None;
        }
        let data = self.catalog.building(building)?;
        let current = state.level(building);
        data.first_level_with_capacity(current, needed)?;
        BuildingAction::next_level(self.catalog, building, current)
    }
}
