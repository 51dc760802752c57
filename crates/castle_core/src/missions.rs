//! Tavern mission bookkeeping.
//!
//! Missions are unique by name: one may run at a time per name, while any
//! number of differently named missions run side by side as long as their
//! units are not double-booked. Units committed to a running mission leave
//! the home army until it completes.

use crate::actions::StartMission;
use crate::army::Army;
use crate::data::{BuildingKind, Catalog, MissionData, UnitKind};
use crate::resources::{Costs, ResourceKind};
use crate::state::{RunningMission, SimulationState};

/// Whether a mission is worth sending units on.
#[must_use]
pub fn is_profitable(mission: &MissionData) -> bool {
    mission.net_average_reward_per_hour() > 0.0
}

/// Whether starting `mission` would spend a resource one of the `reserved`
/// costs is still short of, without paying at least as much of it back.
#[must_use]
pub fn drains_reserved(state: &SimulationState, mission: &MissionData, reserved: &[Costs]) -> bool {
    ResourceKind::ALL.into_iter().any(|kind| {
        let spent = mission.costs.resource(kind);
        spent > 0
            && mission.average_reward(kind) < f64::from(spent)
            && reserved
                .iter()
                .any(|costs| costs.resource(kind) > state.resource_whole(kind))
    })
}

/// Mission queries bound to one catalog.
#[derive(Debug, Clone, Copy)]
pub struct MissionBoard<'a> {
    catalog: &'a Catalog,
}

impl<'a> MissionBoard<'a> {
    /// Create a board over the catalog's missions.
    #[must_use]
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Whether `mission` can start right now.
    ///
    /// The tavern must be inside the mission's level window, no mission of
    /// the same name may be running, the home army must cover every unit
    /// requirement and the stockpiles must cover the cost.
    #[must_use]
    pub fn is_eligible(&self, state: &SimulationState, mission: &MissionData) -> bool {
        mission.offered_at(state.level(BuildingKind::Tavern))
            && !state.is_mission_running(&mission.name)
            && state.army().can_satisfy(&mission.units)
            && state.can_afford(&mission.costs)
    }

    /// The eligible, profitable mission with the best net reward per hour.
    ///
    /// Missions that would eat into a resource an action in `reserved` is
    /// waiting for are held back. Ties keep the first mission in catalog
    /// order.
    #[must_use]
    pub fn pick_best(&self, state: &SimulationState, reserved: &[Costs]) -> Option<&'a MissionData> {
        let mut best: Option<(&'a MissionData, f64)> = None;
        for mission in self.catalog.missions() {
            if !self.is_eligible(state, mission) || drains_reserved(state, mission, reserved) {
                continue;
            }
            let score = mission.net_average_reward_per_hour();
            if score > best.map_or(0.0, |(_, b)| b) {
                best = Some((mission, score));
            }
        }
        best.map(|(m, _)| m)
    }

    /// Largest count of each unit needed by any profitable mission that
    /// `tavern_level` offers.
    #[must_use]
    pub fn requirements_at(&self, tavern_level: u32) -> Army {
        self.max_requirements(|m| m.offered_at(tavern_level))
    }

    /// Largest count of each unit needed by any profitable mission unlocked
    /// at or below `tavern_level`.
    #[must_use]
    pub fn requirements_up_to(&self, tavern_level: u32) -> Army {
        self.max_requirements(|m| m.tavern_level <= tavern_level)
    }

    fn max_requirements(&self, include: impl Fn(&MissionData) -> bool) -> Army {
        let mut needed = Army::new();
        for mission in self
            .catalog
            .missions()
            .iter()
            .filter(|m| is_profitable(m) && include(m))
        {
            for kind in UnitKind::ALL {
                let count = mission.required(kind);
                if count > needed.get(kind) {
                    needed.set(kind, count);
                }
            }
        }
        needed
    }
}

/// Commit a paid-for mission's units and record it as running.
pub(crate) fn commit(state: &mut SimulationState, action: StartMission) -> RunningMission {
    state.army.remove_all(&action.units);
    state.units_on_mission.add_all(&action.units);

    let running = RunningMission {
        mission: action.mission,
        start: state.now,
        end: state.now.saturating_add(action.duration),
        costs: action.costs,
        units: action.units,
        rewards: action.rewards,
    };
    state.running_missions.push(running.clone());
    running
}

/// Finish the running mission called `name`, crediting its average rewards
/// and bringing its units home.
pub(crate) fn complete(state: &mut SimulationState, name: &str) -> Option<RunningMission> {
    let index = state.running_missions.iter().position(|m| m.mission == name)?;
    let finished = state.running_missions.remove(index);

    for reward in &finished.rewards {
        state.credit(reward.resource, reward.average());
    }
    state.units_on_mission.remove_all(&finished.units);
    state.army.add_all(&finished.units);
    Some(finished)
}
