//! Schedulable actions.
//!
//! Every action carries a copy of the catalog numbers it needs, so a pending
//! action stays valid inside a cloned or deserialized state.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::{
    BuildingKind, Catalog, MissionData, Reward, TechData, UnitData, UnitKind, UnitRequirement,
};
use crate::resources::Costs;

/// Upgrade a building by one level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildingAction {
    /// Building being upgraded.
    pub building: BuildingKind,
    /// Level before the upgrade.
    pub from_level: u32,
    /// Level after the upgrade.
    pub to_level: u32,
    /// Cost of the destination level.
    pub costs: Costs,
    /// Construction time in seconds.
    pub build_time: u64,
}

impl BuildingAction {
    /// The `current -> current + 1` upgrade, if the catalog defines it.
    #[must_use]
    pub fn next_level(catalog: &Catalog, building: BuildingKind, current: u32) -> Option<Self> {
        let to_level = current.checked_add(1)?;
        let level = catalog.building_level(building, to_level)?;
        Some(Self {
            building,
            from_level: current,
            to_level,
            costs: level.costs,
            build_time: level.build_time,
        })
    }
}

/// Research a technology.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResearchAction {
    /// Technology name.
    pub tech: String,
    /// Research cost.
    pub costs: Costs,
    /// Research time in seconds.
    pub research_time: u64,
}

impl From<&TechData> for ResearchAction {
    fn from(tech: &TechData) -> Self {
        Self {
            tech: tech.name.clone(),
            costs: tech.costs,
            research_time: tech.research_time,
        }
    }
}

/// Train one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrainingAction {
    /// Unit type.
    pub unit: UnitKind,
    /// Training cost, food included.
    pub costs: Costs,
    /// Training time in seconds.
    pub training_time: u64,
}

impl From<&UnitData> for TrainingAction {
    fn from(unit: &UnitData) -> Self {
        Self {
            unit: unit.kind,
            costs: unit.costs,
            training_time: unit.training_time,
        }
    }
}

/// Send units on a mission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StartMission {
    /// Mission name.
    pub mission: String,
    /// Resources paid at start.
    pub costs: Costs,
    /// Mission length in seconds.
    pub duration: u64,
    /// Units committed until completion.
    pub units: Vec<UnitRequirement>,
    /// Rewards credited on completion.
    pub rewards: Vec<Reward>,
}

impl From<&MissionData> for StartMission {
    fn from(mission: &MissionData) -> Self {
        Self {
            mission: mission.name.clone(),
            // Missions never consume food
            costs: Costs {
                food: 0,
                ..mission.costs
            },
            duration: mission.duration_secs(),
            units: mission.units.clone(),
            rewards: mission.rewards.clone(),
        }
    }
}

/// Any action the decision engine can start.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Building upgrade.
    Building(BuildingAction),
    /// Technology research.
    Research(ResearchAction),
    /// Unit training.
    Training(TrainingAction),
    /// Mission start.
    Mission(StartMission),
}

impl Action {
    /// Resources and food deducted when the action starts.
    #[must_use]
    pub fn costs(&self) -> Costs {
        match self {
            Self::Building(a) => a.costs,
            Self::Research(a) => a.costs,
            Self::Training(a) => a.costs,
            Self::Mission(a) => a.costs,
        }
    }

    /// Seconds from start to completion.
    #[must_use]
    pub fn duration(&self) -> u64 {
        match self {
            Self::Building(a) => a.build_time,
            Self::Research(a) => a.research_time,
            Self::Training(a) => a.training_time,
            Self::Mission(a) => a.duration,
        }
    }

    /// Short human-readable summary.
    #[must_use]
    pub fn description(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Building(a) => write!(f, "upgrade {} {} -> {}", a.building, a.from_level, a.to_level),
            Self::Research(a) => write!(f, "research {}", a.tech),
            Self::Training(a) => write!(f, "train {}", a.unit),
            Self::Mission(a) => write!(f, "mission {}", a.mission),
        }
    }
}

impl From<BuildingAction> for Action {
    fn from(a: BuildingAction) -> Self {
        Self::Building(a)
    }
}

impl From<ResearchAction> for Action {
    fn from(a: ResearchAction) -> Self {
        Self::Research(a)
    }
}

impl From<TrainingAction> for Action {
    fn from(a: TrainingAction) -> Self {
        Self::Training(a)
    }
}

impl From<StartMission> for Action {
    fn from(a: StartMission) -> Self {
        Self::Mission(a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{BuildingData, BuildingLevel};

    fn create_test_catalog() -> Catalog {
        let level = |wood, time| BuildingLevel {
            costs: Costs::new(wood, 0, 0, 1),
            build_time: time,
            production_rate: None,
            storage_capacity: None,
            required_tech: None,
        };
        let keep = BuildingData {
            kind: BuildingKind::Keep,
            levels: vec![level(0, 0), level(100, 600), level(200, 900)],
        };
        Catalog::new(vec![keep], Vec::new(), Vec::new(), UnitData::standard_roster())
    }

    #[test]
    fn test_next_level_reads_destination_costs() {
        let catalog = create_test_catalog();
        let action = BuildingAction::next_level(&catalog, BuildingKind::Keep, 1).expect("level 2");
        assert_eq!(action.to_level, 2);
        assert_eq!(action.costs.wood, 100);
        assert_eq!(action.build_time, 600);
        assert!(BuildingAction::next_level(&catalog, BuildingKind::Keep, 3).is_none());
        assert!(BuildingAction::next_level(&catalog, BuildingKind::Farm, 1).is_none());
    }

    #[test]
    fn test_action_shared_contract() {
        let catalog = create_test_catalog();
        let building: Action = BuildingAction::next_level(&catalog, BuildingKind::Keep, 2)
            .expect("level 3")
            .into();
        assert_eq!(building.duration(), 900);
        assert_eq!(building.costs().wood, 200);
        assert_eq!(building.description(), "upgrade keep 2 -> 3");

        let unit = catalog.unit(UnitKind::Horseman).expect("horseman");
        let training: Action = TrainingAction::from(unit).into();
        assert_eq!(training.duration(), 1050);
        assert_eq!(training.costs().food, 2);
        assert_eq!(training.description(), "train horseman");
    }

    #[test]
    fn test_mission_start_ignores_food() {
        let mission = MissionData {
            name: "Feast".to_string(),
            duration_minutes: 30,
            tavern_level: 1,
            max_tavern_level: None,
            units: Vec::new(),
            costs: Costs::new(5, 5, 5, 9),
            rewards: Vec::new(),
        };
        let action = Action::from(StartMission::from(&mission));
        assert_eq!(action.costs(), Costs::new(5, 5, 5, 0));
        assert_eq!(action.duration(), 1800);
    }
}
