//! Schedule output.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::army::DefenseTotals;
use crate::data::{BuildingKind, Reward, UnitKind, UnitRequirement};
use crate::error::{Result, SolverError};
use crate::resources::Costs;
use crate::state::GameSnapshot;

/// A completed building upgrade.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildingLogEntry {
    /// Building upgraded.
    pub building: BuildingKind,
    /// Level before.
    pub from_level: u32,
    /// Level after.
    pub to_level: u32,
    /// Start time in seconds.
    pub start: u64,
    /// Completion time in seconds.
    pub end: u64,
    /// Resources and food paid.
    pub costs: Costs,
    /// Food used when the entry was recorded.
    pub food_used: u32,
    /// Food capacity when the entry was recorded.
    pub food_capacity: u32,
}

/// A completed technology.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResearchLogEntry {
    /// Technology name.
    pub tech: String,
    /// Start time in seconds.
    pub start: u64,
    /// Completion time in seconds.
    pub end: u64,
    /// Resources and food paid.
    pub costs: Costs,
    /// Food used when the entry was recorded.
    pub food_used: u32,
    /// Food capacity when the entry was recorded.
    pub food_capacity: u32,
}

/// A trained unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrainingLogEntry {
    /// Unit type.
    pub unit: UnitKind,
    /// Start time in seconds.
    pub start: u64,
    /// Completion time in seconds.
    pub end: u64,
    /// Resources and food paid.
    pub costs: Costs,
    /// Food used when the entry was recorded.
    pub food_used: u32,
    /// Food capacity when the entry was recorded.
    pub food_capacity: u32,
}

/// A finished mission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MissionLogEntry {
    /// Mission name.
    pub mission: String,
    /// Start time in seconds.
    pub start: u64,
    /// Completion time in seconds.
    pub end: u64,
    /// Resources paid at start.
    pub costs: Costs,
    /// Units that were committed.
    pub units: Vec<UnitRequirement>,
    /// Reward ranges credited at their average.
    pub rewards: Vec<Reward>,
}

/// Result of a solver run.
///
/// Logs are in completion order. Because each serial queue runs one action
/// at a time, that is also start order within a log.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Solution {
    /// Building upgrades.
    pub building_log: Vec<BuildingLogEntry>,
    /// Researched technologies.
    pub research_log: Vec<ResearchLogEntry>,
    /// Trained units.
    pub training_log: Vec<TrainingLogEntry>,
    /// Completed missions.
    pub mission_log: Vec<MissionLogEntry>,
    /// Seconds until the last queue is free.
    pub total_time: u64,
    /// Castle at the end of the run.
    pub final_state: GameSnapshot,
    /// Defense of the final army.
    pub defense: DefenseTotals,
    /// Targets that were not reached, with the level reached instead.
    pub unmet_targets: BTreeMap<BuildingKind, u32>,
}

impl Solution {
    /// Whether every target was reached.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.unmet_targets.is_empty()
    }

    /// The first building upgrade to start.
    #[must_use]
    pub fn next_building_action(&self) -> Option<&BuildingLogEntry> {
        self.building_log.iter().min_by_key(|e| (e.start, e.end))
    }

    /// Hash over every field, for comparing two runs.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    /// Serialize to bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| SolverError::Serialization(format!("Failed to serialize solution: {e}")))
    }

    /// Deserialize from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| SolverError::Serialization(format!("Failed to deserialize solution: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_solution() -> Solution {
        let entry = |building, from, start| BuildingLogEntry {
            building,
            from_level: from,
            to_level: from + 1,
            start,
            end: start + 60,
            costs: Costs::new(10, 10, 10, 1),
            food_used: 1,
            food_capacity: 40,
        };
        Solution {
            building_log: vec![
                entry(BuildingKind::Quarry, 1, 60),
                entry(BuildingKind::Lumberjack, 1, 0),
            ],
            research_log: Vec::new(),
            training_log: Vec::new(),
            mission_log: Vec::new(),
            total_time: 120,
            final_state: GameSnapshot::default(),
            defense: DefenseTotals::default(),
            unmet_targets: BTreeMap::new(),
        }
    }

    #[test]
    fn test_next_building_action_is_earliest() {
        let solution = create_test_solution();
        let next = solution.next_building_action().expect("entry");
        assert_eq!(next.building, BuildingKind::Lumberjack);
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = create_test_solution();
        let mut b = a.clone();
        assert_eq!(a.fingerprint(), b.fingerprint());

        b.total_time += 1;
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_bytes_round_trip() {
        let solution = create_test_solution();
        let bytes = solution.serialize().expect("serialize");
        assert_eq!(Solution::deserialize(&bytes).expect("deserialize"), solution);
        assert!(solution.is_complete());
    }
}
