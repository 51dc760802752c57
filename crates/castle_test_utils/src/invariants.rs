//! Schedule checkers.
//!
//! Each check walks a finished [`Solution`] and reports every place where the
//! schedule breaks a rule the solver must uphold. [`assert_schedule_valid`]
//! runs all of them and panics with the full list.

use std::collections::BTreeMap;
use std::fmt;

use castle_core::army::Army;
use castle_core::data::{BuildingKind, Catalog, TargetLevels};
use castle_core::solution::Solution;
use castle_core::state::{GameSnapshot, DEFAULT_BUILDING_LEVEL};

/// A broken scheduling rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// Two actions of a single-slot queue overlap.
    QueueOverlap {
        /// Queue name.
        queue: &'static str,
        /// Start of the later action.
        start: u64,
        /// End of the earlier action.
        previous_end: u64,
    },
    /// Two missions with the same name ran at the same time.
    MissionOverlap {
        /// Mission name.
        mission: String,
        /// Start of the later run.
        start: u64,
    },
    /// Concurrent missions booked more units than the castle ever owned.
    UnitsDoubleBooked {
        /// Time at which the overbooking starts.
        time: u64,
    },
    /// A building skipped or repeated a level.
    LevelJump {
        /// Building.
        building: BuildingKind,
        /// Level the upgrade started from.
        from: u32,
        /// Level the building was actually at.
        expected: u32,
    },
    /// A target level was not reached.
    TargetMissed {
        /// Building.
        building: BuildingKind,
        /// Final level.
        reached: u32,
        /// Target level.
        target: u32,
    },
    /// Food used passed capacity at a logged boundary.
    FoodOverflow {
        /// Time of the log entry.
        time: u64,
        /// Food used.
        used: u32,
        /// Food capacity.
        capacity: u32,
    },
    /// A gated upgrade started before its technology finished.
    TechNotReady {
        /// Building.
        building: BuildingKind,
        /// Level the upgrade reached.
        level: u32,
        /// Technology that gates the level.
        tech: String,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueOverlap {
                queue,
                start,
                previous_end,
            } => write!(f, "{queue} queue starts at {start} before {previous_end}"),
            Self::MissionOverlap { mission, start } => {
                write!(f, "mission {mission} started at {start} while still running")
            }
            Self::UnitsDoubleBooked { time } => write!(f, "units double-booked at {time}"),
            Self::LevelJump {
                building,
                from,
                expected,
            } => write!(f, "{building} upgraded from {from} while at {expected}"),
            Self::TargetMissed {
                building,
                reached,
                target,
            } => write!(f, "{building} reached {reached}, target {target}"),
            Self::FoodOverflow {
                time,
                used,
                capacity,
            } => write!(f, "food {used}/{capacity} at {time}"),
            Self::TechNotReady {
                building,
                level,
                tech,
            } => write!(f, "{building} {level} started before {tech} finished"),
        }
    }
}

fn check_serial(queue: &'static str, spans: impl Iterator<Item = (u64, u64)>) -> Vec<Violation> {
    let mut spans: Vec<(u64, u64)> = spans.collect();
    spans.sort_unstable();
    spans
        .windows(2)
        .filter(|w| w[1].0 < w[0].1)
        .map(|w| Violation::QueueOverlap {
            queue,
            start: w[1].0,
            previous_end: w[0].1,
        })
        .collect()
}

/// Building, research and training queues never run two actions at once.
#[must_use]
pub fn check_single_occupancy(solution: &Solution) -> Vec<Violation> {
    let mut violations = check_serial(
        "building",
        solution.building_log.iter().map(|e| (e.start, e.end)),
    );
    violations.extend(check_serial(
        "research",
        solution.research_log.iter().map(|e| (e.start, e.end)),
    ));
    violations.extend(check_serial(
        "training",
        solution.training_log.iter().map(|e| (e.start, e.end)),
    ));
    violations
}

/// Missions are unique by name, and concurrent missions never need more
/// units than the final army holds.
#[must_use]
pub fn check_missions(solution: &Solution) -> Vec<Violation> {
    let mut violations = Vec::new();

    let mut by_name: BTreeMap<&str, Vec<(u64, u64)>> = BTreeMap::new();
    for entry in &solution.mission_log {
        by_name
            .entry(entry.mission.as_str())
            .or_default()
            .push((entry.start, entry.end));
    }
    for (name, mut spans) in by_name {
        spans.sort_unstable();
        for pair in spans.windows(2) {
            if pair[1].0 < pair[0].1 {
                violations.push(Violation::MissionOverlap {
                    mission: name.to_string(),
                    start: pair[1].0,
                });
            }
        }
    }

    // Units only ever join the army, so the final army bounds every booking
    let owned = solution.final_state.army;
    for entry in &solution.mission_log {
        let mut booked = Army::new();
        for other in solution
            .mission_log
            .iter()
            .filter(|o| o.start <= entry.start && entry.start < o.end)
        {
            booked.add_all(&other.units);
        }
        if booked.iter().any(|(kind, count)| count > owned.get(kind)) {
            violations.push(Violation::UnitsDoubleBooked { time: entry.start });
        }
    }
    violations
}

/// Every upgrade moves its building up by exactly one level from where it
/// stood, and every target is reached.
#[must_use]
pub fn check_levels(
    solution: &Solution,
    initial: &GameSnapshot,
    targets: &TargetLevels,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut levels = initial.building_levels.clone();

    let mut log: Vec<_> = solution.building_log.iter().collect();
    log.sort_by_key(|e| e.start);
    for entry in log {
        let current = levels
            .get(&entry.building)
            .copied()
            .unwrap_or(DEFAULT_BUILDING_LEVEL);
        if entry.from_level != current || entry.to_level != current + 1 {
            violations.push(Violation::LevelJump {
                building: entry.building,
                from: entry.from_level,
                expected: current,
            });
        }
        levels.insert(entry.building, entry.to_level);
    }

    for (&building, &target) in targets {
        let reached = solution
            .final_state
            .building_levels
            .get(&building)
            .copied()
            .unwrap_or(DEFAULT_BUILDING_LEVEL);
        if reached < target {
            violations.push(Violation::TargetMissed {
                building,
                reached,
                target,
            });
        }
    }
    violations
}

/// Food used never passes capacity at any logged boundary.
#[must_use]
pub fn check_food(solution: &Solution) -> Vec<Violation> {
    let boundaries = solution
        .building_log
        .iter()
        .map(|e| (e.end, e.food_used, e.food_capacity))
        .chain(
            solution
                .research_log
                .iter()
                .map(|e| (e.end, e.food_used, e.food_capacity)),
        )
        .chain(
            solution
                .training_log
                .iter()
                .map(|e| (e.end, e.food_used, e.food_capacity)),
        )
        .chain(std::iter::once((
            solution.total_time,
            solution.final_state.food_used,
            solution.final_state.food_capacity,
        )));

    boundaries
        .filter(|&(_, used, capacity)| used > capacity)
        .map(|(time, used, capacity)| Violation::FoodOverflow {
            time,
            used,
            capacity,
        })
        .collect()
}

/// Technology-gated upgrades start only after their technology finished.
#[must_use]
pub fn check_tech_gates(
    solution: &Solution,
    catalog: &Catalog,
    initial: &GameSnapshot,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    for entry in &solution.building_log {
        let Some(tech) = catalog
            .building(entry.building)
            .and_then(|b| b.required_tech(entry.to_level))
        else {
            continue;
        };
        if initial.researched.contains(tech) || catalog.tech(tech).is_none() {
            continue;
        }
        let ready = solution
            .research_log
            .iter()
            .any(|r| r.tech == tech && r.end <= entry.start);
        if !ready {
            violations.push(Violation::TechNotReady {
                building: entry.building,
                level: entry.to_level,
                tech: tech.to_string(),
            });
        }
    }
    violations
}

/// Run every check.
#[must_use]
pub fn check_schedule(
    solution: &Solution,
    catalog: &Catalog,
    initial: &GameSnapshot,
    targets: &TargetLevels,
) -> Vec<Violation> {
    let mut violations = check_single_occupancy(solution);
    violations.extend(check_missions(solution));
    violations.extend(check_levels(solution, initial, targets));
    violations.extend(check_food(solution));
    violations.extend(check_tech_gates(solution, catalog, initial));
    violations
}

/// Assert that a schedule is valid, listing every violation on failure.
///
/// # Panics
///
/// Panics if any check fails.
pub fn assert_schedule_valid(
    solution: &Solution,
    catalog: &Catalog,
    initial: &GameSnapshot,
    targets: &TargetLevels,
) {
    let violations = check_schedule(solution, catalog, initial, targets);
    if !violations.is_empty() {
        let lines: Vec<String> = violations.iter().map(ToString::to_string).collect();
        panic!(
            "Schedule breaks {} rule(s):\n  {}",
            violations.len(),
            lines.join("\n  ")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use castle_core::army::DefenseTotals;
    use castle_core::resources::Costs;
    use castle_core::solution::{BuildingLogEntry, MissionLogEntry};

    fn create_test_solution() -> Solution {
        Solution {
            building_log: Vec::new(),
            research_log: Vec::new(),
            training_log: Vec::new(),
            mission_log: Vec::new(),
            total_time: 0,
            final_state: GameSnapshot::default(),
            defense: DefenseTotals::default(),
            unmet_targets: BTreeMap::new(),
        }
    }

    fn upgrade(building: BuildingKind, from: u32, start: u64, end: u64) -> BuildingLogEntry {
        BuildingLogEntry {
            building,
            from_level: from,
            to_level: from + 1,
            start,
            end,
            costs: Costs::ZERO,
            food_used: 0,
            food_capacity: 10,
        }
    }

    #[test]
    fn test_detects_queue_overlap() {
        let mut solution = create_test_solution();
        solution.building_log = vec![
            upgrade(BuildingKind::Keep, 1, 0, 100),
            upgrade(BuildingKind::Farm, 1, 50, 150),
        ];
        let violations = check_single_occupancy(&solution);
        assert_eq!(violations.len(), 1);
        assert!(matches!(
            violations[0],
            Violation::QueueOverlap { start: 50, previous_end: 100, .. }
        ));
    }

    #[test]
    fn test_detects_level_jump() {
        let mut solution = create_test_solution();
        solution.building_log = vec![upgrade(BuildingKind::Keep, 2, 0, 100)];
        let violations = check_levels(&solution, &GameSnapshot::default(), &TargetLevels::new());
        assert_eq!(
            violations,
            vec![Violation::LevelJump {
                building: BuildingKind::Keep,
                from: 2,
                expected: 1,
            }]
        );
    }

    #[test]
    fn test_detects_mission_overlap() {
        let mut solution = create_test_solution();
        let run = |start| MissionLogEntry {
            mission: "Patrol".to_string(),
            start,
            end: start + 60,
            costs: Costs::ZERO,
            units: Vec::new(),
            rewards: Vec::new(),
        };
        solution.mission_log = vec![run(0), run(30)];
        assert!(check_missions(&solution)
            .iter()
            .any(|v| matches!(v, Violation::MissionOverlap { start: 30, .. })));
    }

    #[test]
    fn test_clean_schedule_passes() {
        let mut solution = create_test_solution();
        solution.building_log = vec![
            upgrade(BuildingKind::Keep, 1, 0, 100),
            upgrade(BuildingKind::Keep, 2, 100, 200),
        ];
        solution.final_state.building_levels.insert(BuildingKind::Keep, 3);
        let targets: TargetLevels = [(BuildingKind::Keep, 3)].into_iter().collect();
        assert_schedule_valid(
            &solution,
            &Catalog::default(),
            &GameSnapshot::default(),
            &targets,
        );
    }
}
