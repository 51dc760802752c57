//! The event-driven scheduler.
//!
//! A run starts with one state-changed event at time zero. Every event
//! advances the clock, applies its effect and, for completions, triggers a
//! new state-changed event. State-changed events let each idle queue start
//! its next action (see `decision`), and schedule a wakeup for the moment
//! the cheapest blocked candidate becomes affordable. Once every target is
//! reached the remaining completions are drained and the finalization pass
//! (see `finalize`) spends what is left.
//!
//! # Example
//!
//! ```
//! use castle_core::data::{BuildingData, BuildingKind, BuildingLevel, Catalog, TargetLevels};
//! use castle_core::resources::{Costs, ResourceKind};
//! use castle_core::solver::Solver;
//! use castle_core::state::GameSnapshot;
//! use castle_core::SolverConfig;
//!
//! let level = |wood, rate| BuildingLevel {
//!     costs: Costs::new(wood, 0, 0, 0),
//!     build_time: 60,
//!     production_rate: Some(rate),
//!     storage_capacity: None,
//!     required_tech: None,
//! };
//! let lumberjack = BuildingData {
//!     kind: BuildingKind::Lumberjack,
//!     levels: vec![level(0, 60), level(50, 120), level(100, 240)],
//! };
//! let catalog = Catalog::new(vec![lumberjack], vec![], vec![], vec![]);
//! let targets: TargetLevels = [(BuildingKind::Lumberjack, 3)].into_iter().collect();
//!
//! let mut start = GameSnapshot::default();
//! start.resources.insert(ResourceKind::Wood, 50);
//!
//! let solver = Solver::new(catalog, targets, SolverConfig::default());
//! let solution = solver.solve(&start).unwrap();
//! assert!(solution.is_complete());
//! assert_eq!(solution.building_log.len(), 2);
//! ```

mod decision;
mod finalize;

use crate::config::SolverConfig;
use crate::data::{Catalog, TargetLevels};
use crate::error::{Result, SolverError};
use crate::events::{EventKind, EventQueue, ScheduledEvent};
use crate::missions::{self, MissionBoard};
use crate::prerequisites::PrerequisiteResolver;
use crate::roi::RoiModel;
use crate::solution::{
    BuildingLogEntry, MissionLogEntry, ResearchLogEntry, Solution, TrainingLogEntry,
};
use crate::state::{GameSnapshot, SimulationState};

/// Schedules upgrades, research, training and missions toward target levels.
#[derive(Debug, Clone)]
pub struct Solver {
    catalog: Catalog,
    targets: TargetLevels,
    config: SolverConfig,
}

impl Solver {
    /// Create a solver.
    #[must_use]
    pub fn new(catalog: Catalog, targets: TargetLevels, config: SolverConfig) -> Self {
        Self {
            catalog,
            targets,
            config,
        }
    }

    /// The catalog this solver plans against.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Target levels.
    #[must_use]
    pub fn targets(&self) -> &TargetLevels {
        &self.targets
    }

    /// Solver configuration.
    #[must_use]
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// The state a run from `snapshot` starts with.
    #[must_use]
    pub fn initial_state(&self, snapshot: &GameSnapshot) -> SimulationState {
        SimulationState::from_snapshot(
            &self.catalog,
            snapshot,
            self.config.production_tech_bonus_percent,
        )
    }

    /// Plan from a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::InvariantViolation`] if resource accounting
    /// breaks, and [`SolverError::DidNotConverge`] if the event loop hits
    /// its iteration ceiling.
    pub fn solve(&self, snapshot: &GameSnapshot) -> Result<Solution> {
        self.solve_from(self.initial_state(snapshot))
    }

    /// Plan from an existing state, e.g. a clone kept for a re-run.
    ///
    /// # Errors
    ///
    /// Same as [`Solver::solve`].
    pub fn solve_from(&self, state: SimulationState) -> Result<Solution> {
        Run::new(self, state).execute()
    }
}

/// Mutable context of a single solver run.
struct Run<'a> {
    catalog: &'a Catalog,
    targets: &'a TargetLevels,
    config: SolverConfig,
    roi: RoiModel<'a>,
    resolver: PrerequisiteResolver<'a>,
    board: MissionBoard<'a>,
    state: SimulationState,
    events: EventQueue,
    building_log: Vec<BuildingLogEntry>,
    research_log: Vec<ResearchLogEntry>,
    training_log: Vec<TrainingLogEntry>,
    mission_log: Vec<MissionLogEntry>,
}

impl<'a> Run<'a> {
    fn new(solver: &'a Solver, state: SimulationState) -> Self {
        let config = solver.config;
        Self {
            catalog: &solver.catalog,
            targets: &solver.targets,
            config,
            roi: RoiModel::new(&solver.catalog, &solver.targets, config.production_tech_bonus()),
            resolver: PrerequisiteResolver::new(&solver.catalog, config.resolve_depth),
            board: MissionBoard::new(&solver.catalog),
            state,
            events: EventQueue::new(),
            building_log: Vec::new(),
            research_log: Vec::new(),
            training_log: Vec::new(),
            mission_log: Vec::new(),
        }
    }

    fn execute(mut self) -> Result<Solution> {
        tracing::info!(
            targets = self.targets.len(),
            start = self.state.now(),
            "Starting schedule"
        );

        self.events.push(self.state.now(), EventKind::StateChanged);

        let mut iterations = 0u64;
        while !self.state.all_targets_met(self.targets) {
            let Some(event) = self.events.pop() else {
                tracing::warn!(
                    time = self.state.now(),
                    unmet = self.state.unmet_targets(self.targets).len(),
                    "No pending events, targets cannot be reached"
                );
                break;
            };
            if iterations >= self.config.max_iterations {
                return Err(SolverError::DidNotConverge { iterations });
            }
            iterations += 1;
            self.process(event)?;
        }

        // Completions still in flight belong to the schedule
        while let Some(event) = self.events.pop() {
            if event.kind == EventKind::StateChanged {
                continue;
            }
            self.process(event)?;
        }

        if self.state.all_targets_met(self.targets) {
            self.finalize()?;
        } else {
            tracing::warn!("Skipping finalization, targets not reached");
        }

        let solution = self.into_solution();
        tracing::info!(
            total_time = solution.total_time,
            buildings = solution.building_log.len(),
            research = solution.research_log.len(),
            training = solution.training_log.len(),
            missions = solution.mission_log.len(),
            iterations,
            "Schedule complete"
        );
        Ok(solution)
    }

    fn process(&mut self, event: ScheduledEvent) -> Result<()> {
        self.state.advance_to(event.time);

        match event.kind {
            EventKind::MissionComplete { mission } => self.on_mission_complete(&mission),
            EventKind::BuildingComplete => self.on_building_complete(),
            EventKind::ResearchComplete => self.on_research_complete(),
            EventKind::TrainingComplete => self.on_training_complete(),
            EventKind::StateChanged => self.on_state_changed()?,
        }

        #[cfg(feature = "debug-validation")]
        self.state.check_invariants()?;

        Ok(())
    }

    fn on_mission_complete(&mut self, name: &str) {
        let Some(finished) = missions::complete(&mut self.state, name) else {
            tracing::warn!(mission = name, "Completion for a mission that is not running");
            return;
        };
        tracing::debug!(mission = name, time = self.state.now(), "Mission complete");

        self.mission_log.push(MissionLogEntry {
            mission: finished.mission,
            start: finished.start,
            end: finished.end,
            costs: finished.costs,
            units: finished.units,
            rewards: finished.rewards,
        });
        self.events.push_state_changed_if_absent(self.state.now());
    }

    fn on_building_complete(&mut self) {
        let Some(action) = self.state.pending_building.take() else {
            tracing::warn!(time = self.state.now(), "Building completion without a pending upgrade");
            return;
        };
        self.state.set_level(self.catalog, action.building, action.to_level);
        tracing::debug!(
            building = %action.building,
            level = action.to_level,
            time = self.state.now(),
            "Building complete"
        );

        let now = self.state.now();
        self.building_log.push(BuildingLogEntry {
            building: action.building,
            from_level: action.from_level,
            to_level: action.to_level,
            start: now.saturating_sub(action.build_time),
            end: now,
            costs: action.costs,
            food_used: self.state.food_used(),
            food_capacity: self.state.food_capacity(),
        });
        self.events.push_state_changed_if_absent(now);
    }

    fn on_research_complete(&mut self) {
        let Some(action) = self.state.pending_research.take() else {
            tracing::warn!(time = self.state.now(), "Research completion without pending research");
            return;
        };
        self.state.mark_researched(&action.tech);
        tracing::debug!(tech = %action.tech, time = self.state.now(), "Research complete");

        let now = self.state.now();
        self.research_log.push(ResearchLogEntry {
            tech: action.tech,
            start: now.saturating_sub(action.research_time),
            end: now,
            costs: action.costs,
            food_used: self.state.food_used(),
            food_capacity: self.state.food_capacity(),
        });
        self.events.push_state_changed_if_absent(now);
    }

    fn on_training_complete(&mut self) {
        let Some(action) = self.state.pending_training.take() else {
            tracing::warn!(time = self.state.now(), "Training completion without a pending unit");
            return;
        };
        self.state.army.add(action.unit, 1);
        tracing::debug!(unit = %action.unit, time = self.state.now(), "Training complete");

        let now = self.state.now();
        self.training_log.push(TrainingLogEntry {
            unit: action.unit,
            start: now.saturating_sub(action.training_time),
            end: now,
            costs: action.costs,
            food_used: self.state.food_used(),
            food_capacity: self.state.food_capacity(),
        });
        self.events.push_state_changed_if_absent(now);
    }

    fn total_time(&self) -> u64 {
        self.state
            .now()
            .max(self.state.building_free_at())
            .max(self.state.research_free_at())
            .max(self.state.training_free_at())
    }

    fn into_solution(self) -> Solution {
        let final_army = self.state.total_army();
        Solution {
            total_time: self.total_time(),
            final_state: self.state.to_snapshot(),
            defense: final_army.defense(self.catalog.units()),
            unmet_targets: self.state.unmet_targets(self.targets),
            building_log: self.building_log,
            research_log: self.research_log,
            training_log: self.training_log,
            mission_log: self.mission_log,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{BuildingData, BuildingKind, BuildingLevel, MissionData, Reward, TechData, UnitData, UnitKind, UnitRequirement};
    use crate::resources::{Costs, ResourceKind};

    fn level(costs: Costs, build_time: u64, rate: Option<u32>, cap: Option<u32>) -> BuildingLevel {
        BuildingLevel {
            costs,
            build_time,
            production_rate: rate,
            storage_capacity: cap,
            required_tech: None,
        }
    }

    fn producer(kind: BuildingKind) -> BuildingData {
        BuildingData {
            kind,
            levels: (1..=5)
                .map(|l| level(Costs::new(20 * l, 20 * l, 20 * l, 1), 60 * u64::from(l), Some(100 * l), None))
                .collect(),
        }
    }

    fn store(kind: BuildingKind) -> BuildingData {
        BuildingData {
            kind,
            levels: (1..=5)
                .map(|l| level(Costs::new(10 * l, 10 * l, 10 * l, 0), 30, None, Some(500 * l)))
                .collect(),
        }
    }

    fn create_test_catalog() -> Catalog {
        let mut farm = BuildingData {
            kind: BuildingKind::Farm,
            levels: (1..=5)
                .map(|l| level(Costs::new(15 * l, 15 * l, 0, 0), 45, None, Some(10 + 20 * (l - 1))))
                .collect(),
        };
        farm.levels[2].required_tech = Some("Crop rotation".to_string());
        let library = BuildingData {
            kind: BuildingKind::Library,
            levels: (1..=3)
                .map(|l| level(Costs::new(30 * l, 0, 0, 0), 90, None, None))
                .collect(),
        };
        let tavern = BuildingData {
            kind: BuildingKind::Tavern,
            levels: (1..=3)
                .map(|l| level(Costs::new(25 * l, 25 * l, 0, 1), 60, None, None))
                .collect(),
        };

        let spearman = UnitData::standard_roster()
            .into_iter()
            .filter(|u| u.kind == UnitKind::Spearman)
            .collect();

        Catalog::new(
            vec![
                producer(BuildingKind::Lumberjack),
                producer(BuildingKind::Quarry),
                producer(BuildingKind::OreMine),
                store(BuildingKind::WoodStore),
                store(BuildingKind::StoneStore),
                store(BuildingKind::OreStore),
                farm,
                library,
                tavern,
            ],
            vec![
                TechData {
                    name: "Crop rotation".to_string(),
                    required_library_level: 2,
                    costs: Costs::new(40, 40, 40, 0),
                    research_time: 120,
                },
                TechData {
                    name: "Beer tester".to_string(),
                    required_library_level: 3,
                    costs: Costs::new(50, 50, 50, 0),
                    research_time: 120,
                },
            ],
            vec![MissionData {
                name: "Patrol".to_string(),
                duration_minutes: 30,
                tavern_level: 2,
                max_tavern_level: None,
                units: vec![UnitRequirement {
                    unit: UnitKind::Spearman,
                    count: 2,
                }],
                costs: Costs::ZERO,
                rewards: vec![Reward {
                    resource: ResourceKind::Wood,
                    min: 40,
                    max: 60,
                }],
            }],
            spearman,
        )
    }

    fn create_test_snapshot(amount: u32) -> GameSnapshot {
        let mut snapshot = GameSnapshot::default();
        for kind in ResourceKind::ALL {
            snapshot.resources.insert(kind, amount);
        }
        snapshot
    }

    fn targets(pairs: &[(BuildingKind, u32)]) -> TargetLevels {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_reaches_all_targets() {
        let solver = Solver::new(
            create_test_catalog(),
            targets(&[
                (BuildingKind::Lumberjack, 5),
                (BuildingKind::Quarry, 5),
                (BuildingKind::OreMine, 5),
                (BuildingKind::Farm, 5),
                (BuildingKind::Tavern, 3),
            ]),
            SolverConfig::default(),
        );
        let solution = solver.solve(&create_test_snapshot(100)).expect("solve");

        assert!(solution.is_complete(), "unmet: {:?}", solution.unmet_targets);
        assert!(solution.final_state.researched.contains("Crop rotation"));
        assert_eq!(
            solution.final_state.food_used,
            solution.final_state.food_capacity
        );
    }

    #[test]
    fn test_tech_completes_before_gated_farm_level() {
        let solver = Solver::new(
            create_test_catalog(),
            targets(&[(BuildingKind::Farm, 4)]),
            SolverConfig::default(),
        );
        let solution = solver.solve(&create_test_snapshot(200)).expect("solve");

        let research_end = solution
            .research_log
            .iter()
            .find(|r| r.tech == "Crop rotation")
            .map(|r| r.end)
            .expect("researched");
        let farm_start = solution
            .building_log
            .iter()
            .find(|b| b.building == BuildingKind::Farm && b.to_level == 3)
            .map(|b| b.start)
            .expect("farm 3");
        assert!(research_end <= farm_start);
    }

    #[test]
    fn test_researches_tech_gating_farm_substitute() {
        // Farm is not a target, but Lumberjack 2 needs its third level for food
        let solver = Solver::new(
            create_test_catalog(),
            targets(&[(BuildingKind::Lumberjack, 3)]),
            SolverConfig::default(),
        );
        let mut snapshot = create_test_snapshot(200);
        snapshot.food_used = 30;
        snapshot.building_levels.insert(BuildingKind::Farm, 2);
        snapshot.building_levels.insert(BuildingKind::Library, 2);
        let solution = solver.solve(&snapshot).expect("solve");

        assert!(solution.is_complete(), "unmet: {:?}", solution.unmet_targets);
        let research_end = solution
            .research_log
            .iter()
            .find(|r| r.tech == "Crop rotation")
            .map(|r| r.end)
            .expect("researched");
        let farm_start = solution
            .building_log
            .iter()
            .find(|b| b.building == BuildingKind::Farm && b.to_level == 3)
            .map(|b| b.start)
            .expect("farm 3");
        assert!(research_end <= farm_start);
    }

    #[test]
    fn test_already_met_targets() {
        let solver = Solver::new(
            create_test_catalog(),
            targets(&[(BuildingKind::Keep, 1)]),
            SolverConfig::default(),
        );
        let solution = solver.solve(&create_test_snapshot(0)).expect("solve");
        assert!(solution.building_log.is_empty());
        assert!(solution.is_complete());
    }

    #[test]
    fn test_unreachable_target_reported() {
        let mut catalog = create_test_catalog();
        catalog = Catalog::new(
            catalog
                .buildings()
                .filter(|b| b.kind != BuildingKind::Quarry)
                .cloned()
                .collect(),
            catalog.techs().cloned().collect(),
            catalog.missions().to_vec(),
            catalog.units().cloned().collect(),
        );
        // Stone is never produced, so Lumberjack 2 can never be paid for
        let solver = Solver::new(
            catalog,
            targets(&[(BuildingKind::Lumberjack, 3)]),
            SolverConfig::default(),
        );
        let solution = solver.solve(&create_test_snapshot(0)).expect("solve");
        assert!(!solution.is_complete());
        assert_eq!(solution.unmet_targets.get(&BuildingKind::Lumberjack), Some(&1));
    }

    #[test]
    fn test_iteration_ceiling() {
        let config = SolverConfig {
            max_iterations: 3,
            ..SolverConfig::default()
        };
        let solver = Solver::new(
            create_test_catalog(),
            targets(&[(BuildingKind::Lumberjack, 5), (BuildingKind::Quarry, 5)]),
            config,
        );
        let err = solver.solve(&create_test_snapshot(0));
        assert!(matches!(err, Err(SolverError::DidNotConverge { iterations: 3 })));
    }

    #[test]
    fn test_wait_until_affordable_moves_clock() {
        let solver = Solver::new(create_test_catalog(), targets(&[]), SolverConfig::default());
        let state = solver.initial_state(&create_test_snapshot(0));
        let mut run = Run::new(&solver, state);

        // 100 wood per hour from Lumberjack 1, 500 wood storage
        let costs = Costs::new(450, 0, 0, 0);
        assert!(run.wait_until_affordable(&costs));
        assert!(run.state.can_afford(&costs));
        assert!(run.state.now() >= 4 * 3600);
    }

    #[test]
    fn test_wait_until_affordable_gives_up_above_storage() {
        let solver = Solver::new(create_test_catalog(), targets(&[]), SolverConfig::default());
        let state = solver.initial_state(&create_test_snapshot(0));
        let mut run = Run::new(&solver, state);

        assert!(!run.wait_until_affordable(&Costs::new(501, 0, 0, 0)));
        assert_eq!(run.state.now(), 0);
    }

    #[test]
    fn test_defense_fill_breaks_ties_by_unit_kind() {
        let base = create_test_catalog();
        let spearman = base
            .units()
            .find(|u| u.kind == UnitKind::Spearman)
            .cloned()
            .expect("spearman");
        let twin = UnitData {
            kind: UnitKind::Swordsman,
            ..spearman.clone()
        };
        let catalog = Catalog::new(
            base.buildings().cloned().collect(),
            base.techs().cloned().collect(),
            base.missions().to_vec(),
            vec![twin, spearman],
        );
        let solver = Solver::new(catalog, targets(&[]), SolverConfig::default());

        // Farm 1 holds 10 food, so one unit fits
        let mut snapshot = create_test_snapshot(200);
        snapshot.food_used = 9;
        let solution = solver.solve(&snapshot).expect("solve");

        let trained: Vec<UnitKind> = solution.training_log.iter().map(|t| t.unit).collect();
        assert_eq!(trained, vec![UnitKind::Spearman]);
    }

    #[test]
    fn test_clone_reruns_identically() {
        let solver = Solver::new(
            create_test_catalog(),
            targets(&[(BuildingKind::Lumberjack, 4), (BuildingKind::Tavern, 3)]),
            SolverConfig::default(),
        );
        let state = solver.initial_state(&create_test_snapshot(100));
        let first = solver.solve_from(state.clone()).expect("first");
        let second = solver.solve_from(state).expect("second");
        assert_eq!(first.fingerprint(), second.fingerprint());
        assert_eq!(first, second);
    }
}
