//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the solver produces identical
//! schedules given identical inputs.
//!
//! # Testing Strategy
//!
//! A schedule is only useful if re-running the same castle gives the same
//! answer. Sources of non-determinism include:
//!
//! - **Floating-point accumulation**: stockpiles and rates use fixed-point
//!   arithmetic via [`castle_core::math::Fixed`]. Floats appear only in
//!   ranking scores, which are recomputed from scratch each time.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Catalogs, levels and targets live in `BTreeMap`s.
//!
//! - **Same-instant events**: the event queue breaks ties by kind priority
//!   and then insertion order.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: individual components (queue ordering, ROI ranking)
//! 2. **Property tests**: random snapshots must still solve deterministically
//! 3. **Integration tests**: full scenarios are reproducible
//! 4. **Parallel tests**: N solves on separate threads all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use castle_core::error::Result;
use castle_core::solution::Solution;
use castle_core::solver::Solver;
use castle_core::state::GameSnapshot;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
}

impl DeterminismResult {
    fn from_hashes(hashes: Vec<u64>) -> Self {
        Self {
            is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
            hashes,
        }
    }

    /// Get all unique hashes (should be 1 for a deterministic solver).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Solver is non-deterministic!\n\
                 Runs: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a computation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `setup` - Function to create the input
/// * `run` - Function producing the output from the input
/// * `hash` - Function to compute the output hash
pub fn verify_determinism<S, T, Setup, Run, HashFn>(
    runs: usize,
    setup: Setup,
    run: Run,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Run: Fn(S) -> T,
    HashFn: Fn(&T) -> u64,
{
    let hashes = (0..runs).map(|_| hash(&run(setup()))).collect();
    DeterminismResult::from_hashes(hashes)
}

/// Solve the same snapshot `runs` times and compare fingerprints.
///
/// # Errors
///
/// Returns the first solver error encountered.
pub fn verify_solver_determinism(
    solver: &Solver,
    snapshot: &GameSnapshot,
    runs: usize,
) -> Result<DeterminismResult> {
    let hashes = (0..runs)
        .map(|_| solver.solve(snapshot).map(|s| s.fingerprint()))
        .collect::<Result<Vec<u64>>>()?;
    Ok(DeterminismResult::from_hashes(hashes))
}

/// Solve the same snapshot on `num_runs` scoped threads.
///
/// Catches non-determinism that only shows up under thread scheduling or
/// memory layout differences.
///
/// # Errors
///
/// Returns the first solver error encountered.
///
/// # Panics
///
/// Panics if a solver thread panics.
pub fn run_parallel_solves_scoped(
    solver: &Solver,
    snapshot: &GameSnapshot,
    num_runs: usize,
) -> Result<DeterminismResult> {
    let results: Vec<Result<u64>> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_runs)
            .map(|_| s.spawn(|| solver.solve(snapshot).map(|sol| sol.fingerprint())))
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("solver thread panicked"))
            .collect()
    });

    let hashes = results.into_iter().collect::<Result<Vec<u64>>>()?;
    Ok(DeterminismResult::from_hashes(hashes))
}

/// Where two schedules first differ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Divergence {
    /// Building log differs at this index.
    Building(usize),
    /// Research log differs at this index.
    Research(usize),
    /// Training log differs at this index.
    Training(usize),
    /// Mission log differs at this index.
    Mission(usize),
    /// Logs match but the totals or final state do not.
    Outcome,
}

fn first_difference<T: PartialEq>(a: &[T], b: &[T]) -> Option<usize> {
    a.iter()
        .zip(b)
        .position(|(x, y)| x != y)
        .or_else(|| (a.len() != b.len()).then_some(a.len().min(b.len())))
}

/// Compare two schedules entry by entry, finding the first divergence.
///
/// Useful for debugging non-determinism by finding exactly which action
/// started to differ.
#[must_use]
pub fn find_first_divergence(a: &Solution, b: &Solution) -> Option<Divergence> {
    if let Some(i) = first_difference(&a.building_log, &b.building_log) {
        return Some(Divergence::Building(i));
    }
    if let Some(i) = first_difference(&a.research_log, &b.research_log) {
        return Some(Divergence::Research(i));
    }
    if let Some(i) = first_difference(&a.training_log, &b.training_log) {
        return Some(Divergence::Training(i));
    }
    if let Some(i) = first_difference(&a.mission_log, &b.mission_log) {
        return Some(Divergence::Mission(i));
    }
    (a != b).then_some(Divergence::Outcome)
}

/// Verify that a serialization round trip preserves a solution exactly.
#[must_use]
pub fn verify_serialization_determinism(solution: &Solution) -> bool {
    let Ok(bytes) = solution.serialize() else {
        return false;
    };
    let Ok(restored) = Solution::deserialize(&bytes) else {
        return false;
    };
    restored.fingerprint() == solution.fingerprint()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for determinism testing.
///
/// These strategies generate random but reproducible scenarios for
/// property-based testing of the solver.
pub mod strategies {
    use castle_core::data::{BuildingKind, TargetLevels};
    use castle_core::resources::{Costs, ResourceKind};
    use castle_core::state::GameSnapshot;
    use proptest::prelude::*;

    /// Generate a starting stockpile amount (0-2000).
    pub fn arb_resource_amount() -> impl Strategy<Value = u32> {
        0u32..2000u32
    }

    /// Generate a resource kind.
    pub fn arb_resource_kind() -> impl Strategy<Value = ResourceKind> {
        prop_oneof![
            Just(ResourceKind::Wood),
            Just(ResourceKind::Stone),
            Just(ResourceKind::Iron),
        ]
    }

    /// Generate a cost bundle with every resource below `max`.
    pub fn arb_costs(max: u32) -> impl Strategy<Value = Costs> {
        (0..max, 0..max, 0..max, 0u32..3).prop_map(|(w, s, i, f)| Costs::new(w, s, i, f))
    }

    /// Generate a snapshot with every building at level 1 and random
    /// stockpiles.
    pub fn arb_snapshot() -> impl Strategy<Value = GameSnapshot> {
        (
            arb_resource_amount(),
            arb_resource_amount(),
            arb_resource_amount(),
        )
            .prop_map(|(wood, stone, iron)| {
                let mut snapshot = GameSnapshot::default();
                snapshot.resources.insert(ResourceKind::Wood, wood);
                snapshot.resources.insert(ResourceKind::Stone, stone);
                snapshot.resources.insert(ResourceKind::Iron, iron);
                snapshot
            })
    }

    /// Generate producer and tavern targets no higher than
    /// [`small_targets`](crate::fixtures::small_targets), which the fixture
    /// scenarios solve from any stockpile.
    pub fn arb_targets() -> impl Strategy<Value = TargetLevels> {
        (2u32..=6, 2u32..=6, 2u32..=5, 1u32..=3).prop_map(|(wood, stone, iron, tavern)| {
            [
                (BuildingKind::Lumberjack, wood),
                (BuildingKind::Quarry, stone),
                (BuildingKind::OreMine, iron),
                (BuildingKind::Tavern, tavern),
            ]
            .into_iter()
            .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{castle_catalog, small_targets, snapshot_with};
    use castle_core::SolverConfig;

    #[test]
    fn test_verify_determinism_detects_difference() {
        let counter = std::cell::Cell::new(0u64);
        let result = verify_determinism(
            3,
            || {
                counter.set(counter.get() + 1);
                counter.get()
            },
            |n| n,
            compute_hash,
        );
        assert!(!result.is_deterministic);
        assert_eq!(result.unique_hashes().len(), 3);
    }

    #[test]
    fn test_solver_repeatable() {
        let solver = Solver::new(castle_catalog(), small_targets(), SolverConfig::default());
        let result = verify_solver_determinism(&solver, &snapshot_with(200), 3).expect("solve");
        result.assert_deterministic();
    }

    #[test]
    fn test_find_first_divergence() {
        let solver = Solver::new(castle_catalog(), small_targets(), SolverConfig::default());
        let a = solver.solve(&snapshot_with(200)).expect("solve");
        let mut b = a.clone();
        assert_eq!(find_first_divergence(&a, &b), None);

        b.building_log[1].start += 1;
        assert_eq!(find_first_divergence(&a, &b), Some(Divergence::Building(1)));

        let mut c = a.clone();
        c.total_time += 1;
        assert_eq!(find_first_divergence(&a, &c), Some(Divergence::Outcome));
    }

    #[test]
    fn test_serialization_round_trip() {
        let solver = Solver::new(castle_catalog(), small_targets(), SolverConfig::default());
        let solution = solver.solve(&snapshot_with(200)).expect("solve");
        assert!(verify_serialization_determinism(&solution));
    }
}
