//! Schedule invariants over random starting castles.

use castle_core::solver::Solver;
use castle_core::SolverConfig;
use castle_test_utils::determinism::strategies::{arb_snapshot, arb_targets};
use castle_test_utils::fixtures::castle_catalog;
use castle_test_utils::invariants::check_schedule;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_schedule_valid(snapshot in arb_snapshot(), targets in arb_targets()) {
        let catalog = castle_catalog();
        let solver = Solver::new(catalog.clone(), targets.clone(), SolverConfig::default());
        let solution = solver.solve(&snapshot).expect("solve");

        prop_assert!(solution.is_complete(), "unmet: {:?}", solution.unmet_targets);
        let violations = check_schedule(&solution, &catalog, &snapshot, &targets);
        prop_assert!(violations.is_empty(), "{:?}", violations);
    }

    #[test]
    fn prop_final_state_consistent(snapshot in arb_snapshot(), targets in arb_targets()) {
        let solver = Solver::new(castle_catalog(), targets, SolverConfig::default());
        let solution = solver.solve(&snapshot).expect("solve");

        prop_assert!(solution.final_state.food_used <= solution.final_state.food_capacity);
        let trained = u64::try_from(solution.training_log.len()).unwrap_or(u64::MAX);
        prop_assert_eq!(solution.final_state.army.total(), trained);
    }
}
