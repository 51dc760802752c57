//! Return-on-investment heuristics for ranking upgrades.
//!
//! Everything here is a pure function of the catalog, the target levels and
//! a read-only [`SimulationState`]. Scores are `f64`: they only order
//! candidates and never feed back into resource accounting.

use std::cmp::Ordering;

use crate::actions::BuildingAction;
use crate::data::{BuildingKind, Catalog, TargetLevels, TechData, PRODUCTION_TECHS};
use crate::resources::ResourceKind;
use crate::state::SimulationState;

/// Lowest scarcity multiplier.
pub const MIN_SCARCITY: f64 = 0.5;
/// Highest scarcity multiplier.
pub const MAX_SCARCITY: f64 = 2.0;
/// Floor applied to each production rate when computing supply shares.
pub const MIN_SUPPLY_RATE: f64 = 0.1;
/// Multiplier used when an investment costs nothing.
pub const FREE_INVESTMENT_FACTOR: f64 = 1000.0;

/// Components of one ROI score.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RoiMetric {
    /// Resources (or net mission reward) gained per hour.
    pub gain_per_hour: f64,
    /// Resources invested.
    pub total_cost: f64,
    /// Additive adjustment: `0.5` means +50%.
    pub scarcity_bonus: f64,
}

impl RoiMetric {
    /// Final score.
    ///
    /// A free investment scores `gain x 1000`. Otherwise the gain per unit of
    /// cost is scaled by `1 + scarcity_bonus`.
    #[must_use]
    pub fn score(&self) -> f64 {
        if self.total_cost <= 0.0 {
            return self.gain_per_hour * FREE_INVESTMENT_FACTOR;
        }
        self.gain_per_hour / self.total_cost.max(1.0) * (1.0 + self.scarcity_bonus)
    }
}

/// A candidate upgrade with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedUpgrade {
    /// The `current -> current + 1` upgrade.
    pub action: BuildingAction,
    /// Its ROI score.
    pub roi: f64,
}

/// ROI scoring bound to one catalog and target map.
#[derive(Debug, Clone, Copy)]
pub struct RoiModel<'a> {
    catalog: &'a Catalog,
    targets: &'a TargetLevels,
    tech_bonus: f64,
}

impl<'a> RoiModel<'a> {
    /// Create a model. `tech_bonus` is the production gain of one production
    /// technology as a fraction (0.05 for +5%).
    #[must_use]
    pub fn new(catalog: &'a Catalog, targets: &'a TargetLevels, tech_bonus: f64) -> Self {
        Self {
            catalog,
            targets,
            tech_bonus,
        }
    }

    /// Metric for a building upgrade.
    #[must_use]
    pub fn building_metric(&self, state: &SimulationState, action: &BuildingAction) -> RoiMetric {
        let total_cost = (action.costs.total_resources().max(1)) as f64;
        let zero = RoiMetric {
            gain_per_hour: 0.0,
            total_cost,
            scarcity_bonus: 0.0,
        };

        match action.building {
            BuildingKind::Tavern => {
                return RoiMetric {
                    gain_per_hour: self.tavern_gain(action.to_level),
                    ..zero
                }
            }
            BuildingKind::Arsenal => return zero,
            _ => {}
        }

        let Some(data) = self.catalog.building(action.building) else {
            return zero;
        };
        let Some(new_rate) = data.production_rate(action.to_level) else {
            return zero;
        };
        let old_rate = data.production_rate(action.from_level).unwrap_or(0);
        let gain = f64::from(new_rate) - f64::from(old_rate);

        RoiMetric {
            gain_per_hour: gain,
            total_cost,
            scarcity_bonus: self.scarcity(state, action.building) - 1.0,
        }
    }

    /// Score for a building upgrade.
    #[must_use]
    pub fn building_roi(&self, state: &SimulationState, action: &BuildingAction) -> f64 {
        self.building_metric(state, action).score()
    }

    /// Best net mission reward per hour that reaching `to_level` opens up.
    ///
    /// Missions unlocking exactly at `to_level` count fully. If there are
    /// none, missions further up count divided by `levels_away + 1`.
    fn tavern_gain(&self, to_level: u32) -> f64 {
        let missions = self.catalog.missions();
        let exact = missions
            .iter()
            .filter(|m| m.tavern_level == to_level)
            .map(crate::data::MissionData::net_average_reward_per_hour)
            .fold(0.0, f64::max);
        if exact > 0.0 {
            return exact;
        }

        missions
            .iter()
            .filter(|m| m.tavern_level > to_level)
            .map(|m| {
                let away = f64::from(m.tavern_level - to_level);
                m.net_average_reward_per_hour() / (away + 1.0)
            })
            .fold(0.0, f64::max)
    }

    /// Resources still to be spent on every target, per resource.
    #[must_use]
    pub fn remaining_demand(&self, state: &SimulationState) -> [f64; 3] {
        let mut demand = [0.0; 3];
        for (&kind, &target) in self.targets {
            let Some(data) = self.catalog.building(kind) else {
                continue;
            };
            for level in state.level(kind).saturating_add(1)..=target {
                if let Some(level_data) = data.level(level) {
                    for (slot, resource) in demand.iter_mut().zip(ResourceKind::ALL) {
                        *slot += f64::from(level_data.costs.resource(resource));
                    }
                }
            }
        }
        demand
    }

    /// Scarcity multiplier for a producer, in `[0.5, 2.0]`.
    ///
    /// Demand share over supply share of the resource it produces. Returns
    /// 1.0 for buildings that produce nothing and when nothing is left to
    /// build.
    #[must_use]
    pub fn scarcity(&self, state: &SimulationState, kind: BuildingKind) -> f64 {
        let Some(resource) = kind.produces() else {
            return 1.0;
        };

        let demand = self.remaining_demand(state);
        let total_demand: f64 = demand.iter().sum();
        if total_demand <= 0.0 {
            return 1.0;
        }

        let rates = ResourceKind::ALL.map(|r| {
            state.production_rates()[r]
                .to_num::<f64>()
                .max(MIN_SUPPLY_RATE)
        });
        let total_rate: f64 = rates.iter().sum();

        let index = ResourceKind::ALL
            .iter()
            .position(|&r| r == resource)
            .unwrap_or(0);
        let demand_share = demand[index] / total_demand;
        let supply_share = rates[index] / total_rate;

        (demand_share / supply_share).clamp(MIN_SCARCITY, MAX_SCARCITY)
    }

    /// Summed resource cost of library levels `current+1 ..= required`.
    #[must_use]
    pub fn library_cost_to(&self, state: &SimulationState, required: u32) -> u64 {
        let Some(library) = self.catalog.building(BuildingKind::Library) else {
            return 0;
        };
        (state.level(BuildingKind::Library).saturating_add(1)..=required)
            .filter_map(|level| library.level(level))
            .map(|l| l.costs.total_resources())
            .sum()
    }

    /// Metric for a production technology, library levels included.
    #[must_use]
    pub fn production_tech_metric(&self, state: &SimulationState, tech: &TechData) -> RoiMetric {
        let total_rate: f64 = ResourceKind::ALL
            .iter()
            .map(|&r| state.production_rates()[r].to_num::<f64>())
            .sum();
        let cost = tech.costs.total_resources() + self.library_cost_to(state, tech.required_library_level);

        RoiMetric {
            gain_per_hour: total_rate * self.tech_bonus,
            total_cost: cost as f64,
            scarcity_bonus: 0.0,
        }
    }

    /// Score for a production technology.
    #[must_use]
    pub fn production_tech_roi(&self, state: &SimulationState, tech: &TechData) -> f64 {
        self.production_tech_metric(state, tech).score()
    }

    /// The unresearched production technology with the best positive score.
    #[must_use]
    pub fn best_production_tech(&self, state: &SimulationState) -> Option<(&'a TechData, f64)> {
        self.catalog.building(BuildingKind::Library)?;

        let mut best: Option<(&'a TechData, f64)> = None;
        for name in PRODUCTION_TECHS {
            if state.is_researched(name) {
                continue;
            }
            let Some(tech) = self.catalog.tech(name) else {
                continue;
            };
            let roi = self.production_tech_roi(state, tech);
            if roi > best.map_or(0.0, |(_, b)| b) {
                best = Some((tech, roi));
            }
        }
        best
    }

    /// Next upgrade of every unfinished target, best first.
    ///
    /// Upgrades with a positive score come first, by score descending then
    /// building name. Zero-score upgrades are only returned once no positive
    /// one is left, shortest build first. Buildings without catalog data for
    /// their next level are dropped.
    #[must_use]
    pub fn rank_buildings(&self, state: &SimulationState) -> Vec<RankedUpgrade> {
        let mut productive = Vec::new();
        let mut deferred = Vec::new();

        for (&kind, &target) in self.targets {
            let current = state.level(kind);
            if current >= target {
                continue;
            }
            let Some(action) = BuildingAction::next_level(self.catalog, kind, current) else {
                tracing::warn!(building = %kind, level = current + 1, "No level data, dropping target");
                continue;
            };
            let roi = self.building_roi(state, &action);
            let ranked = RankedUpgrade { action, roi };
            if roi == 0.0 {
                deferred.push(ranked);
            } else {
                productive.push(ranked);
            }
        }

        if !productive.is_empty() {
            productive.sort_by(|a, b| {
                b.roi
                    .partial_cmp(&a.roi)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| a.action.building.name().cmp(b.action.building.name()))
            });
            return productive;
        }

        deferred.sort_by(|a, b| {
            a.action
                .build_time
                .cmp(&b.action.build_time)
                .then_with(|| a.action.building.name().cmp(b.action.building.name()))
        });
        deferred
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{BuildingData, BuildingLevel, MissionData, Reward};
    use crate::resources::Costs;
    use crate::state::GameSnapshot;
    use proptest::prelude::*;

    fn level(costs: Costs, build_time: u64, rate: Option<u32>) -> BuildingLevel {
        BuildingLevel {
            costs,
            build_time,
            production_rate: rate,
            storage_capacity: None,
            required_tech: None,
        }
    }

    fn producer(kind: BuildingKind, rates: &[u32]) -> BuildingData {
        BuildingData {
            kind,
            levels: rates
                .iter()
                .enumerate()
                .map(|(i, &r)| {
                    let c = 10 * (i as u32 + 1);
                    level(Costs::new(c, c, c, 1), 60, Some(r))
                })
                .collect(),
        }
    }

    fn plain(kind: BuildingKind, levels: u32, wood: u32, time: u64) -> BuildingData {
        BuildingData {
            kind,
            levels: (1..=levels)
                .map(|_| level(Costs::new(wood, 0, 0, 0), time, None))
                .collect(),
        }
    }

    fn mission(name: &str, tavern_level: u32, wood_reward: u32) -> MissionData {
        MissionData {
            name: name.to_string(),
            duration_minutes: 60,
            tavern_level,
            max_tavern_level: None,
            units: Vec::new(),
            costs: Costs::ZERO,
            rewards: vec![Reward {
                resource: ResourceKind::Wood,
                min: wood_reward,
                max: wood_reward,
            }],
        }
    }

    fn create_test_catalog() -> Catalog {
        Catalog::new(
            vec![
                producer(BuildingKind::Lumberjack, &[10, 20, 40, 80]),
                producer(BuildingKind::Quarry, &[10, 20, 40, 80]),
                producer(BuildingKind::OreMine, &[10, 20, 40, 80]),
                plain(BuildingKind::Keep, 4, 50, 300),
                plain(BuildingKind::Arsenal, 4, 50, 100),
                plain(BuildingKind::Tavern, 4, 100, 60),
                plain(BuildingKind::Library, 4, 100, 60),
            ],
            vec![TechData {
                name: "Beer tester".to_string(),
                required_library_level: 3,
                costs: Costs::new(50, 50, 0, 0),
                research_time: 60,
            }],
            vec![mission("Near", 2, 100), mission("Far", 4, 300)],
            Vec::new(),
        )
    }

    fn targets(pairs: &[(BuildingKind, u32)]) -> TargetLevels {
        pairs.iter().copied().collect()
    }

    fn create_test_state(catalog: &Catalog) -> SimulationState {
        SimulationState::from_snapshot(catalog, &GameSnapshot::default(), 5)
    }

    #[test]
    fn test_metric_score() {
        let metric = RoiMetric {
            gain_per_hour: 10.0,
            total_cost: 100.0,
            scarcity_bonus: 0.5,
        };
        assert!((metric.score() - 0.15).abs() < 1e-12);

        let free = RoiMetric {
            gain_per_hour: 2.0,
            total_cost: 0.0,
            scarcity_bonus: 0.0,
        };
        assert!((free.score() - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_producers_score_zero() {
        let catalog = create_test_catalog();
        let t = targets(&[(BuildingKind::Keep, 4), (BuildingKind::Arsenal, 4)]);
        let model = RoiModel::new(&catalog, &t, 0.05);
        let state = create_test_state(&catalog);

        for kind in [BuildingKind::Keep, BuildingKind::Arsenal] {
            let action = BuildingAction::next_level(&catalog, kind, 1).expect("level 2");
            assert_eq!(model.building_roi(&state, &action), 0.0);
        }
    }

    #[test]
    fn test_tavern_prefers_exact_unlock() {
        let catalog = create_test_catalog();
        let t = targets(&[(BuildingKind::Tavern, 4)]);
        let model = RoiModel::new(&catalog, &t, 0.05);
        let state = create_test_state(&catalog);

        let to_two = BuildingAction::next_level(&catalog, BuildingKind::Tavern, 1).expect("level 2");
        let metric = model.building_metric(&state, &to_two);
        assert!((metric.gain_per_hour - 100.0).abs() < 1e-9);

        // Level 3 unlocks nothing; Far is one level further away
        let to_three = BuildingAction::next_level(&catalog, BuildingKind::Tavern, 2).expect("level 3");
        let metric = model.building_metric(&state, &to_three);
        assert!((metric.gain_per_hour - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_scarcity_favors_demanded_resource() {
        let catalog = create_test_catalog();
        // Keep costs only wood, so wood demand dominates
        let t = targets(&[(BuildingKind::Keep, 4)]);
        let model = RoiModel::new(&catalog, &t, 0.05);
        let state = create_test_state(&catalog);

        assert!((model.scarcity(&state, BuildingKind::Lumberjack) - MAX_SCARCITY).abs() < 1e-12);
        assert!((model.scarcity(&state, BuildingKind::Quarry) - MIN_SCARCITY).abs() < 1e-12);
        assert!((model.scarcity(&state, BuildingKind::Keep) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_scarcity_neutral_when_nothing_remains() {
        let catalog = create_test_catalog();
        let t = targets(&[(BuildingKind::Keep, 1)]);
        let model = RoiModel::new(&catalog, &t, 0.05);
        let state = create_test_state(&catalog);
        assert!((model.scarcity(&state, BuildingKind::Quarry) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_production_tech_includes_library_levels() {
        let catalog = create_test_catalog();
        let t = TargetLevels::new();
        let model = RoiModel::new(&catalog, &t, 0.05);
        let state = create_test_state(&catalog);
        let tech = catalog.tech("Beer tester").expect("tech");

        let metric = model.production_tech_metric(&state, tech);
        // Library 2 and 3 at 100 wood each, plus the tech's own 100
        assert!((metric.total_cost - 300.0).abs() < 1e-9);
        assert!((metric.gain_per_hour - 1.5).abs() < 1e-9);

        let (best, roi) = model.best_production_tech(&state).expect("candidate");
        assert_eq!(best.name, "Beer tester");
        assert!((roi - 0.005).abs() < 1e-12);
    }

    #[test]
    fn test_rank_productive_before_zero_roi() {
        let catalog = create_test_catalog();
        let t = targets(&[
            (BuildingKind::Keep, 4),
            (BuildingKind::Lumberjack, 4),
            (BuildingKind::Quarry, 4),
        ]);
        let model = RoiModel::new(&catalog, &t, 0.05);
        let state = create_test_state(&catalog);

        let ranked = model.rank_buildings(&state);
        let kinds: Vec<_> = ranked.iter().map(|r| r.action.building).collect();
        assert!(!kinds.contains(&BuildingKind::Keep));
        assert!(ranked.windows(2).all(|w| w[0].roi >= w[1].roi));
    }

    #[test]
    fn test_rank_zero_roi_by_build_time_then_name() {
        let catalog = create_test_catalog();
        let t = targets(&[
            (BuildingKind::Keep, 2),
            (BuildingKind::Arsenal, 2),
            (BuildingKind::Library, 2),
        ]);
        let model = RoiModel::new(&catalog, &t, 0.05);
        let state = create_test_state(&catalog);

        let kinds: Vec<_> = model
            .rank_buildings(&state)
            .into_iter()
            .map(|r| r.action.building)
            .collect();
        assert_eq!(
            kinds,
            vec![BuildingKind::Library, BuildingKind::Arsenal, BuildingKind::Keep]
        );
    }

    #[test]
    fn test_rank_ties_by_name() {
        let catalog = create_test_catalog();
        let t = targets(&[(BuildingKind::Quarry, 2), (BuildingKind::OreMine, 2)]);
        let model = RoiModel::new(&catalog, &t, 0.05);
        let state = create_test_state(&catalog);

        // No remaining cost difference between the two, so scores tie
        let kinds: Vec<_> = model
            .rank_buildings(&state)
            .into_iter()
            .map(|r| r.action.building)
            .collect();
        assert_eq!(kinds, vec![BuildingKind::OreMine, BuildingKind::Quarry]);
    }

    proptest! {
        #[test]
        fn prop_scarcity_bounded(
            levels in proptest::array::uniform3(1u32..=4),
            keep in 1u32..=4,
        ) {
            let catalog = create_test_catalog();
            let t = targets(&[
                (BuildingKind::Keep, keep),
                (BuildingKind::Lumberjack, 4),
                (BuildingKind::Quarry, 4),
                (BuildingKind::OreMine, 4),
            ]);
            let model = RoiModel::new(&catalog, &t, 0.05);
            let mut snapshot = GameSnapshot::default();
            snapshot.building_levels.insert(BuildingKind::Lumberjack, levels[0]);
            snapshot.building_levels.insert(BuildingKind::Quarry, levels[1]);
            snapshot.building_levels.insert(BuildingKind::OreMine, levels[2]);
            let state = SimulationState::from_snapshot(&catalog, &snapshot, 5);

            for kind in [BuildingKind::Lumberjack, BuildingKind::Quarry, BuildingKind::OreMine] {
                let s = model.scarcity(&state, kind);
                prop_assert!(!s.is_nan());
                prop_assert!((MIN_SCARCITY..=MAX_SCARCITY).contains(&s));
            }
            for ranked in model.rank_buildings(&state) {
                prop_assert!(ranked.roi >= 0.0);
            }
        }
    }
}
