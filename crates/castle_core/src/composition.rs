//! Army composition for a finished castle.
//!
//! Once every building is maxed the remaining food is split between
//! defenders and market carriers. Carrying capacity must cover the hourly
//! production, so everything produced can be sold for silver. Within that
//! limit the planner maximizes the weakest of the three defense totals.
//!
//! Defenders carry goods too. Dedicated carts are added only when the
//! defenders alone fall short, displacing the least food-efficient
//! defenders if food runs out.
//!
//! # Example
//!
//! ```
//! use castle_core::composition::CompositionPlanner;
//! use castle_core::config::CompositionConfig;
//!
//! let plan = CompositionPlanner::standard(CompositionConfig::default()).plan();
//! assert!(plan.meets_throughput());
//! assert_eq!(plan.food_used, 4265);
//! ```

use serde::{Deserialize, Serialize};

use crate::army::DefenseTotals;
use crate::config::CompositionConfig;
use crate::data::{Defense, UnitData, UnitKind};

const SECONDS_PER_HOUR: f64 = 3600.0;

/// What a unit is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitRole {
    /// Foot soldier.
    Infantry,
    /// Ranged unit.
    Artillery,
    /// Mounted unit.
    Cavalry,
    /// Cart with no defense.
    Transport,
}

/// A unit as the composition planner sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmyUnit {
    /// Display name.
    pub name: String,
    /// Combat class, or transport.
    pub role: UnitRole,
    /// Food taken per unit.
    pub food: u32,
    /// Travel time per field in seconds.
    pub seconds_per_field: u32,
    /// Resources carried per trip.
    pub capacity: u32,
    /// Defense values; zero for transports.
    pub defense: Defense,
}

impl ArmyUnit {
    /// Resources moved to the market and back per hour over
    /// `round_trip_fields`.
    #[must_use]
    pub fn throughput_per_hour(&self, round_trip_fields: u32) -> f64 {
        let trip = f64::from(round_trip_fields) * f64::from(self.seconds_per_field);
        if self.capacity == 0 || trip <= 0.0 {
            return 0.0;
        }
        f64::from(self.capacity) * SECONDS_PER_HOUR / trip
    }

    /// Summed defense per food.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn defense_per_food(&self) -> f64 {
        if self.food == 0 {
            return 0.0;
        }
        self.defense.total() as f64 / f64::from(self.food)
    }

    fn throughput_per_food(&self, round_trip_fields: u32) -> f64 {
        if self.food == 0 {
            return 0.0;
        }
        self.throughput_per_hour(round_trip_fields) / f64::from(self.food)
    }

    fn is_transport(&self) -> bool {
        self.role == UnitRole::Transport
    }

    /// The catalog's standard units plus the two carts.
    #[must_use]
    pub fn standard_roster() -> Vec<Self> {
        let mut roster: Vec<Self> = UnitData::standard_roster()
            .into_iter()
            .map(|unit| {
                let (role, seconds_per_field, capacity) = movement(unit.kind);
                Self {
                    name: unit.kind.name().to_string(),
                    role,
                    food: unit.costs.food,
                    seconds_per_field,
                    capacity,
                    defense: unit.defense,
                }
            })
            .collect();

        let cart = |name: &str, food, seconds_per_field, capacity| Self {
            name: name.to_string(),
            role: UnitRole::Transport,
            food,
            seconds_per_field,
            capacity,
            defense: Defense::default(),
        };
        roster.push(cart("handcart", 1, 800, 500));
        roster.push(cart("oxcart", 3, 1000, 2500));
        roster
    }
}

/// Role, seconds per field and carrying capacity of a standard unit.
const fn movement(kind: UnitKind) -> (UnitRole, u32, u32) {
    match kind {
        UnitKind::Spearman => (UnitRole::Infantry, 700, 12),
        UnitKind::Swordsman => (UnitRole::Infantry, 800, 10),
        UnitKind::Archer => (UnitRole::Artillery, 500, 16),
        UnitKind::Crossbowman => (UnitRole::Artillery, 600, 13),
        UnitKind::Horseman => (UnitRole::Cavalry, 300, 22),
        UnitKind::Lancer => (UnitRole::Cavalry, 400, 20),
    }
}

/// One line of a composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitCount {
    /// Unit name.
    pub name: String,
    /// Units of this kind.
    pub count: u32,
    /// Food they take.
    pub food: u32,
    /// Resources they carry per hour.
    pub throughput_per_hour: f64,
    /// Defense they add.
    pub defense: DefenseTotals,
}

/// A planned army.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    /// Non-zero unit counts in roster order.
    pub units: Vec<UnitCount>,
    /// Food taken by the whole army.
    pub food_used: u32,
    /// Food that was available.
    pub food_capacity: u32,
    /// Resources the army carries per hour.
    pub throughput_per_hour: f64,
    /// Resources that need carrying per hour.
    pub required_throughput: f64,
    /// Defense totals of the whole army.
    pub defense: DefenseTotals,
    /// Silver earned per hour by selling all production.
    pub silver_per_hour: f64,
}

impl Composition {
    /// Units of the named kind.
    #[must_use]
    pub fn count(&self, name: &str) -> u32 {
        self.units
            .iter()
            .find(|u| u.name == name)
            .map_or(0, |u| u.count)
    }

    /// Whether the army can carry all production to market.
    #[must_use]
    pub fn meets_throughput(&self) -> bool {
        self.throughput_per_hour >= self.required_throughput
    }
}

/// Greedy planner for the defender and cart mix.
#[derive(Debug, Clone)]
pub struct CompositionPlanner {
    roster: Vec<ArmyUnit>,
    config: CompositionConfig,
}

impl CompositionPlanner {
    /// Plan over a custom roster.
    #[must_use]
    pub fn new(roster: Vec<ArmyUnit>, config: CompositionConfig) -> Self {
        Self { roster, config }
    }

    /// Plan over [`ArmyUnit::standard_roster`].
    #[must_use]
    pub fn standard(config: CompositionConfig) -> Self {
        Self::new(ArmyUnit::standard_roster(), config)
    }

    /// Units considered.
    #[must_use]
    pub fn roster(&self) -> &[ArmyUnit] {
        &self.roster
    }

    /// Castle figures planned against.
    #[must_use]
    pub fn config(&self) -> &CompositionConfig {
        &self.config
    }

    fn required(&self) -> f64 {
        f64::from(self.config.production_per_hour)
    }

    /// Plan the army.
    ///
    /// 1. If no defender could carry the production even with all food,
    ///    reserve food for the carts that can.
    /// 2. Fill the rest with defenders, each time adding the one that
    ///    raises the weakest defense total most. Candidates are scanned by
    ///    defense per food, best first, and the first wins ties.
    /// 3. Add carts while carrying capacity falls short, dropping the
    ///    least food-efficient defenders when food is full.
    #[must_use]
    pub fn plan(&self) -> Composition {
        let round_trip = self.config.round_trip_fields();
        let mut counts = vec![0u32; self.roster.len()];

        let mut defenders: Vec<usize> = (0..self.roster.len())
            .filter(|&i| !self.roster[i].is_transport() && self.roster[i].food > 0)
            .collect();
        defenders.sort_by(|&a, &b| {
            self.roster[b]
                .defense_per_food()
                .total_cmp(&self.roster[a].defense_per_food())
        });
        let cart = self.best_cart();

        let best_defender = defenders
            .iter()
            .map(|&i| self.roster[i].throughput_per_food(round_trip))
            .fold(0.0, f64::max);
        let reserved = match cart {
            Some(cart) if best_defender * f64::from(self.config.food_capacity) < self.required() => {
                self.cart_food_for_production(cart)
            }
            _ => 0,
        };
        if reserved > 0 {
            tracing::debug!(reserved, "Reserving food for carts");
        }

        let budget = self.config.food_capacity.saturating_sub(reserved);
        self.add_defenders(&mut counts, &defenders, budget);
        if let Some(cart) = cart {
            self.add_carts(&mut counts, &defenders, cart);
        }
        self.tally(&counts)
    }

    /// Transport with the best throughput per food; the first wins ties.
    fn best_cart(&self) -> Option<usize> {
        let round_trip = self.config.round_trip_fields();
        let mut best: Option<(usize, f64)> = None;
        for (index, unit) in self.roster.iter().enumerate() {
            if !unit.is_transport() {
                continue;
            }
            let per_food = unit.throughput_per_food(round_trip);
            if per_food > 0.0 && best.map_or(true, |(_, b)| per_food > b) {
                best = Some((index, per_food));
            }
        }
        best.map(|(index, _)| index)
    }

    /// Food for one cart more than the production strictly needs.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn cart_food_for_production(&self, cart: usize) -> u32 {
        let unit = &self.roster[cart];
        let per_cart = unit.throughput_per_hour(self.config.round_trip_fields());
        let carts = (self.required() / per_cart).floor() as u32;
        carts.saturating_add(1).saturating_mul(unit.food)
    }

    fn add_defenders(&self, counts: &mut [u32], defenders: &[usize], budget: u32) {
        let mut totals = DefenseTotals::default();
        let mut used = 0u32;
        loop {
            let weakest = totals.min();
            let mut best: Option<(usize, u64)> = None;
            for &index in defenders {
                let unit = &self.roster[index];
                if used.saturating_add(unit.food) > budget {
                    continue;
                }
                let gain = totals.with(&unit.defense).min() - weakest;
                if best.map_or(true, |(_, b)| gain > b) {
                    best = Some((index, gain));
                }
            }

            let Some((index, _)) = best else {
                break;
            };
            let unit = &self.roster[index];
            counts[index] += 1;
            used += unit.food;
            totals.add(&unit.defense, 1);
        }
    }

    fn add_carts(&self, counts: &mut [u32], defenders: &[usize], cart: usize) {
        let food = self.roster[cart].food;
        while self.throughput(counts) < self.required() {
            let used = self.food_used(counts);
            let over = used.saturating_add(food).saturating_sub(self.config.food_capacity);
            if over > 0 && self.drop_defenders(counts, defenders, over) < over {
                tracing::debug!(carts = counts[cart], "Food exhausted before production is covered");
                break;
            }
            counts[cart] += 1;
        }
    }

    /// Remove defenders, least defense per food first, until `needed` food
    /// is free. Returns the food freed.
    fn drop_defenders(&self, counts: &mut [u32], defenders: &[usize], needed: u32) -> u32 {
        let mut freed = 0u32;
        for &index in defenders.iter().rev() {
            while counts[index] > 0 && freed < needed {
                counts[index] -= 1;
                freed += self.roster[index].food;
            }
            if freed >= needed {
                break;
            }
        }
        freed
    }

    fn food_used(&self, counts: &[u32]) -> u32 {
        self.roster
            .iter()
            .zip(counts)
            .fold(0u32, |sum, (unit, &n)| sum.saturating_add(unit.food.saturating_mul(n)))
    }

    fn throughput(&self, counts: &[u32]) -> f64 {
        let round_trip = self.config.round_trip_fields();
        self.roster
            .iter()
            .zip(counts)
            .map(|(unit, &n)| f64::from(n) * unit.throughput_per_hour(round_trip))
            .sum()
    }

    fn tally(&self, counts: &[u32]) -> Composition {
        let round_trip = self.config.round_trip_fields();
        let mut defense = DefenseTotals::default();
        let units = self
            .roster
            .iter()
            .zip(counts)
            .filter(|&(_, &n)| n > 0)
            .map(|(unit, &count)| {
                let mut unit_defense = DefenseTotals::default();
                unit_defense.add(&unit.defense, count);
                defense.add(&unit.defense, count);
                UnitCount {
                    name: unit.name.clone(),
                    count,
                    food: unit.food.saturating_mul(count),
                    throughput_per_hour: f64::from(count) * unit.throughput_per_hour(round_trip),
                    defense: unit_defense,
                }
            })
            .collect();

        Composition {
            units,
            food_used: self.food_used(counts),
            food_capacity: self.config.food_capacity,
            throughput_per_hour: self.throughput(counts),
            required_throughput: self.required(),
            defense,
            silver_per_hour: self.required() * self.config.silver_per_resource,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_unit(name: &str, role: UnitRole, food: u32, seconds: u32, capacity: u32, defense: u32) -> ArmyUnit {
        ArmyUnit {
            name: name.to_string(),
            role,
            food,
            seconds_per_field: seconds,
            capacity,
            defense: Defense::new(defense, defense, defense),
        }
    }

    fn unit(name: &str) -> ArmyUnit {
        ArmyUnit::standard_roster()
            .into_iter()
            .find(|u| u.name == name)
            .expect("standard unit")
    }

    #[test]
    fn test_throughput_per_hour() {
        // 12 resources per 50 x 700 s round trip
        assert!((unit("spearman").throughput_per_hour(50) - 1.234).abs() < 0.001);
        assert!((unit("horseman").throughput_per_hour(50) - 5.28).abs() < 0.001);
        assert!((unit("oxcart").throughput_per_hour(50) - 180.0).abs() < 0.001);
        assert_eq!(unit("oxcart").throughput_per_hour(0), 0.0);
    }

    #[test]
    fn test_defense_per_food() {
        assert!((unit("crossbowman").defense_per_food() - 184.0).abs() < f64::EPSILON);
        assert!((unit("horseman").defense_per_food() - 62.0).abs() < f64::EPSILON);
        assert_eq!(unit("oxcart").defense_per_food(), 0.0);
    }

    #[test]
    fn test_standard_roster_has_carts() {
        let roster = ArmyUnit::standard_roster();
        assert_eq!(roster.len(), 8);
        assert_eq!(roster.iter().filter(|u| u.is_transport()).count(), 2);
        assert!(roster.iter().all(|u| u.food > 0 && u.seconds_per_field > 0));
    }

    #[test]
    fn test_default_plan_fills_food_and_trades_everything() {
        let plan = CompositionPlanner::standard(CompositionConfig::default()).plan();

        assert_eq!(plan.food_used, 4265);
        let counted: u32 = plan.units.iter().map(|u| u.food).sum();
        assert_eq!(counted, plan.food_used);
        assert!(plan.meets_throughput(), "{} < {}", plan.throughput_per_hour, plan.required_throughput);
        assert!(plan.defense.min() > 0);

        let max = plan.defense.cavalry.max(plan.defense.infantry).max(plan.defense.artillery);
        assert!(max <= 2 * plan.defense.min(), "{:?}", plan.defense);
        assert!((plan.silver_per_hour - 23.22).abs() < 1e-9);
    }

    #[test]
    fn test_heavy_production_reserves_carts() {
        let config = CompositionConfig {
            production_per_hour: 100_000,
            ..CompositionConfig::default()
        };
        let plan = CompositionPlanner::standard(config).plan();

        assert!(plan.count("oxcart") > 0);
        assert_eq!(plan.count("handcart"), 0);
        assert!(plan.meets_throughput());
        assert!(plan.food_used <= plan.food_capacity);
    }

    #[test]
    fn test_carts_displace_weakest_defenders() {
        // Porters alone could carry everything, but guards defend better
        let roster = vec![
            create_test_unit("porter", UnitRole::Infantry, 1, 1, 100, 1),
            create_test_unit("guard", UnitRole::Infantry, 1, 10, 0, 10),
            create_test_unit("cart", UnitRole::Transport, 2, 10, 20, 0),
        ];
        let config = CompositionConfig {
            food_capacity: 10,
            production_per_hour: 500,
            market_distance: 25,
            silver_per_resource: 0.02,
        };
        let plan = CompositionPlanner::new(roster, config).plan();

        // 144 per cart per hour, so four carts
        assert_eq!(plan.count("cart"), 4);
        assert_eq!(plan.count("guard"), 2);
        assert_eq!(plan.count("porter"), 0);
        assert_eq!(plan.food_used, 10);
        assert!(plan.meets_throughput());
    }

    #[test]
    fn test_too_little_food_for_production() {
        let config = CompositionConfig {
            food_capacity: 10,
            production_per_hour: 1000,
            ..CompositionConfig::default()
        };
        let plan = CompositionPlanner::standard(config).plan();

        assert_eq!(plan.count("oxcart"), 3);
        assert_eq!(plan.food_used, 9);
        assert!(!plan.meets_throughput());
    }

    #[test]
    fn test_equal_gains_pick_best_defense_per_food() {
        let even = create_test_unit("even", UnitRole::Infantry, 1, 10, 0, 10);
        let mut lopsided = create_test_unit("lopsided", UnitRole::Infantry, 1, 10, 0, 10);
        lopsided.defense = Defense::new(10, 50, 50);
        let config = CompositionConfig {
            food_capacity: 1,
            production_per_hour: 0,
            ..CompositionConfig::default()
        };
        let plan = CompositionPlanner::new(vec![even, lopsided], config).plan();

        assert_eq!(plan.count("lopsided"), 1);
        assert_eq!(plan.count("even"), 0);
    }
}
