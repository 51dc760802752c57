//! Tavern mission data structures.

use serde::{Deserialize, Serialize};

use crate::math::{fixed_from_u32, Fixed};
use crate::resources::{Costs, ResourceKind};

use super::UnitKind;

/// Units a mission ties up while it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitRequirement {
    /// Unit type.
    pub unit: UnitKind,
    /// Number of units.
    pub count: u32,
}

/// Reward range for one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reward {
    /// Resource paid out.
    pub resource: ResourceKind,
    /// Smallest payout.
    pub min: u32,
    /// Largest payout.
    pub max: u32,
}

impl Reward {
    /// Expected payout, the midpoint of the range.
    #[must_use]
    pub fn average(&self) -> Fixed {
        (fixed_from_u32(self.min) + fixed_from_u32(self.max)) / Fixed::from_num(2)
    }
}

/// Data-driven mission definition.
///
/// # Example RON
///
/// ```ron
/// MissionData(
///     name: "Overtime wood",
///     duration_minutes: 90,
///     tavern_level: 2,
///     max_tavern_level: Some(6),
///     units: [(unit: spearman, count: 10)],
///     costs: (wood: 0, stone: 0, iron: 30),
///     rewards: [(resource: wood, min: 300, max: 500)],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionData {
    /// Unique mission name.
    pub name: String,

    /// How long the mission runs.
    pub duration_minutes: u32,

    /// Lowest tavern level at which the mission is offered.
    pub tavern_level: u32,

    /// Highest tavern level at which the mission is still offered.
    #[serde(default)]
    pub max_tavern_level: Option<u32>,

    /// Units committed for the duration.
    #[serde(default)]
    pub units: Vec<UnitRequirement>,

    /// Resources consumed at start.
    #[serde(default)]
    pub costs: Costs,

    /// Resources credited on completion.
    #[serde(default)]
    pub rewards: Vec<Reward>,
}

impl MissionData {
    /// Mission duration in seconds.
    #[must_use]
    pub fn duration_secs(&self) -> u64 {
        u64::from(self.duration_minutes) * 60
    }

    /// Whether a tavern at `level` offers this mission.
    #[must_use]
    pub fn offered_at(&self, level: u32) -> bool {
        level >= self.tavern_level && self.max_tavern_level.map_or(true, |max| level <= max)
    }

    /// Sum of the average rewards over all resources.
    #[must_use]
    pub fn average_total_reward(&self) -> f64 {
        self.rewards
            .iter()
            .map(|r| (f64::from(r.min) + f64::from(r.max)) / 2.0)
            .sum()
    }

    /// Average reward minus the cost of starting the mission.
    #[must_use]
    pub fn net_average_reward(&self) -> f64 {
        let c = &self.costs;
        self.average_total_reward()
            - f64::from(c.wood)
            - f64::from(c.stone)
            - f64::from(c.iron)
            - f64::from(c.food)
    }

    /// Net average reward per hour of mission time.
    ///
    /// Zero-length missions score zero.
    #[must_use]
    pub fn net_average_reward_per_hour(&self) -> f64 {
        if self.duration_minutes == 0 {
            return 0.0;
        }
        self.net_average_reward() / (f64::from(self.duration_minutes) / 60.0)
    }

    /// Average payout of one resource.
    #[must_use]
    pub fn average_reward(&self, resource: ResourceKind) -> f64 {
        self.rewards
            .iter()
            .filter(|r| r.resource == resource)
            .map(|r| (f64::from(r.min) + f64::from(r.max)) / 2.0)
            .sum()
    }

    /// Units of one kind the mission needs.
    #[must_use]
    pub fn required(&self, unit: UnitKind) -> u32 {
        self.units
            .iter()
            .filter(|r| r.unit == unit)
            .map(|r| r.count)
            .sum()
    }
}
