//! Unit data structures for data-driven unit definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::resources::Costs;

/// Trainable unit types.
///
/// Declaration order is the fixed iteration order used wherever units are
/// compared with equal scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// Cheap infantry, strong against cavalry.
    Spearman,
    /// Infantry.
    Swordsman,
    /// Ranged infantry.
    Archer,
    /// Heavy ranged infantry.
    Crossbowman,
    /// Light cavalry.
    Horseman,
    /// Heavy cavalry.
    Lancer,
}

impl UnitKind {
    /// All unit kinds in fixed iteration order.
    pub const ALL: [Self; 6] = [
        Self::Spearman,
        Self::Swordsman,
        Self::Archer,
        Self::Crossbowman,
        Self::Horseman,
        Self::Lancer,
    ];

    /// Stable snake_case identifier.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Spearman => "spearman",
            Self::Swordsman => "swordsman",
            Self::Archer => "archer",
            Self::Crossbowman => "crossbowman",
            Self::Horseman => "horseman",
            Self::Lancer => "lancer",
        }
    }

    pub(crate) const fn index(self) -> usize {
        match self {
            Self::Spearman => 0,
            Self::Swordsman => 1,
            Self::Archer => 2,
            Self::Crossbowman => 3,
            Self::Horseman => 4,
            Self::Lancer => 5,
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Defense values against the three threat classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Defense {
    /// Defense against cavalry.
    pub cavalry: u32,
    /// Defense against infantry.
    pub infantry: u32,
    /// Defense against artillery.
    pub artillery: u32,
}

impl Defense {
    /// Create a defense profile.
    #[must_use]
    pub const fn new(cavalry: u32, infantry: u32, artillery: u32) -> Self {
        Self {
            cavalry,
            infantry,
            artillery,
        }
    }

    /// Weakest of the three values.
    #[must_use]
    pub fn min(&self) -> u64 {
        u64::from(self.cavalry.min(self.infantry).min(self.artillery))
    }

    /// Sum of the three values.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.cavalry as u64 + self.infantry as u64 + self.artillery as u64
    }
}

/// Data-driven unit definition.
///
/// # Example RON
///
/// ```ron
/// UnitData(
///     kind: archer,
///     costs: (wood: 27, stone: 12, iron: 39, food: 1),
///     training_time: 900,
///     required_tech: Some("Longbow"),
///     defense: (cavalry: 10, infantry: 32, artillery: 15),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitData {
    /// Unit type.
    pub kind: UnitKind,

    /// Training cost, food included.
    pub costs: Costs,

    /// Training time in seconds.
    pub training_time: u64,

    /// Technology needed before this unit can be trained.
    #[serde(default)]
    pub required_tech: Option<String>,

    /// Defense contribution of a single unit.
    #[serde(default)]
    pub defense: Defense,
}

impl UnitData {
    /// Total defense per food consumed, used to order defense candidates.
    #[must_use]
    pub fn defense_per_food(&self) -> f64 {
        self.defense.total() as f64 / f64::from(self.costs.food.max(1))
    }

    /// The standard six-unit roster.
    #[must_use]
    pub fn standard_roster() -> Vec<Self> {
        let unit = |kind, costs, training_time, tech: Option<&str>, defense| Self {
            kind,
            costs,
            training_time,
            required_tech: tech.map(str::to_string),
            defense,
        };

        vec![
            unit(
                UnitKind::Spearman,
                Costs::new(18, 6, 30, 1),
                750,
                None,
                Defense::new(59, 32, 20),
            ),
            unit(
                UnitKind::Swordsman,
                Costs::new(43, 20, 48, 1),
                1200,
                Some("Swordsmith"),
                Defense::new(38, 25, 13),
            ),
            unit(
                UnitKind::Archer,
                Costs::new(27, 12, 39, 1),
                900,
                Some("Longbow"),
                Defense::new(10, 32, 15),
            ),
            unit(
                UnitKind::Crossbowman,
                Costs::new(50, 28, 55, 1),
                1350,
                Some("Crossbow"),
                Defense::new(33, 91, 60),
            ),
            unit(
                UnitKind::Horseman,
                Costs::new(25, 15, 45, 2),
                1050,
                None,
                Defense::new(37, 27, 60),
            ),
            unit(
                UnitKind::Lancer,
                Costs::new(70, 60, 80, 2),
                1860,
                Some("Horse armour"),
                Defense::new(16, 13, 25),
            ),
        ]
    }
}
