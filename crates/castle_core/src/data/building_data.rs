//! Building data structures for data-driven castle definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::resources::{Costs, ResourceKind};

/// Every building a castle can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingKind {
    /// Produces wood.
    Lumberjack,
    /// Produces stone.
    Quarry,
    /// Produces iron.
    OreMine,
    /// Provides food capacity.
    Farm,
    /// Caps the wood stockpile.
    WoodStore,
    /// Caps the stone stockpile.
    StoneStore,
    /// Caps the iron stockpile.
    OreStore,
    /// Castle keep.
    Keep,
    /// Trains units.
    Arsenal,
    /// Gates technology research.
    Library,
    /// Unlocks missions.
    Tavern,
    /// Trade building.
    Market,
    /// Walls and towers.
    Fortifications,
}

impl BuildingKind {
    /// All building kinds in declaration order.
    pub const ALL: [Self; 13] = [
        Self::Lumberjack,
        Self::Quarry,
        Self::OreMine,
        Self::Farm,
        Self::WoodStore,
        Self::StoneStore,
        Self::OreStore,
        Self::Keep,
        Self::Arsenal,
        Self::Library,
        Self::Tavern,
        Self::Market,
        Self::Fortifications,
    ];

    /// Stable snake_case identifier, also used for name-ordered tie-breaks.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Lumberjack => "lumberjack",
            Self::Quarry => "quarry",
            Self::OreMine => "ore_mine",
            Self::Farm => "farm",
            Self::WoodStore => "wood_store",
            Self::StoneStore => "stone_store",
            Self::OreStore => "ore_store",
            Self::Keep => "keep",
            Self::Arsenal => "arsenal",
            Self::Library => "library",
            Self::Tavern => "tavern",
            Self::Market => "market",
            Self::Fortifications => "fortifications",
        }
    }

    /// Resource this building produces, if it is a producer.
    #[must_use]
    pub const fn produces(self) -> Option<ResourceKind> {
        match self {
            Self::Lumberjack => Some(ResourceKind::Wood),
            Self::Quarry => Some(ResourceKind::Stone),
            Self::OreMine => Some(ResourceKind::Iron),
            _ => None,
        }
    }

    /// Resource whose storage ceiling this building sets, if any.
    #[must_use]
    pub const fn stores(self) -> Option<ResourceKind> {
        match self {
            Self::WoodStore => Some(ResourceKind::Wood),
            Self::StoneStore => Some(ResourceKind::Stone),
            Self::OreStore => Some(ResourceKind::Iron),
            _ => None,
        }
    }

    /// Producer building for a resource.
    #[must_use]
    pub const fn producer_of(resource: ResourceKind) -> Self {
        match resource {
            ResourceKind::Wood => Self::Lumberjack,
            ResourceKind::Stone => Self::Quarry,
            ResourceKind::Iron => Self::OreMine,
        }
    }

    /// Storage building for a resource.
    #[must_use]
    pub const fn store_of(resource: ResourceKind) -> Self {
        match resource {
            ResourceKind::Wood => Self::WoodStore,
            ResourceKind::Stone => Self::StoneStore,
            ResourceKind::Iron => Self::OreStore,
        }
    }
}

impl fmt::Display for BuildingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One level of a building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingLevel {
    /// Cost of upgrading *to* this level.
    pub costs: Costs,

    /// Construction time in seconds.
    pub build_time: u64,

    /// Hourly production once this level is reached.
    #[serde(default)]
    pub production_rate: Option<u32>,

    /// Storage or food capacity once this level is reached.
    #[serde(default)]
    pub storage_capacity: Option<u32>,

    /// Technology that must be researched before upgrading to this level.
    #[serde(default)]
    pub required_tech: Option<String>,
}

/// Data-driven building definition.
///
/// Levels are stored contiguously starting from level 1.
///
/// # Example RON
///
/// ```ron
/// BuildingData(
///     kind: farm,
///     levels: [
///         (costs: (wood: 0, stone: 0, iron: 0), build_time: 0, storage_capacity: Some(40)),
///         (costs: (wood: 40, stone: 30, iron: 10), build_time: 300, storage_capacity: Some(211)),
///     ],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingData {
    /// Which building this describes.
    pub kind: BuildingKind,

    /// Level definitions, index 0 is level 1.
    pub levels: Vec<BuildingLevel>,
}

impl BuildingData {
    /// Highest level the catalog defines.
    #[must_use]
    pub fn max_level(&self) -> u32 {
        u32::try_from(self.levels.len()).unwrap_or(u32::MAX)
    }

    /// Level data for a 1-based level.
    #[must_use]
    pub fn level(&self, level: u32) -> Option<&BuildingLevel> {
        let index = usize::try_from(level.checked_sub(1)?).ok()?;
        self.levels.get(index)
    }

    /// Production rate at a level, if the building produces at that level.
    #[must_use]
    pub fn production_rate(&self, level: u32) -> Option<u32> {
        self.level(level).and_then(|l| l.production_rate)
    }

    /// Storage capacity at a level.
    #[must_use]
    pub fn storage_capacity(&self, level: u32) -> Option<u32> {
        self.level(level).and_then(|l| l.storage_capacity)
    }

    /// Technology required to reach a level.
    #[must_use]
    pub fn required_tech(&self, level: u32) -> Option<&str> {
        self.level(level).and_then(|l| l.required_tech.as_deref())
    }

    /// First level strictly above `current` whose capacity covers `needed`.
    #[must_use]
    pub fn first_level_with_capacity(&self, current: u32, needed: u32) -> Option<u32> {
        (current.saturating_add(1)..=self.max_level())
            .find(|&lvl| self.storage_capacity(lvl).is_some_and(|cap| cap >= needed))
    }
}
