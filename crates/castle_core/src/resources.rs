//! Resource kinds, cost bundles and per-resource storage.

use std::fmt;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::math::{fixed_from_u32, fixed_serde, Fixed};

/// The three stockpiled resources.
///
/// Food is not a stockpile; it is tracked as a capacity pool on the
/// simulation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Produced by the lumberjack, stored in the wood store.
    Wood,
    /// Produced by the quarry, stored in the stone store.
    Stone,
    /// Produced by the ore mine, stored in the ore store.
    Iron,
}

impl ResourceKind {
    /// All resources in their fixed iteration order.
    pub const ALL: [Self; 3] = [Self::Wood, Self::Stone, Self::Iron];

    /// Stable lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Wood => "wood",
            Self::Stone => "stone",
            Self::Iron => "iron",
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Wood => 0,
            Self::Stone => 1,
            Self::Iron => 2,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resource and food cost of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Costs {
    /// Wood cost.
    #[serde(default)]
    pub wood: u32,
    /// Stone cost.
    #[serde(default)]
    pub stone: u32,
    /// Iron cost.
    #[serde(default)]
    pub iron: u32,
    /// Food (worker capacity) consumed permanently.
    #[serde(default)]
    pub food: u32,
}

impl Costs {
    /// No cost at all.
    pub const ZERO: Self = Self::new(0, 0, 0, 0);

    /// Create a cost bundle.
    #[must_use]
    pub const fn new(wood: u32, stone: u32, iron: u32, food: u32) -> Self {
        Self {
            wood,
            stone,
            iron,
            food,
        }
    }

    /// Cost in a single resource.
    #[must_use]
    pub const fn resource(&self, kind: ResourceKind) -> u32 {
        match kind {
            ResourceKind::Wood => self.wood,
            ResourceKind::Stone => self.stone,
            ResourceKind::Iron => self.iron,
        }
    }

    /// Sum of wood, stone and iron (food excluded).
    #[must_use]
    pub const fn total_resources(&self) -> u64 {
        self.wood as u64 + self.stone as u64 + self.iron as u64
    }

    /// Component-wise saturating sum.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self {
            wood: self.wood.saturating_add(other.wood),
            stone: self.stone.saturating_add(other.stone),
            iron: self.iron.saturating_add(other.iron),
            food: self.food.saturating_add(other.food),
        }
    }
}

/// Fixed-point amount per resource.
///
/// Used for both stockpiles and hourly production rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Stockpile {
    /// Wood amount.
    #[serde(with = "fixed_serde")]
    pub wood: Fixed,
    /// Stone amount.
    #[serde(with = "fixed_serde")]
    pub stone: Fixed,
    /// Iron amount.
    #[serde(with = "fixed_serde")]
    pub iron: Fixed,
}

impl Stockpile {
    /// Build from whole-unit amounts.
    #[must_use]
    pub fn from_whole(wood: u32, stone: u32, iron: u32) -> Self {
        Self {
            wood: fixed_from_u32(wood),
            stone: fixed_from_u32(stone),
            iron: fixed_from_u32(iron),
        }
    }

    /// Sum over all three resources.
    #[must_use]
    pub fn total(&self) -> Fixed {
        self.wood.saturating_add(self.stone).saturating_add(self.iron)
    }
}

impl Index<ResourceKind> for Stockpile {
    type Output = Fixed;

    fn index(&self, kind: ResourceKind) -> &Fixed {
        match kind {
            ResourceKind::Wood => &self.wood,
            ResourceKind::Stone => &self.stone,
            ResourceKind::Iron => &self.iron,
        }
    }
}

impl IndexMut<ResourceKind> for Stockpile {
    fn index_mut(&mut self, kind: ResourceKind) -> &mut Fixed {
        match kind {
            ResourceKind::Wood => &mut self.wood,
            ResourceKind::Stone => &mut self.stone,
            ResourceKind::Iron => &mut self.iron,
        }
    }
}

/// Storage ceiling per resource, in whole units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageCaps([u32; 3]);

impl StorageCaps {
    /// Caps that never bind.
    pub const UNBOUNDED: Self = Self([u32::MAX; 3]);

    /// Create caps for wood, stone and iron.
    #[must_use]
    pub const fn new(wood: u32, stone: u32, iron: u32) -> Self {
        Self([wood, stone, iron])
    }
}

impl Default for StorageCaps {
    fn default() -> Self {
        Self::UNBOUNDED
    }
}

impl Index<ResourceKind> for StorageCaps {
    type Output = u32;

    fn index(&self, kind: ResourceKind) -> &u32 {
        &self.0[kind.index()]
    }
}

impl IndexMut<ResourceKind> for StorageCaps {
    fn index_mut(&mut self, kind: ResourceKind) -> &mut u32 {
        &mut self.0[kind.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_costs_total_ignores_food() {
        let costs = Costs::new(10, 20, 30, 99);
        assert_eq!(costs.total_resources(), 60);
        assert_eq!(costs.resource(ResourceKind::Stone), 20);
    }

    #[test]
    fn test_costs_saturating_add() {
        let a = Costs::new(u32::MAX, 1, 2, 3);
        let b = Costs::new(5, 1, 1, 1);
        assert_eq!(a.saturating_add(b), Costs::new(u32::MAX, 2, 3, 4));
    }

    #[test]
    fn test_stockpile_indexing() {
        let mut pile = Stockpile::from_whole(1, 2, 3);
        pile[ResourceKind::Iron] += Fixed::from_num(4);
        assert_eq!(pile.iron, Fixed::from_num(7));
        assert_eq!(pile.total(), Fixed::from_num(10));
    }

    #[test]
    fn test_storage_caps_default_unbounded() {
        let caps = StorageCaps::default();
        for kind in ResourceKind::ALL {
            assert_eq!(caps[kind], u32::MAX);
        }
    }
}
