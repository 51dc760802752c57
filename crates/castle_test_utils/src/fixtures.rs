//! Test fixtures and helpers.
//!
//! A synthetic but complete castle catalog with smooth level curves, plus
//! the target sets and starting snapshots the integration tests share.
//!
//! Curves per level `L`:
//! - producers: rate `10 + 13(L-1)`, cost `10L²` wood and stone, `6L²` iron,
//!   build time `60L²`, food `L/3 + 1`, up to level 30
//! - stores: capacity `100L² + 400`, cost `8L²` wood and stone, up to 20
//! - farm: food capacity `40 + 4960(L-1)/29`, so level 30 holds 5000; levels
//!   15, 25 and 30 need "Crop rotation", "Yoke" and "Cellar storeroom"
//! - library: cost `20L²` wood, `10L²` stone, up to 10

use castle_core::data::{
    BuildingData, BuildingKind, BuildingLevel, Catalog, MissionData, Reward, TargetLevels,
    TechData, UnitData, UnitKind, UnitRequirement,
};
use castle_core::resources::{Costs, ResourceKind};
use castle_core::state::GameSnapshot;
use fixed::types::I32F32;

/// Food capacity of the fixture farm at its top level.
pub const MAX_FOOD_CAPACITY: u32 = 5000;

/// Technologies gating farm levels, with the level each one unlocks.
pub const FARM_TECHS: [(&str, u32); 3] = [
    ("Crop rotation", 15),
    ("Yoke", 25),
    ("Cellar storeroom", 30),
];

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

fn level(costs: Costs, build_time: u64) -> BuildingLevel {
    BuildingLevel {
        costs,
        build_time,
        production_rate: None,
        storage_capacity: None,
        required_tech: None,
    }
}

/// Levels `1..=max`, level 1 free, the rest priced by `cost(L)`.
fn levels(max: u32, mut cost: impl FnMut(u32) -> (Costs, u64)) -> Vec<BuildingLevel> {
    (1..=max)
        .map(|l| {
            if l == 1 {
                level(Costs::ZERO, 0)
            } else {
                let (costs, time) = cost(l);
                level(costs, time)
            }
        })
        .collect()
}

fn square(l: u32) -> u32 {
    l * l
}

/// A resource producer with the fixture's production curve.
#[must_use]
pub fn producer(kind: BuildingKind) -> BuildingData {
    let mut levels = levels(30, |l| {
        let sq = square(l);
        (
            Costs::new(10 * sq, 10 * sq, 6 * sq, l / 3 + 1),
            60 * u64::from(sq),
        )
    });
    for (index, entry) in (1u32..).zip(levels.iter_mut()) {
        entry.production_rate = Some(10 + 13 * (index - 1));
    }
    BuildingData { kind, levels }
}

/// A storage building with the fixture's capacity curve.
#[must_use]
pub fn store(kind: BuildingKind) -> BuildingData {
    let mut levels = levels(20, |l| {
        let sq = square(l);
        (Costs::new(8 * sq, 8 * sq, 0, 1), 30 * u64::from(sq))
    });
    for (index, entry) in (1u32..).zip(levels.iter_mut()) {
        entry.storage_capacity = Some(100 * square(index) + 400);
    }
    BuildingData { kind, levels }
}

/// The farm, with technology gates at levels 15, 25 and 30.
#[must_use]
pub fn farm() -> BuildingData {
    let mut levels = levels(30, |l| {
        let sq = square(l);
        (Costs::new(12 * sq, 12 * sq, 0, 0), 45 * u64::from(sq))
    });
    for (index, entry) in (1u32..).zip(levels.iter_mut()) {
        entry.storage_capacity = Some(40 + 4960 * (index - 1) / 29);
    }
    for (tech, at) in FARM_TECHS {
        levels[at as usize - 1].required_tech = Some(tech.to_string());
    }
    BuildingData {
        kind: BuildingKind::Farm,
        levels,
    }
}

/// A building without production or capacity, like the keep or arsenal.
#[must_use]
pub fn plain(kind: BuildingKind, max: u32) -> BuildingData {
    BuildingData {
        kind,
        levels: levels(max, |l| {
            let sq = square(l);
            (Costs::new(12 * sq, 12 * sq, 12 * sq, 1), 45 * u64::from(sq))
        }),
    }
}

/// The library, up to level 10.
#[must_use]
pub fn library() -> BuildingData {
    BuildingData {
        kind: BuildingKind::Library,
        levels: levels(10, |l| {
            let sq = square(l);
            (Costs::new(20 * sq, 10 * sq, 0, 1), 90 * u64::from(sq))
        }),
    }
}

fn tech(name: &str, required_library_level: u32, price: u32, research_time: u64) -> TechData {
    TechData {
        name: name.to_string(),
        required_library_level,
        costs: Costs::new(price, price, price / 2, 0),
        research_time,
    }
}

/// Every technology the fixture buildings and units reference.
#[must_use]
pub fn technologies() -> Vec<TechData> {
    vec![
        tech("Crop rotation", 1, 150, 1800),
        tech("Longbow", 1, 120, 1500),
        tech("Beer tester", 2, 300, 3600),
        tech("Yoke", 3, 500, 5400),
        tech("Wheelbarrow", 4, 700, 7200),
        tech("Swordsmith", 4, 600, 6000),
        tech("Cellar storeroom", 5, 900, 9000),
        tech("Crossbow", 5, 800, 7200),
        tech("Horse armour", 7, 1200, 10800),
    ]
}

fn mission(
    name: &str,
    minutes: u32,
    tavern: (u32, Option<u32>),
    units: &[(UnitKind, u32)],
    costs: Costs,
    rewards: &[(ResourceKind, u32, u32)],
) -> MissionData {
    MissionData {
        name: name.to_string(),
        duration_minutes: minutes,
        tavern_level: tavern.0,
        max_tavern_level: tavern.1,
        units: units
            .iter()
            .map(|&(unit, count)| UnitRequirement { unit, count })
            .collect(),
        costs,
        rewards: rewards
            .iter()
            .map(|&(resource, min, max)| Reward { resource, min, max })
            .collect(),
    }
}

/// Tavern missions unlocked at levels 1, 2, 3, 5 and 8.
#[must_use]
pub fn missions() -> Vec<MissionData> {
    use ResourceKind::{Iron, Stone, Wood};
    use UnitKind::{Archer, Crossbowman, Horseman, Lancer, Spearman, Swordsman};

    vec![
        mission(
            "Gather firewood",
            60,
            (1, Some(4)),
            &[(Spearman, 5)],
            Costs::new(0, 0, 10, 0),
            &[(Wood, 150, 250)],
        ),
        mission(
            "Escort merchants",
            120,
            (2, None),
            &[(Spearman, 10)],
            Costs::new(20, 0, 0, 0),
            &[(Stone, 250, 350), (Iron, 100, 200)],
        ),
        mission(
            "Hunt boar",
            90,
            (3, None),
            &[(Spearman, 8), (Archer, 5)],
            Costs::new(0, 30, 0, 0),
            &[(Wood, 300, 400), (Iron, 150, 250)],
        ),
        mission(
            "Guard the mine",
            180,
            (5, None),
            &[(Swordsman, 10), (Crossbowman, 10)],
            Costs::new(100, 100, 0, 0),
            &[(Iron, 900, 1100)],
        ),
        mission(
            "Raid camp",
            240,
            (8, None),
            &[(Horseman, 10), (Lancer, 5)],
            Costs::new(200, 200, 200, 0),
            &[(Wood, 800, 1200), (Stone, 800, 1200), (Iron, 800, 1200)],
        ),
    ]
}

/// The complete fixture catalog with the standard unit roster.
#[must_use]
pub fn castle_catalog() -> Catalog {
    Catalog::new(
        vec![
            producer(BuildingKind::Lumberjack),
            producer(BuildingKind::Quarry),
            producer(BuildingKind::OreMine),
            store(BuildingKind::WoodStore),
            store(BuildingKind::StoneStore),
            store(BuildingKind::OreStore),
            farm(),
            plain(BuildingKind::Keep, 10),
            plain(BuildingKind::Arsenal, 30),
            library(),
            plain(BuildingKind::Tavern, 10),
            plain(BuildingKind::Market, 8),
            plain(BuildingKind::Fortifications, 20),
        ],
        technologies(),
        missions(),
        UnitData::standard_roster(),
    )
}

/// Collect `(building, level)` pairs into targets.
#[must_use]
pub fn targets(pairs: &[(BuildingKind, u32)]) -> TargetLevels {
    pairs.iter().copied().collect()
}

/// Every building at the top level the fixture catalog defines.
#[must_use]
pub fn full_targets() -> TargetLevels {
    targets(&[
        (BuildingKind::Lumberjack, 30),
        (BuildingKind::Quarry, 30),
        (BuildingKind::OreMine, 30),
        (BuildingKind::Farm, 30),
        (BuildingKind::WoodStore, 20),
        (BuildingKind::StoneStore, 20),
        (BuildingKind::OreStore, 20),
        (BuildingKind::Keep, 10),
        (BuildingKind::Arsenal, 30),
        (BuildingKind::Library, 10),
        (BuildingKind::Tavern, 10),
        (BuildingKind::Market, 8),
        (BuildingKind::Fortifications, 20),
    ])
}

/// Small targets that finish quickly, for determinism and property runs.
#[must_use]
pub fn small_targets() -> TargetLevels {
    targets(&[
        (BuildingKind::Lumberjack, 6),
        (BuildingKind::Quarry, 6),
        (BuildingKind::OreMine, 5),
        (BuildingKind::Tavern, 3),
    ])
}

/// All buildings at level 1 with `amount` of every resource.
#[must_use]
pub fn snapshot_with(amount: u32) -> GameSnapshot {
    let mut snapshot = GameSnapshot::default();
    for kind in ResourceKind::ALL {
        snapshot.resources.insert(kind, amount);
    }
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_farm_tops_out_at_max_food() {
        let farm = farm();
        assert_eq!(farm.storage_capacity(1), Some(40));
        assert_eq!(farm.storage_capacity(30), Some(MAX_FOOD_CAPACITY));
        assert_eq!(farm.required_tech(15), Some("Crop rotation"));
        assert_eq!(farm.required_tech(30), Some("Cellar storeroom"));
    }

    #[test]
    fn test_catalog_covers_targets() {
        let catalog = castle_catalog();
        for (kind, target) in full_targets() {
            let data = catalog.building(kind).expect("building in catalog");
            assert!(data.max_level() >= target, "{kind} stops below {target}");
        }
    }

    #[test]
    fn test_referenced_techs_defined() {
        let catalog = castle_catalog();
        for name in catalog.referenced_techs() {
            assert!(catalog.tech(name).is_some(), "{name} missing");
        }
    }

    #[test]
    fn test_top_costs_fit_top_storage() {
        let catalog = castle_catalog();
        let top_cap = store(BuildingKind::WoodStore)
            .storage_capacity(20)
            .expect("cap");
        for building in catalog.buildings() {
            for level in &building.levels {
                for kind in ResourceKind::ALL {
                    assert!(level.costs.resource(kind) <= top_cap);
                }
            }
        }
    }

    #[test]
    fn test_missions_profitable() {
        for mission in missions() {
            assert!(mission.net_average_reward_per_hour() > 0.0, "{}", mission.name);
        }
    }

    #[test]
    fn test_fixed_helper() {
        assert_eq!(fixed(3) + fixed(2), fixed(5));
    }
}
