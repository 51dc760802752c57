//! Data structures for castle catalogs.
//!
//! This module contains pure data structures that define buildings,
//! technologies, missions and units. All structs are designed to be
//! deserialized from RON files.
//!
//! **Note:** This module contains no IO - it only defines data types.
//! File loading is handled by `castle_tools`.

mod building_data;
mod catalog;
mod mission_data;
mod tech_data;
mod unit_data;

pub use building_data::{BuildingData, BuildingKind, BuildingLevel};
pub use catalog::{Catalog, TargetLevels};
pub use mission_data::{MissionData, Reward, UnitRequirement};
pub use tech_data::{is_production_tech, TechData, PRODUCTION_TECHS};
pub use unit_data::{Defense, UnitData, UnitKind};
