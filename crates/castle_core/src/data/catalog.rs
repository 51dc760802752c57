//! Read-only lookup over every catalog the scheduler consumes.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SolverError};

use super::{BuildingData, BuildingKind, BuildingLevel, MissionData, TechData, UnitData, UnitKind};

/// Desired final level per building. Buildings not listed stay where they are.
pub type TargetLevels = BTreeMap<BuildingKind, u32>;

/// Buildings, technologies, missions and units.
///
/// Missions are kept sorted by (tavern level, name) so every scan over them
/// visits them in the same order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    buildings: BTreeMap<BuildingKind, BuildingData>,
    techs: BTreeMap<String, TechData>,
    missions: Vec<MissionData>,
    units: BTreeMap<UnitKind, UnitData>,
}

impl Catalog {
    /// Build a catalog from its parts.
    ///
    /// For buildings, technologies and units a later duplicate replaces the
    /// earlier entry. For missions the first entry with a given name wins.
    #[must_use]
    pub fn new(
        buildings: Vec<BuildingData>,
        techs: Vec<TechData>,
        mut missions: Vec<MissionData>,
        units: Vec<UnitData>,
    ) -> Self {
        let mut seen = BTreeSet::new();
        missions.retain(|m| seen.insert(m.name.clone()));
        missions.sort_by(|a, b| {
            a.tavern_level
                .cmp(&b.tavern_level)
                .then_with(|| a.name.cmp(&b.name))
        });

        Self {
            buildings: buildings.into_iter().map(|b| (b.kind, b)).collect(),
            techs: techs.into_iter().map(|t| (t.name.clone(), t)).collect(),
            missions,
            units: units.into_iter().map(|u| (u.kind, u)).collect(),
        }
    }

    /// Building definition.
    #[must_use]
    pub fn building(&self, kind: BuildingKind) -> Option<&BuildingData> {
        self.buildings.get(&kind)
    }

    /// All building definitions in kind order.
    pub fn buildings(&self) -> impl Iterator<Item = &BuildingData> {
        self.buildings.values()
    }

    /// Level data for a building.
    #[must_use]
    pub fn building_level(&self, kind: BuildingKind, level: u32) -> Option<&BuildingLevel> {
        self.building(kind)?.level(level)
    }

    /// Level data for a building, as an error when absent.
    pub fn require_level(&self, kind: BuildingKind, level: u32) -> Result<&BuildingLevel> {
        let building = self
            .building(kind)
            .ok_or(SolverError::UnknownBuilding(kind))?;
        building.level(level).ok_or(SolverError::MissingLevelData {
            building: kind,
            level,
        })
    }

    /// Technology by name.
    #[must_use]
    pub fn tech(&self, name: &str) -> Option<&TechData> {
        self.techs.get(name)
    }

    /// All technologies in name order.
    pub fn techs(&self) -> impl Iterator<Item = &TechData> {
        self.techs.values()
    }

    /// Missions sorted by (tavern level, name).
    #[must_use]
    pub fn missions(&self) -> &[MissionData] {
        &self.missions
    }

    /// Mission by name.
    #[must_use]
    pub fn mission(&self, name: &str) -> Option<&MissionData> {
        self.missions.iter().find(|m| m.name == name)
    }

    /// Unit definition.
    #[must_use]
    pub fn unit(&self, kind: UnitKind) -> Option<&UnitData> {
        self.units.get(&kind)
    }

    /// All unit definitions in fixed unit order.
    pub fn units(&self) -> impl Iterator<Item = &UnitData> {
        self.units.values()
    }

    /// Every technology name referenced by a building level or a unit.
    #[must_use]
    pub fn referenced_techs(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .buildings
            .values()
            .flat_map(|b| b.levels.iter())
            .filter_map(|l| l.required_tech.as_deref())
            .chain(self.units.values().filter_map(|u| u.required_tech.as_deref()))
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}
