//! Data validation utilities.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use castle_core::data::{BuildingData, BuildingKind, UnitKind};

use crate::loader::{load_catalog_files, CatalogFiles, LoadError};

/// How bad a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// The solver copes, but the data is probably not what was meant.
    Warning,
    /// The catalog cannot be used.
    Error,
}

/// One validation finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    /// Severity.
    pub severity: Severity,
    /// Human-readable description.
    pub message: String,
}

impl Issue {
    fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Warning => write!(f, "warning: {}", self.message),
            Severity::Error => write!(f, "error: {}", self.message),
        }
    }
}

fn validate_building(building: &BuildingData, issues: &mut Vec<Issue>) {
    let kind = building.kind;
    if building.levels.is_empty() {
        issues.push(Issue::error(format!("{kind} defines no levels")));
        return;
    }

    let needs_rate = kind.produces().is_some();
    let needs_capacity = kind.stores().is_some() || kind == BuildingKind::Farm;
    let mut last_capacity = 0;

    for (index, level) in building.levels.iter().enumerate() {
        let number = index + 1;
        if needs_rate && level.production_rate.is_none() {
            issues.push(Issue::error(format!("{kind} level {number} has no production rate")));
        }
        if needs_capacity {
            match level.storage_capacity {
                None => issues.push(Issue::error(format!("{kind} level {number} has no capacity"))),
                Some(cap) if cap < last_capacity => issues.push(Issue::warning(format!(
                    "{kind} level {number} capacity {cap} drops below {last_capacity}"
                ))),
                Some(cap) => last_capacity = cap,
            }
        }
        if index > 0 && level.build_time == 0 {
            issues.push(Issue::warning(format!("{kind} level {number} builds instantly")));
        }
    }
}

/// Check parsed catalog files for consistency.
///
/// Errors cover data the solver cannot plan with: duplicate names, missing
/// rates or capacities, undefined unit kinds and inverted ranges. Warnings
/// cover data it tolerates, such as technologies referenced but never
/// defined (they count as researched).
#[must_use]
pub fn validate_files(files: &CatalogFiles) -> Vec<Issue> {
    let mut issues = Vec::new();

    let mut seen = BTreeSet::new();
    for building in &files.buildings {
        if !seen.insert(building.kind) {
            issues.push(Issue::error(format!("{} defined twice", building.kind)));
        }
        validate_building(building, &mut issues);
    }

    let mut tech_names = BTreeSet::new();
    for tech in &files.techs {
        if !tech_names.insert(tech.name.as_str()) {
            issues.push(Issue::error(format!("technology {} defined twice", tech.name)));
        }
        if tech.required_library_level == 0 {
            issues.push(Issue::warning(format!("technology {} needs library level 0", tech.name)));
        }
    }

    let referenced = files
        .buildings
        .iter()
        .flat_map(|b| b.levels.iter())
        .filter_map(|l| l.required_tech.as_deref())
        .chain(files.units.iter().filter_map(|u| u.required_tech.as_deref()));
    let mut reported = BTreeSet::new();
    for name in referenced {
        if !tech_names.contains(name) && reported.insert(name) {
            issues.push(Issue::warning(format!(
                "technology {name} is referenced but not defined, it will count as researched"
            )));
        }
    }

    let unit_kinds: BTreeSet<UnitKind> = files.units.iter().map(|u| u.kind).collect();
    let mut mission_names = BTreeSet::new();
    for mission in &files.missions {
        let name = &mission.name;
        if !mission_names.insert(name.as_str()) {
            issues.push(Issue::error(format!("mission {name} defined twice")));
        }
        if mission.duration_minutes == 0 {
            issues.push(Issue::error(format!("mission {name} has zero duration")));
        }
        if mission
            .max_tavern_level
            .is_some_and(|max| max < mission.tavern_level)
        {
            issues.push(Issue::error(format!("mission {name} has an empty tavern window")));
        }
        for requirement in &mission.units {
            if !unit_kinds.contains(&requirement.unit) {
                issues.push(Issue::error(format!(
                    "mission {name} needs {} which is not in the unit catalog",
                    requirement.unit
                )));
            }
        }
        for reward in &mission.rewards {
            if reward.min > reward.max {
                issues.push(Issue::error(format!(
                    "mission {name} rewards {} {}..{}",
                    reward.resource, reward.min, reward.max
                )));
            }
        }
    }

    issues
}

/// Validate all RON data files in a directory.
///
/// # Errors
///
/// Returns an error if a data file cannot be read or parsed. Consistency
/// findings are returned as issues instead.
pub fn validate_data_directory(path: &Path) -> Result<Vec<Issue>, LoadError> {
    let files = load_catalog_files(path)?;
    Ok(validate_files(&files))
}

#[cfg(test)]
mod tests {
    use super::*;
    use castle_core::data::{BuildingLevel, MissionData, TechData, UnitData, UnitRequirement};
    use castle_core::resources::Costs;

    fn level(rate: Option<u32>) -> BuildingLevel {
        BuildingLevel {
            costs: Costs::ZERO,
            build_time: 60,
            production_rate: rate,
            storage_capacity: None,
            required_tech: Some("Masonry".to_string()),
        }
    }

    fn create_test_files() -> CatalogFiles {
        CatalogFiles {
            buildings: vec![BuildingData {
                kind: BuildingKind::Lumberjack,
                levels: vec![level(Some(10)), level(Some(20))],
            }],
            techs: vec![TechData {
                name: "Masonry".to_string(),
                required_library_level: 1,
                costs: Costs::ZERO,
                research_time: 60,
            }],
            missions: Vec::new(),
            units: UnitData::standard_roster()
                .into_iter()
                .filter(|u| u.required_tech.is_none())
                .collect(),
        }
    }

    fn errors(issues: &[Issue]) -> usize {
        issues.iter().filter(|i| i.severity == Severity::Error).count()
    }

    #[test]
    fn test_clean_files_pass() {
        assert!(validate_files(&create_test_files()).is_empty());
    }

    #[test]
    fn test_missing_rate_is_error() {
        let mut files = create_test_files();
        files.buildings[0].levels.push(level(None));
        assert_eq!(errors(&validate_files(&files)), 1);
    }

    #[test]
    fn test_undefined_tech_is_warning() {
        let mut files = create_test_files();
        files.techs.clear();
        let issues = validate_files(&files);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Warning);
    }

    #[test]
    fn test_mission_checks() {
        let mut files = create_test_files();
        files.units.retain(|u| u.kind == UnitKind::Spearman);
        let mission = MissionData {
            name: "Raid".to_string(),
            duration_minutes: 0,
            tavern_level: 5,
            max_tavern_level: Some(3),
            units: vec![UnitRequirement {
                unit: UnitKind::Lancer,
                count: 2,
            }],
            costs: Costs::ZERO,
            rewards: Vec::new(),
        };
        files.missions = vec![mission.clone(), mission];
        // zero duration, empty window, unknown unit, twice over, plus the duplicate
        assert_eq!(errors(&validate_files(&files)), 7);
    }
}
