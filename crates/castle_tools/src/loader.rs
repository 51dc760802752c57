//! Catalog and scenario loading.
//!
//! A data directory holds one RON file per catalog:
//!
//! - `buildings.ron` - `[BuildingData(...), ...]`
//! - `technologies.ron` - `[TechData(...), ...]`
//! - `missions.ron` - `[MissionData(...), ...]`
//! - `units.ron` - optional, the standard roster is used when absent
//!
//! A scenario file names the starting castle, the targets and optional
//! solver settings.

use std::fs;
use std::path::{Path, PathBuf};

use castle_core::data::{BuildingData, Catalog, MissionData, TargetLevels, TechData, UnitData};
use castle_core::state::GameSnapshot;
use castle_core::SolverConfig;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validate::{validate_files, Severity};

/// Building catalog file name.
pub const BUILDINGS_FILE: &str = "buildings.ron";
/// Technology catalog file name.
pub const TECHNOLOGIES_FILE: &str = "technologies.ron";
/// Mission catalog file name.
pub const MISSIONS_FILE: &str = "missions.ron";
/// Optional unit catalog file name.
pub const UNITS_FILE: &str = "units.ron";

/// Environment variable overriding the default data directory.
pub const DATA_DIR_ENV: &str = "CASTLE_DATA_DIR";

/// Errors that can occur while loading data files.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    /// Failed to read a file.
    #[error("IO error reading '{0}': {1}")]
    IoError(String, String),
    /// Failed to parse RON.
    #[error("Parse error in '{0}': {1}")]
    ParseError(String, String),
    /// Data directory missing.
    #[error("Directory not found: {0}")]
    DirectoryNotFound(String),
    /// Catalog files parsed but are inconsistent.
    #[error("{count} validation error(s), first: {first}")]
    Validation {
        /// Number of errors found.
        count: usize,
        /// The first error message.
        first: String,
    },
}

/// A planning request: where to start, where to go, how to search.
///
/// # Example RON
///
/// ```ron
/// Scenario(
///     initial: (
///         resources: { wood: 120, stone: 120, iron: 120 },
///     ),
///     targets: { lumberjack: 30, farm: 30 },
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Starting castle.
    #[serde(default)]
    pub initial: GameSnapshot,
    /// Target building levels.
    pub targets: TargetLevels,
    /// Solver settings.
    #[serde(default)]
    pub config: SolverConfig,
}

/// Raw catalog files as parsed, before duplicates are folded.
#[derive(Debug, Clone, Default)]
pub struct CatalogFiles {
    /// Building definitions.
    pub buildings: Vec<BuildingData>,
    /// Technology definitions.
    pub techs: Vec<TechData>,
    /// Mission definitions.
    pub missions: Vec<MissionData>,
    /// Unit definitions.
    pub units: Vec<UnitData>,
}

impl CatalogFiles {
    /// Fold into a lookup catalog.
    #[must_use]
    pub fn into_catalog(self) -> Catalog {
        Catalog::new(self.buildings, self.techs, self.missions, self.units)
    }
}

/// Parse a RON file into `T`.
///
/// # Errors
///
/// Returns [`LoadError::IoError`] or [`LoadError::ParseError`].
pub fn load_ron<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let content = fs::read_to_string(path)
        .map_err(|e| LoadError::IoError(path.display().to_string(), e.to_string()))?;
    ron::from_str(&content)
        .map_err(|e| LoadError::ParseError(path.display().to_string(), e.to_string()))
}

/// Parse every catalog file in `dir` without validating.
///
/// # Errors
///
/// Returns an error if the directory or a required file is missing or
/// unparseable.
pub fn load_catalog_files(dir: &Path) -> Result<CatalogFiles, LoadError> {
    if !dir.is_dir() {
        return Err(LoadError::DirectoryNotFound(dir.display().to_string()));
    }

    let buildings = load_ron(&dir.join(BUILDINGS_FILE))?;
    let techs = load_ron(&dir.join(TECHNOLOGIES_FILE))?;
    let missions = load_ron(&dir.join(MISSIONS_FILE))?;

    let units_path = dir.join(UNITS_FILE);
    let units = if units_path.exists() {
        load_ron(&units_path)?
    } else {
        tracing::debug!("No {UNITS_FILE} in {}, using the standard roster", dir.display());
        UnitData::standard_roster()
    };

    Ok(CatalogFiles {
        buildings,
        techs,
        missions,
        units,
    })
}

/// Load, validate and fold the catalogs in `dir`.
///
/// Validation warnings are logged; errors abort the load.
///
/// # Errors
///
/// Returns an error if loading fails or validation finds errors.
pub fn load_catalog(dir: &Path) -> Result<Catalog, LoadError> {
    let files = load_catalog_files(dir)?;

    let issues = validate_files(&files);
    let mut errors = Vec::new();
    for issue in issues {
        match issue.severity {
            Severity::Warning => tracing::warn!("{}", issue.message),
            Severity::Error => {
                tracing::error!("{}", issue.message);
                errors.push(issue.message);
            }
        }
    }
    if let Some(first) = errors.first() {
        return Err(LoadError::Validation {
            count: errors.len(),
            first: first.clone(),
        });
    }

    tracing::info!(
        buildings = files.buildings.len(),
        technologies = files.techs.len(),
        missions = files.missions.len(),
        units = files.units.len(),
        "Loaded catalogs from {}",
        dir.display()
    );
    Ok(files.into_catalog())
}

/// Load a scenario file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_scenario(path: &Path) -> Result<Scenario, LoadError> {
    load_ron(path)
}

/// Resolve the default data directory.
///
/// Looks in order at:
/// 1. Environment variable `CASTLE_DATA_DIR`
/// 2. `./crates/castle_tools/data` (repo root)
/// 3. `./data` (running from castle_tools)
#[must_use]
pub fn default_data_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        let path = PathBuf::from(dir);
        if path.is_dir() {
            return Some(path);
        }
    }

    ["crates/castle_tools/data", "data"]
        .into_iter()
        .map(PathBuf::from)
        .find(|p| p.is_dir())
}

#[cfg(test)]
mod tests {
    use super::*;
    use castle_core::data::BuildingKind;
    use castle_core::resources::ResourceKind;

    #[test]
    fn test_parse_scenario_defaults() {
        let scenario: Scenario = ron::from_str(
            "Scenario(initial: (resources: { wood: 10 }), targets: { keep: 3 })",
        )
        .expect("parse");
        assert_eq!(scenario.initial.resources.get(&ResourceKind::Wood), Some(&10));
        assert_eq!(scenario.targets.get(&BuildingKind::Keep), Some(&3));
        assert_eq!(scenario.config, SolverConfig::default());
    }

    #[test]
    fn test_missing_directory() {
        let err = load_catalog_files(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, LoadError::DirectoryNotFound(_)));
    }
}
