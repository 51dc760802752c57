//! Technology data structures.

use serde::{Deserialize, Serialize};

use crate::resources::Costs;

/// Technologies that raise every production rate when researched.
pub const PRODUCTION_TECHS: [&str; 2] = ["Beer tester", "Wheelbarrow"];

/// Whether a technology is one of the production boosters.
#[must_use]
pub fn is_production_tech(name: &str) -> bool {
    PRODUCTION_TECHS.contains(&name)
}

/// Data-driven technology definition.
///
/// # Example RON
///
/// ```ron
/// TechData(
///     name: "Crop rotation",
///     required_library_level: 1,
///     costs: (wood: 120, stone: 80, iron: 40),
///     research_time: 1800,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechData {
    /// Unique technology name.
    pub name: String,

    /// Library level needed before research can start.
    #[serde(default = "default_library_level")]
    pub required_library_level: u32,

    /// Resource and food cost.
    #[serde(default)]
    pub costs: Costs,

    /// Research time in seconds.
    pub research_time: u64,
}

/// Default library requirement for technologies without one.
const fn default_library_level() -> u32 {
    1
}

impl TechData {
    /// Whether researching this raises the production bonus.
    #[must_use]
    pub fn is_production_tech(&self) -> bool {
        is_production_tech(&self.name)
    }
}
