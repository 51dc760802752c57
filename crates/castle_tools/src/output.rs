//! Schedule rendering for the command line.

use std::fmt::Write;

use castle_core::composition::{Composition, CompositionPlanner};
use castle_core::resources::Costs;
use castle_core::solution::Solution;
use thiserror::Error;

/// Output format for a solved schedule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
    /// Pretty-printed RON.
    Ron,
}

/// Errors while rendering a schedule.
#[derive(Debug, Error)]
pub enum OutputError {
    /// JSON encoding failed.
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    /// RON encoding failed.
    #[error("RON encoding failed: {0}")]
    Ron(#[from] ron::Error),
}

/// Seconds as `HH:MM:SS`, hours unbounded.
#[must_use]
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

/// Fixed-width cost column.
#[must_use]
pub fn format_costs(costs: &Costs) -> String {
    format!(
        "W:{:5} S:{:5} I:{:4} F:{:2}",
        costs.wood, costs.stone, costs.iron, costs.food
    )
}

/// The first action to take, as a single machine-readable line:
/// `building:<kind>:<level>`, `research:<tech>` or `none`.
///
/// A building upgrade wins ties with research.
#[must_use]
pub fn next_action(solution: &Solution) -> String {
    let building = solution.next_building_action();
    let research = solution.research_log.iter().min_by_key(|e| (e.start, e.end));

    match (building, research) {
        (Some(b), Some(r)) if r.start < b.start => format!("research:{}", r.tech),
        (Some(b), _) => format!("building:{}:{}", b.building, b.to_level),
        (None, Some(r)) => format!("research:{}", r.tech),
        (None, None) => "none".to_string(),
    }
}

/// Human-readable report of a schedule.
#[must_use]
pub fn render_text(solution: &Solution) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = write_text(&mut out, solution);
    out
}

fn write_text(out: &mut String, solution: &Solution) -> std::fmt::Result {
    writeln!(out, "Building upgrades ({}):", solution.building_log.len())?;
    for e in &solution.building_log {
        writeln!(
            out,
            "  {} -> {}  {:<15} {:>2} -> {:<2}  {}  food {}/{}",
            format_duration(e.start),
            format_duration(e.end),
            e.building.name(),
            e.from_level,
            e.to_level,
            format_costs(&e.costs),
            e.food_used,
            e.food_capacity
        )?;
    }

    writeln!(out, "\nResearch ({}):", solution.research_log.len())?;
    for e in &solution.research_log {
        writeln!(
            out,
            "  {} -> {}  {:<22}  {}",
            format_duration(e.start),
            format_duration(e.end),
            e.tech,
            format_costs(&e.costs)
        )?;
    }

    writeln!(out, "\nTraining ({} units):", solution.training_log.len())?;
    for (kind, count) in solution.final_state.army.iter().filter(|&(_, c)| c > 0) {
        writeln!(out, "  {:<12} {count}", kind.name())?;
    }

    writeln!(out, "\nMissions ({}):", solution.mission_log.len())?;
    for e in &solution.mission_log {
        writeln!(
            out,
            "  {} -> {}  {}",
            format_duration(e.start),
            format_duration(e.end),
            e.mission
        )?;
    }

    let total = solution.total_time;
    writeln!(
        out,
        "\nTotal completion time: {} ({:.1} hours = {:.1} days)",
        format_duration(total),
        total as f64 / 3600.0,
        total as f64 / 86_400.0
    )?;
    writeln!(
        out,
        "Food: {}/{} used",
        solution.final_state.food_used, solution.final_state.food_capacity
    )?;
    writeln!(
        out,
        "Defense: cavalry {}, infantry {}, artillery {} (min {})",
        solution.defense.cavalry,
        solution.defense.infantry,
        solution.defense.artillery,
        solution.defense.min()
    )?;

    if solution.is_complete() {
        writeln!(out, "All buildings reached their target levels")?;
    } else {
        writeln!(out, "Unreached targets:")?;
        for (kind, level) in &solution.unmet_targets {
            writeln!(out, "  {kind}: stopped at {level}")?;
        }
    }
    Ok(())
}

/// Render a schedule in the requested format.
///
/// # Errors
///
/// Returns an error if JSON or RON encoding fails.
pub fn render(solution: &Solution, format: OutputFormat) -> Result<String, OutputError> {
    match format {
        OutputFormat::Text => Ok(render_text(solution)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(solution)?),
        OutputFormat::Ron => Ok(ron::ser::to_string_pretty(
            solution,
            ron::ser::PrettyConfig::default(),
        )?),
    }
}

/// Human-readable report of an army composition, with the roster it was
/// chosen from.
#[must_use]
pub fn render_composition_text(planner: &CompositionPlanner, plan: &Composition) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = write_composition(&mut out, planner, plan);
    out
}

fn write_composition(
    out: &mut String,
    planner: &CompositionPlanner,
    plan: &Composition,
) -> std::fmt::Result {
    let config = planner.config();
    let round_trip = config.round_trip_fields();
    writeln!(out, "Castle:")?;
    writeln!(out, "  Food for units: {}", config.food_capacity)?;
    writeln!(out, "  Resource production: {}/hour", config.production_per_hour)?;
    writeln!(out, "  Market distance: {} fields", config.market_distance)?;

    writeln!(out, "\nAvailable units:")?;
    writeln!(
        out,
        "  {:<12} {:>4} {:>9} {:>8} {:>12} {:>7} {:>7} {:>7}",
        "unit", "food", "sec/field", "capacity", "throughput/h", "def cav", "def inf", "def art"
    )?;
    for unit in planner.roster() {
        writeln!(
            out,
            "  {:<12} {:>4} {:>9} {:>8} {:>12.0} {:>7} {:>7} {:>7}",
            unit.name,
            unit.food,
            unit.seconds_per_field,
            unit.capacity,
            unit.throughput_per_hour(round_trip),
            unit.defense.cavalry,
            unit.defense.infantry,
            unit.defense.artillery
        )?;
    }

    writeln!(out, "\nComposition:")?;
    for line in &plan.units {
        writeln!(
            out,
            "  {:<12} {:>6}  food {:>5}  {:>8.0}/h  def {}/{}/{}",
            line.name,
            line.count,
            line.food,
            line.throughput_per_hour,
            line.defense.cavalry,
            line.defense.infantry,
            line.defense.artillery
        )?;
    }

    writeln!(out, "\nFood: {}/{} used", plan.food_used, plan.food_capacity)?;
    writeln!(
        out,
        "Trading throughput: {:.0}/{:.0} resources per hour",
        plan.throughput_per_hour, plan.required_throughput
    )?;
    writeln!(
        out,
        "Silver income: {:.2}/hour ({:.1}/day)",
        plan.silver_per_hour,
        plan.silver_per_hour * 24.0
    )?;
    writeln!(
        out,
        "Defense: cavalry {}, infantry {}, artillery {} (min {})",
        plan.defense.cavalry,
        plan.defense.infantry,
        plan.defense.artillery,
        plan.defense.min()
    )?;
    if !plan.meets_throughput() {
        writeln!(out, "Not enough food to carry all production to market")?;
    }
    Ok(())
}

/// Render an army composition in the requested format.
///
/// # Errors
///
/// Returns an error if JSON or RON encoding fails.
pub fn render_composition(
    planner: &CompositionPlanner,
    plan: &Composition,
    format: OutputFormat,
) -> Result<String, OutputError> {
    match format {
        OutputFormat::Text => Ok(render_composition_text(planner, plan)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(plan)?),
        OutputFormat::Ron => Ok(ron::ser::to_string_pretty(
            plan,
            ron::ser::PrettyConfig::default(),
        )?),
    }
}
