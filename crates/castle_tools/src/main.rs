//! Castle build-order planner - command line

use std::path::PathBuf;

use castle_core::composition::CompositionPlanner;
use castle_core::solver::Solver;
use castle_core::CompositionConfig;
use castle_tools::loader::{default_data_dir, load_catalog, load_ron, load_scenario};
use castle_tools::output::{next_action, render, render_composition, OutputFormat};
use castle_tools::validate::{validate_data_directory, Severity};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "castle-tools")]
#[command(about = "Build-order planning tools for castle economies")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan a build order for a scenario
    Solve {
        /// Path to the catalog directory
        #[arg(long)]
        data: Option<PathBuf>,
        /// Scenario file
        #[arg(long)]
        scenario: PathBuf,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Print only the first action to take
        #[arg(long)]
        next: bool,
    },
    /// Plan defenders and market carts for a finished castle
    Units {
        /// RON file with castle figures; flags override it
        #[arg(long)]
        config: Option<PathBuf>,
        /// Food available for units
        #[arg(long)]
        food: Option<u32>,
        /// Resources produced per hour
        #[arg(long)]
        production: Option<u32>,
        /// One-way distance to the market in fields
        #[arg(long)]
        market_distance: Option<u32>,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Validate catalog files
    Validate {
        /// Path to the catalog directory
        #[arg(long)]
        data: Option<PathBuf>,
    },
}

fn data_dir(explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(default_data_dir)
        .unwrap_or_else(|| PathBuf::from("data"))
}

fn fail(message: &str) -> ! {
    tracing::error!("{message}");
    std::process::exit(1);
}

fn solve(data: PathBuf, scenario: &std::path::Path, format: OutputFormat, next: bool) {
    let catalog = load_catalog(&data).unwrap_or_else(|e| fail(&format!("Loading catalogs failed: {e}")));
    let scenario =
        load_scenario(scenario).unwrap_or_else(|e| fail(&format!("Loading scenario failed: {e}")));

    let solver = Solver::new(catalog, scenario.targets, scenario.config);
    let solution = solver
        .solve(&scenario.initial)
        .unwrap_or_else(|e| fail(&format!("Solving failed: {e}")));

    if next {
        println!("{}", next_action(&solution));
        return;
    }

    match render(&solution, format) {
        Ok(text) => println!("{text}"),
        Err(e) => fail(&format!("Rendering failed: {e}")),
    }
    if !solution.is_complete() {
        tracing::warn!(unmet = solution.unmet_targets.len(), "Some targets were not reached");
    }
}

fn units(
    config: Option<&std::path::Path>,
    food: Option<u32>,
    production: Option<u32>,
    market_distance: Option<u32>,
    format: OutputFormat,
) {
    let mut config: CompositionConfig = match config {
        Some(path) => {
            load_ron(path).unwrap_or_else(|e| fail(&format!("Loading config failed: {e}")))
        }
        None => CompositionConfig::default(),
    };
    if let Some(food) = food {
        config.food_capacity = food;
    }
    if let Some(production) = production {
        config.production_per_hour = production;
    }
    if let Some(distance) = market_distance {
        config.market_distance = distance;
    }

    let planner = CompositionPlanner::standard(config);
    let plan = planner.plan();
    match render_composition(&planner, &plan, format) {
        Ok(text) => println!("{text}"),
        Err(e) => fail(&format!("Rendering failed: {e}")),
    }
    if !plan.meets_throughput() {
        tracing::warn!(
            throughput = plan.throughput_per_hour,
            required = plan.required_throughput,
            "Army cannot carry all production"
        );
    }
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Solve {
            data,
            scenario,
            format,
            next,
        } => solve(data_dir(data), &scenario, format, next),
        Commands::Units {
            config,
            food,
            production,
            market_distance,
            format,
        } => units(config.as_deref(), food, production, market_distance, format),
        Commands::Validate { data } => {
            let path = data_dir(data);
            tracing::info!("Validating data files in: {}", path.display());
            match validate_data_directory(&path) {
                Ok(issues) => {
                    for issue in &issues {
                        println!("{issue}");
                    }
                    if issues.iter().any(|i| i.severity == Severity::Error) {
                        fail("Validation failed");
                    }
                    tracing::info!("Validation passed");
                }
                Err(e) => fail(&format!("Validation failed: {e}")),
            }
        }
    }
}
