//! Command-line front end for the Routeflow optimization engine.
//!
//! Exposes the engine's three public operations over JSON documents:
//! `optimize` and `reroute` read a request file and print (or write) the
//! resulting solution, `health` reports liveness. Configuration comes
//! from the documented environment variables.

#![forbid(unsafe_code)]

mod error;
pub mod summary;

use std::fs::File;
use std::io::BufReader;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand, ValueEnum};
use routeflow_core::{Delivery, EngineConfig, Location, Solution, Vehicle};
use routeflow_engine::{OptimizeRequest, Optimizer, RerouteContext, Rerouter};
use routeflow_matrix::TrafficData;
use serde::Deserialize;

pub use error::CliError;

/// Runs the CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let config = EngineConfig::from_env();
    match cli.command {
        Command::Optimize(args) => run_optimize(&args, config),
        Command::Reroute(args) => run_reroute(&args, config),
        Command::Health => {
            println!("{}", r#"{"status": "healthy"}"#);
            Ok(())
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "routeflow",
    about = "Route optimization: distance matrices, VRP solving, dynamic rerouting",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compute routes for a fleet and a batch of deliveries.
    Optimize(OptimizeArgs),
    /// Re-solve an existing plan after a traffic, delay, or roadblock
    /// event.
    Reroute(RerouteArgs),
    /// Report service liveness.
    Health,
}

/// CLI arguments for the `optimize` subcommand.
#[derive(Debug, Clone, Parser)]
struct OptimizeArgs {
    /// Path to a JSON file containing an optimization request.
    #[arg(value_name = "path")]
    request_path: Utf8PathBuf,
    /// Write the solution here instead of standard output.
    #[arg(long, value_name = "path")]
    output: Option<Utf8PathBuf>,
    /// Print a human-readable summary instead of JSON.
    #[arg(long)]
    summary: bool,
}

/// CLI arguments for the `reroute` subcommand.
#[derive(Debug, Clone, Parser)]
struct RerouteArgs {
    /// Kind of event to reroute for.
    #[arg(long = "type", value_enum, value_name = "kind")]
    reroute_type: RerouteType,
    /// Path to a JSON file containing the reroute document.
    #[arg(value_name = "path")]
    request_path: Utf8PathBuf,
    /// Write the solution here instead of standard output.
    #[arg(long, value_name = "path")]
    output: Option<Utf8PathBuf>,
    /// Print a human-readable summary instead of JSON.
    #[arg(long)]
    summary: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RerouteType {
    Traffic,
    Delay,
    Roadblock,
}

/// JSON document accepted by `reroute`.
#[derive(Debug, Deserialize)]
struct RerouteDocument {
    current_solution: Solution,
    locations: Vec<Location>,
    vehicles: Vec<Vehicle>,
    original_deliveries: Vec<Delivery>,
    #[serde(default)]
    completed_delivery_ids: Vec<String>,
    #[serde(default)]
    traffic_data: Option<TrafficData>,
    #[serde(default)]
    delayed_location_ids: Vec<String>,
    #[serde(default)]
    delay_minutes: Option<f64>,
    #[serde(default)]
    blocked_segments: Vec<(String, String)>,
    #[serde(default)]
    use_api: Option<bool>,
    #[serde(default = "default_time_limit_seconds")]
    time_limit_seconds: u64,
}

fn default_time_limit_seconds() -> u64 {
    30
}

fn run_optimize(args: &OptimizeArgs, config: EngineConfig) -> Result<(), CliError> {
    let request: OptimizeRequest = read_json(&args.request_path)?;
    let optimizer = Optimizer::new(config);
    let solution = optimizer.optimize(&request)?;
    if args.summary {
        print!("{}", summary::render_summary(&solution));
        return Ok(());
    }
    write_solution(&solution, args.output.as_deref())
}

fn run_reroute(args: &RerouteArgs, config: EngineConfig) -> Result<(), CliError> {
    let document: RerouteDocument = read_json(&args.request_path)?;
    let optimizer = Optimizer::new(config);
    let rerouter = Rerouter::new(&optimizer);

    let context = RerouteContext {
        current_solution: document.current_solution,
        locations: document.locations,
        vehicles: document.vehicles,
        original_deliveries: document.original_deliveries,
        completed_delivery_ids: document.completed_delivery_ids,
        use_api: document.use_api,
        time_limit_seconds: document.time_limit_seconds,
    };

    let solution = match args.reroute_type {
        RerouteType::Traffic => {
            let traffic = document.traffic_data.ok_or(CliError::MissingReroutePayload {
                reroute_type: "traffic",
                field: "traffic_data",
            })?;
            rerouter.reroute_for_traffic(&context, &traffic)?
        }
        RerouteType::Delay => {
            let delay_minutes =
                document.delay_minutes.ok_or(CliError::MissingReroutePayload {
                    reroute_type: "delay",
                    field: "delay_minutes",
                })?;
            rerouter.reroute_for_delay(&context, &document.delayed_location_ids, delay_minutes)?
        }
        RerouteType::Roadblock => {
            rerouter.reroute_for_roadblock(&context, &document.blocked_segments)?
        }
    };
    if args.summary {
        print!("{}", summary::render_summary(&solution));
        return Ok(());
    }
    write_solution(&solution, args.output.as_deref())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Utf8Path) -> Result<T, CliError> {
    let file = File::open(path).map_err(|source| CliError::OpenRequest {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| CliError::ParseRequest {
        path: path.to_path_buf(),
        source,
    })
}

fn write_solution(solution: &Solution, output: Option<&Utf8Path>) -> Result<(), CliError> {
    let rendered =
        serde_json::to_string_pretty(solution).map_err(CliError::SerialiseSolution)?;
    match output {
        Some(path) => std::fs::write(path, rendered).map_err(|source| CliError::WriteOutput {
            path: path.to_path_buf(),
            source,
        }),
        None => {
            println!("{rendered}");
            Ok(())
        }
    }
}
