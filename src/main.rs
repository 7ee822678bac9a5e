use clap::{Parser, Subcommand};
use colored::*;
use env_logger::Builder;
use log::{error, info, LevelFilter};
use std::path::{Path, PathBuf};
use std::process;

use surety_core::config::{ConfigError, LedgerConfig};
use surety_core::simulation::{
    run_scenario, run_simulation, ResponseBehavior, SimulationError, SimulationParams, StepOutcome,
};
use surety_core::units::format_units;

#[derive(Parser)]
#[clap(author, version, about)]
/// Flight-delay insurance ledger driver
struct Cli {
    /// Subcommand to execute
    #[clap(subcommand)]
    command: Commands,

    /// Ledger configuration file (TOML)
    #[clap(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level for output
    #[clap(short, long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk through the canonical insure, delay, claim and refund flow
    Scenario {
        /// Seed for the oracle network
        #[clap(short, long, default_value = "1")]
        seed: u64,
    },

    /// Run an oracle network against several insured flights
    #[clap(alias = "sim")]
    Simulate {
        /// Oracles to register
        #[clap(short, long, default_value = "20")]
        oracles: usize,

        /// Passengers insuring every flight
        #[clap(short, long, default_value = "5")]
        passengers: usize,

        /// Flights to schedule
        #[clap(short, long, default_value = "3")]
        flights: usize,

        /// Seed for oracle indexes, premiums and responses
        #[clap(short, long, default_value = "1")]
        seed: u64,

        /// Probability that an oracle reports the true status; random when absent
        #[clap(short, long)]
        accuracy: Option<f64>,
    },

    /// Load and validate a configuration file
    CheckConfig {
        /// Path to the TOML file
        path: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        "off" => LevelFilter::Off,
        _ => LevelFilter::Info,
    };

    Builder::new()
        .filter_level(log_level)
        .parse_default_env()
        .format_timestamp_millis()
        .init();

    let result = match &cli.command {
        Commands::Scenario { seed } => load_config(&cli.config, *seed)
            .map_err(SimulationError::from)
            .and_then(|config| scenario(config, *seed)),
        Commands::Simulate {
            oracles,
            passengers,
            flights,
            seed,
            accuracy,
        } => {
            let params = SimulationParams {
                oracles: *oracles,
                passengers: *passengers,
                flights: *flights,
                seed: *seed,
                behavior: match accuracy {
                    Some(accuracy) => ResponseBehavior::Truthful { accuracy: *accuracy },
                    None => ResponseBehavior::Random,
                },
            };
            load_config(&cli.config, *seed)
                .map_err(SimulationError::from)
                .and_then(|config| simulate(config, &params))
        }
        Commands::CheckConfig { path } => check_config(path).map_err(SimulationError::from),
    };

    if let Err(e) = result {
        error!("{}", e);
        process::exit(1);
    }
}

/// File configuration when given, otherwise the testing preset seeded with `seed`
fn load_config(path: &Option<PathBuf>, seed: u64) -> Result<LedgerConfig, ConfigError> {
    match path {
        Some(path) => LedgerConfig::load(path),
        None => Ok(LedgerConfig::testing(seed)),
    }
}

fn scenario(config: LedgerConfig, seed: u64) -> Result<(), SimulationError> {
    println!("{}", "Flight Surety Scenario".green().bold());
    println!("{}", "======================".green());

    let (ledger, steps) = run_scenario(config, seed)?;
    for (n, step) in steps.iter().enumerate() {
        match &step.outcome {
            StepOutcome::Completed(detail) => println!(
                "{:>2}. {:<24} {} {}",
                n + 1,
                step.name.white().bold(),
                "ok".green(),
                detail
            ),
            StepOutcome::Rejected(reason) => println!(
                "{:>2}. {:<24} {} {}",
                n + 1,
                step.name.white().bold(),
                "rejected".yellow(),
                reason
            ),
        }
    }

    let snapshot = ledger.snapshot();
    println!();
    println!(
        "{}: {} units",
        "Treasury balance".cyan().bold(),
        format_units(snapshot.treasury_balance)
    );
    println!("{}: {}", "Ledger height".cyan().bold(), snapshot.height);
    Ok(())
}

fn simulate(config: LedgerConfig, params: &SimulationParams) -> Result<(), SimulationError> {
    info!(
        "Simulating {} flights with {} oracles and {} passengers",
        params.flights, params.oracles, params.passengers
    );
    let report = run_simulation(config, params)?;
    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{}", json),
        Err(e) => error!("Failed to render report: {}", e),
    }
    Ok(())
}

fn check_config(path: &Path) -> Result<(), ConfigError> {
    let config = LedgerConfig::load(path)?;
    let result = config.validate();
    println!("{} {}", "Profile:".cyan().bold(), config.profile);
    println!("{}", result.get_summary());
    println!("{}", "Configuration OK".green().bold());
    Ok(())
}
