// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! QubitOS Network Simulator CLI
//!
//! # Usage
//!
//! ```bash
//! # Show effective configuration
//! qubit-os-netsim config
//!
//! # Validate a config file
//! qubit-os-netsim validate --config /path/to/netsim.yaml
//!
//! # Run the two-entity ping-pong simulation
//! qubit-os-netsim pingpong --end-time 91
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use qubit_os_netsim::{config::Config, Result, Simulation, VERSION};

/// QubitOS discrete-event quantum network simulator
#[derive(Parser)]
#[command(name = "qubit-os-netsim")]
#[command(author = "QubitOS Contributors")]
#[command(version = VERSION)]
#[command(about = "Discrete-event simulation core for quantum networks")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show effective configuration
    Config,

    /// Validate configuration file
    Validate,

    /// Run the ping-pong simulation and print its statistics as JSON
    Pingpong {
        /// Stop after this simulated time
        #[arg(long, default_value_t = 91.0)]
        end_time: f64,

        /// Delay between ping and pong
        #[arg(long, default_value_t = 10.0)]
        delay: f64,

        /// Override the configured seed
        #[arg(long, env = "QUBITOS_NETSIM_SEED")]
        seed: Option<u64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level);

    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Config => {
            println!("{}", serde_yaml::to_string(&config)?);
        }

        Commands::Validate => match config.validate() {
            Ok(()) => {
                println!("Configuration is valid");
            }
            Err(e) => {
                eprintln!("Configuration error: {}", e);
                std::process::exit(1);
            }
        },

        Commands::Pingpong {
            end_time,
            delay,
            seed,
        } => {
            if let Some(seed) = seed {
                config.simulation.seed = seed;
            }
            config.validate()?;

            info!(
                version = VERSION,
                seed = config.simulation.seed,
                formalism = %config.simulation.formalism,
                end_time,
                "Starting ping-pong simulation"
            );

            let mut sim = Simulation::new(&config);
            sim.install_ping_pong(delay)?;
            let stats = sim.run(Some(end_time), None)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}

/// Initialize logging with tracing.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();
}
