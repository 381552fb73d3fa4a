//! SS-BGP simulator binary
//!
//! Loads a scenario file, runs it once and logs the final state of every
//! node.

use clap::Parser;
use ssbgp::{Config, ProtocolKind, Simulator};
use std::path::PathBuf;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

/// Path-vector routing simulator with Sender-Side loop suppression
#[derive(Parser, Debug)]
#[command(name = "ssbgp", version, about)]
struct Args {
    /// Path to the scenario file
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Protocol variant, overriding the scenario (bgp, ssbgp, issbgp)
    #[arg(short, long)]
    protocol: Option<ProtocolKind>,

    /// Delay generator seed, overriding the scenario
    #[arg(short, long)]
    seed: Option<u64>,
}

fn main() {
    // Initialize logging
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let args = Args::parse();

    let mut config = match Config::load_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration from {}: {}", args.config.display(), e);
            std::process::exit(1);
        }
    };
    info!(path = %args.config.display(), "Loaded scenario");

    if let Some(kind) = args.protocol {
        config.protocol.kind = kind;
    }
    if let Some(seed) = args.seed {
        config.simulation.seed = seed;
    }

    let mut simulator = match Simulator::from_config(&config) {
        Ok(simulator) => simulator,
        Err(e) => {
            error!("Failed to build simulation: {}", e);
            std::process::exit(1);
        }
    };

    let report = match simulator.run() {
        Ok(report) => report,
        Err(e) => {
            error!("Simulation failed: {}", e);
            std::process::exit(1);
        }
    };

    for (node, state) in &report.nodes {
        let neighbor = state
            .selected_neighbor
            .map_or_else(|| "-".to_string(), |n| n.to_string());
        info!(
            node = %node,
            neighbor = %neighbor,
            route = %state.selected_route,
            disabled = ?state.disabled,
            "Final state"
        );
    }

    if !report.converged {
        warn!(messages = report.messages, "Simulation did not converge");
    }
}
