#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line host that runs a headless town walking simulation.

mod scenario;
mod town;

use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{scenario::Scenario, town::Town};

/// Runs wandering townsfolk and a scripted guide over a tile map.
#[derive(Debug, Parser)]
#[command(name = "townwalk", version, about)]
struct Args {
    /// TOML scenario describing the map and its movers; a built-in town is used when omitted.
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Number of fixed-size ticks to simulate.
    #[arg(long, default_value_t = 600)]
    ticks: u64,

    /// Seconds advanced per tick.
    #[arg(long, default_value_t = 1.0 / 30.0)]
    dt: f32,

    /// Seed for the wanderers' random streams.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_filter: String,
}

/// Entry point for the townwalk command-line interface.
fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_filter)?;
    ensure!(
        args.dt.is_finite() && args.dt > 0.0,
        "tick length must be positive, got {}",
        args.dt
    );

    let scenario = match &args.scenario {
        Some(path) => Scenario::load(path)?,
        None => Scenario::builtin().context("built-in scenario is invalid")?,
    };
    let mut town = Town::build(&scenario, args.seed).context("failed to populate town")?;

    for _ in 0..args.ticks {
        town.tick(args.dt);
    }
    info!(
        ticks = town.ticks(),
        claimed = town.map().claimed_cells().count(),
        "simulation finished"
    );

    println!(
        "townwalk summary after {} ticks ({:.2}s simulated)",
        town.ticks(),
        town.ticks() as f64 * f64::from(args.dt)
    );
    for report in town.reports() {
        println!("{report}");
    }

    Ok(())
}

fn init_tracing(fallback: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(fallback)
            .with_context(|| format!("invalid log filter `{fallback}`"))?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
    Ok(())
}
