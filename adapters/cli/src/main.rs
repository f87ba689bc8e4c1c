#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that lets a player explore Delve levels turn by turn.

mod input;
mod level_transfer;
mod render;
mod session;

use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::Parser;
use delve_core::Measurement;
use delve_system_bootstrap::{Bootstrap, SessionConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{input::Input, level_transfer::LevelSnapshot, session::Session};

/// Explore procedurally generated levels from the terminal.
#[derive(Debug, Parser)]
#[command(name = "delve", version, about)]
struct Args {
    /// Seed for the first level; random when neither this nor the config sets one.
    #[arg(long)]
    seed: Option<u64>,
    /// TOML session configuration.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Level width in cells.
    #[arg(long)]
    width: Option<u32>,
    /// Level height in cells.
    #[arg(long)]
    height: Option<u32>,
    /// Sight radius in cells.
    #[arg(long)]
    radius: Option<u32>,
    /// Allow diagonal steps.
    #[arg(long)]
    eight_way: bool,
    /// Level string produced by the `export` command.
    #[arg(long, value_name = "LEVEL")]
    import: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let config = session_config(&args)?;
    let seed = args.seed.unwrap_or_else(|| config.seed_or(rand::random()));
    let bootstrap = Bootstrap;

    let mut events = Vec::new();
    let coordinator = match &args.import {
        Some(encoded) => {
            let level = LevelSnapshot::decode(encoded)
                .and_then(LevelSnapshot::into_level)
                .context("failed to import level")?;
            bootstrap.launch_with_level(&config, level, seed, &mut events)
        }
        None => bootstrap.launch(&config, seed, &mut events),
    }
    .context("failed to start session")?;
    info!(seed, events = events.len(), "session started");

    let mut session = Session::new(coordinator);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "{}", bootstrap.welcome_banner())?;
    writeln!(out, "{}", session.frame())?;

    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read input")?;
        match input::parse(&line) {
            Ok(Input::Quit) => break,
            Ok(input) => writeln!(out, "{}", session.execute(input))?,
            Err(error) => writeln!(out, "{error}")?,
        }
        out.flush()?;
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .init();
}

fn session_config(args: &Args) -> Result<SessionConfig> {
    let mut config = match &args.config {
        Some(path) => SessionConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => SessionConfig::default(),
    };

    if let Some(width) = args.width {
        config.generator.width = width;
    }
    if let Some(height) = args.height {
        config.generator.height = height;
    }
    if let Some(radius) = args.radius {
        config.coordinator.sight.radius = radius;
    }
    if args.eight_way {
        config.coordinator.measurement = Measurement::Chebyshev;
    }

    config.validate().context("invalid session settings")?;
    Ok(config)
}
