#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays Glyph Rain sessions headlessly.

mod scenario;
mod simulation;

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use glyph_rain_core::{Difficulty, Speed};

use crate::scenario::Scenario;

/// Simulates rounds with a scripted player and prints a JSON report.
#[derive(Debug, Parser)]
#[command(name = "glyph-rain", version)]
struct Args {
    /// Scenario file in TOML format.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of rounds to play.
    #[arg(long)]
    rounds: Option<u32>,
    /// Seed for every random source.
    #[arg(long)]
    seed: Option<u64>,
    /// Difficulty tier.
    #[arg(long, value_enum)]
    difficulty: Option<DifficultyArg>,
    /// Fall speed.
    #[arg(long, value_enum)]
    speed: Option<SpeedArg>,
    /// Share of spawns drawn from the whole alphabet (0.0 to 0.5).
    #[arg(long)]
    noise: Option<f32>,
    /// Write the report to this file instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Pretty-print the JSON report.
    #[arg(long)]
    pretty: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DifficultyArg {
    Easy,
    Standard,
    Hard,
}

impl From<DifficultyArg> for Difficulty {
    fn from(value: DifficultyArg) -> Self {
        match value {
            DifficultyArg::Easy => Self::Easy,
            DifficultyArg::Standard => Self::Standard,
            DifficultyArg::Hard => Self::Hard,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SpeedArg {
    Slow,
    Normal,
    Fast,
}

impl From<SpeedArg> for Speed {
    fn from(value: SpeedArg) -> Self {
        match value {
            SpeedArg::Slow => Self::Slow,
            SpeedArg::Normal => Self::Normal,
            SpeedArg::Fast => Self::Fast,
        }
    }
}

impl Args {
    /// Command-line flags take precedence over the scenario file.
    fn overlay(&self, scenario: &mut Scenario) {
        if let Some(rounds) = self.rounds {
            scenario.rounds = rounds;
        }
        if let Some(seed) = self.seed {
            scenario.seed = seed;
        }
        if let Some(difficulty) = self.difficulty {
            scenario.difficulty = difficulty.into();
        }
        if let Some(speed) = self.speed {
            scenario.speed = speed.into();
        }
        if let Some(noise) = self.noise {
            scenario.noise_level = noise;
        }
    }
}

/// Entry point for the Glyph Rain command-line interface.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut scenario = match &args.config {
        Some(path) => Scenario::load(path)?,
        None => Scenario::default(),
    };
    args.overlay(&mut scenario);

    let report = simulation::run(&scenario).context("simulation failed")?;
    let json = if args.pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    }
    .context("failed to serialise simulation report")?;

    match &args.output {
        Some(path) => fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}
