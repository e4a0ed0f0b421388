//! Cadence CLI - inspect and dry-run recorded input macros
//!
//! Replays go through a logging backend, so a macro's timing and content can
//! be checked without touching real input devices.

mod config;

use anyhow::{Context, Result};
use cadence_recorder::{
    BackendSink, CancelToken, CleanupSink, CompositeSink, EventSequence, LogBackend, ReplayStats,
    Replayer,
};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use crate::config::{CadenceConfig, CONFIG_FILE};

/// Inspect and replay recorded input macros
#[derive(Parser, Debug)]
#[command(name = "cadence")]
#[command(about = "Inspect and replay recorded input macros")]
#[command(version)]
struct Cli {
    /// Configuration file or directory containing cadence.toml
    #[arg(short, long, global = true, default_value = ".")]
    config: PathBuf,

    /// Log every injected action
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show a summary of a saved macro
    Inspect {
        /// Macro file (JSON)
        file: PathBuf,
    },

    /// Replay a saved macro through the logging backend
    Replay {
        /// Macro file (JSON)
        file: PathBuf,

        /// Loop until interrupted with Ctrl-C
        #[arg(long)]
        repeat: bool,

        /// Stop after this many passes
        #[arg(long, conflicts_with = "repeat", value_parser = clap::value_parser!(u32).range(1..))]
        passes: Option<u32>,

        /// Playback speed multiplier (0.1 - 10.0)
        #[arg(long, value_parser = parse_speed)]
        speed: Option<f64>,
    },

    /// Write a default cadence.toml
    Init {
        /// Directory to write into
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = CadenceConfig::load(&cli.config)?;

    let level = if cli.verbose {
        "debug"
    } else {
        config.log.level.as_str()
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    match cli.command {
        Commands::Inspect { file } => inspect(&file, &config),
        Commands::Replay {
            file,
            repeat,
            passes,
            speed,
        } => {
            if repeat {
                config.replay.repeat = true;
                config.replay.passes = None;
            }
            if passes.is_some() {
                config.replay.passes = passes;
            }
            if let Some(speed) = speed {
                config.replay.speed = speed;
            }
            replay(&file, &config)
        }
        Commands::Init { path, force } => init(&path, force),
    }
}

fn parse_speed(value: &str) -> Result<f64, String> {
    let speed: f64 = value
        .parse()
        .map_err(|_| format!("`{value}` is not a number"))?;
    if !speed.is_finite() || speed <= 0.0 {
        return Err(format!("speed must be a positive number, got {value}"));
    }
    Ok(speed)
}

fn load(file: &Path) -> Result<EventSequence> {
    EventSequence::load(file).with_context(|| format!("Failed to load {}", file.display()))
}

fn inspect(file: &Path, config: &CadenceConfig) -> Result<()> {
    let sequence = load(file)?;
    let stats = sequence.stats();
    let ignore = config.record.recorder_config().ignore;
    let hotkeys = sequence
        .iter()
        .filter(|event| event.input().is_some_and(|id| ignore.contains(id)))
        .count();

    println!("{}", file.display());
    println!("  events:        {}", stats.total_events);
    println!("  duration:      {:.3}s", stats.duration.as_secs_f64());
    println!("  pointer moves: {}", stats.pointer_moves);
    println!("  buttons:       {}", stats.button_events);
    println!("  scrolls:       {}", stats.scrolls);
    println!("  keys:          {}", stats.key_events);

    if !stats.unbalanced_presses.is_empty() {
        let names: Vec<_> = stats.unbalanced_presses.iter().map(|id| id.as_str()).collect();
        println!("  never released: {}", names.join(", "));
    }
    if hotkeys > 0 {
        println!("  {hotkeys} event(s) use ignored inputs");
    }

    Ok(())
}

fn replay(file: &Path, config: &CadenceConfig) -> Result<()> {
    let sequence = load(file)?;
    let sink = CleanupSink::new(CompositeSink::new(
        BackendSink::new(LogBackend::new()),
        BackendSink::new(LogBackend::new()),
    ));

    let cancel = CancelToken::new();
    let interrupt = cancel.clone();
    ctrlc::set_handler(move || {
        tracing::info!("interrupted, releasing input");
        interrupt.cancel();
    })
    .context("Failed to install Ctrl-C handler")?;

    let mut replayer = Replayer::new(sequence, sink, config.replay.replay_config());
    replayer
        .start_with_cancel(cancel)
        .context("Failed to start replay")?;

    replayer.wait().context("Replay did not finish cleanly")?;
    report(&replayer.stats());
    Ok(())
}

fn report(stats: &ReplayStats) {
    println!(
        "{} pass(es), {} event(s) executed, {} failed, end drift {:.3}ms",
        stats.passes,
        stats.executed,
        stats.failed,
        stats.last_residual.as_secs_f64() * 1000.0
    );
    if let Some(error) = &stats.last_error {
        println!("last error: {error}");
    }
}

fn init(path: &Path, force: bool) -> Result<()> {
    let target = path.join(CONFIG_FILE);
    if target.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite it.",
            target.display()
        );
    }

    fs::create_dir_all(path)?;
    fs::write(&target, CadenceConfig::default().to_toml()?)
        .with_context(|| format!("Failed to write {}", target.display()))?;

    println!("Wrote {}", target.display());
    Ok(())
}
