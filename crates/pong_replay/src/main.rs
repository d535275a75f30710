//! Pong Replay CLI
//!
//! Recorded detection log → full tracking pipeline → session summary JSON

#[cfg(feature = "cli")]
use anyhow::{Context, Result};
#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "pong_replay")]
#[command(about = "Replay recorded detections through the throw tracking pipeline", long_about = None)]
struct Cli {
    /// Enable debug-level logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded detection log
    Replay {
        /// Recorded detection log (JSON)
        #[arg(long)]
        log: PathBuf,

        /// Game config (.json / .yaml); falls back to PONG_CONFIG, then defaults
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write the report here instead of stdout
        #[arg(long)]
        summary_out: Option<PathBuf>,
    },

    /// Load and validate a game config
    ValidateConfig {
        /// Game config (.json / .yaml)
        #[arg(long)]
        config: PathBuf,
    },
}

#[cfg(feature = "cli")]
fn main() -> Result<()> {
    use pong_core::{GameConfig, GameEvent};
    use pong_replay::{replay, save_report, ReplayLog};
    use tracing_subscriber::EnvFilter;

    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Commands::Replay { log, config, summary_out } => {
            let config = match config {
                Some(path) => GameConfig::from_path(&path)
                    .with_context(|| format!("Failed to load config: {}", path.display()))?,
                None => GameConfig::from_env_or_default(),
            };
            let recorded = ReplayLog::from_path(&log)?;
            eprintln!("Replaying {} frames from {}", recorded.frames.len(), log.display());

            let report = replay(&recorded, config, |event| match event {
                GameEvent::StageEntered(change) => {
                    eprintln!("  stage: {} -> {}", change.previous, change.new);
                }
                GameEvent::ThrowCompleted { metrics, summary } => {
                    eprintln!(
                        "  throw {}: {} for {} points at {} (total {}/{})",
                        summary.throw_count,
                        metrics.throw_type,
                        metrics.score.points(),
                        metrics.speed,
                        summary.total_score,
                        summary.max_score,
                    );
                }
            })?;

            match summary_out {
                Some(path) => {
                    save_report(&path, &report)?;
                    eprintln!("Report saved to: {}", path.display());
                }
                None => println!("{}", serde_json::to_string_pretty(&report)?),
            }
        }

        Commands::ValidateConfig { config } => {
            let loaded = GameConfig::from_path(&config)
                .with_context(|| format!("Invalid config: {}", config.display()))?;
            eprintln!("Config is valid: {}", config.display());
            println!("{}", serde_json::to_string_pretty(&loaded)?);
        }
    }

    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("pong_replay CLI is not available. Enable the 'cli' feature to use it.");
    std::process::exit(1);
}
