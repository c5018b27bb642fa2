//! CLI binary for atlantis.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use atlantis::AtlantisConfig;
use atlantis::atlantis_events::extract::{extract_candidate, repair};
use atlantis::atlantis_events::{TimeWindow, extract_pins};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Atlantis: salvage event pins from generated text.
#[derive(Parser)]
#[command(name = "atlantis", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Extract and validate pins from raw provider output.
    Extract {
        /// File with raw provider text (stdin if omitted).
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// First day of the window (YYYY-MM-DD).
        #[arg(long, requires = "end")]
        start: Option<String>,

        /// Last day of the window (YYYY-MM-DD).
        #[arg(long, requires = "start")]
        end: Option<String>,
    },

    /// Print the repaired JSON candidate without validating it.
    Repair {
        /// File with raw provider text (stdin if omitted).
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Print the effective configuration as TOML, or write it to a file.
    Config {
        /// Write to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries command output.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("atlantis=info,atlantis_events=info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => AtlantisConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => AtlantisConfig::default(),
    };
    config.validate()?;

    match cli.command {
        Command::Extract { input, start, end } => {
            let window = match (start, end) {
                (Some(start), Some(end)) => Some(TimeWindow::parse(&start, &end)?),
                _ => None,
            };
            let raw = read_input(input.as_deref())?;
            let extraction = extract_pins(&raw, window.as_ref());
            info!(
                accepted = extraction.report.accepted,
                rejected = extraction.report.rejected.total(),
                "extraction finished"
            );
            println!("{}", serde_json::to_string_pretty(&extraction)?);
        }
        Command::Repair { input } => {
            let raw = read_input(input.as_deref())?;
            println!("{}", repair(extract_candidate(&raw)));
        }
        Command::Config { output } => match output {
            Some(path) => {
                config.save_to_file(&path)?;
                info!(path = %path.display(), "configuration written");
            }
            None => print!("{}", config.to_toml()?),
        },
    }
    Ok(())
}

fn read_input(path: Option<&Path>) -> anyhow::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display())),
        None => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("reading stdin")?;
            Ok(raw)
        }
    }
}
