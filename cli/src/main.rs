//! `qnstat` command-line entry point.
//!
//! Subcommands:
//!   - `stats`       statistics of a weight history against market data
//!   - `exposure`    position concentration check
//!   - `sectors`     capital split across sectors
//!   - `correlation` correlation with submitted strategies

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use qnstat_cli::{Config, run_correlation, run_exposure, run_sectors, run_stats};

#[derive(Parser)]
#[command(name = "qnstat", version, about = "Backtest statistics for target-weight strategies")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Simulate a weight history and print the latest statistics
    Stats {
        /// Market data JSON
        #[arg(long)]
        data: PathBuf,
        /// Weights JSON
        #[arg(long)]
        weights: PathBuf,
        /// TOML config
        #[arg(long)]
        config: Option<PathBuf>,
        /// One statistics column per asset
        #[arg(long)]
        per_asset: bool,
        /// Write the full statistics array to this JSON file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Check position concentration; exits non-zero on failure
    Exposure {
        #[arg(long)]
        weights: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the sector distribution at the last point
    Sectors {
        #[arg(long)]
        weights: PathBuf,
        /// Asset-to-sector JSON map
        #[arg(long)]
        sectors: PathBuf,
    },
    /// Check correlation with strategies in the registry
    Correlation {
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        weights: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Command::Stats {
            data,
            weights,
            config,
            per_asset,
            output,
        } => {
            let config = Config::load_or_default(config.as_deref())?;
            print!(
                "{}",
                run_stats(&data, &weights, &config, per_asset, output.as_deref())?
            );
        }
        Command::Exposure { weights, config } => {
            let config = Config::load_or_default(config.as_deref())?;
            let (passed, text) = run_exposure(&weights, &config)?;
            print!("{text}");
            if !passed {
                return Ok(ExitCode::from(2));
            }
        }
        Command::Sectors { weights, sectors } => {
            print!("{}", run_sectors(&weights, &sectors)?);
        }
        Command::Correlation {
            data,
            weights,
            config,
        } => {
            let config = Config::load_or_default(config.as_deref())?;
            print!("{}", run_correlation(&data, &weights, &config)?);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
