//! # qnstat-cli
//!
//! File-based front end for the qnstat crates. Each `run_*` function loads
//! its inputs, runs one report and returns the rendered text; the `qnstat`
//! binary only parses arguments and prints.

pub mod config;
pub mod input;
pub mod report;

use std::path::Path;

use anyhow::{Context, Result};

use qnstat::calc_stat;
use qnstat_correlation::{CorrelationConfig, HttpRegistry, check_correlation};
use qnstat_risk::{calc_sector_distribution, check_exposure};

pub use config::Config;

/// Compute statistics; with `output`, also write the full array as JSON.
pub fn run_stats(
    data: &Path,
    weights: &Path,
    config: &Config,
    per_asset: bool,
    output: Option<&Path>,
) -> Result<String> {
    let data = input::load_market_data(data)?;
    let weights = input::load_weights(weights)?;
    let mut stats_config = config.stats;
    stats_config.per_asset |= per_asset;

    let stats = calc_stat(&data, &weights, &config.costs, &stats_config)?;
    log::info!("computed statistics over {} points", stats.len());
    if let Some(path) = output {
        stats
            .save_json(path)
            .with_context(|| format!("cannot write {}", path.display()))?;
        log::info!("statistics written to {}", path.display());
    }
    Ok(report::render_stats(&stats))
}

/// Check position concentration. The boolean is the verdict.
pub fn run_exposure(weights: &Path, config: &Config) -> Result<(bool, String)> {
    let weights = input::load_weights(weights)?;
    let report = check_exposure(&weights, &config.exposure);
    Ok((report.passed, report::render_exposure(&report)))
}

pub fn run_sectors(weights: &Path, sectors: &Path) -> Result<String> {
    let weights = input::load_weights(weights)?;
    let sectors = input::load_sectors(sectors)?;
    let dist = calc_sector_distribution(&weights, &sectors, None);
    Ok(report::render_sectors(&dist))
}

pub fn run_correlation(data: &Path, weights: &Path, config: &Config) -> Result<String> {
    let data = input::load_market_data(data)?;
    let weights = input::load_weights(weights)?;
    let registry = HttpRegistry::new(config.correlation(CorrelationConfig::from_env())?)
        .context("cannot build registry client")?;
    let report = check_correlation(&registry, &data, &weights, &config.costs)?;
    Ok(report.to_string())
}
