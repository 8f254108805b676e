//! JSON input files.
//!
//! Market data:
//!
//! ```json
//! {
//!   "times": ["2024-01-02", "2024-01-03"],
//!   "assets": ["AAPL", "MSFT"],
//!   "fields": {
//!     "open":  [[185.6, 373.9], [184.2, null]],
//!     "close": [[185.4, 370.9], [184.3, 370.6]],
//!     ...
//!   }
//! }
//! ```
//!
//! Weights use the same `times`/`assets` header with a single `values`
//! matrix. `null` stands for a missing value.

use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use ndarray::Array2;
use rustc_hash::FxHashMap;
use serde::Deserialize;

use qnstat::{Field, MarketData, Timestamp, WeightSeries};

type Matrix = Vec<Vec<Option<f64>>>;

#[derive(Debug, Deserialize)]
struct DataFile {
    times: Vec<String>,
    assets: Vec<String>,
    fields: FxHashMap<String, Matrix>,
}

#[derive(Debug, Deserialize)]
struct WeightsFile {
    times: Vec<String>,
    assets: Vec<String>,
    values: Matrix,
}

/// Parse an ISO date, naive datetime or RFC 3339 timestamp into Unix
/// seconds. Naive values are taken as UTC.
pub fn parse_time(s: &str) -> Result<Timestamp> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.timestamp());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.and_utc().timestamp());
        }
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid time label {s:?}"))?;
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .ok_or_else(|| anyhow!("invalid time label {s:?}"))
}

fn parse_times(labels: &[String]) -> Result<Vec<Timestamp>> {
    labels.iter().map(|s| parse_time(s)).collect()
}

fn to_array(name: &str, rows: Matrix, shape: (usize, usize)) -> Result<Array2<f64>> {
    if rows.len() != shape.0 {
        bail!("{name}: expected {} rows, got {}", shape.0, rows.len());
    }
    let mut flat = Vec::with_capacity(shape.0 * shape.1);
    for (i, row) in rows.into_iter().enumerate() {
        if row.len() != shape.1 {
            bail!("{name}: row {i} has {} values, expected {}", row.len(), shape.1);
        }
        flat.extend(row.into_iter().map(|v| v.unwrap_or(f64::NAN)));
    }
    Ok(Array2::from_shape_vec(shape, flat)?)
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))
}

pub fn parse_market_data(text: &str) -> Result<MarketData> {
    let file: DataFile = serde_json::from_str(text)?;
    let times = parse_times(&file.times)?;
    let shape = (times.len(), file.assets.len());

    let mut fields: Vec<(Field, Matrix)> = file
        .fields
        .into_iter()
        .map(|(name, m)| {
            Field::parse(&name)
                .map(|f| (f, m))
                .ok_or_else(|| anyhow!("unknown market data field {name:?}"))
        })
        .collect::<Result<_>>()?;
    fields.sort_by_key(|(f, _)| *f);

    let matrices = fields
        .into_iter()
        .map(|(f, m)| Ok((f, to_array(f.as_str(), m, shape)?)))
        .collect::<Result<Vec<_>>>()?;
    Ok(MarketData::from_fields(times, file.assets, matrices)?)
}

pub fn parse_weights(text: &str) -> Result<WeightSeries> {
    let file: WeightsFile = serde_json::from_str(text)?;
    let times = parse_times(&file.times)?;
    let shape = (times.len(), file.assets.len());
    let values = to_array("weights", file.values, shape)?;
    Ok(WeightSeries::new(times, file.assets, values)?)
}

pub fn load_market_data(path: &Path) -> Result<MarketData> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    parse_market_data(&text).with_context(|| format!("invalid market data in {}", path.display()))
}

pub fn load_weights(path: &Path) -> Result<WeightSeries> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    parse_weights(&text).with_context(|| format!("invalid weights in {}", path.display()))
}

/// Asset-to-sector map, `{"AAPL": "Technology", ...}`.
pub fn load_sectors(path: &Path) -> Result<FxHashMap<String, String>> {
    read_json(path)
}
