//! Capital distribution across sectors.
//!
//! Sector metadata is supplied by the caller as an asset-to-sector map.
//! Assets without a usable sector fall into [`OTHER_SECTOR`]; whatever is
//! not invested is reported as [`CASH_SECTOR`].

use ndarray::{Array2, Axis};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use qnstat::{Timestamp, WeightSeries};

pub const OTHER_SECTOR: &str = "Other";
pub const CASH_SECTOR: &str = "Cash";

/// `(time, sector)` fractions of capital; the last column is cash.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SectorDistribution {
    pub times: Vec<Timestamp>,
    pub sectors: Vec<String>,
    pub values: Array2<f64>,
}

impl SectorDistribution {
    /// The fraction held in `sector` over time.
    pub fn sector(&self, sector: &str) -> Option<ndarray::ArrayView1<'_, f64>> {
        let col = self.sectors.iter().position(|s| s == sector)?;
        Some(self.values.column(col))
    }
}

fn sector_of<'a>(asset: &str, sectors: &'a FxHashMap<String, String>) -> &'a str {
    match sectors.get(asset).map(|s| s.trim()) {
        Some(s) if !s.is_empty() && s != "n/a" => s,
        _ => OTHER_SECTOR,
    }
}

/// Split the gross book across sectors.
///
/// Weights are taken in absolute value (NaN as 0) and scaled down on days
/// whose gross weight exceeds 1. With `timeseries`, the result is laid on
/// that time axis; days missing from the weights hold nothing.
pub fn calc_sector_distribution(
    weights: &WeightSeries,
    sectors: &FxHashMap<String, String>,
    timeseries: Option<&[Timestamp]>,
) -> SectorDistribution {
    let mut ph = weights
        .values()
        .mapv(|w| if w.is_nan() { 0.0 } else { w.abs() });
    for mut row in ph.axis_iter_mut(Axis(0)) {
        let s = row.sum().max(1.0);
        row.mapv_inplace(|w| w / s);
    }

    let (times, ph) = match timeseries {
        None => (weights.times().to_vec(), ph),
        Some(ts) => {
            let rows: FxHashMap<Timestamp, usize> = weights
                .times()
                .iter()
                .enumerate()
                .map(|(i, &t)| (t, i))
                .collect();
            let mut out = Array2::zeros((ts.len(), ph.ncols()));
            for (i, t) in ts.iter().enumerate() {
                if let Some(&r) = rows.get(t) {
                    out.row_mut(i).assign(&ph.row(r));
                }
            }
            (ts.to_vec(), out)
        }
    };

    let asset_sectors: Vec<&str> = weights
        .assets()
        .iter()
        .map(|a| sector_of(a, sectors))
        .collect();
    let mut names: Vec<&str> = asset_sectors.clone();
    names.sort_unstable();
    names.dedup();
    let column: FxHashMap<&str, usize> = names.iter().enumerate().map(|(i, &s)| (s, i)).collect();

    let cash = names.len();
    let mut values = Array2::zeros((times.len(), cash + 1));
    for (t, row) in ph.axis_iter(Axis(0)).enumerate() {
        let mut invested = 0.0;
        for (a, &w) in row.iter().enumerate() {
            values[[t, column[asset_sectors[a]]]] += w;
            invested += w;
        }
        values[[t, cash]] = 1.0 - invested;
    }

    let mut sectors: Vec<String> = names.into_iter().map(str::to_string).collect();
    sectors.push(CASH_SECTOR.to_string());
    SectorDistribution {
        times,
        sectors,
        values,
    }
}
