//! The statistics array: eleven derived series over the simulated returns.
//!
//! [`calc_stat`] runs the whole pipeline (checks, simulation, alignment,
//! metrics) and stacks the results into a [`Statistics`] value of shape
//! `(time, field, column)`. The building blocks are public so callers can
//! compute a single metric on their own series.

pub mod holding;
pub mod metrics;

use std::fmt;

use ndarray::{Array2, Array3, ArrayView1, ArrayView2, Axis};

use crate::arrange::{AuxSeries, arrange_data};
use crate::checks::{calc_non_liquid, find_missed_dates};
use crate::data::{Field, MarketData, Timestamp, WeightSeries, label_index};
use crate::error::Result;
use crate::periods::{DEFAULT_POINTS_PER_YEAR, calc_avg_points_per_year};
use crate::simulate::{CostConfig, calc_relative_return};

pub use holding::{HoldingEntry, HoldingLog, HoldingTracker, calc_avg_holding_time, holding_log};
pub use metrics::{
    calc_avg_turnover, calc_bias, calc_equity, calc_instruments, calc_max_drawdown,
    calc_mean_return, calc_mean_return_annualized, calc_sharpe_ratio_annualized,
    calc_underwater, calc_volatility, calc_volatility_annualized,
};

/// Clamp a rolling window to a series of `len` points.
pub(crate) fn window(len: usize, max_periods: usize, min_periods: usize) -> (usize, usize) {
    let max_periods = max_periods.min(len);
    (max_periods, min_periods.min(max_periods))
}

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// A named series of the statistics array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StatField {
    Equity,
    RelativeReturn,
    Volatility,
    Underwater,
    MaxDrawdown,
    SharpeRatio,
    MeanReturn,
    Bias,
    Instruments,
    AvgTurnover,
    AvgHoldingTime,
}

impl StatField {
    /// All fields in array order.
    pub const ALL: [StatField; 11] = [
        StatField::Equity,
        StatField::RelativeReturn,
        StatField::Volatility,
        StatField::Underwater,
        StatField::MaxDrawdown,
        StatField::SharpeRatio,
        StatField::MeanReturn,
        StatField::Bias,
        StatField::Instruments,
        StatField::AvgTurnover,
        StatField::AvgHoldingTime,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StatField::Equity => "equity",
            StatField::RelativeReturn => "relative_return",
            StatField::Volatility => "volatility",
            StatField::Underwater => "underwater",
            StatField::MaxDrawdown => "max_drawdown",
            StatField::SharpeRatio => "sharpe_ratio",
            StatField::MeanReturn => "mean_return",
            StatField::Bias => "bias",
            StatField::Instruments => "instruments",
            StatField::AvgTurnover => "avg_turnover",
            StatField::AvgHoldingTime => "avg_holding_time",
        }
    }

    pub fn parse(s: &str) -> Option<StatField> {
        StatField::ALL.into_iter().find(|f| f.as_str() == s)
    }

    /// Position along the field axis.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for StatField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Window and mode parameters of [`calc_stat`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StatsConfig {
    pub min_periods: usize,
    /// Rolling window length; `None` means three years of daily points or
    /// seven years of any other frequency.
    pub max_periods: Option<usize>,
    pub per_asset: bool,
    /// Sampling frequency; inferred from the data when `None`.
    pub points_per_year: Option<usize>,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            min_periods: 1,
            max_periods: None,
            per_asset: false,
            points_per_year: None,
        }
    }
}

impl StatsConfig {
    pub fn max_periods_for(&self, points_per_year: usize) -> usize {
        self.max_periods.unwrap_or(if points_per_year == DEFAULT_POINTS_PER_YEAR {
            points_per_year * 3
        } else {
            points_per_year * 7
        })
    }
}

// ---------------------------------------------------------------------------
// Statistics array
// ---------------------------------------------------------------------------

/// Stacked statistics, `(time, field, column)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Statistics {
    times: Vec<Timestamp>,
    assets: Option<Vec<String>>,
    values: Array3<f64>,
}

impl Statistics {
    pub(crate) fn from_parts(
        times: Vec<Timestamp>,
        assets: Option<Vec<String>>,
        values: Array3<f64>,
    ) -> Self {
        debug_assert_eq!(values.dim().0, times.len());
        debug_assert_eq!(values.dim().1, StatField::ALL.len());
        Self {
            times,
            assets,
            values,
        }
    }

    pub fn times(&self) -> &[Timestamp] {
        &self.times
    }

    /// Column labels in per-asset mode.
    pub fn assets(&self) -> Option<&[String]> {
        self.assets.as_deref()
    }

    pub fn is_per_asset(&self) -> bool {
        self.assets.is_some()
    }

    pub fn values(&self) -> &Array3<f64> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// One field as a `(time, column)` view.
    pub fn field(&self, field: StatField) -> ArrayView2<'_, f64> {
        self.values.index_axis(Axis(1), field.index())
    }

    /// One field of the portfolio column (aggregate mode) or of the first
    /// asset (per-asset mode).
    pub fn series(&self, field: StatField) -> Option<ArrayView1<'_, f64>> {
        (self.values.dim().2 > 0).then(|| self.field(field).index_axis_move(Axis(1), 0))
    }

    /// The last row of one field, one value per column.
    pub fn last(&self, field: StatField) -> Option<ArrayView1<'_, f64>> {
        let n = self.times.len();
        (n > 0).then(|| self.field(field).index_axis_move(Axis(0), n - 1))
    }

    /// Value of `field` for `asset` at the last point (per-asset mode).
    pub fn last_for(&self, field: StatField, asset: &str) -> Option<f64> {
        let col = self.assets.as_ref()?.iter().position(|a| a == asset)?;
        self.last(field).map(|row| row[col])
    }
}

#[cfg(feature = "persistence")]
mod persistence {
    use std::fs::File;
    use std::io::{BufReader, BufWriter};
    use std::path::Path;

    use ndarray::Array3;
    use serde::{Deserialize, Serialize};

    use super::{StatField, Statistics};
    use crate::data::Timestamp;
    use crate::error::{Error, Result};

    /// On-disk layout: NaN is not representable in JSON, so values are
    /// stored as nullable numbers in row-major order.
    #[derive(Serialize, Deserialize)]
    struct StatisticsFile {
        times: Vec<Timestamp>,
        fields: Vec<StatField>,
        assets: Option<Vec<String>>,
        shape: [usize; 3],
        values: Vec<Option<f64>>,
    }

    impl Statistics {
        /// Write the array as JSON.
        pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
            let (t, f, c) = self.values.dim();
            let file = StatisticsFile {
                times: self.times.clone(),
                fields: StatField::ALL.to_vec(),
                assets: self.assets.clone(),
                shape: [t, f, c],
                values: self
                    .values
                    .iter()
                    .map(|&v| if v.is_nan() { None } else { Some(v) })
                    .collect(),
            };
            let out = File::create(path).map_err(|e| Error::Io(e.to_string()))?;
            serde_json::to_writer(BufWriter::new(out), &file).map_err(|e| Error::Json(e.to_string()))
        }

        /// Read an array written by [`save_json`](Self::save_json).
        pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
            let input = File::open(path).map_err(|e| Error::Io(e.to_string()))?;
            let file: StatisticsFile = serde_json::from_reader(BufReader::new(input))
                .map_err(|e| Error::Json(e.to_string()))?;
            if file.fields != StatField::ALL {
                return Err(Error::Json("unexpected statistics fields".into()));
            }
            let [t, f, c] = file.shape;
            let values = file
                .values
                .into_iter()
                .map(|v| v.unwrap_or(f64::NAN))
                .collect();
            let values = Array3::from_shape_vec((t, f, c), values).map_err(|_| {
                Error::ShapeMismatch {
                    what: "statistics",
                    expected: vec![t, f, c],
                    actual: vec![],
                }
            })?;
            if file.times.len() != t {
                return Err(Error::ShapeMismatch {
                    what: "statistics times",
                    expected: vec![t],
                    actual: vec![file.times.len()],
                });
            }
            Ok(Statistics {
                times: file.times,
                assets: file.assets,
                values,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Map `(row, column)` values from `src_times` onto `dst_times`, NaN where a
/// time is missing.
fn reindex(src: &Array2<f64>, src_times: &[Timestamp], dst_times: &[Timestamp]) -> Array2<f64> {
    let rows = label_index(src_times);
    let mut out = Array2::from_elem((dst_times.len(), src.ncols()), f64::NAN);
    for (t, time) in dst_times.iter().enumerate() {
        if let Some(&r) = rows.get(time) {
            out.row_mut(t).assign(&src.row(r));
        }
    }
    out
}

/// Simulate `weights` against `data` and compute every statistic.
pub fn calc_stat(
    data: &MarketData,
    weights: &WeightSeries,
    costs: &CostConfig,
    config: &StatsConfig,
) -> Result<Statistics> {
    let ppy = config
        .points_per_year
        .unwrap_or_else(|| calc_avg_points_per_year(data.times()));
    let max_periods = Some(config.max_periods_for(ppy));
    let min_periods = config.min_periods;
    let per_asset = config.per_asset;

    if let Some(non_liquid) = calc_non_liquid(data, weights) {
        log::warn!(
            "strategy trades non-liquid assets: {} on {} dates",
            non_liquid.assets.join(", "),
            non_liquid.times.len()
        );
    }
    let missed = find_missed_dates(weights, data);
    if !missed.is_empty() {
        log::warn!("{} dates are missed in the portfolio history", missed.len());
    }

    let rr = calc_relative_return(data, weights, costs, per_asset, Some(ppy))?;
    let rr_view = rr.values.view();
    let equity = calc_equity(rr_view);
    let volatility = calc_volatility_annualized(rr_view, max_periods, min_periods, ppy);
    let underwater = calc_underwater(equity.view());
    let max_drawdown = calc_max_drawdown(underwater.view());
    let sharpe = calc_sharpe_ratio_annualized(rr_view, max_periods, min_periods, ppy);
    let mean_return = calc_mean_return_annualized(rr_view, max_periods, min_periods, ppy);

    // Weight-based metrics use the unshifted history on the equity grid.
    let arranged = arrange_data(
        data,
        weights,
        Some(AuxSeries {
            times: &rr.times,
            assets: rr.assets.as_deref(),
            values: equity.view(),
        }),
        per_asset,
    );
    let grid_times = arranged.data.times();
    let grid_equity = arranged
        .aux
        .unwrap_or_else(|| Array2::from_elem((grid_times.len(), equity.ncols()), f64::NAN));
    let w = arranged.weights.view();
    let open = arranged.data.require(Field::Open)?;

    let bias = calc_bias(w, per_asset);
    let instruments = calc_instruments(w, per_asset);
    let turnover = calc_avg_turnover(
        w,
        grid_equity.view(),
        open,
        max_periods,
        min_periods,
        per_asset,
        ppy,
    );
    let holding = calc_avg_holding_time(w, max_periods, min_periods, per_asset, ppy);

    let n_cols = rr.values.ncols();
    let on_rr_grid = |m: &Array2<f64>| reindex(m, grid_times, &rr.times);
    let columns: [Array2<f64>; 11] = [
        equity,
        rr.values,
        volatility,
        underwater,
        max_drawdown,
        sharpe,
        mean_return,
        on_rr_grid(&bias),
        on_rr_grid(&instruments),
        on_rr_grid(&turnover),
        on_rr_grid(&holding),
    ];

    let mut values = Array3::from_elem((rr.times.len(), StatField::ALL.len(), n_cols), f64::NAN);
    for (field, series) in StatField::ALL.iter().zip(&columns) {
        if series.ncols() == n_cols {
            values.index_axis_mut(Axis(1), field.index()).assign(series);
        }
    }

    log::debug!(
        "computed statistics over {} points ({} column{})",
        rr.times.len(),
        n_cols,
        if n_cols == 1 { "" } else { "s" }
    );
    Ok(Statistics::from_parts(rr.times, rr.assets, values))
}
