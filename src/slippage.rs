//! Slippage estimation from a True-Range volatility proxy.
//!
//! The cost of trading one share on day `t` is a fraction of the average
//! true range over the trailing `period_days` trading days:
//!
//! ```text
//! TR[t] = max(high - low, |high - close[t-1d]|, |close[t-1d] - low|)
//! slippage[t] = fract * mean(TR[t-window+1 ..= t])
//! ```
//!
//! For intraday data, high/low are aggregated over one trading day and the
//! close is looked up one full day back.

use ndarray::{Array2, ArrayView2, Axis};

use crate::data::{Field, MarketData};
use crate::error::Result;
use crate::periods::{calc_avg_points_per_year, calc_points_per_day};
use crate::rolling::{ffill, rolling_max_strict, rolling_mean_strict, rolling_min_strict, shift};

/// Parameters of the slippage estimate.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SlippageConfig {
    /// ATR lookback in trading days.
    pub period_days: usize,
    /// Fraction of the ATR charged per traded share.
    pub fract: f64,
}

impl Default for SlippageConfig {
    fn default() -> Self {
        Self {
            period_days: 14,
            fract: 0.05,
        }
    }
}

/// Per-share slippage for every `(time, asset)` of `data`.
///
/// NaN where not enough trailing history exists; gaps after the first
/// full window are forward-filled.
pub fn calc_slippage(
    data: &MarketData,
    config: &SlippageConfig,
    points_per_year: Option<usize>,
) -> Result<Array2<f64>> {
    let atr = calc_atr(data, config.period_days, points_per_year)?;
    Ok(atr * config.fract)
}

/// The unscaled rolling true range used by [`calc_slippage`].
pub fn calc_atr(
    data: &MarketData,
    period_days: usize,
    points_per_year: Option<usize>,
) -> Result<Array2<f64>> {
    let close = data.require(Field::Close)?;
    let high = data.require(Field::High)?;
    let low = data.require(Field::Low)?;

    let ppy = points_per_year.unwrap_or_else(|| calc_avg_points_per_year(data.times()));
    let points_per_day = calc_points_per_day(ppy);
    let n = data.n_times();
    let daily_period = points_per_day.min(n);
    let atr_period = (period_days * points_per_day).min(n);

    let mut out = Array2::<f64>::from_elem((n, data.n_assets()), f64::NAN);
    for (a, mut dst) in out.axis_iter_mut(Axis(1)).enumerate() {
        let tr = true_range(column(close, a), column(high, a), column(low, a), daily_period);
        let mut atr = rolling_mean_strict(&tr, atr_period);
        ffill(&mut atr);
        for (d, v) in dst.iter_mut().zip(atr) {
            *d = v;
        }
    }
    Ok(out)
}

fn column(m: ArrayView2<'_, f64>, a: usize) -> Vec<f64> {
    m.column(a).to_vec()
}

fn true_range(close: Vec<f64>, high: Vec<f64>, low: Vec<f64>, daily_period: usize) -> Vec<f64> {
    let cl = shift(&close, daily_period);
    let hi = rolling_max_strict(&high, daily_period);
    let lo = rolling_min_strict(&low, daily_period);
    cl.iter()
        .zip(&hi)
        .zip(&lo)
        .map(|((&c, &h), &l)| {
            if c.is_nan() || h.is_nan() || l.is_nan() {
                f64::NAN
            } else {
                (h - l).max((h - c).abs()).max((c - l).abs())
            }
        })
        .collect()
}
