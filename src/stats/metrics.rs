//! Rolling performance metrics over `(time, column)` series.
//!
//! A column is either the single portfolio series (aggregate mode) or one
//! asset (per-asset mode). Windows are right-aligned; `max_periods`
//! defaults to one year of points and is capped at the series length.

use ndarray::{Array2, ArrayView2, Axis, Zip};

use super::window;
use crate::rolling::{expanding_max, expanding_min, map_columns, rolling_mean, rolling_std};

/// Cumulative product of `1 + relative_return`.
pub fn calc_equity(relative_return: ArrayView2<'_, f64>) -> Array2<f64> {
    let mut equity = relative_return.to_owned();
    if let Some(mut first) = equity.axis_iter_mut(Axis(0)).next() {
        first.mapv_inplace(|r| 1.0 + r);
    }
    equity.accumulate_axis_inplace(Axis(0), |&prev, cur| *cur = prev * (1.0 + *cur));
    equity
}

/// Rolling population standard deviation of the returns, per point.
pub fn calc_volatility(
    relative_return: ArrayView2<'_, f64>,
    max_periods: Option<usize>,
    min_periods: usize,
    points_per_year: usize,
) -> Array2<f64> {
    let (w, m) = window(
        relative_return.nrows(),
        max_periods.unwrap_or(points_per_year),
        min_periods,
    );
    map_columns(relative_return, |x| rolling_std(x, w, m))
}

/// [`calc_volatility`] scaled by `sqrt(points_per_year)`.
pub fn calc_volatility_annualized(
    relative_return: ArrayView2<'_, f64>,
    max_periods: Option<usize>,
    min_periods: usize,
    points_per_year: usize,
) -> Array2<f64> {
    let scale = (points_per_year as f64).sqrt();
    calc_volatility(relative_return, max_periods, min_periods, points_per_year) * scale
}

/// Fraction below the running equity peak: `equity / peak - 1`.
pub fn calc_underwater(equity: ArrayView2<'_, f64>) -> Array2<f64> {
    map_columns(equity, |e| {
        e.iter()
            .zip(expanding_max(e))
            .map(|(&e, peak)| e / peak - 1.0)
            .collect()
    })
}

/// Running minimum of the underwater series.
pub fn calc_max_drawdown(underwater: ArrayView2<'_, f64>) -> Array2<f64> {
    map_columns(underwater, expanding_min)
}

/// Rolling geometric mean return per point.
pub fn calc_mean_return(
    relative_return: ArrayView2<'_, f64>,
    max_periods: Option<usize>,
    min_periods: usize,
    points_per_year: usize,
) -> Array2<f64> {
    let (w, m) = window(
        relative_return.nrows(),
        max_periods.unwrap_or(points_per_year),
        min_periods,
    );
    let log_growth = relative_return.mapv(f64::ln_1p);
    map_columns(log_growth.view(), |x| rolling_mean(x, w, m)).mapv(f64::exp_m1)
}

/// [`calc_mean_return`] compounded over one year.
pub fn calc_mean_return_annualized(
    relative_return: ArrayView2<'_, f64>,
    max_periods: Option<usize>,
    min_periods: usize,
    points_per_year: usize,
) -> Array2<f64> {
    let ppy = points_per_year as f64;
    calc_mean_return(relative_return, max_periods, min_periods, points_per_year)
        .mapv(|m| (m + 1.0).powf(ppy) - 1.0)
}

/// Annualized mean return over annualized volatility.
pub fn calc_sharpe_ratio_annualized(
    relative_return: ArrayView2<'_, f64>,
    max_periods: Option<usize>,
    min_periods: usize,
    points_per_year: usize,
) -> Array2<f64> {
    let m =
        calc_mean_return_annualized(relative_return, max_periods, min_periods, points_per_year);
    let v = calc_volatility_annualized(relative_return, max_periods, min_periods, points_per_year);
    m / v
}

/// Net directional tilt `sum(w) / sum(|w|)`, 0 when undefined.
///
/// Per-asset mode returns the weights themselves.
pub fn calc_bias(weights: ArrayView2<'_, f64>, per_asset: bool) -> Array2<f64> {
    if per_asset {
        return weights.to_owned();
    }
    weights
        .axis_iter(Axis(0))
        .map(|row| {
            let net: f64 = row.iter().filter(|w| !w.is_nan()).sum();
            let gross: f64 = row.iter().filter(|w| !w.is_nan()).map(|w| w.abs()).sum();
            let b = net / gross;
            if b.is_finite() { b } else { 0.0 }
        })
        .collect::<ndarray::Array1<f64>>()
        .insert_axis(Axis(1))
}

/// Number of assets that have held a non-zero weight at any point so far.
///
/// Per-asset mode is 1 everywhere.
pub fn calc_instruments(weights: ArrayView2<'_, f64>, per_asset: bool) -> Array2<f64> {
    if per_asset {
        return Array2::ones(weights.raw_dim());
    }
    let mut seen = vec![false; weights.ncols()];
    weights
        .axis_iter(Axis(0))
        .map(|row| {
            for (s, &w) in seen.iter_mut().zip(row) {
                if w != 0.0 && !w.is_nan() {
                    *s = true;
                }
            }
            seen.iter().filter(|&&s| s).count() as f64
        })
        .collect::<ndarray::Array1<f64>>()
        .insert_axis(Axis(1))
}

/// Rolling mean of the traded fraction of capital.
///
/// The weight traded on point `t` is `w[t-1]`; the drift-adjusted holding
/// it replaces is `w[t-2] * E[t-1] * open[t] / (open[t-1] * E[t])`.
/// `equity` has one column per asset in per-asset mode and a single
/// column otherwise.
pub fn calc_avg_turnover(
    weights: ArrayView2<'_, f64>,
    equity: ArrayView2<'_, f64>,
    open: ArrayView2<'_, f64>,
    max_periods: Option<usize>,
    min_periods: usize,
    per_asset: bool,
    points_per_year: usize,
) -> Array2<f64> {
    let n = weights.nrows();
    let mut turnover = Array2::<f64>::zeros(weights.raw_dim());
    for t in 0..n {
        for a in 0..weights.ncols() {
            let e_col = if per_asset { a } else { 0 };
            let w = if t >= 1 { weights[[t - 1, a]] } else { 0.0 };
            let wp = if t >= 2 { weights[[t - 2, a]] } else { 0.0 };
            let op = if t >= 1 { open[[t - 1, a]] } else { open[[t, a]] };
            let ep = if t >= 1 { equity[[t - 1, e_col]] } else { 1.0 };
            let e = equity[[t, e_col]];
            turnover[[t, a]] = (w - wp * ep * open[[t, a]] / (op * e)).abs();
        }
    }

    let turnover = if per_asset {
        turnover
    } else {
        let mut total = ndarray::Array1::<f64>::zeros(n);
        Zip::from(&mut total)
            .and(turnover.axis_iter(Axis(0)))
            .for_each(|s, row| *s = row.iter().filter(|v| !v.is_nan()).sum());
        total.insert_axis(Axis(1))
    };

    let (w, m) = window(n, max_periods.unwrap_or(points_per_year), min_periods);
    map_columns(turnover.view(), |x| rolling_mean(x, w, m))
}
