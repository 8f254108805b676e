//! Position concentration limits.
//!
//! The exposure of a position is its share of the day's gross book,
//! `|w| / sum |w|`. A day is *bad* when its largest exposure exceeds the
//! soft limit. The check passes when no day exceeds the hard limit and,
//! over the checked period, either bad days or the average excess over the
//! soft limit stay within tolerance on every rolling window.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use qnstat::{EPS, Timestamp, WeightSeries};

/// Thresholds of [`check_exposure`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExposureLimits {
    pub soft_limit: f64,
    pub hard_limit: f64,
    /// Largest allowed fraction of bad days per window.
    pub days_tolerance: f64,
    /// Largest allowed average excess over the soft limit per window.
    pub excess_tolerance: f64,
    /// Rolling window, in points.
    pub avg_period: usize,
    /// Number of trailing points checked.
    pub check_period: usize,
}

impl Default for ExposureLimits {
    fn default() -> Self {
        Self {
            soft_limit: 0.05,
            hard_limit: 0.1,
            days_tolerance: 0.02,
            excess_tolerance: 0.02,
            avg_period: 252,
            check_period: 252 * 3,
        }
    }
}

/// The most concentrated position of a day over the soft limit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExposureBreach {
    pub time: Timestamp,
    pub asset: String,
    pub exposure: f64,
}

/// Verdict of [`check_exposure`] with its parts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExposureReport {
    pub passed: bool,
    pub hard_limit_ok: bool,
    pub days_ok: bool,
    pub excess_ok: bool,
    pub breaches: Vec<ExposureBreach>,
}

/// Exposure of every position: `|w| / sum |w|` per day, with days whose
/// gross weight is below [`EPS`] left undivided.
pub fn calc_exposure(weights: &WeightSeries) -> Array2<f64> {
    let mut exposure = weights.values().mapv(f64::abs);
    for mut row in exposure.axis_iter_mut(Axis(0)) {
        let gross: f64 = row.iter().filter(|v| !v.is_nan()).sum();
        let s = if gross > EPS { gross } else { 1.0 };
        row.mapv_inplace(|v| v / s);
    }
    exposure
}

/// Full-window rolling mean; NaN until `window` points are available.
fn rolling_mean_full(x: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let mut sum = 0.0;
    x.iter()
        .enumerate()
        .map(|(t, &v)| {
            sum += v;
            if t >= window {
                sum -= x[t - window];
            }
            if t + 1 >= window { sum / window as f64 } else { f64::NAN }
        })
        .collect()
}

fn within(series: &[f64], window: usize, tolerance: f64) -> bool {
    !rolling_mean_full(series, window)
        .iter()
        .any(|&m| m > tolerance)
}

/// Check the weight history against `limits`.
pub fn check_exposure(weights: &WeightSeries, limits: &ExposureLimits) -> ExposureReport {
    let exposure = calc_exposure(weights);
    let n = exposure.nrows();

    let mut max_exposure = Array1::<f64>::from_elem(n, f64::NAN);
    let mut breaches = Vec::new();
    for (t, row) in exposure.axis_iter(Axis(0)).enumerate() {
        let top = row
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_nan())
            .fold(None, |best: Option<(usize, f64)>, (a, &v)| match best {
                Some((_, b)) if b >= v => best,
                _ => Some((a, v)),
            });
        if let Some((a, v)) = top {
            max_exposure[t] = v;
            if v > limits.soft_limit {
                breaches.push(ExposureBreach {
                    time: weights.times()[t],
                    asset: weights.assets()[a].clone(),
                    exposure: v,
                });
            }
        }
    }

    let periods = limits.avg_period.min(n);
    let start = n.saturating_sub(limits.check_period);

    let bad_days: Vec<f64> = max_exposure
        .iter()
        .skip(start)
        .map(|&m| if m > limits.soft_limit { 1.0 } else { 0.0 })
        .collect();
    let excess: Vec<f64> = exposure
        .axis_iter(Axis(0))
        .skip(start)
        .map(|row| {
            row.iter()
                .map(|&e| e - limits.soft_limit)
                .filter(|&x| x > 0.0)
                .sum()
        })
        .collect();

    let days_ok = within(&bad_days, periods, limits.days_tolerance);
    let excess_ok = within(&excess, periods, limits.excess_tolerance);
    let hard_limit_ok = !max_exposure.iter().any(|&m| m > limits.hard_limit);
    let passed = hard_limit_ok && (days_ok || excess_ok);

    if !breaches.is_empty() {
        log::warn!(
            "{} points with a position over the {} exposure limit",
            breaches.len(),
            limits.soft_limit
        );
        for b in &breaches {
            log::debug!("exposure breach: time={} asset={} exposure={:.4}", b.time, b.asset, b.exposure);
        }
    }
    if passed {
        log::info!("exposure check passed");
    } else {
        log::warn!(
            "exposure check failed: hard_limit_ok={hard_limit_ok} days_ok={days_ok} excess_ok={excess_ok}"
        );
    }

    ExposureReport {
        passed,
        hard_limit_ok,
        days_ok,
        excess_ok,
        breaches,
    }
}
