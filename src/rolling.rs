//! Right-aligned rolling-window reductions over `f64` series.
//!
//! Every window ending at `t` covers `[t - window + 1, t]`: only current
//! and past values are used. Two NaN policies exist:
//!
//! - *strict* reductions need a full window with no NaN, otherwise NaN;
//! - *skip-NaN* reductions ignore NaN and emit NaN while fewer than
//!   `min_periods` finite values are in the window.
//!
//! Moments are maintained incrementally (Welford with removal) so long
//! windows stay linear in the series length.

use ndarray::{Array2, ArrayView2, Axis};

/// Running count/mean/M2 with support for removing old observations.
#[derive(Clone, Copy, Debug, Default)]
struct Moments {
    count: usize,
    mean: f64,
    m2: f64,
}

impl Moments {
    fn add(&mut self, x: f64) {
        self.count += 1;
        let d = x - self.mean;
        self.mean += d / self.count as f64;
        self.m2 += d * (x - self.mean);
    }

    fn remove(&mut self, x: f64) {
        if self.count <= 1 {
            *self = Moments::default();
            return;
        }
        self.count -= 1;
        let d = x - self.mean;
        self.mean -= d / self.count as f64;
        self.m2 -= d * (x - self.mean);
        if self.m2 < 0.0 {
            self.m2 = 0.0;
        }
    }

    /// Population variance (ddof = 0).
    fn variance(&self) -> f64 {
        self.m2 / self.count as f64
    }
}

/// Slide a window over `x`, feeding non-NaN values to a [`Moments`]
/// accumulator, and map each window state to an output value.
fn rolling_moments(
    x: &[f64],
    window: usize,
    mut emit: impl FnMut(&Moments, usize, usize) -> f64,
) -> Vec<f64> {
    let window = window.max(1);
    let mut acc = Moments::default();
    let mut nan_count = 0usize;
    let mut out = Vec::with_capacity(x.len());
    for t in 0..x.len() {
        if x[t].is_nan() {
            nan_count += 1;
        } else {
            acc.add(x[t]);
        }
        if t >= window {
            let old = x[t - window];
            if old.is_nan() {
                nan_count -= 1;
            } else {
                acc.remove(old);
            }
        }
        let filled = (t + 1).min(window);
        out.push(emit(&acc, nan_count, filled));
    }
    out
}

/// Shift a series `n` steps forward; the first `n` values become NaN.
pub fn shift(x: &[f64], n: usize) -> Vec<f64> {
    let n = n.min(x.len());
    let mut out = vec![f64::NAN; n];
    out.extend_from_slice(&x[..x.len() - n]);
    out
}

/// Forward-fill NaN gaps in place. Leading NaNs stay NaN.
pub fn ffill(x: &mut [f64]) {
    let mut last = f64::NAN;
    for v in x.iter_mut() {
        if v.is_nan() {
            *v = last;
        } else {
            last = *v;
        }
    }
}

fn rolling_extreme_strict(x: &[f64], window: usize, pick: fn(f64, f64) -> f64) -> Vec<f64> {
    let window = window.max(1);
    (0..x.len())
        .map(|t| {
            if t + 1 < window {
                return f64::NAN;
            }
            let w = &x[t + 1 - window..=t];
            if w.iter().any(|v| v.is_nan()) {
                f64::NAN
            } else {
                w.iter().copied().fold(w[0], pick)
            }
        })
        .collect()
}

/// Strict rolling maximum.
pub fn rolling_max_strict(x: &[f64], window: usize) -> Vec<f64> {
    rolling_extreme_strict(x, window, f64::max)
}

/// Strict rolling minimum.
pub fn rolling_min_strict(x: &[f64], window: usize) -> Vec<f64> {
    rolling_extreme_strict(x, window, f64::min)
}

/// Strict rolling mean.
pub fn rolling_mean_strict(x: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    rolling_moments(x, window, |m, nans, filled| {
        if filled < window || nans > 0 {
            f64::NAN
        } else {
            m.mean
        }
    })
}

/// Skip-NaN rolling mean.
pub fn rolling_mean(x: &[f64], window: usize, min_periods: usize) -> Vec<f64> {
    let min_periods = min_periods.max(1);
    rolling_moments(x, window, |m, _, _| {
        if m.count < min_periods {
            f64::NAN
        } else {
            m.mean
        }
    })
}

/// Skip-NaN rolling sum.
pub fn rolling_sum(x: &[f64], window: usize, min_periods: usize) -> Vec<f64> {
    let window = window.max(1);
    let min_periods = min_periods.max(1);
    let mut sum = 0.0;
    let mut count = 0usize;
    let mut out = Vec::with_capacity(x.len());
    for t in 0..x.len() {
        if !x[t].is_nan() {
            sum += x[t];
            count += 1;
        }
        if t >= window && !x[t - window].is_nan() {
            sum -= x[t - window];
            count -= 1;
        }
        out.push(if count < min_periods { f64::NAN } else { sum });
    }
    out
}

/// Skip-NaN rolling population standard deviation (ddof = 0).
pub fn rolling_std(x: &[f64], window: usize, min_periods: usize) -> Vec<f64> {
    let min_periods = min_periods.max(1);
    rolling_moments(x, window, |m, _, _| {
        if m.count < min_periods {
            f64::NAN
        } else {
            m.variance().sqrt()
        }
    })
}

fn expanding(x: &[f64], pick: fn(f64, f64) -> f64) -> Vec<f64> {
    let mut acc = f64::NAN;
    x.iter()
        .map(|&v| {
            if !v.is_nan() {
                acc = if acc.is_nan() { v } else { pick(acc, v) };
            }
            acc
        })
        .collect()
}

/// Running maximum over the whole history, skipping NaN.
pub fn expanding_max(x: &[f64]) -> Vec<f64> {
    expanding(x, f64::max)
}

/// Running minimum over the whole history, skipping NaN.
pub fn expanding_min(x: &[f64]) -> Vec<f64> {
    expanding(x, f64::min)
}

/// Apply a series transform to every column of a `(time, column)` array.
pub fn map_columns(a: ArrayView2<'_, f64>, f: impl Fn(&[f64]) -> Vec<f64>) -> Array2<f64> {
    let mut out = Array2::<f64>::from_elem(a.raw_dim(), f64::NAN);
    for (src, mut dst) in a.axis_iter(Axis(1)).zip(out.axis_iter_mut(Axis(1))) {
        let column = src.to_vec();
        let mapped = f(&column);
        for (d, v) in dst.iter_mut().zip(mapped) {
            *d = v;
        }
    }
    out
}
