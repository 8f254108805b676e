//! Sampling-frequency inference.

use crate::data::Timestamp;

/// Fallback when the time axis is too short to measure its spacing.
pub const DEFAULT_POINTS_PER_YEAR: usize = 252;

/// Threshold separating daily bars from intraday data.
const INTRADAY_POINTS_PER_YEAR: usize = 400;

/// Points per day assumed for intraday data.
const INTRADAY_POINTS_PER_DAY: usize = 24;

/// Average number of samples per year, from the mean spacing of `times`.
///
/// `round(365.25 * 24 / mean_spacing_hours)`. Returns
/// [`DEFAULT_POINTS_PER_YEAR`] for fewer than two distinct timestamps.
pub fn calc_avg_points_per_year(times: &[Timestamp]) -> usize {
    if times.len() < 2 {
        return DEFAULT_POINTS_PER_YEAR;
    }
    let mut t = times.to_vec();
    t.sort_unstable();
    let span = (t[t.len() - 1] - t[0]) as f64;
    if span <= 0.0 {
        return DEFAULT_POINTS_PER_YEAR;
    }
    let mean_hours = span / (t.len() - 1) as f64 / 3600.0;
    (365.25 * 24.0 / mean_hours).round().max(1.0) as usize
}

/// Array steps per trading day: 1 for daily bars, 24 for intraday data.
pub fn calc_points_per_day(points_per_year: usize) -> usize {
    if points_per_year < INTRADAY_POINTS_PER_YEAR {
        1
    } else {
        INTRADAY_POINTS_PER_DAY
    }
}
