//! Capital-weighted average holding time.
//!
//! Every asset carries the age of its current position in days. Trades
//! against the position log the closed part together with its age; adds
//! blend the age by size, so doubling a position halves its average age.

use ndarray::{Array2, ArrayView2, Axis};

use super::window;
use crate::data::EPS;
use crate::periods::calc_points_per_day;
use crate::position::PositionChange;
use crate::rolling::rolling_sum;

/// One closed (or partially closed) slice of a position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HoldingEntry {
    /// Closed size, in weight units.
    pub cost: f64,
    /// Age of the position when it was closed, in points.
    pub duration: f64,
}

/// Age tracker for a single asset.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HoldingTracker {
    prev_pos: f64,
    holding_time: f64,
}

impl HoldingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current age of the position, in points.
    pub fn holding_time(&self) -> f64 {
        self.holding_time
    }

    /// Age the position by one point.
    pub fn tick(&mut self) {
        self.holding_time += 1.0;
    }

    /// Move to `pos`, returning the log entry when part of the position
    /// was closed. Non-finite and negligible moves are ignored entirely.
    pub fn update(&mut self, pos: f64) -> Option<HoldingEntry> {
        if !pos.is_finite() {
            return None;
        }
        let prev = self.prev_pos;
        let change = PositionChange::classify(prev, pos, EPS);
        let entry = match change {
            PositionChange::Hold => return None,
            PositionChange::Reduce | PositionChange::Close => Some(HoldingEntry {
                cost: (pos - prev).abs(),
                duration: self.holding_time,
            }),
            PositionChange::Flip => {
                let entry = HoldingEntry {
                    cost: prev.abs(),
                    duration: self.holding_time,
                };
                self.holding_time = 0.0;
                Some(entry)
            }
            PositionChange::Open | PositionChange::Add => {
                self.holding_time *= prev.abs() / pos.abs();
                None
            }
        };
        if change == PositionChange::Close {
            self.holding_time = 0.0;
        }
        self.prev_pos = pos;
        entry
    }
}

/// Per-point, per-asset closed sizes and their ages.
#[derive(Clone, Debug, PartialEq)]
pub struct HoldingLog {
    pub cost: Array2<f64>,
    pub duration: Array2<f64>,
}

/// Run a [`HoldingTracker`] over every asset of a `(time, asset)` weight
/// matrix. The position observed at point `t` is the weight of `t-1`.
pub fn holding_log(weights: ArrayView2<'_, f64>) -> HoldingLog {
    let mut log = HoldingLog {
        cost: Array2::zeros(weights.raw_dim()),
        duration: Array2::zeros(weights.raw_dim()),
    };
    let mut trackers = vec![HoldingTracker::new(); weights.ncols()];
    for t in 1..weights.nrows() {
        for (a, tracker) in trackers.iter_mut().enumerate() {
            tracker.tick();
            if let Some(entry) = tracker.update(weights[[t - 1, a]]) {
                log.cost[[t, a]] = entry.cost;
                log.duration[[t, a]] = entry.duration;
            }
        }
    }
    log
}

/// Rolling capital-weighted average holding time, in days.
///
/// The second-to-last row of `weights` is treated as flat so that positions
/// still open at the end are measured. In aggregate mode the per-asset logs
/// are pooled into a single column.
pub fn calc_avg_holding_time(
    weights: ArrayView2<'_, f64>,
    max_periods: Option<usize>,
    min_periods: usize,
    per_asset: bool,
    points_per_year: usize,
) -> Array2<f64> {
    let mut ph = weights.to_owned();
    let n = ph.nrows();
    if n >= 2 {
        ph.row_mut(n - 2).fill(0.0);
    }

    let log = holding_log(ph.view());
    let weighted = &log.cost * &log.duration;
    let (num, cost) = if per_asset {
        (weighted, log.cost)
    } else {
        (
            weighted.sum_axis(Axis(1)).insert_axis(Axis(1)),
            log.cost.sum_axis(Axis(1)).insert_axis(Axis(1)),
        )
    };

    let (max_periods, min_periods) = window(n, max_periods.unwrap_or(points_per_year), min_periods);
    let points_per_day = calc_points_per_day(points_per_year) as f64;

    let mut out = Array2::from_elem(num.raw_dim(), f64::NAN);
    for ((num, cost), mut dst) in num
        .axis_iter(Axis(1))
        .zip(cost.axis_iter(Axis(1)))
        .zip(out.axis_iter_mut(Axis(1)))
    {
        let num = rolling_sum(&num.to_vec(), max_periods, min_periods);
        let cost = rolling_sum(&cost.to_vec(), max_periods, min_periods);
        for ((d, n), c) in dst.iter_mut().zip(num).zip(cost) {
            *d = n / c / points_per_day;
        }
    }
    out
}
