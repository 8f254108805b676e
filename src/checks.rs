//! Advisory checks on a portfolio history.
//!
//! Neither check stops a computation; [`calc_stat`](crate::stats::calc_stat)
//! logs their findings as warnings.

use ndarray::Array2;

use crate::arrange::arrange_data;
use crate::data::{Field, MarketData, Timestamp, WeightSeries, label_index};

/// Weights held on assets flagged as not tradable.
#[derive(Clone, Debug, PartialEq)]
pub struct NonLiquid {
    pub times: Vec<Timestamp>,
    pub assets: Vec<String>,
    /// Raw weight where `is_liquid == 0`, NaN elsewhere.
    pub values: Array2<f64>,
}

/// Find the weights that target illiquid entries.
///
/// The check runs on the aligned grid but looks at the weights as
/// submitted, before the aligner zeroes them. Times and assets without any
/// illiquid entry are dropped. `None` when the data has no `is_liquid`
/// field or no non-zero weight is held on an illiquid entry.
pub fn calc_non_liquid(data: &MarketData, weights: &WeightSeries) -> Option<NonLiquid> {
    if !data.has(Field::IsLiquid) {
        return None;
    }
    let arranged = arrange_data(data, weights, None, false);
    let liquid = arranged.data.field(Field::IsLiquid)?;
    let grid_times = arranged.data.times();
    let grid_assets = arranged.data.assets();

    let weight_times = label_index(weights.times());
    let weight_assets = label_index(weights.assets());

    let mut full = Array2::from_elem(liquid.raw_dim(), f64::NAN);
    for (t, time) in grid_times.iter().enumerate() {
        for (a, asset) in grid_assets.iter().enumerate() {
            let l = liquid[[t, a]];
            if !(l.is_finite() && l == 0.0) {
                continue;
            }
            let w = match (weight_times.get(time), weight_assets.get(asset)) {
                (Some(&wt), Some(&wa)) => weights.values()[[wt, wa]],
                _ => f64::NAN,
            };
            full[[t, a]] = if w.is_finite() { w } else { 0.0 };
        }
    }

    let keep_times: Vec<usize> = (0..full.nrows())
        .filter(|&t| full.row(t).iter().any(|v| !v.is_nan()))
        .collect();
    let keep_assets: Vec<usize> = (0..full.ncols())
        .filter(|&a| full.column(a).iter().any(|v| !v.is_nan()))
        .collect();

    let held: f64 = full.iter().filter(|v| !v.is_nan()).map(|v| v.abs()).sum();
    if held <= 0.0 {
        return None;
    }

    let values = full
        .select(ndarray::Axis(0), &keep_times)
        .select(ndarray::Axis(1), &keep_assets);
    Some(NonLiquid {
        times: keep_times.iter().map(|&t| grid_times[t]).collect(),
        assets: keep_assets.iter().map(|&a| grid_assets[a].clone()).collect(),
        values,
    })
}

/// Data timestamps at or after the first weight timestamp that the weights
/// skip, sorted ascending.
pub fn find_missed_dates(weights: &WeightSeries, data: &MarketData) -> Vec<Timestamp> {
    let Some(&first) = weights.times().iter().min() else {
        return Vec::new();
    };
    let present = label_index(weights.times());
    let mut missed: Vec<Timestamp> = data
        .times()
        .iter()
        .copied()
        .filter(|t| *t >= first && !present.contains_key(t))
        .collect();
    missed.sort_unstable();
    missed
}
