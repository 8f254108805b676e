//! Alignment of market data and target weights onto one grid.
//!
//! Both inputs are restricted to a common, sorted time axis and a common
//! sorted asset set. Weights are made finite, zeroed on illiquid assets and
//! normalized so that the portfolio is never leveraged:
//!
//! - aggregate mode: each day is divided by `max(1, sum |w|)`;
//! - per-asset mode: each entry is clipped to `[-1, 1]`.
//!
//! Empty intersections are not errors; they yield zero-length arrays.

use ndarray::{Array2, ArrayView2, Axis};

use crate::data::{Field, MarketData, Timestamp, WeightSeries, label_index};

/// An auxiliary series used to bound the time range of the alignment
/// (e.g. a slippage estimate or an equity curve).
#[derive(Clone, Copy, Debug)]
pub struct AuxSeries<'a> {
    pub times: &'a [Timestamp],
    /// Column labels; `None` when the columns are not per-asset
    /// (a single portfolio-level column, for instance).
    pub assets: Option<&'a [String]>,
    /// `(time, column)` values.
    pub values: ArrayView2<'a, f64>,
}

/// Output of [`arrange_data`].
#[derive(Clone, Debug)]
pub struct Arranged {
    pub data: MarketData,
    pub weights: WeightSeries,
    /// The auxiliary series on the arranged time axis (NaN where it had no
    /// row), restricted to the arranged assets when it was per-asset.
    pub aux: Option<Array2<f64>>,
}

/// First and last time of the rows holding at least one non-NaN value.
fn non_nan_bounds(aux: &AuxSeries<'_>) -> Option<(Timestamp, Timestamp)> {
    let mut bounds: Option<(Timestamp, Timestamp)> = None;
    for (row, &t) in aux.values.axis_iter(Axis(0)).zip(aux.times) {
        if row.iter().any(|v| !v.is_nan()) {
            bounds = Some(match bounds {
                None => (t, t),
                Some((lo, hi)) => (lo.min(t), hi.max(t)),
            });
        }
    }
    bounds
}

/// Align `data` and `weights` (and optionally `aux`) onto a common grid.
pub fn arrange_data(
    data: &MarketData,
    weights: &WeightSeries,
    aux: Option<AuxSeries<'_>>,
    per_asset: bool,
) -> Arranged {
    let mut min_date = weights.times().iter().min().copied();
    let mut max_date = data.times().iter().max().copied();

    if let Some((lo, hi)) = aux.as_ref().and_then(non_nan_bounds) {
        min_date = min_date.map(|d| d.max(lo));
        max_date = max_date.map(|d| d.min(hi));
    }

    let time_idx: Vec<usize> = match (min_date, max_date) {
        (Some(lo), Some(hi)) => data
            .times()
            .iter()
            .enumerate()
            .filter(|&(_, &t)| t >= lo && t <= hi)
            .map(|(i, _)| i)
            .collect(),
        _ => Vec::new(),
    };

    let weight_assets = label_index(weights.assets());
    let mut assets: Vec<&String> = data
        .assets()
        .iter()
        .filter(|a| weight_assets.contains_key(*a))
        .collect();
    assets.sort();
    let data_assets = label_index(data.assets());
    let data_asset_idx: Vec<usize> = assets.iter().map(|a| data_assets[*a]).collect();
    let weight_asset_idx: Vec<usize> = assets.iter().map(|a| weight_assets[*a]).collect();

    let adjusted = data.select(&time_idx, &data_asset_idx);

    let weight_times = label_index(weights.times());
    let mut tw = Array2::<f64>::zeros((adjusted.n_times(), adjusted.n_assets()));
    for (t, &time) in adjusted.times().iter().enumerate() {
        let Some(&src) = weight_times.get(&time) else {
            continue;
        };
        for (a, &wa) in weight_asset_idx.iter().enumerate() {
            let w = weights.values()[[src, wa]];
            if w.is_finite() {
                tw[[t, a]] = w;
            }
        }
    }

    if let Some(liquid) = adjusted.field(Field::IsLiquid) {
        ndarray::Zip::from(&mut tw).and(&liquid).for_each(|w, &l| {
            if l.is_nan() || l <= 0.0 {
                *w = 0.0;
            }
        });
    }

    if per_asset {
        tw.mapv_inplace(|w| w.clamp(-1.0, 1.0));
    } else {
        for mut row in tw.axis_iter_mut(Axis(0)) {
            let gross: f64 = row.iter().map(|w| w.abs()).sum();
            let s = gross.max(1.0);
            row.mapv_inplace(|w| w / s);
        }
    }

    let aux = aux.map(|aux| restrict_aux(&aux, adjusted.times(), adjusted.assets()));

    let weights = WeightSeries::from_parts(
        adjusted.times().to_vec(),
        adjusted.assets().to_vec(),
        tw,
    );

    Arranged {
        data: adjusted,
        weights,
        aux,
    }
}

fn restrict_aux(aux: &AuxSeries<'_>, times: &[Timestamp], assets: &[String]) -> Array2<f64> {
    let rows = label_index(aux.times);
    let cols: Vec<Option<usize>> = match aux.assets {
        Some(labels) => {
            let idx = label_index(labels);
            assets.iter().map(|a| idx.get(a).copied()).collect()
        }
        None => (0..aux.values.ncols()).map(Some).collect(),
    };

    let mut out = Array2::from_elem((times.len(), cols.len()), f64::NAN);
    for (t, time) in times.iter().enumerate() {
        let Some(&r) = rows.get(time) else {
            continue;
        };
        for (c, col) in cols.iter().enumerate() {
            if let Some(col) = *col {
                out[[t, c]] = aux.values[[r, col]];
            }
        }
    }
    out
}
