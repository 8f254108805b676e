//! Per-asset simulation: every asset trades its own unit of capital.
//!
//! Assets never interact, so each column is an independent state machine
//! over [`AssetBook`]s. With the `parallel` feature, columns are simulated
//! concurrently.

use ndarray::{Array2, Axis};

use super::{SimInputs, relative_from_equity};
use crate::position::carried_over;

/// State of one asset at the end of one day.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AssetBook {
    pub shares: f64,
    pub equity_before_buy: f64,
    pub equity_after_buy: f64,
    pub equity_tonight: f64,
}

impl AssetBook {
    /// Flat book holding the starting unit of capital.
    pub const INITIAL: AssetBook = AssetBook {
        shares: 0.0,
        equity_before_buy: 1.0,
        equity_after_buy: 1.0,
        equity_tonight: 1.0,
    };
}

/// Roll paid on day `t` for the shares carried from `prev_shares` to `shares`.
fn roll_charge(inputs: &SimInputs<'_>, t: usize, a: usize, prev_shares: f64, shares: f64) -> f64 {
    if t == 0 {
        return 0.0;
    }
    inputs
        .roll_cost(t, a)
        .map_or(0.0, |cost| carried_over(prev_shares, shares) * cost)
}

/// Advance asset `a` from `prev` through day `t`.
///
/// A locked asset keeps its shares and marks, but still pays roll on the
/// position it carries.
fn step(inputs: &SimInputs<'_>, prev: &AssetBook, t: usize, a: usize) -> AssetBook {
    if !inputs.unlocked[[t, a]] {
        let roll = roll_charge(inputs, t, a, prev.shares, prev.shares);
        return AssetBook {
            equity_after_buy: prev.equity_after_buy - roll,
            equity_tonight: prev.equity_tonight - roll,
            ..*prev
        };
    }

    let open = inputs.open[[t, a]];
    let prev_open = if t == 0 { open } else { inputs.open[[t - 1, a]] };
    let equity_before_buy =
        prev.equity_after_buy + (open - prev_open + inputs.divs[[t, a]]) * prev.shares;

    let shares = equity_before_buy * inputs.weights[[t, a]] / open;
    let slippage = inputs.slippage[[t, a]] * (shares - prev.shares).abs();
    let equity_after_buy =
        equity_before_buy - slippage - roll_charge(inputs, t, a, prev.shares, shares);
    let equity_tonight = equity_after_buy + (inputs.close[[t, a]] - open) * shares;
    AssetBook {
        shares,
        equity_before_buy,
        equity_after_buy,
        equity_tonight,
    }
}

fn run_asset(inputs: &SimInputs<'_>, a: usize) -> Vec<AssetBook> {
    let mut books = Vec::with_capacity(inputs.n_times());
    let mut prev = AssetBook::INITIAL;
    for t in 0..inputs.n_times() {
        prev = step(inputs, &prev, t, a);
        books.push(prev);
    }
    books
}

/// Full state history of a per-asset simulation, `(time, asset)` each.
#[derive(Clone, Debug, PartialEq)]
pub struct PerAssetTrace {
    pub shares: Array2<f64>,
    pub equity_before_buy: Array2<f64>,
    pub equity_after_buy: Array2<f64>,
    pub equity_tonight: Array2<f64>,
}

impl PerAssetTrace {
    /// Day-over-day returns of every asset's equity.
    pub fn relative_returns(&self) -> Array2<f64> {
        let mut out = Array2::zeros(self.equity_tonight.raw_dim());
        for (src, mut dst) in self
            .equity_tonight
            .axis_iter(Axis(1))
            .zip(out.axis_iter_mut(Axis(1)))
        {
            dst.assign(&relative_from_equity(src));
        }
        out
    }
}

/// Run the per-asset state machine over all days and assets.
pub fn simulate_per_asset(inputs: &SimInputs<'_>) -> PerAssetTrace {
    let n_assets = inputs.n_assets();

    #[cfg(feature = "parallel")]
    let books: Vec<Vec<AssetBook>> = {
        use rayon::prelude::*;
        (0..n_assets)
            .into_par_iter()
            .map(|a| run_asset(inputs, a))
            .collect()
    };
    #[cfg(not(feature = "parallel"))]
    let books: Vec<Vec<AssetBook>> = (0..n_assets).map(|a| run_asset(inputs, a)).collect();

    let dim = (inputs.n_times(), n_assets);
    let collect = |pick: fn(&AssetBook) -> f64| Array2::from_shape_fn(dim, |(t, a)| pick(&books[a][t]));
    PerAssetTrace {
        shares: collect(|b| b.shares),
        equity_before_buy: collect(|b| b.equity_before_buy),
        equity_after_buy: collect(|b| b.equity_after_buy),
        equity_tonight: collect(|b| b.equity_tonight),
    }
}
