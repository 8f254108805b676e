//! Aggregate simulation: one equity shared by all assets.
//!
//! Each day the equity left after marking the book to the open is split in
//! two: the value of positions in locked assets, which cannot be traded,
//! and the *operable* rest. The operable equity is distributed over the
//! unlocked assets in proportion to their weights relative to the
//! operable weight budget
//!
//! ```text
//! w_operable = sum(|w| over unlocked) + (max(1, sum |w|) - sum |w|)
//! N[a] = operable_equity * w[a] / (w_operable * open[a])
//! ```
//!
//! where the second term is the free cash kept when the book is not fully
//! invested. Below [`EPS`] of operable weight the day is a no-op.

use ndarray::{Array1, Array2};

use super::{SimInputs, relative_from_equity};
use crate::data::EPS;
use crate::position::carried_over;

/// Sum skipping NaN terms.
fn nansum(it: impl Iterator<Item = f64>) -> f64 {
    it.filter(|v| !v.is_nan()).sum()
}

/// Full state history of an aggregate simulation.
#[derive(Clone, Debug, PartialEq)]
pub struct PortfolioTrace {
    /// `(time, asset)` share counts.
    pub shares: Array2<f64>,
    pub equity_before_buy: Array1<f64>,
    pub equity_operable_before_buy: Array1<f64>,
    pub equity_after_buy: Array1<f64>,
    pub equity_tonight: Array1<f64>,
}

impl PortfolioTrace {
    /// Day-over-day returns of the portfolio equity.
    pub fn relative_returns(&self) -> Array1<f64> {
        relative_from_equity(self.equity_tonight.view())
    }
}

/// Run the aggregate state machine over all days.
pub fn simulate_portfolio(inputs: &SimInputs<'_>) -> PortfolioTrace {
    let (n_times, n_assets) = (inputs.n_times(), inputs.n_assets());
    let mut trace = PortfolioTrace {
        shares: Array2::zeros((n_times, n_assets)),
        equity_before_buy: Array1::zeros(n_times),
        equity_operable_before_buy: Array1::zeros(n_times),
        equity_after_buy: Array1::zeros(n_times),
        equity_tonight: Array1::zeros(n_times),
    };

    let mut prev_shares = vec![0.0; n_assets];
    let mut prev_after = 1.0;

    for t in 0..n_times {
        let open = inputs.open.row(t);
        let close = inputs.close.row(t);
        let weights = inputs.weights.row(t);
        let unlocked = inputs.unlocked.row(t);
        let mut shares = prev_shares.clone();

        // ---- mark to open ----
        let equity_before_buy = if t == 0 {
            1.0
        } else {
            let prev_open = inputs.open.row(t - 1);
            let divs = inputs.divs.row(t);
            prev_after
                + nansum((0..n_assets).map(|a| (open[a] - prev_open[a] + divs[a]) * shares[a]))
        };

        // ---- operable budget ----
        let w_sum = nansum(weights.iter().map(|w| w.abs()));
        let w_free_cash = w_sum.max(1.0) - w_sum;
        let w_unlocked = nansum(
            (0..n_assets)
                .filter(|&a| unlocked[a])
                .map(|a| weights[a].abs()),
        );
        let w_operable = w_unlocked + w_free_cash;

        let locked_value = nansum(
            (0..n_assets)
                .filter(|&a| !unlocked[a])
                .map(|a| open[a] * shares[a].abs()),
        );
        let equity_operable = equity_before_buy - locked_value;

        // ---- rebalance ----
        let mut equity_after_buy = if w_operable < EPS {
            equity_before_buy
        } else {
            let mut slippage = 0.0;
            for a in (0..n_assets).filter(|&a| unlocked[a]) {
                shares[a] = equity_operable * weights[a] / (w_operable * open[a]);
                let cost = inputs.slippage[[t, a]] * (shares[a] - prev_shares[a]).abs();
                if !cost.is_nan() {
                    slippage += cost;
                }
            }
            equity_before_buy - slippage
        };

        // ---- roll ----
        if t > 0 {
            equity_after_buy -= nansum((0..n_assets).filter_map(|a| {
                inputs
                    .roll_cost(t, a)
                    .map(|cost| carried_over(prev_shares[a], shares[a]) * cost)
            }));
        }

        // ---- mark to close ----
        let equity_tonight =
            equity_after_buy + nansum((0..n_assets).map(|a| (close[a] - open[a]) * shares[a]));

        trace.equity_before_buy[t] = equity_before_buy;
        trace.equity_operable_before_buy[t] = equity_operable;
        trace.equity_after_buy[t] = equity_after_buy;
        trace.equity_tonight[t] = equity_tonight;
        for (dst, &n) in trace.shares.row_mut(t).iter_mut().zip(&shares) {
            *dst = n;
        }

        prev_shares = shares;
        prev_after = equity_after_buy;
    }

    log::trace!(
        "portfolio simulation finished: {} days, final equity {:?}",
        n_times,
        trace.equity_tonight.last()
    );
    trace
}
