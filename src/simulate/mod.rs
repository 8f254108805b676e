//! Return simulation: target weights to realized relative returns.
//!
//! Starting from one unit of capital, every day:
//!
//! 1. the previous position is marked from yesterday's open to today's
//!    open and dividends are credited;
//! 2. unlocked assets are rebalanced to `equity * weight / open` shares,
//!    paying `slippage * |shares traded|`;
//! 3. positions held over in the same direction pay the roll cost;
//! 4. positions are marked to the close.
//!
//! Two variants exist: [`per_asset`] simulates every asset as an
//! independent one-asset portfolio, [`portfolio`] shares a single equity
//! across assets. Both are pure functions of their inputs.
//!
//! Degenerate inputs never fail: an asset without a finite open/close,
//! weight or slippage, or with `open <= EPS`, is locked for the day, and
//! non-finite relative returns are reported as 0.

pub mod per_asset;
pub mod portfolio;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, Zip};

use crate::arrange::{AuxSeries, arrange_data};
use crate::data::{EPS, Field, MarketData, Timestamp, WeightSeries};
use crate::error::{Error, Result};
use crate::rolling::ffill;
use crate::slippage::calc_atr;

pub use per_asset::{PerAssetTrace, simulate_per_asset};
pub use portfolio::{PortfolioTrace, simulate_portfolio};

/// ATR lookback used for trading costs, in trading days.
pub const SLIPPAGE_PERIOD_DAYS: usize = 14;

/// Trading-cost parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CostConfig {
    /// Fraction of the ATR charged per traded share.
    pub slippage_factor: f64,
    /// Fraction of the ATR charged per rolled share on roll days.
    pub roll_slippage_factor: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            slippage_factor: 0.05,
            roll_slippage_factor: 0.02,
        }
    }
}

impl CostConfig {
    /// No slippage and no roll slippage.
    pub fn zero() -> Self {
        Self {
            slippage_factor: 0.0,
            roll_slippage_factor: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Day-aligned inputs of the simulator. Every matrix is `(time, asset)`.
#[derive(Clone, Copy, Debug)]
pub struct SimInputs<'a> {
    weights: ArrayView2<'a, f64>,
    unlocked: ArrayView2<'a, bool>,
    open: ArrayView2<'a, f64>,
    close: ArrayView2<'a, f64>,
    slippage: ArrayView2<'a, f64>,
    divs: ArrayView2<'a, f64>,
    roll: Option<(ArrayView2<'a, f64>, ArrayView2<'a, f64>)>,
}

fn check_shape(what: &'static str, expected: (usize, usize), m: &ArrayView2<'_, impl Sized>) -> Result<()> {
    if m.dim() != expected {
        return Err(Error::ShapeMismatch {
            what,
            expected: vec![expected.0, expected.1],
            actual: m.shape().to_vec(),
        });
    }
    Ok(())
}

impl<'a> SimInputs<'a> {
    /// Bundle the simulator inputs, checking that all shapes agree.
    ///
    /// `open` and `close` are expected to be forward-filled with NaN
    /// replaced by 0; `divs` NaN-free.
    pub fn new(
        weights: ArrayView2<'a, f64>,
        unlocked: ArrayView2<'a, bool>,
        open: ArrayView2<'a, f64>,
        close: ArrayView2<'a, f64>,
        slippage: ArrayView2<'a, f64>,
        divs: ArrayView2<'a, f64>,
    ) -> Result<Self> {
        let dim = weights.dim();
        check_shape("unlocked", dim, &unlocked)?;
        check_shape("open", dim, &open)?;
        check_shape("close", dim, &close)?;
        check_shape("slippage", dim, &slippage)?;
        check_shape("divs", dim, &divs)?;
        Ok(Self {
            weights,
            unlocked,
            open,
            close,
            slippage,
            divs,
            roll: None,
        })
    }

    /// Charge `roll + roll_slippage` per share held over on each day.
    pub fn with_roll(
        mut self,
        roll: ArrayView2<'a, f64>,
        roll_slippage: ArrayView2<'a, f64>,
    ) -> Result<Self> {
        let dim = self.weights.dim();
        check_shape("roll", dim, &roll)?;
        check_shape("roll slippage", dim, &roll_slippage)?;
        self.roll = Some((roll, roll_slippage));
        Ok(self)
    }

    pub fn n_times(&self) -> usize {
        self.weights.nrows()
    }

    pub fn n_assets(&self) -> usize {
        self.weights.ncols()
    }

    /// Per-share roll charge for `(t, a)`, if a roll field is present.
    fn roll_cost(&self, t: usize, a: usize) -> Option<f64> {
        self.roll
            .as_ref()
            .map(|(roll, slip)| roll[[t, a]] + slip[[t, a]])
    }
}

/// Availability mask: an asset is tradable on a day only when its raw
/// open and close, its weight and its slippage are finite and its
/// (filled) open price exceeds [`EPS`].
pub fn unlocked_mask(
    raw_open: ArrayView2<'_, f64>,
    raw_close: ArrayView2<'_, f64>,
    weights: ArrayView2<'_, f64>,
    slippage: ArrayView2<'_, f64>,
    filled_open: ArrayView2<'_, f64>,
) -> Array2<bool> {
    let mut mask = Array2::from_elem(weights.raw_dim(), false);
    Zip::from(&mut mask)
        .and(raw_open)
        .and(raw_close)
        .and(weights)
        .and(slippage)
        .and(filled_open)
        .for_each(|m, &o, &c, &w, &s, &fo| {
            *m = o.is_finite() && c.is_finite() && w.is_finite() && s.is_finite() && fo > EPS;
        });
    mask
}

/// Relative returns from an equity curve: `E[t] / E[t-1] - 1` with
/// `E[-1] = 1`; non-finite results become 0.
pub fn relative_from_equity(equity: ArrayView1<'_, f64>) -> Array1<f64> {
    let mut prev = 1.0;
    equity
        .iter()
        .map(|&e| {
            let rr = e / prev - 1.0;
            prev = e;
            if rr.is_finite() { rr } else { 0.0 }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Data-level entry point
// ---------------------------------------------------------------------------

/// Simulated relative returns on the aligned time axis.
#[derive(Clone, Debug, PartialEq)]
pub struct RelativeReturns {
    pub times: Vec<Timestamp>,
    /// Column labels in per-asset mode; `None` for the single portfolio
    /// column of aggregate mode.
    pub assets: Option<Vec<String>>,
    /// `(time, column)` returns.
    pub values: Array2<f64>,
}

impl RelativeReturns {
    pub fn is_per_asset(&self) -> bool {
        self.assets.is_some()
    }

    /// The portfolio series in aggregate mode.
    pub fn portfolio(&self) -> Option<ArrayView1<'_, f64>> {
        match self.assets {
            None => Some(self.values.column(0)),
            Some(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

fn filled_price(m: ArrayView2<'_, f64>) -> Array2<f64> {
    let mut out = m.to_owned();
    for mut col in out.axis_iter_mut(Axis(1)) {
        let mut v = col.to_vec();
        ffill(&mut v);
        for (d, x) in col.iter_mut().zip(v) {
            *d = if x.is_nan() { 0.0 } else { x };
        }
    }
    out
}

fn nan_to_zero(m: ArrayView2<'_, f64>) -> Array2<f64> {
    m.mapv(|x| if x.is_nan() { 0.0 } else { x })
}

/// Simulate the relative returns of a portfolio history against market
/// data.
///
/// Weights recorded on day `t-1` are traded on day `t`. Trading costs are
/// derived from a 14-day ATR scaled by `costs`. The result starts where
/// both the (shifted) weights and the slippage estimate are available.
pub fn calc_relative_return(
    data: &MarketData,
    portfolio_history: &WeightSeries,
    costs: &CostConfig,
    per_asset: bool,
    points_per_year: Option<usize>,
) -> Result<RelativeReturns> {
    let target_weights = portfolio_history.shift_forward();
    let atr = calc_atr(data, SLIPPAGE_PERIOD_DAYS, points_per_year)?;

    let arranged = arrange_data(
        data,
        &target_weights,
        Some(AuxSeries {
            times: data.times(),
            assets: Some(data.assets()),
            values: atr.view(),
        }),
        per_asset,
    );
    let atr = arranged
        .aux
        .unwrap_or_else(|| Array2::from_elem(arranged.weights.values().raw_dim(), f64::NAN));
    let d = &arranged.data;
    let w = arranged.weights.view();

    let raw_open = d.require(Field::Open)?;
    let raw_close = d.require(Field::Close)?;
    let open = filled_price(raw_open);
    let close = filled_price(raw_close);
    let divs = match d.field(Field::Divs) {
        Some(m) => nan_to_zero(m),
        None => Array2::zeros(w.raw_dim()),
    };
    let slippage = &atr * costs.slippage_factor;

    let unlocked = unlocked_mask(raw_open, raw_close, w, slippage.view(), open.view());

    let roll = d.field(Field::Roll).map(|r| {
        let roll = nan_to_zero(r);
        let mut roll_slippage = &atr * costs.roll_slippage_factor;
        Zip::from(&mut roll_slippage).and(&roll).for_each(|s, &r| {
            if r <= 0.0 || s.is_nan() {
                *s = 0.0;
            }
        });
        (roll, roll_slippage)
    });

    let mut inputs = SimInputs::new(
        w,
        unlocked.view(),
        open.view(),
        close.view(),
        slippage.view(),
        divs.view(),
    )?;
    if let Some((roll, roll_slippage)) = &roll {
        inputs = inputs.with_roll(roll.view(), roll_slippage.view())?;
    }

    let times = d.times().to_vec();
    if per_asset {
        let trace = simulate_per_asset(&inputs);
        log::debug!(
            "simulated {} assets over {} days (per asset)",
            inputs.n_assets(),
            inputs.n_times()
        );
        Ok(RelativeReturns {
            times,
            assets: Some(d.assets().to_vec()),
            values: trace.relative_returns(),
        })
    } else {
        let trace = simulate_portfolio(&inputs);
        log::debug!(
            "simulated {} assets over {} days (portfolio)",
            inputs.n_assets(),
            inputs.n_times()
        );
        Ok(RelativeReturns {
            times,
            assets: None,
            values: trace.relative_returns().insert_axis(Axis(1)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, array};

    const DAY: i64 = 86_400;

    fn market(open: Array2<f64>, close: Array2<f64>, assets: &[&str]) -> MarketData {
        let n = open.nrows();
        let high = close.mapv(|c| c * 1.01);
        let low = close.mapv(|c| c * 0.99);
        MarketData::from_fields(
            (0..n as i64).map(|i| i * DAY).collect(),
            assets.iter().map(|s| s.to_string()).collect(),
            vec![
                (Field::Open, open),
                (Field::Close, close),
                (Field::High, high),
                (Field::Low, low),
            ],
        )
        .unwrap()
    }

    /// Daily bars with a high-low band of 2 around the close, so the ATR
    /// settles at 2 once 14 true ranges exist.
    fn banded(
        open: Array2<f64>,
        close: Array2<f64>,
        assets: &[&str],
        extra: Vec<(Field, Array2<f64>)>,
    ) -> (MarketData, WeightSeries) {
        let n = open.nrows();
        let times: Vec<Timestamp> = (0..n as i64).map(|i| i * DAY).collect();
        let names: Vec<String> = assets.iter().map(|s| s.to_string()).collect();
        let mut fields = vec![
            (Field::High, close.mapv(|c| c + 1.0)),
            (Field::Low, close.mapv(|c| c - 1.0)),
            (Field::Open, open),
            (Field::Close, close),
        ];
        fields.extend(extra);
        let data = MarketData::from_fields(times.clone(), names.clone(), fields).unwrap();
        let weights = WeightSeries::new(times, names, Array2::from_elem((n, assets.len()), 1.0)).unwrap();
        (data, weights)
    }

    fn at(rr: &RelativeReturns, day: i64) -> usize {
        rr.times.iter().position(|&t| t == day * DAY).unwrap()
    }

    #[test]
    fn relative_from_equity_masks_blowups() {
        let rr = relative_from_equity(array![1.0, 1.1, 0.0, 0.5].view());
        assert!((rr[1] - 0.1).abs() < 1e-12);
        assert_eq!(rr[0], 0.0);
        assert!((rr[2] + 1.0).abs() < 1e-12);
        // division by zero equity is reported as 0
        assert_eq!(rr[3], 0.0);
    }

    #[test]
    fn unlocked_requires_finite_inputs_and_positive_open() {
        let raw_open = array![[1.0, f64::NAN, 1.0, 1.0, 0.0]];
        let raw_close = array![[1.0, 1.0, 1.0, 1.0, 1.0]];
        let weights = array![[0.1, 0.1, f64::NAN, 0.1, 0.1]];
        let slippage = array![[0.0, 0.0, 0.0, f64::NAN, 0.0]];
        let filled = array![[1.0, 1.0, 1.0, 1.0, 0.0]];
        let m = unlocked_mask(
            raw_open.view(),
            raw_close.view(),
            weights.view(),
            slippage.view(),
            filled.view(),
        );
        assert_eq!(m, array![[true, false, false, false, false]]);
    }

    #[test]
    fn inputs_reject_mismatched_shapes() {
        let w = Array2::<f64>::zeros((3, 2));
        let u = Array2::from_elem((3, 2), true);
        let bad = Array2::<f64>::zeros((2, 2));
        let err = SimInputs::new(w.view(), u.view(), w.view(), bad.view(), w.view(), w.view())
            .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { what: "close", .. }));
    }

    #[test]
    fn no_trading_before_slippage_is_known() {
        // Flat weights of 1 on a steadily rising asset: nothing is traded
        // until the 14-day ATR exists, so early returns are zero.
        let n = 30;
        let prices = Array2::from_shape_fn((n, 1), |(t, _)| 100.0 * 1.01f64.powi(t as i32));
        let data = market(prices.clone(), prices, &["A"]);
        let w = WeightSeries::new(
            data.times().to_vec(),
            vec!["A".into()],
            Array2::from_elem((n, 1), 1.0),
        )
        .unwrap();

        let rr = calc_relative_return(&data, &w, &CostConfig::zero(), false, None).unwrap();
        assert_eq!(rr.times.first().copied(), Some(14 * DAY));
        let series = rr.portfolio().unwrap();
        assert!(series[0].abs() < 1e-12);
        for t in 1..series.len() {
            assert!((series[t] - 0.01).abs() < 1e-9, "t={t}: {}", series[t]);
        }
    }

    #[test]
    fn per_asset_mode_has_asset_columns() {
        let n = 20;
        let prices = Array2::from_shape_fn((n, 2), |(t, a)| 10.0 + (t + a) as f64);
        let data = market(prices.clone(), prices, &["A", "B"]);
        let w = WeightSeries::new(
            data.times().to_vec(),
            vec!["B".into(), "A".into()],
            Array2::from_elem((n, 2), 0.5),
        )
        .unwrap();
        let rr = calc_relative_return(&data, &w, &CostConfig::default(), true, None).unwrap();
        assert!(rr.is_per_asset());
        assert_eq!(rr.assets.as_deref(), Some(&["A".to_string(), "B".to_string()][..]));
        assert_eq!(rr.values.ncols(), 2);
        assert!(rr.values.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn degenerate_inputs_yield_empty_series() {
        let prices = Array2::from_elem((3, 1), 10.0);
        let data = market(prices.clone(), prices, &["A"]);
        let w = WeightSeries::new(vec![0], vec!["A".into()], array![[1.0]]).unwrap();
        let rr = calc_relative_return(&data, &w, &CostConfig::default(), false, None).unwrap();
        assert!(rr.is_empty());
    }

    #[test]
    fn roll_charged_where_roll_is_positive() {
        let n = 30;
        let prices = Array2::from_elem((n, 2), 10.0);
        let mut roll = Array2::zeros((n, 2));
        roll[[20, 0]] = 0.1;
        roll[[22, 0]] = f64::NAN;
        roll[[24, 1]] = f64::NAN;
        let (data, weights) = banded(prices.clone(), prices, &["A", "B"], vec![(Field::Roll, roll)]);
        let costs = CostConfig {
            slippage_factor: 0.0,
            roll_slippage_factor: 0.02,
        };

        let rr = calc_relative_return(&data, &weights, &costs, false, None).unwrap();
        let series = rr.portfolio().unwrap();
        // 0.05 shares of A carried, charged roll 0.1 plus 2% of an ATR of 2
        let day = at(&rr, 20);
        assert!((series[day] + 0.05 * (0.1 + 0.04)).abs() < 1e-12, "{}", series[day]);
        for (t, r) in series.iter().enumerate() {
            if t != day {
                assert!(r.abs() < 1e-12, "t={t}: {r}");
            }
        }
    }

    #[test]
    fn missing_dividends_count_as_zero() {
        let n = 30;
        let prices = Array2::from_elem((n, 1), 10.0);
        let mut divs = Array2::zeros((n, 1));
        divs[[20, 0]] = 0.5;
        divs[[21, 0]] = f64::NAN;
        divs[[25, 0]] = f64::NAN;
        let (data, weights) = banded(prices.clone(), prices, &["A"], vec![(Field::Divs, divs)]);

        let rr = calc_relative_return(&data, &weights, &CostConfig::zero(), false, None).unwrap();
        let series = rr.portfolio().unwrap();
        // 0.1 shares collect 0.5 each on a unit of equity
        assert!((series[at(&rr, 20)] - 0.05).abs() < 1e-12);
        assert_eq!(series[at(&rr, 21)], 0.0);
        assert_eq!(series[at(&rr, 25)], 0.0);
        assert!(series.iter().all(|r| r.is_finite()));
    }

    #[test]
    fn illiquid_day_is_sat_out() {
        // A gains 1% between each open and close; B never moves.
        let n = 30;
        let close = Array2::from_shape_fn((n, 2), |(t, a)| {
            if a == 0 { 100.0 * 1.01f64.powi(t as i32) } else { 50.0 }
        });
        let open = Array2::from_shape_fn((n, 2), |(t, a)| {
            if t == 0 { close[[0, a]] } else { close[[t - 1, a]] }
        });
        let mut liquid = Array2::ones((n, 2));
        liquid[[20, 0]] = 0.0;
        let (data, weights) = banded(open, close, &["A", "B"], vec![(Field::IsLiquid, liquid)]);

        let rr = calc_relative_return(&data, &weights, &CostConfig::zero(), true, None).unwrap();
        let a = rr.values.column(0);
        assert!((a[at(&rr, 19)] - 0.01).abs() < 1e-9);
        assert_eq!(a[at(&rr, 20)], 0.0);
        assert!((a[at(&rr, 21)] - 0.01).abs() < 1e-9);
        assert!(rr.values.column(1).iter().all(|r| r.abs() < 1e-12));
    }
}
