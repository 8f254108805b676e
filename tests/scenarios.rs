//! End-to-end scenarios over the simulator and the statistics pipeline.

use ndarray::{Array2, array};
use qnstat::simulate::{SimInputs, simulate_per_asset, simulate_portfolio};
use qnstat::stats::{HoldingTracker, calc_max_drawdown, calc_underwater};
use qnstat::{
    CostConfig, Field, MarketData, StatField, StatsConfig, WeightSeries, calc_non_liquid,
    calc_relative_return, calc_stat,
};

const DAY: i64 = 86_400;

/// Day-aligned simulator inputs owned in one place.
struct Fixture {
    weights: Array2<f64>,
    unlocked: Array2<bool>,
    open: Array2<f64>,
    close: Array2<f64>,
    slippage: Array2<f64>,
    divs: Array2<f64>,
}

impl Fixture {
    fn new(weights: Array2<f64>, open: Array2<f64>, close: Array2<f64>) -> Self {
        let dim = weights.raw_dim();
        Self {
            unlocked: Array2::from_elem(dim.clone(), true),
            slippage: Array2::zeros(dim.clone()),
            divs: Array2::zeros(dim),
            weights,
            open,
            close,
        }
    }

    fn inputs(&self) -> SimInputs<'_> {
        SimInputs::new(
            self.weights.view(),
            self.unlocked.view(),
            self.open.view(),
            self.close.view(),
            self.slippage.view(),
            self.divs.view(),
        )
        .unwrap()
    }
}

fn rising(days: usize, assets: usize, rate: f64) -> Array2<f64> {
    Array2::from_shape_fn((days, assets), |(t, _)| 100.0 * (1.0 + rate).powi(t as i32))
}

fn assert_close(actual: &[f64], expected: &[f64], tol: f64) {
    assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < tol, "{actual:?} vs {expected:?}");
    }
}

#[test]
fn two_assets_one_locked_five_days() {
    let prices = rising(5, 2, 0.01);
    let weights = Array2::from_shape_fn((5, 2), |(_, a)| if a == 0 { 1.0 } else { 0.0 });
    let mut fx = Fixture::new(weights, prices.clone(), prices);
    fx.unlocked.column_mut(1).fill(false);

    let trace = simulate_portfolio(&fx.inputs());
    assert_close(
        &trace.relative_returns().to_vec(),
        &[0.0, 0.01, 0.01, 0.01, 0.01],
        1e-12,
    );
    assert!(trace.shares.column(1).iter().all(|&n| n == 0.0));
}

#[test]
fn zero_weights_give_zero_returns() {
    let open = rising(20, 3, 0.02);
    let close = open.mapv(|p| p * 0.97);
    let mut fx = Fixture::new(Array2::zeros((20, 3)), open, close);
    fx.slippage.fill(0.5);

    let aggregate = simulate_portfolio(&fx.inputs()).relative_returns();
    assert!(aggregate.iter().all(|r| r.abs() < 1e-15));
    let per_asset = simulate_per_asset(&fx.inputs()).relative_returns();
    assert!(per_asset.iter().all(|r| r.abs() < 1e-15));
}

#[test]
fn constant_weight_compounds_like_buy_and_hold() {
    let close = array![[100.0], [102.0], [99.0], [101.0], [105.0], [104.0]];
    let w = 0.5;
    let fx = Fixture::new(Array2::from_elem((6, 1), w), close.clone(), close.clone());

    let mut expected = vec![0.0];
    for t in 1..6 {
        expected.push(w * (close[[t, 0]] / close[[t - 1, 0]] - 1.0));
    }
    assert_close(
        &simulate_portfolio(&fx.inputs()).relative_returns().to_vec(),
        &expected,
        1e-12,
    );
    assert_close(
        &simulate_per_asset(&fx.inputs()).relative_returns().column(0).to_vec(),
        &expected,
        1e-12,
    );
}

#[test]
fn reruns_are_bit_identical() {
    let open = Array2::from_shape_fn((30, 4), |(t, a)| 10.0 + ((t * 3 + a * 5) % 7) as f64);
    let close = open.mapv(|p| p * 1.003);
    let weights = Array2::from_shape_fn((30, 4), |(t, a)| ((t + a) % 5) as f64 * 0.1 - 0.2);
    let mut fx = Fixture::new(weights, open, close);
    fx.slippage.fill(0.01);
    fx.unlocked[[10, 2]] = false;

    assert_eq!(simulate_portfolio(&fx.inputs()), simulate_portfolio(&fx.inputs()));
    assert_eq!(simulate_per_asset(&fx.inputs()), simulate_per_asset(&fx.inputs()));
}

#[test]
fn locked_asset_never_trades() {
    let open = rising(15, 3, 0.005);
    let weights = Array2::from_elem((15, 3), 0.3);
    let mut fx = Fixture::new(weights, open.clone(), open);
    fx.unlocked.column_mut(1).fill(false);

    let portfolio = simulate_portfolio(&fx.inputs());
    assert!(portfolio.shares.column(1).iter().all(|&n| n == 0.0));
    let per_asset = simulate_per_asset(&fx.inputs());
    assert!(per_asset.shares.column(1).iter().all(|&n| n == 0.0));
    assert!(per_asset.equity_tonight.column(1).iter().all(|&e| e == 1.0));
}

#[test]
fn drawdown_of_known_equity() {
    let equity = array![[1.0], [1.1], [0.99], [1.05]];
    let underwater = calc_underwater(equity.view());
    assert_close(
        &underwater.column(0).to_vec(),
        &[0.0, 0.0, -0.1, 1.05 / 1.1 - 1.0],
        1e-12,
    );
    let dd = calc_max_drawdown(underwater.view());
    assert_close(&dd.column(0).to_vec(), &[0.0, 0.0, -0.1, -0.1], 1e-12);
}

#[test]
fn holding_time_of_a_round_trip() {
    for k in 1..6 {
        let mut tracker = HoldingTracker::new();
        tracker.tick();
        assert_eq!(tracker.update(1.0), None);
        let mut entries = Vec::new();
        for _ in 0..k - 1 {
            tracker.tick();
            entries.extend(tracker.update(1.0));
        }
        tracker.tick();
        entries.extend(tracker.update(0.0));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].duration, k as f64);
        assert_eq!(entries[0].cost, 1.0);
    }
}

fn market(days: usize, close: Array2<f64>, assets: &[&str]) -> MarketData {
    MarketData::from_fields(
        (0..days as i64).map(|d| d * DAY).collect(),
        assets.iter().map(|a| a.to_string()).collect(),
        vec![
            (Field::Open, close.clone()),
            (Field::High, close.mapv(|p| p + 1.0)),
            (Field::Low, close.mapv(|p| p - 1.0)),
            (Field::Close, close),
        ],
    )
    .unwrap()
}

#[test]
fn pipeline_statistics_are_consistent() {
    let days = 60;
    let close = Array2::from_shape_fn((days, 2), |(t, a)| 50.0 + t as f64 * (a as f64 + 0.5));
    let data = market(days, close, &["A", "B"]);
    let weights = WeightSeries::new(
        (0..days as i64).map(|d| d * DAY).collect(),
        vec!["A".into(), "B".into()],
        Array2::from_elem((days, 2), 0.5),
    )
    .unwrap();

    let stats = calc_stat(&data, &weights, &CostConfig::default(), &StatsConfig::default()).unwrap();
    assert!(!stats.is_empty());

    let rr = calc_relative_return(&data, &weights, &CostConfig::default(), false, None).unwrap();
    assert_eq!(stats.times(), rr.times.as_slice());

    let equity = stats.series(StatField::Equity).unwrap();
    let returns = stats.series(StatField::RelativeReturn).unwrap();
    let mut e = 1.0;
    for (r, eq) in returns.iter().zip(equity) {
        e *= 1.0 + r;
        assert!((e - eq).abs() < 1e-9);
    }

    // Prices only rise, so the book never draws down by more than its costs.
    let dd = stats.last(StatField::MaxDrawdown).unwrap()[0];
    assert!(dd <= 0.0 && dd > -0.01);
    let bias = stats.series(StatField::Bias).unwrap();
    assert!(bias.iter().all(|&b| (b - 1.0).abs() < 1e-12));
    assert_eq!(stats.last(StatField::Instruments).unwrap()[0], 2.0);
    assert!(stats.last(StatField::SharpeRatio).unwrap()[0] > 0.0);
}

#[test]
fn disjoint_inputs_give_empty_results() {
    let data = market(20, Array2::from_elem((20, 1), 10.0), &["A"]);
    let weights = WeightSeries::new(
        (100..120).map(|d| d * DAY).collect(),
        vec!["A".into()],
        Array2::ones((20, 1)),
    )
    .unwrap();
    let stats = calc_stat(&data, &weights, &CostConfig::default(), &StatsConfig::default()).unwrap();
    assert!(stats.is_empty());
}

#[test]
fn illiquid_weights_are_flagged_without_stopping_stats() {
    let days = 40;
    let close = Array2::from_shape_fn((days, 2), |(t, _)| 50.0 + t as f64);
    let mut is_liquid = Array2::ones((days, 2));
    is_liquid[[30, 1]] = 0.0;
    let base = market(days, close, &["A", "B"]);
    let mut fields: Vec<(Field, Array2<f64>)> = [Field::Open, Field::Close, Field::High, Field::Low]
        .into_iter()
        .map(|f| (f, base.require(f).unwrap().to_owned()))
        .collect();
    fields.push((Field::IsLiquid, is_liquid));
    let data = MarketData::from_fields(base.times().to_vec(), base.assets().to_vec(), fields).unwrap();
    let weights = WeightSeries::new(
        base.times().to_vec(),
        vec!["A".into(), "B".into()],
        Array2::from_elem((days, 2), 0.5),
    )
    .unwrap();

    let flagged = calc_non_liquid(&data, &weights).unwrap();
    assert_eq!(flagged.times, vec![30 * DAY]);
    assert_eq!(flagged.assets, vec!["B".to_string()]);
    assert_eq!(flagged.values[[0, 0]], 0.5);

    // the check is advisory: statistics are still produced
    let stats = calc_stat(&data, &weights, &CostConfig::default(), &StatsConfig::default()).unwrap();
    assert!(!stats.is_empty());
    assert!(stats.series(StatField::Equity).unwrap().iter().all(|e| e.is_finite()));
}
