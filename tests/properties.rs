//! Property tests for the aligner and the simulator.

use ndarray::Array2;
use proptest::prelude::*;
use qnstat::simulate::{SimInputs, simulate_per_asset, simulate_portfolio};
use qnstat::{Field, MarketData, WeightSeries, arrange_data};

const DAY: i64 = 86_400;

/// A small universe: `(days, assets, opens, closes, weights, unlocked)`.
fn universe() -> impl Strategy<Value = (usize, usize, Vec<f64>, Vec<f64>, Vec<f64>, Vec<bool>)> {
    (1usize..25, 1usize..5).prop_flat_map(|(days, assets)| {
        let n = days * assets;
        (
            Just(days),
            Just(assets),
            prop::collection::vec(1.0f64..200.0, n),
            prop::collection::vec(1.0f64..200.0, n),
            prop::collection::vec(-1.5f64..1.5, n),
            prop::collection::vec(prop::bool::weighted(0.8), n),
        )
    })
}

fn grid(days: usize, assets: usize, v: Vec<f64>) -> Array2<f64> {
    Array2::from_shape_vec((days, assets), v).unwrap()
}

proptest! {
    #[test]
    fn zero_weights_never_move_equity((days, assets, open, close, _, unlocked) in universe()) {
        let open = grid(days, assets, open);
        let close = grid(days, assets, close);
        let unlocked = Array2::from_shape_vec((days, assets), unlocked).unwrap();
        let weights = Array2::zeros((days, assets));
        let slippage = Array2::from_elem((days, assets), 0.1);
        let divs = Array2::zeros((days, assets));
        let inputs = SimInputs::new(
            weights.view(), unlocked.view(), open.view(), close.view(), slippage.view(), divs.view(),
        ).unwrap();

        for r in simulate_portfolio(&inputs).relative_returns() {
            prop_assert!(r.abs() < 1e-12);
        }
        for r in simulate_per_asset(&inputs).relative_returns() {
            prop_assert!(r.abs() < 1e-12);
        }
    }

    #[test]
    fn simulation_is_deterministic_and_locks_hold(
        (days, assets, open, close, weights, unlocked) in universe(),
        locked in 0usize..5,
    ) {
        let open = grid(days, assets, open);
        let close = grid(days, assets, close);
        let weights = grid(days, assets, weights);
        let mut unlocked = Array2::from_shape_vec((days, assets), unlocked).unwrap();
        let locked = locked % assets;
        unlocked.column_mut(locked).fill(false);
        let slippage = Array2::from_elem((days, assets), 0.05);
        let divs = Array2::zeros((days, assets));
        let inputs = SimInputs::new(
            weights.view(), unlocked.view(), open.view(), close.view(), slippage.view(), divs.view(),
        ).unwrap();

        let first = simulate_portfolio(&inputs);
        prop_assert_eq!(&first, &simulate_portfolio(&inputs));
        prop_assert!(first.shares.column(locked).iter().all(|&n| n == 0.0));

        let per_asset = simulate_per_asset(&inputs);
        prop_assert_eq!(&per_asset, &simulate_per_asset(&inputs));
        prop_assert!(per_asset.shares.column(locked).iter().all(|&n| n == 0.0));
        prop_assert!(per_asset.relative_returns().iter().all(|r| r.is_finite()));
    }

    #[test]
    fn arranged_weights_respect_exposure_limits(
        (days, assets, _, _, weights, _) in universe(),
        liquid in prop::collection::vec(prop::bool::weighted(0.9), 100),
        per_asset in any::<bool>(),
    ) {
        let times: Vec<i64> = (0..days as i64).map(|d| d * DAY).collect();
        let names: Vec<String> = (0..assets).map(|a| format!("A{a}")).collect();
        let ones = Array2::ones((days, assets));
        let is_liquid = Array2::from_shape_fn((days, assets), |(t, a)| {
            if liquid[(t * assets + a) % liquid.len()] { 1.0 } else { 0.0 }
        });
        let data = MarketData::from_fields(
            times.clone(),
            names.clone(),
            vec![
                (Field::Open, ones.clone()),
                (Field::Close, ones.clone()),
                (Field::High, ones.clone()),
                (Field::Low, ones),
                (Field::IsLiquid, is_liquid.clone()),
            ],
        ).unwrap();
        let weights = WeightSeries::new(times, names, grid(days, assets, weights)).unwrap();

        let arranged = arrange_data(&data, &weights, None, per_asset);
        let w = arranged.weights.values();
        prop_assert_eq!(w.dim(), (days, assets));
        for (t, row) in w.rows().into_iter().enumerate() {
            if per_asset {
                prop_assert!(row.iter().all(|v| v.abs() <= 1.0));
            } else {
                let gross: f64 = row.iter().map(|v| v.abs()).sum();
                prop_assert!(gross <= 1.0 + 1e-9);
            }
            for (a, &v) in row.iter().enumerate() {
                if is_liquid[[t, a]] == 0.0 {
                    prop_assert_eq!(v, 0.0);
                }
            }
        }
    }
}
