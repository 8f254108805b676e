//! Fuzz the return simulator with arbitrary prices and weights.
//!
//! Whatever the input, `calc_relative_return` must not panic and every
//! relative return it produces must be finite, in both modes.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use ndarray::Array2;
use qnstat::{CostConfig, Field, MarketData, WeightSeries, calc_relative_return};

const DAY: i64 = 86_400;

#[derive(Debug, Arbitrary)]
struct Input {
    n_times: u8,
    n_assets: u8,
    prices: Vec<f64>,
    weights: Vec<f64>,
    divs: Option<Vec<f64>>,
    roll: Option<Vec<f64>>,
    slippage_factor: f64,
    per_asset: bool,
}

fn matrix(shape: (usize, usize), raw: &[f64], fill: f64) -> Array2<f64> {
    Array2::from_shape_fn(shape, |(t, a)| {
        if raw.is_empty() {
            fill
        } else {
            raw[(t * shape.1 + a) % raw.len()]
        }
    })
}

fuzz_target!(|input: Input| {
    let shape = (input.n_times as usize % 40 + 1, input.n_assets as usize % 5 + 1);
    let times: Vec<i64> = (0..shape.0 as i64).map(|d| d * DAY).collect();
    let assets: Vec<String> = (0..shape.1).map(|a| format!("A{a}")).collect();

    let price = matrix(shape, &input.prices, 1.0);
    let mut fields = vec![
        (Field::Open, price.clone()),
        (Field::Close, price.mapv(|p| p * 1.01)),
        (Field::High, price.mapv(|p| p * 1.02)),
        (Field::Low, price.mapv(|p| p * 0.98)),
    ];
    if let Some(divs) = &input.divs {
        fields.push((Field::Divs, matrix(shape, divs, 0.0)));
    }
    if let Some(roll) = &input.roll {
        fields.push((Field::Roll, matrix(shape, roll, 0.0)));
    }
    let Ok(data) = MarketData::from_fields(times.clone(), assets.clone(), fields) else {
        return;
    };
    let Ok(weights) = WeightSeries::new(times, assets, matrix(shape, &input.weights, 0.0)) else {
        return;
    };

    let costs = CostConfig {
        slippage_factor: input.slippage_factor,
        ..CostConfig::default()
    };
    if let Ok(rr) = calc_relative_return(&data, &weights, &costs, input.per_asset, None) {
        assert!(rr.values.iter().all(|r| r.is_finite()), "non-finite return: {rr:?}");
    }
});
