//! Fuzz the aligner with overlapping, partial time and asset axes.
//!
//! The arranged weights must be finite, on the data grid, and hold at most
//! 100% gross exposure per day in aggregate mode (at most 100% per asset in
//! per-asset mode).

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use ndarray::Array2;
use qnstat::{Field, MarketData, WeightSeries, arrange_data};

#[derive(Debug, Arbitrary)]
struct Input {
    data_times: Vec<i16>,
    weight_times: Vec<i16>,
    data_assets: u8,
    weight_assets: u8,
    weights: Vec<f64>,
    liquid: Option<Vec<f64>>,
    per_asset: bool,
}

fn dedup(raw: &[i16]) -> Vec<i64> {
    let mut t: Vec<i64> = raw.iter().take(64).map(|&d| d as i64 * 86_400).collect();
    t.sort_unstable();
    t.dedup();
    t
}

fn cycle(shape: (usize, usize), raw: &[f64], fill: f64) -> Array2<f64> {
    Array2::from_shape_fn(shape, |(t, a)| {
        if raw.is_empty() {
            fill
        } else {
            raw[(t * shape.1 + a) % raw.len()]
        }
    })
}

fuzz_target!(|input: Input| {
    let data_times = dedup(&input.data_times);
    let weight_times = dedup(&input.weight_times);
    let data_assets: Vec<String> = (0..input.data_assets % 6).map(|a| format!("A{a}")).collect();
    // Offset by one so the asset sets overlap only partially.
    let weight_assets: Vec<String> = (0..input.weight_assets % 6).map(|a| format!("A{}", a + 1)).collect();

    let shape = (data_times.len(), data_assets.len());
    let ones = Array2::ones(shape);
    let mut fields = vec![
        (Field::Open, ones.clone()),
        (Field::Close, ones.clone()),
        (Field::High, ones.clone()),
        (Field::Low, ones),
    ];
    if let Some(liquid) = &input.liquid {
        fields.push((Field::IsLiquid, cycle(shape, liquid, 1.0)));
    }
    let Ok(data) = MarketData::from_fields(data_times, data_assets, fields) else {
        return;
    };
    let values = cycle((weight_times.len(), weight_assets.len()), &input.weights, 0.0);
    let Ok(weights) = WeightSeries::new(weight_times, weight_assets, values) else {
        return;
    };

    let arranged = arrange_data(&data, &weights, None, input.per_asset);
    let w = arranged.weights.values();
    assert_eq!(w.dim(), (arranged.data.n_times(), arranged.data.n_assets()));
    assert!(arranged.data.times().windows(2).all(|p| p[0] < p[1]));
    assert!(w.iter().all(|v| v.is_finite()));
    if input.per_asset {
        assert!(w.iter().all(|v| v.abs() <= 1.0));
    } else {
        for row in w.rows() {
            let gross: f64 = row.iter().map(|v| v.abs()).sum();
            assert!(gross <= 1.0 + 1e-9, "gross exposure {gross}");
        }
    }
});
