//! # qnstat
//!
//! Backtest statistics for strategies expressed as target portfolio weights.
//!
//! Given market data and a history of target weights, the crate simulates
//! the realized returns of trading those weights, net of slippage, roll
//! costs and trading locks, and derives a suite of rolling performance
//! statistics from them.
//!
//! ## Pipeline
//!
//! ```text
//! MarketData + WeightSeries
//!     -> arrange_data         common sorted grid, normalized weights
//!     -> calc_slippage        ATR-based cost per share
//!     -> calc_relative_return day-by-day equity simulation
//!     -> calc_stat            equity, volatility, drawdown, Sharpe, ...
//! ```
//!
//! ## Example
//!
//! ```
//! use ndarray::Array2;
//! use qnstat::{CostConfig, Field, MarketData, StatField, StatsConfig, WeightSeries, calc_stat};
//!
//! let days = 40;
//! let close = Array2::from_shape_fn((days, 1), |(t, _)| 100.0 * 1.001f64.powi(t as i32));
//! let times: Vec<i64> = (0..days as i64).map(|d| d * 86_400).collect();
//! let data = MarketData::from_fields(
//!     times.clone(),
//!     vec!["AAPL".to_string()],
//!     vec![
//!         (Field::Open, close.clone()),
//!         (Field::High, &close * 1.01),
//!         (Field::Low, &close * 0.99),
//!         (Field::Close, close),
//!     ],
//! )?;
//! let weights = WeightSeries::new(times, vec!["AAPL".to_string()], Array2::ones((days, 1)))?;
//!
//! let stats = calc_stat(&data, &weights, &CostConfig::default(), &StatsConfig::default())?;
//! let equity = stats.last(StatField::Equity).unwrap();
//! assert!(equity[0] > 1.0);
//! # Ok::<(), qnstat::Error>(())
//! ```
//!
//! ## Features
//!
//! - `serde`: serialization of schema, configuration and field types
//! - `persistence`: `Statistics::save_json` / `Statistics::load_json`
//! - `parallel`: per-asset simulation across assets with rayon

pub mod arrange;
pub mod checks;
pub mod data;
pub mod error;
pub mod periods;
pub mod position;
pub mod rolling;
pub mod simulate;
pub mod slippage;
pub mod stats;

pub use arrange::{Arranged, AuxSeries, arrange_data};
pub use checks::{NonLiquid, calc_non_liquid, find_missed_dates};
pub use data::{EPS, Field, MarketData, Timestamp, WeightSeries};
pub use error::{Error, Result};
pub use periods::{calc_avg_points_per_year, calc_points_per_day};
pub use position::PositionChange;
pub use simulate::{CostConfig, RelativeReturns, SimInputs, calc_relative_return};
pub use slippage::{SlippageConfig, calc_slippage};
pub use stats::{StatField, Statistics, StatsConfig, calc_stat};
