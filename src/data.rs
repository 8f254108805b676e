//! Labeled array schema shared by every component.
//!
//! Market data is a dense `(field, time, asset)` cube of `f64`; portfolio
//! weights are a dense `(time, asset)` matrix. Missing values are NaN.
//! Time labels are Unix timestamps in seconds and are kept sorted
//! ascending by the constructors.

use std::fmt;

use ndarray::{Array2, Array3, ArrayView2, Axis};
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};

/// Unix timestamp in seconds.
pub type Timestamp = i64;

/// Numerical floor used for "effectively zero" comparisons.
pub const EPS: f64 = 1e-7;

/// Named dimensions of the labeled arrays.
pub mod dims {
    pub const FIELD: &str = "field";
    pub const TIME: &str = "time";
    pub const ASSET: &str = "asset";
}

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// A market data field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Field {
    Open,
    Close,
    High,
    Low,
    /// Per-period dividend or cash distribution.
    Divs,
    /// Futures roll cost per share.
    Roll,
    /// 1 when the asset may be traded, 0 otherwise.
    IsLiquid,
}

impl Field {
    /// Fields every market data cube must carry.
    pub const REQUIRED: [Field; 4] = [Field::Open, Field::Close, Field::High, Field::Low];

    pub const ALL: [Field; 7] = [
        Field::Open,
        Field::Close,
        Field::High,
        Field::Low,
        Field::Divs,
        Field::Roll,
        Field::IsLiquid,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Open => "open",
            Field::Close => "close",
            Field::High => "high",
            Field::Low => "low",
            Field::Divs => "divs",
            Field::Roll => "roll",
            Field::IsLiquid => "is_liquid",
        }
    }

    /// Parse a field name (case-insensitive).
    pub fn parse(s: &str) -> Option<Field> {
        let s = s.to_ascii_lowercase();
        Field::ALL.into_iter().find(|f| f.as_str() == s)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn check_unique_assets(assets: &[String]) -> Result<()> {
    let mut seen = FxHashMap::default();
    for a in assets {
        if seen.insert(a.as_str(), ()).is_some() {
            return Err(Error::DuplicateLabel {
                axis: dims::ASSET,
                label: a.clone(),
            });
        }
    }
    Ok(())
}

/// Permutation that sorts `times` ascending; rejects duplicates.
fn sort_order(times: &[Timestamp]) -> Result<Vec<usize>> {
    let mut order: Vec<usize> = (0..times.len()).collect();
    order.sort_by_key(|&i| times[i]);
    for w in order.windows(2) {
        if times[w[0]] == times[w[1]] {
            return Err(Error::DuplicateLabel {
                axis: dims::TIME,
                label: times[w[0]].to_string(),
            });
        }
    }
    Ok(order)
}

fn is_identity(order: &[usize]) -> bool {
    order.iter().enumerate().all(|(i, &j)| i == j)
}

/// Map from label to its position on an axis.
pub(crate) fn label_index<T: std::hash::Hash + Eq + Clone>(labels: &[T]) -> FxHashMap<T, usize> {
    labels
        .iter()
        .enumerate()
        .map(|(i, l)| (l.clone(), i))
        .collect()
}

// ---------------------------------------------------------------------------
// Market data
// ---------------------------------------------------------------------------

/// Historical market data: a `(field, time, asset)` cube.
#[derive(Clone, Debug, PartialEq)]
pub struct MarketData {
    fields: Vec<Field>,
    times: Vec<Timestamp>,
    assets: Vec<String>,
    values: Array3<f64>,
}

impl MarketData {
    /// Build a cube, validating labels and sorting the time axis.
    ///
    /// The required fields (`open`, `close`, `high`, `low`) must be present.
    pub fn new(
        fields: Vec<Field>,
        times: Vec<Timestamp>,
        assets: Vec<String>,
        values: Array3<f64>,
    ) -> Result<Self> {
        let expected = vec![fields.len(), times.len(), assets.len()];
        if values.shape() != expected.as_slice() {
            return Err(Error::ShapeMismatch {
                what: "market data",
                expected,
                actual: values.shape().to_vec(),
            });
        }
        for f in Field::REQUIRED {
            if !fields.contains(&f) {
                return Err(Error::MissingField(f));
            }
        }
        for (i, f) in fields.iter().enumerate() {
            if fields[..i].contains(f) {
                return Err(Error::DuplicateLabel {
                    axis: dims::FIELD,
                    label: f.to_string(),
                });
            }
        }
        check_unique_assets(&assets)?;

        let order = sort_order(&times)?;
        let (times, values) = if is_identity(&order) {
            (times, values)
        } else {
            (
                order.iter().map(|&i| times[i]).collect(),
                values.select(Axis(1), &order),
            )
        };

        Ok(Self {
            fields,
            times,
            assets,
            values,
        })
    }

    /// Build a cube from one `(time, asset)` matrix per field.
    pub fn from_fields(
        times: Vec<Timestamp>,
        assets: Vec<String>,
        matrices: Vec<(Field, Array2<f64>)>,
    ) -> Result<Self> {
        let shape = (times.len(), assets.len());
        let mut values = Array3::from_elem((matrices.len(), shape.0, shape.1), f64::NAN);
        let mut fields = Vec::with_capacity(matrices.len());
        for (i, (field, m)) in matrices.into_iter().enumerate() {
            if m.dim() != shape {
                return Err(Error::ShapeMismatch {
                    what: "field matrix",
                    expected: vec![shape.0, shape.1],
                    actual: m.shape().to_vec(),
                });
            }
            values.index_axis_mut(Axis(0), i).assign(&m);
            fields.push(field);
        }
        Self::new(fields, times, assets, values)
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn times(&self) -> &[Timestamp] {
        &self.times
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Raw `(field, time, asset)` values.
    pub fn values(&self) -> &Array3<f64> {
        &self.values
    }

    pub fn n_times(&self) -> usize {
        self.times.len()
    }

    pub fn n_assets(&self) -> usize {
        self.assets.len()
    }

    pub fn has(&self, field: Field) -> bool {
        self.fields.contains(&field)
    }

    /// The `(time, asset)` matrix of one field, if present.
    pub fn field(&self, field: Field) -> Option<ArrayView2<'_, f64>> {
        self.fields
            .iter()
            .position(|&f| f == field)
            .map(|i| self.values.index_axis(Axis(0), i))
    }

    /// Like [`field`](Self::field) but reports a missing field as an error.
    pub fn require(&self, field: Field) -> Result<ArrayView2<'_, f64>> {
        self.field(field).ok_or(Error::MissingField(field))
    }

    /// Sub-cube at the given time and asset positions (in that order).
    pub fn select(&self, time_idx: &[usize], asset_idx: &[usize]) -> MarketData {
        let values = self
            .values
            .select(Axis(1), time_idx)
            .select(Axis(2), asset_idx);
        MarketData {
            fields: self.fields.clone(),
            times: time_idx.iter().map(|&i| self.times[i]).collect(),
            assets: asset_idx.iter().map(|&i| self.assets[i].clone()).collect(),
            values,
        }
    }
}

// ---------------------------------------------------------------------------
// Weights
// ---------------------------------------------------------------------------

/// Portfolio weights over time: a `(time, asset)` matrix.
///
/// NaN means "no target" for that asset on that day.
#[derive(Clone, Debug, PartialEq)]
pub struct WeightSeries {
    times: Vec<Timestamp>,
    assets: Vec<String>,
    values: Array2<f64>,
}

impl WeightSeries {
    /// Build a weight matrix, validating labels and sorting the time axis.
    pub fn new(times: Vec<Timestamp>, assets: Vec<String>, values: Array2<f64>) -> Result<Self> {
        if values.dim() != (times.len(), assets.len()) {
            return Err(Error::ShapeMismatch {
                what: "weights",
                expected: vec![times.len(), assets.len()],
                actual: values.shape().to_vec(),
            });
        }
        check_unique_assets(&assets)?;

        let order = sort_order(&times)?;
        let (times, values) = if is_identity(&order) {
            (times, values)
        } else {
            (
                order.iter().map(|&i| times[i]).collect(),
                values.select(Axis(0), &order),
            )
        };

        Ok(Self {
            times,
            assets,
            values,
        })
    }

    pub(crate) fn from_parts(times: Vec<Timestamp>, assets: Vec<String>, values: Array2<f64>) -> Self {
        debug_assert_eq!(values.dim(), (times.len(), assets.len()));
        Self {
            times,
            assets,
            values,
        }
    }

    pub fn times(&self) -> &[Timestamp] {
        &self.times
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn n_times(&self) -> usize {
        self.times.len()
    }

    pub fn n_assets(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Shift values one step forward in time and drop the first point.
    ///
    /// The weights decided on day `t-1` become the targets traded on day `t`.
    pub fn shift_forward(&self) -> WeightSeries {
        let n = self.times.len();
        if n < 2 {
            return WeightSeries::from_parts(
                Vec::new(),
                self.assets.clone(),
                Array2::zeros((0, self.assets.len())),
            );
        }
        let values = self.values.slice(ndarray::s![..n - 1, ..]).to_owned();
        WeightSeries::from_parts(self.times[1..].to_vec(), self.assets.clone(), values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn field_parse_roundtrip() {
        for f in Field::ALL {
            assert_eq!(Field::parse(f.as_str()), Some(f));
        }
        assert_eq!(Field::parse("CLOSE"), Some(Field::Close));
        assert_eq!(Field::parse("volume"), None);
    }

    #[test]
    fn market_data_requires_ohlc() {
        let err = MarketData::from_fields(
            vec![1, 2],
            names(&["A"]),
            vec![(Field::Open, array![[1.0], [2.0]])],
        )
        .unwrap_err();
        assert_eq!(err, Error::MissingField(Field::Close));
    }

    #[test]
    fn market_data_sorts_time() {
        let m = array![[2.0], [1.0]];
        let data = MarketData::from_fields(
            vec![20, 10],
            names(&["A"]),
            vec![
                (Field::Open, m.clone()),
                (Field::Close, m.clone()),
                (Field::High, m.clone()),
                (Field::Low, m),
            ],
        )
        .unwrap();
        assert_eq!(data.times(), &[10, 20]);
        assert_eq!(data.field(Field::Close).unwrap()[[0, 0]], 1.0);
        assert!(data.field(Field::Roll).is_none());
    }

    #[test]
    fn shape_mismatch_rejected() {
        let err = WeightSeries::new(vec![1, 2], names(&["A"]), array![[1.0, 2.0]]).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn duplicate_labels_rejected() {
        let err = WeightSeries::new(vec![1, 1], names(&["A"]), array![[1.0], [2.0]]).unwrap_err();
        assert!(matches!(err, Error::DuplicateLabel { axis: "time", .. }));
        let err = WeightSeries::new(vec![1], names(&["A", "A"]), array![[1.0, 2.0]]).unwrap_err();
        assert!(matches!(err, Error::DuplicateLabel { axis: "asset", .. }));
    }

    #[test]
    fn shift_forward_drops_first_point() {
        let w = WeightSeries::new(vec![1, 2, 3], names(&["A"]), array![[0.1], [0.2], [0.3]]).unwrap();
        let s = w.shift_forward();
        assert_eq!(s.times(), &[2, 3]);
        assert_eq!(s.values(), &array![[0.1], [0.2]]);

        let single = WeightSeries::new(vec![1], names(&["A"]), array![[0.1]]).unwrap();
        assert!(single.shift_forward().is_empty());
    }
}
