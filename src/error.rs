//! Error types for schema construction.
//!
//! Numerical degeneracies inside the simulator and the statistics library
//! are never reported here: they are substituted (locked asset, skipped
//! trade, zeroed return). Only malformed inputs are rejected.

use thiserror::Error;

use crate::data::Field;

/// Errors raised while building or reading the labeled arrays.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// Label lengths do not match the value array dimensions.
    #[error("shape mismatch for {what}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// A field the computation needs is not present in the market data.
    #[error("market data has no `{0}` field")]
    MissingField(Field),

    /// The same label appears twice on one axis.
    #[error("duplicate {axis} label: {label}")]
    DuplicateLabel { axis: &'static str, label: String },

    /// JSON (de)serialization failed.
    #[cfg(feature = "persistence")]
    #[error("json: {0}")]
    Json(String),

    /// File I/O failed.
    #[cfg(feature = "persistence")]
    #[error("io: {0}")]
    Io(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
