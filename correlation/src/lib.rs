//! # qnstat-correlation
//!
//! Checks a strategy's relative returns against the strategies already
//! submitted to a remote registry.
//!
//! The registry is reached through the [`SubmissionRegistry`] trait;
//! [`HttpRegistry`] is the blocking HTTP implementation, configured by an
//! explicit [`CorrelationConfig`]. Failures never propagate out of
//! [`calc_correlation`]: they are logged and reported as "no correlated
//! strategies".

pub mod config;
pub mod error;
pub mod registry;
pub mod report;

pub use config::CorrelationConfig;
pub use error::{Error, Result};
pub use registry::{Cofactor, HttpRegistry, Submission, SubmissionRegistry, encode_returns};
pub use report::{CorrelatedSubmission, CorrelationReport, calc_correlation, check_correlation};
