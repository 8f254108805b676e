//! # qnstat-risk
//!
//! Checks over a target-weight history that do not need market data:
//!
//! - [`exposure`]: per-position concentration against soft and hard limits
//! - [`sector`]: capital split across sectors, with the uninvested rest as
//!   cash
//!
//! Both are advisory. They report and log; they never fail.

pub mod exposure;
pub mod sector;

pub use exposure::{ExposureBreach, ExposureLimits, ExposureReport, calc_exposure, check_exposure};
pub use sector::{CASH_SECTOR, OTHER_SECTOR, SectorDistribution, calc_sector_distribution};
