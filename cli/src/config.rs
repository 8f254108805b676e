//! TOML configuration for every report.
//!
//! ```toml
//! [costs]
//! slippage_factor = 0.05
//!
//! [stats]
//! per_asset = true
//!
//! [exposure]
//! hard_limit = 0.15
//!
//! [correlation]
//! participant_id = "42"
//! ```
//!
//! Every section and key is optional. The correlation section starts from
//! the environment (`ENGINE_CORRELATION_URL`, ...) and file values override
//! it.

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use qnstat::{CostConfig, StatsConfig};
use qnstat_correlation::CorrelationConfig;
use qnstat_risk::ExposureLimits;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub costs: CostConfig,
    pub stats: StatsConfig,
    pub exposure: ExposureLimits,
    /// Keys present in the file; missing ones come from the environment.
    correlation: Option<toml::Table>,
}

impl Config {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    /// `path`, or the defaults when no file is given.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    /// Registry settings: `base` overridden by the `[correlation]` section.
    pub fn correlation(&self, base: CorrelationConfig) -> Result<CorrelationConfig> {
        let Some(section) = &self.correlation else {
            return Ok(base);
        };
        let toml::Value::Table(mut merged) = toml::Value::try_from(&base)? else {
            bail!("correlation settings do not serialize to a table");
        };
        for (k, v) in section {
            merged.insert(k.clone(), v.clone());
        }
        Ok(toml::Value::Table(merged).try_into()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_is_default() {
        let cfg = Config::parse("").unwrap();
        assert_eq!(cfg.costs, CostConfig::default());
        assert_eq!(cfg.stats, StatsConfig::default());
        assert_eq!(cfg.exposure, ExposureLimits::default());
        assert_eq!(
            cfg.correlation(CorrelationConfig::default()).unwrap(),
            CorrelationConfig::default()
        );
    }

    #[test]
    fn sections_override_defaults() {
        let cfg = Config::parse(
            r#"
            [costs]
            slippage_factor = 0.1

            [stats]
            per_asset = true
            max_periods = 20

            [exposure]
            hard_limit = 0.15

            [correlation]
            participant_id = "42"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.costs.slippage_factor, 0.1);
        assert_eq!(cfg.costs.roll_slippage_factor, 0.02);
        assert!(cfg.stats.per_asset);
        assert_eq!(cfg.stats.max_periods, Some(20));
        assert_eq!(cfg.exposure.hard_limit, 0.15);
        assert_eq!(cfg.exposure.soft_limit, 0.05);

        let base = CorrelationConfig {
            engine_url: "http://engine".into(),
            ..CorrelationConfig::default()
        };
        let corr = cfg.correlation(base).unwrap();
        assert_eq!(corr.participant_id, "42");
        assert_eq!(corr.engine_url, "http://engine");
    }

    #[test]
    fn unknown_types_are_rejected() {
        assert!(Config::parse("[costs]\nslippage_factor = \"high\"").is_err());
    }
}
