//! Registry endpoints and identity.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_ENGINE_URL: &str = "http://localhost:8080/referee/submission/forCorrelation";
pub const DEFAULT_STATAN_URL: &str = "http://localhost:8081/statan/correlation";
pub const DEFAULT_PARTICIPANT_ID: &str = "0";

/// Where the registry lives and who is asking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Lists the submissions to compare against.
    pub engine_url: String,
    /// Computes cofactors for a posted return series.
    pub statan_url: String,
    pub participant_id: String,
    pub timeout_secs: u64,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            engine_url: DEFAULT_ENGINE_URL.to_string(),
            statan_url: DEFAULT_STATAN_URL.to_string(),
            participant_id: DEFAULT_PARTICIPANT_ID.to_string(),
            timeout_secs: 30,
        }
    }
}

fn lookup_str(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    lookup(name)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl CorrelationConfig {
    /// Read `ENGINE_CORRELATION_URL`, `STATAN_CORRELATION_URL`,
    /// `PARTICIPANT_ID` and `CORRELATION_TIMEOUT_SECS`, falling back to the
    /// defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            engine_url: lookup_str(&lookup, "ENGINE_CORRELATION_URL", DEFAULT_ENGINE_URL),
            statan_url: lookup_str(&lookup, "STATAN_CORRELATION_URL", DEFAULT_STATAN_URL),
            participant_id: lookup_str(&lookup, "PARTICIPANT_ID", DEFAULT_PARTICIPANT_ID),
            timeout_secs: lookup("CORRELATION_TIMEOUT_SECS")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.timeout_secs),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
