//! Submission registry access.
//!
//! Two round trips: list the submissions to compare against, then post the
//! checked return series with those ids and receive one cofactor per
//! correlated submission. The series travels as base64 of gzipped JSON.

use std::io::Write;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::{Deserialize, Deserializer, Serialize};

use qnstat::Timestamp;

use crate::config::CorrelationConfig;
use crate::error::Result;

/// Accept both numeric and string ids.
fn id_string<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    match serde_json::Value::deserialize(d)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "invalid submission id: {other}"
        ))),
    }
}

/// A strategy already known to the registry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Submitted by the checking participant.
    #[serde(default)]
    pub my: bool,
}

/// Correlation of the checked series with one submission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cofactor {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub cofactor: f64,
    pub sharpe_ratio: f64,
}

/// Source of submissions and cofactors.
pub trait SubmissionRegistry {
    fn fetch_submissions(&self) -> Result<Vec<Submission>>;

    /// `relative_returns` is the output of [`encode_returns`].
    fn fetch_cofactors(
        &self,
        relative_returns: &str,
        submission_ids: &[String],
    ) -> Result<Vec<Cofactor>>;
}

#[derive(Serialize)]
struct ReturnSeries<'a> {
    time: &'a [Timestamp],
    values: Vec<Option<f64>>,
}

/// Gzip and base64-encode a return series as JSON `{time, values}`, NaN
/// written as `null`.
pub fn encode_returns(times: &[Timestamp], values: impl IntoIterator<Item = f64>) -> Result<String> {
    let series = ReturnSeries {
        time: times,
        values: values
            .into_iter()
            .map(|v| v.is_finite().then_some(v))
            .collect(),
    };
    let json = serde_json::to_vec(&series)?;
    let mut gz = GzEncoder::new(Vec::new(), Compression::default());
    gz.write_all(&json)?;
    Ok(STANDARD.encode(gz.finish()?))
}

#[derive(Serialize)]
struct CofactorRequest<'a> {
    relative_returns: &'a str,
    submission_ids: &'a [String],
}

/// Blocking HTTP client for the registry.
#[derive(Debug, Clone)]
pub struct HttpRegistry {
    config: CorrelationConfig,
    client: reqwest::blocking::Client,
}

impl HttpRegistry {
    pub fn new(config: CorrelationConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &CorrelationConfig {
        &self.config
    }
}

impl SubmissionRegistry for HttpRegistry {
    fn fetch_submissions(&self) -> Result<Vec<Submission>> {
        log::debug!("fetching submissions from {}", self.config.engine_url);
        let submissions = self
            .client
            .get(&self.config.engine_url)
            .query(&[("participantId", self.config.participant_id.as_str())])
            .send()?
            .error_for_status()?
            .json()?;
        Ok(submissions)
    }

    fn fetch_cofactors(
        &self,
        relative_returns: &str,
        submission_ids: &[String],
    ) -> Result<Vec<Cofactor>> {
        log::debug!(
            "requesting cofactors for {} submissions from {}",
            submission_ids.len(),
            self.config.statan_url
        );
        let cofactors = self
            .client
            .post(&self.config.statan_url)
            .json(&CofactorRequest {
                relative_returns,
                submission_ids,
            })
            .send()?
            .error_for_status()?
            .json()?;
        Ok(cofactors)
    }
}
