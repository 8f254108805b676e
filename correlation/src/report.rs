//! Correlation verdicts.

use std::fmt;

use qnstat::stats::calc_sharpe_ratio_annualized;
use qnstat::{
    CostConfig, MarketData, RelativeReturns, WeightSeries, calc_avg_points_per_year,
    calc_relative_return,
};

use crate::error::{Error, Result};
use crate::registry::{Submission, SubmissionRegistry, encode_returns};

/// A registry submission the checked series correlates with.
#[derive(Clone, Debug, PartialEq)]
pub struct CorrelatedSubmission {
    pub submission: Submission,
    pub cofactor: f64,
    pub sharpe_ratio: f64,
}

fn try_correlation(
    registry: &impl SubmissionRegistry,
    returns: &RelativeReturns,
) -> Result<Vec<CorrelatedSubmission>> {
    let series = returns.portfolio().ok_or(Error::PerAsset)?;
    let submissions = registry.fetch_submissions()?;
    let ids: Vec<String> = submissions.iter().map(|s| s.id.clone()).collect();

    let payload = encode_returns(&returns.times, series.iter().copied())?;
    let cofactors = registry.fetch_cofactors(&payload, &ids)?;

    cofactors
        .into_iter()
        .map(|c| {
            let submission = submissions
                .iter()
                .find(|s| s.id == c.id)
                .cloned()
                .ok_or_else(|| Error::UnknownSubmission(c.id.clone()))?;
            Ok(CorrelatedSubmission {
                submission,
                cofactor: c.cofactor,
                sharpe_ratio: c.sharpe_ratio,
            })
        })
        .collect()
}

/// Submissions correlated with `returns`, as reported by `registry`.
///
/// Any failure is logged and yields an empty list.
pub fn calc_correlation(
    registry: &impl SubmissionRegistry,
    returns: &RelativeReturns,
) -> Vec<CorrelatedSubmission> {
    match try_correlation(registry, returns) {
        Ok(list) => list,
        Err(e) => {
            log::error!("correlation check failed: {e}");
            Vec::new()
        }
    }
}

/// Summary of a correlation check.
#[derive(Clone, Debug, PartialEq)]
pub struct CorrelationReport {
    pub correlated: Vec<CorrelatedSubmission>,
    /// Annualized Sharpe ratio of the checked series over the last three
    /// years.
    pub sharpe_ratio: f64,
}

impl CorrelationReport {
    pub fn is_clean(&self) -> bool {
        self.correlated.is_empty()
    }

    pub fn max_cofactor(&self) -> Option<f64> {
        self.correlated.iter().map(|c| c.cofactor).reduce(f64::max)
    }

    /// Correlated submissions made by the checking participant.
    pub fn mine(&self) -> impl Iterator<Item = &CorrelatedSubmission> {
        self.correlated.iter().filter(|c| c.submission.my)
    }
}

impl fmt::Display for CorrelationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return writeln!(f, "Ok. This strategy does not correlate with other strategies.");
        }
        writeln!(f, "WARNING! This strategy correlates with other strategies.")?;
        writeln!(
            f,
            "Systems with a larger Sharpe ratio and correlation above 0.8: {}",
            self.correlated.len()
        )?;
        if let Some(max) = self.max_cofactor() {
            writeln!(f, "Max correlation with such systems: {max:.4}")?;
        }
        writeln!(f, "Current Sharpe ratio (3y): {:.4}", self.sharpe_ratio)?;

        let mine: Vec<_> = self.mine().collect();
        if !mine.is_empty() {
            writeln!(f)?;
            writeln!(f, "My correlated submissions:")?;
            writeln!(f, "{:<32} {:>12} {:>12}", "Name", "Coefficient", "Sharpe ratio")?;
            for c in mine {
                writeln!(
                    f,
                    "{:<32} {:>12.4} {:>12.4}",
                    c.submission.name, c.cofactor, c.sharpe_ratio
                )?;
            }
        }
        Ok(())
    }
}

/// Simulate `weights` on `data` and check the resulting portfolio returns
/// against the registry.
pub fn check_correlation(
    registry: &impl SubmissionRegistry,
    data: &MarketData,
    weights: &WeightSeries,
    costs: &CostConfig,
) -> qnstat::Result<CorrelationReport> {
    let ppy = calc_avg_points_per_year(data.times());
    let returns = calc_relative_return(data, weights, costs, false, Some(ppy))?;
    let correlated = calc_correlation(registry, &returns);

    let sharpe = calc_sharpe_ratio_annualized(returns.values.view(), Some(ppy * 3), 2, ppy);
    let sharpe_ratio = sharpe
        .rows()
        .into_iter()
        .last()
        .map(|row| row[0])
        .unwrap_or(f64::NAN);

    let report = CorrelationReport {
        correlated,
        sharpe_ratio,
    };
    if report.is_clean() {
        log::info!("no correlated strategies found");
    } else {
        log::warn!("strategy correlates with {} submissions", report.correlated.len());
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use ndarray::Array2;
    use qnstat::Field;

    use crate::config::CorrelationConfig;
    use crate::registry::{Cofactor, HttpRegistry};

    struct FakeRegistry {
        submissions: Vec<Submission>,
        cofactors: Vec<Cofactor>,
        seen_ids: RefCell<Vec<String>>,
    }

    impl SubmissionRegistry for FakeRegistry {
        fn fetch_submissions(&self) -> Result<Vec<Submission>> {
            Ok(self.submissions.clone())
        }

        fn fetch_cofactors(&self, payload: &str, ids: &[String]) -> Result<Vec<Cofactor>> {
            assert!(!payload.is_empty());
            *self.seen_ids.borrow_mut() = ids.to_vec();
            Ok(self.cofactors.clone())
        }
    }

    fn submission(id: &str, my: bool) -> Submission {
        Submission {
            id: id.to_string(),
            name: format!("strategy {id}"),
            my,
        }
    }

    fn cofactor(id: &str, c: f64) -> Cofactor {
        Cofactor {
            id: id.to_string(),
            cofactor: c,
            sharpe_ratio: 1.5,
        }
    }

    fn returns() -> RelativeReturns {
        RelativeReturns {
            times: vec![1, 2, 3],
            assets: None,
            values: Array2::from_shape_vec((3, 1), vec![0.0, 0.01, -0.005]).unwrap(),
        }
    }

    #[test]
    fn joins_cofactors_to_submissions() {
        let registry = FakeRegistry {
            submissions: vec![submission("1", false), submission("2", true), submission("3", false)],
            cofactors: vec![cofactor("2", 0.91), cofactor("3", 0.85)],
            seen_ids: RefCell::new(Vec::new()),
        };
        let list = calc_correlation(&registry, &returns());
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].submission.name, "strategy 2");
        assert_eq!(list[1].cofactor, 0.85);
        assert_eq!(*registry.seen_ids.borrow(), vec!["1", "2", "3"]);

        let report = CorrelationReport {
            correlated: list,
            sharpe_ratio: 0.7,
        };
        assert_eq!(report.max_cofactor(), Some(0.91));
        assert_eq!(report.mine().count(), 1);
        let text = report.to_string();
        assert!(text.contains("WARNING"));
        assert!(text.contains("strategy 2"));
    }

    #[test]
    fn unknown_submission_degrades_to_empty() {
        let registry = FakeRegistry {
            submissions: vec![submission("1", false)],
            cofactors: vec![cofactor("9", 0.9)],
            seen_ids: RefCell::new(Vec::new()),
        };
        assert!(calc_correlation(&registry, &returns()).is_empty());
    }

    #[test]
    fn per_asset_returns_are_rejected_quietly() {
        let registry = FakeRegistry {
            submissions: vec![],
            cofactors: vec![],
            seen_ids: RefCell::new(Vec::new()),
        };
        let per_asset = RelativeReturns {
            assets: Some(vec!["A".into()]),
            ..returns()
        };
        assert!(calc_correlation(&registry, &per_asset).is_empty());
    }

    #[test]
    fn unreachable_registry_degrades_to_empty() {
        let registry = HttpRegistry::new(CorrelationConfig {
            engine_url: "http://127.0.0.1:9/forCorrelation".into(),
            statan_url: "http://127.0.0.1:9/correlation".into(),
            participant_id: "0".into(),
            timeout_secs: 2,
        })
        .unwrap();
        assert!(calc_correlation(&registry, &returns()).is_empty());
    }

    #[test]
    fn clean_report_from_simulation() {
        let days = 30;
        let close = Array2::from_shape_fn((days, 1), |(t, _)| 50.0 + t as f64);
        let times: Vec<i64> = (0..days as i64).map(|d| d * 86_400).collect();
        let data = MarketData::from_fields(
            times.clone(),
            vec!["A".into()],
            vec![
                (Field::Open, close.clone()),
                (Field::Close, close.clone()),
                (Field::High, &close + 0.5),
                (Field::Low, &close - 0.5),
            ],
        )
        .unwrap();
        let weights = WeightSeries::new(times, vec!["A".into()], Array2::ones((days, 1))).unwrap();
        let registry = FakeRegistry {
            submissions: vec![submission("1", false)],
            cofactors: vec![],
            seen_ids: RefCell::new(Vec::new()),
        };
        let report = check_correlation(&registry, &data, &weights, &CostConfig::default()).unwrap();
        assert!(report.is_clean());
        assert!(report.sharpe_ratio > 0.0);
        assert!(report.to_string().starts_with("Ok."));
    }
}
