//! Plain-text rendering of the reports.

use std::fmt::Write;

use chrono::DateTime;

use qnstat::{StatField, Statistics, Timestamp};
use qnstat_risk::{ExposureReport, SectorDistribution};

pub fn format_time(t: Timestamp) -> String {
    match DateTime::from_timestamp(t, 0) {
        Some(dt) if t % 86_400 == 0 => dt.format("%Y-%m-%d").to_string(),
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => t.to_string(),
    }
}

/// The last point of every statistic, one column per portfolio or asset.
pub fn render_stats(stats: &Statistics) -> String {
    let mut out = String::new();
    let Some(&last) = stats.times().last() else {
        out.push_str("Not enough data to compute statistics.\n");
        return out;
    };
    let columns: Vec<String> = match stats.assets() {
        Some(assets) => assets.to_vec(),
        None => vec!["portfolio".to_string()],
    };

    let _ = writeln!(out, "Statistics at {}", format_time(last));
    let _ = write!(out, "{:<18}", "field");
    for c in &columns {
        let _ = write!(out, " {c:>14}");
    }
    out.push('\n');
    for field in StatField::ALL {
        let _ = write!(out, "{:<18}", field.as_str());
        if let Some(row) = stats.last(field) {
            for v in row {
                let _ = write!(out, " {v:>14.6}");
            }
        }
        out.push('\n');
    }
    out
}

pub fn render_exposure(report: &ExposureReport) -> String {
    let mut out = String::new();
    let verdict = if report.passed { "PASSED" } else { "FAILED" };
    let _ = writeln!(out, "Exposure check: {verdict}");
    let _ = writeln!(out, "  hard limit respected:   {}", report.hard_limit_ok);
    let _ = writeln!(out, "  bad days within limit:  {}", report.days_ok);
    let _ = writeln!(out, "  excess within limit:    {}", report.excess_ok);
    if !report.breaches.is_empty() {
        let _ = writeln!(out, "Positions over the soft limit: {}", report.breaches.len());
        for b in &report.breaches {
            let _ = writeln!(out, "  {} {:<12} {:.4}", format_time(b.time), b.asset, b.exposure);
        }
    }
    out
}

/// The sector split at the last point.
pub fn render_sectors(dist: &SectorDistribution) -> String {
    let mut out = String::new();
    let Some(&last) = dist.times.last() else {
        out.push_str("No weights.\n");
        return out;
    };
    let _ = writeln!(out, "Sector distribution at {}", format_time(last));
    let row = dist.values.row(dist.times.len() - 1);
    for (sector, v) in dist.sectors.iter().zip(row) {
        let _ = writeln!(out, "  {sector:<24} {:>7.2}%", v * 100.0);
    }
    out
}
