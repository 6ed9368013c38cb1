//! Formatted terminal output for `pix` runs.

use std::collections::BTreeMap;

use crate::domain::{IndicatorRecord, SeriesRecord};

/// Per-indicator outcome of a scoring run.
#[derive(Debug, Clone)]
pub struct IndicatorOutcome {
    pub code: String,
    pub complete: Vec<IndicatorRecord>,
    pub incomplete: Vec<IndicatorRecord>,
}

pub fn format_score_summary(outcomes: &[IndicatorOutcome]) -> String {
    let mut out = String::new();
    out.push_str("=== pix - indicator scores ===\n");
    out.push_str(&format!("{:<12} {:>9} {:>11} {:>10}\n", "indicator", "complete", "incomplete", "mean"));
    out.push_str(&format!("{:-<12} {:-<9} {:-<11} {:-<10}\n", "", "", "", ""));
    for o in outcomes {
        let mean = mean_score(&o.complete)
            .map(|m| format!("{m:.4}"))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "{:<12} {:>9} {:>11} {:>10}\n",
            truncate(&o.code, 12),
            o.complete.len(),
            o.incomplete.len(),
            mean
        ));
    }
    out
}

/// Counts of synthetic records by method, per indicator.
pub fn format_imputation_summary(imputed: &[(String, Vec<IndicatorRecord>)]) -> String {
    let mut out = String::new();
    out.push_str("=== pix - imputations ===\n");
    for (code, records) in imputed {
        out.push_str(&format!("{code}: {} records\n", records.len()));
        let mut by_method: BTreeMap<&'static str, usize> = BTreeMap::new();
        for r in records {
            for d in r.datasets.iter().filter(|d| d.is_imputed()) {
                if let Some(imp) = &d.imputation {
                    *by_method.entry(imp.method.label()).or_default() += 1;
                }
            }
        }
        for (method, n) in by_method {
            out.push_str(&format!("  {method:<24} {n:>6} datasets\n"));
        }
    }
    out
}

/// Record-level table (country, year, value, score, unit, imputed).
pub fn format_records(records: &[IndicatorRecord]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<10} {:<8} {:>6} {:>12} {:>8} {:<10} {}\n",
            "indicator", "country", "year", "value", "score", "unit", "imputed"
        )
        .trim_end(),
    );
    out.push('\n');

    for r in records {
        let imputed = match r.imputation_level() {
            Some(level) => format!("{level:?}").to_lowercase(),
            None => String::new(),
        };
        out.push_str(
            format!(
                "{:<10} {:<8} {:>6} {:>12} {:>8} {:<10} {}\n",
                truncate(&r.indicator_code, 10),
                truncate(&r.country_code, 8),
                r.year,
                fmt_opt(r.value, 3),
                fmt_opt(r.score, 4),
                truncate(r.unit.as_deref().unwrap_or(""), 10),
                imputed,
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

fn mean_score(records: &[IndicatorRecord]) -> Option<f64> {
    let scores: Vec<f64> = records.iter().filter_map(|r| r.score).collect();
    if scores.is_empty() {
        return None;
    }
    Some(scores.iter().sum::<f64>() / scores.len() as f64)
}

fn fmt_opt(v: Option<f64>, precision: usize) -> String {
    v.map(|x| format!("{x:.precision$}")).unwrap_or_else(|| "-".to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
