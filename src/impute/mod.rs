//! Imputation cascade.
//!
//! Every operation follows the same shape: group records into series by
//! `(CountryCode, code)`, synthesize records for missing years inside each
//! series, then emit either the augmented list or only the synthetic records.
//!
//! Guarantees shared by all operations:
//! - real records are never rewritten or removed (they come first, in input order)
//! - synthetic records are sorted by year within each series
//! - a year already present in a series is never synthesized again
//!
//! Submodules:
//! - `extrapolate`: forward/backward carry of the nearest observation
//! - `interpolate`: linear fill between bracketing observations
//! - `average`: reference-class (global) averages
//! - `regression`: OLS prediction of indicator scores from feature scores
//! - `cascade`: per-indicator composition of the above

use std::collections::{BTreeMap, HashMap};

use crate::domain::SeriesRecord;

pub mod average;
pub mod cascade;
pub mod extrapolate;
pub mod interpolate;
pub mod regression;

pub use average::*;
pub use cascade::*;
pub use extrapolate::*;
pub use interpolate::*;
pub use regression::*;

/// Member indices of each series, series in first-seen order.
pub(crate) fn series_indices<R: SeriesRecord>(records: &[R]) -> Vec<Vec<usize>> {
    let mut index: HashMap<(String, String), usize> = HashMap::new();
    let mut out: Vec<Vec<usize>> = Vec::new();
    for (i, record) in records.iter().enumerate() {
        let slot = *index.entry(record.series_key()).or_insert_with(|| {
            out.push(Vec::new());
            out.len() - 1
        });
        out[slot].push(i);
    }
    out
}

/// Members with a numeric value, keyed by year. A later record wins a tie.
pub(crate) fn numeric_anchors<R: SeriesRecord>(records: &[R], members: &[usize]) -> BTreeMap<i32, usize> {
    members
        .iter()
        .filter(|&&i| records[i].value().is_some_and(|v| !v.is_nan()))
        .map(|&i| (records[i].year(), i))
        .collect()
}

pub(crate) fn assemble<R>(records: Vec<R>, synthetic: Vec<R>, impute_only: bool) -> Vec<R> {
    if impute_only {
        return synthetic;
    }
    let mut out = records;
    out.extend(synthetic);
    out
}
