//! Structural checks on indicator records.

use std::collections::HashSet;

use crate::domain::{IndicatorRecord, SeriesRecord};
use crate::error::EngineError;

/// Split records into `(complete, incomplete)`.
///
/// Complete means the record carries `Value`, `Unit` and `Score` on top of its
/// identifiers. Every input lands in exactly one side, order preserved.
pub fn filter_incomplete_data(records: Vec<IndicatorRecord>) -> (Vec<IndicatorRecord>, Vec<IndicatorRecord>) {
    records.into_iter().partition(IndicatorRecord::is_complete)
}

/// Check output invariants; the first violation is returned.
///
/// - scores lie in [0,1]
/// - scored records carry `Value` and `Unit`
/// - nested datasets match the record's `(CountryCode, Year)`
/// - each series holds a year at most once
pub fn validate_indicator_records(records: &[IndicatorRecord]) -> Result<(), EngineError> {
    for r in records {
        let id = || format!("{}/{}/{}", r.indicator_code, r.country_code, r.year);
        if let Some(score) = r.score {
            if !(0.0..=1.0).contains(&score) {
                return Err(EngineError::InvariantViolation(format!("{}: score {score} outside [0,1]", id())));
            }
            if r.value.is_none() || r.unit.is_none() {
                return Err(EngineError::InvariantViolation(format!(
                    "{}: scored record lacks Value or Unit",
                    id()
                )));
            }
        }
        if let Some(d) = r
            .datasets
            .iter()
            .find(|d| d.country_code != r.country_code || d.year != r.year)
        {
            return Err(EngineError::InvariantViolation(format!(
                "{}: nested dataset {} belongs to {}/{}",
                id(),
                d.dataset_code,
                d.country_code,
                d.year
            )));
        }
    }
    validate_unique_years(records)
}

/// Each `(series, Year)` appears at most once.
pub fn validate_unique_years<R: SeriesRecord>(records: &[R]) -> Result<(), EngineError> {
    let mut seen = HashSet::new();
    for r in records {
        if !seen.insert((r.country_code(), r.code(), r.year())) {
            return Err(EngineError::InvariantViolation(format!(
                "duplicate year {} in series {}/{}",
                r.year(),
                r.country_code(),
                r.code()
            )));
        }
    }
    Ok(())
}
