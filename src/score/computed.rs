//! Virtual datasets derived inside already-grouped indicator records.
//!
//! A derivation reads existing datasets of a record and appends a new dataset
//! record computed from them (e.g. a per-capita series from a total and a
//! population). Missing inputs, non-numeric values and failing functions skip
//! that derivation for that record; the record is left untouched.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::domain::{DatasetRecord, IndicatorRecord};
use crate::error::EngineError;
use crate::score::definition::ScoreFn;

/// One virtual dataset: `code` computed from `inputs` by `func`.
#[derive(Clone)]
pub struct ComputedSeries {
    pub code: String,
    pub unit: String,
    pub inputs: Vec<String>,
    func: ScoreFn,
}

impl ComputedSeries {
    pub fn new<F>(code: impl Into<String>, unit: impl Into<String>, inputs: &[&str], func: F) -> Self
    where
        F: Fn(&[f64]) -> Result<f64, EngineError> + Send + Sync + 'static,
    {
        Self {
            code: code.into(),
            unit: unit.into(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            func: Arc::new(func),
        }
    }
}

impl fmt::Debug for ComputedSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputedSeries")
            .field("code", &self.code)
            .field("unit", &self.unit)
            .field("inputs", &self.inputs)
            .finish()
    }
}

/// Apply each derivation, in order, to every record.
///
/// Later derivations may read datasets produced by earlier ones. A derived
/// dataset inherits the imputation flag of the first synthetic input.
pub fn create_computed_series(
    records: Vec<IndicatorRecord>,
    derivations: &[ComputedSeries],
) -> Vec<IndicatorRecord> {
    records
        .into_iter()
        .map(|mut record| {
            for derivation in derivations {
                if let Some(dataset) = derive(&record, derivation) {
                    record.datasets.push(dataset);
                }
            }
            record
        })
        .collect()
}

fn derive(record: &IndicatorRecord, derivation: &ComputedSeries) -> Option<DatasetRecord> {
    let sources: Vec<&DatasetRecord> = derivation
        .inputs
        .iter()
        .map(|code| record.dataset(code))
        .collect::<Option<_>>()?;
    let inputs: Vec<f64> = sources.iter().map(|d| d.numeric_value()).collect::<Option<_>>()?;

    let value = match (derivation.func)(&inputs) {
        Ok(v) if !v.is_nan() => v,
        Ok(_) => return None,
        Err(e) => {
            debug!(code = %derivation.code, country = %record.country_code, year = record.year, error = %e, "derivation skipped");
            return None;
        }
    };

    Some(DatasetRecord {
        dataset_code: derivation.code.clone(),
        country_code: record.country_code.clone(),
        year: record.year,
        value: Some(value),
        unit: derivation.unit.clone(),
        score: None,
        imputation: sources.iter().find_map(|d| d.imputation.clone()),
    })
}
