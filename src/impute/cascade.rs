//! Per-indicator imputation.
//!
//! `impute_indicator` runs the usual sequence over a country group and a year
//! range:
//!
//! 1. extrapolate backward, then forward, then interpolate each dataset series
//! 2. countries with no observations of a dataset get the reference-class average
//! 3. re-score the augmented datasets
//! 4. keep records inside the group/range that carry at least one synthetic dataset

use std::collections::HashSet;
use std::ops::RangeInclusive;

use tracing::{debug, info, warn};

use crate::domain::{DatasetRecord, IndicatorRecord, SeriesRecord};
use crate::error::EngineError;
use crate::impute::average::impute_global_average;
use crate::impute::extrapolate::{extrapolate_backward, extrapolate_forward};
use crate::impute::interpolate::interpolate_linear;
use crate::records::drop_missing;
use crate::score::{IndicatorDefinition, score_indicator};

/// Records with at least one dataset flagged as imputed.
pub fn filter_imputations(records: Vec<IndicatorRecord>) -> Vec<IndicatorRecord> {
    records
        .into_iter()
        .filter(|r| r.datasets.iter().any(|d| d.imputation.is_some()))
        .collect()
}

/// Backward extrapolation to `years.start()`, forward to `years.end()`, then
/// linear interpolation. Returns real records followed by synthetic ones.
pub fn impute_series<R: SeriesRecord>(records: Vec<R>, years: &RangeInclusive<i32>) -> Vec<R> {
    let records = extrapolate_backward(records, *years.start(), false);
    let records = extrapolate_forward(records, *years.end(), false);
    interpolate_linear(records, false)
}

/// Impute and re-score one indicator over `countries` x `years`.
///
/// Only records containing synthetic data are returned; fully observed records
/// are left to `score_indicator`.
pub fn impute_indicator(
    datasets: Vec<DatasetRecord>,
    definition: &IndicatorDefinition,
    countries: &[String],
    years: RangeInclusive<i32>,
) -> Result<Vec<IndicatorRecord>, EngineError> {
    let (kept, _) = drop_missing(datasets);
    let relevant: Vec<DatasetRecord> = kept
        .into_iter()
        .filter(|d| definition.datasets.contains(&d.dataset_code))
        .collect();

    let mut augmented = impute_series(relevant, &years);
    let observed: HashSet<(String, String)> = augmented.iter().map(|d| d.series_key()).collect();

    let mut averaged = Vec::new();
    for dataset_code in &definition.datasets {
        let missing: Vec<&String> = countries
            .iter()
            .filter(|c| !observed.contains(&((*c).clone(), dataset_code.clone())))
            .collect();
        if missing.is_empty() {
            continue;
        }

        let reference: Vec<DatasetRecord> = augmented
            .iter()
            .filter(|d| &d.dataset_code == dataset_code && !d.is_imputed() && years.contains(&d.year))
            .cloned()
            .collect();
        if reference.is_empty() {
            warn!(
                indicator = %definition.code,
                dataset = %dataset_code,
                "no reference observations in range, skipping average"
            );
            continue;
        }

        for country in missing {
            let filled = impute_global_average(&reference, country, years.clone(), "Dataset", dataset_code)?;
            averaged.extend(filled.into_iter().filter_map(|r| r.into_dataset()));
        }
    }
    debug!(
        indicator = %definition.code,
        synthetic = augmented.iter().filter(|d| d.is_imputed()).count(),
        averaged = averaged.len(),
        "augmented dataset series"
    );
    augmented.extend(averaged);

    let (complete, _) = score_indicator(augmented, definition)?;
    let in_scope: Vec<IndicatorRecord> = complete
        .into_iter()
        .filter(|r| years.contains(&r.year) && countries.contains(&r.country_code))
        .collect();
    let imputed = filter_imputations(in_scope);
    info!(indicator = %definition.code, imputed = imputed.len(), "imputed indicator");
    Ok(imputed)
}
