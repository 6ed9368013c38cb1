//! Reference-class averaging.
//!
//! When a country has no observations of an item at all, the mean of a
//! reference class (typically the other countries' observations of the same
//! item) stands in for every year of the requested range.

use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use crate::domain::{DatasetRecord, Imputation, ImputationMethod, IndicatorRecord, ItemType, SeriesRecord};
use crate::error::EngineError;

/// Means over a reference set.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceMean {
    pub value: f64,
    /// `None` when no reference record carries a score.
    pub score: Option<f64>,
    pub unit: String,
    pub n: usize,
}

/// A synthesized record whose kind is chosen at runtime by `item_type`.
#[derive(Debug, Clone, PartialEq)]
pub enum SyntheticRecord {
    Dataset(DatasetRecord),
    Indicator(IndicatorRecord),
}

impl SyntheticRecord {
    pub fn into_dataset(self) -> Option<DatasetRecord> {
        match self {
            SyntheticRecord::Dataset(d) => Some(d),
            SyntheticRecord::Indicator(_) => None,
        }
    }

    pub fn into_indicator(self) -> Option<IndicatorRecord> {
        match self {
            SyntheticRecord::Indicator(i) => Some(i),
            SyntheticRecord::Dataset(_) => None,
        }
    }
}

/// Arithmetic means of `Value` and `Score` over `reference`.
///
/// All records must share one unit.
pub fn reference_mean<R: SeriesRecord>(reference: &[R]) -> Result<ReferenceMean, EngineError> {
    let units: BTreeSet<&str> = reference.iter().map(|r| r.unit().unwrap_or("")).collect();
    if units.len() > 1 {
        return Err(EngineError::InconsistentUnits {
            units: units.into_iter().map(str::to_string).collect(),
        });
    }

    let values: Vec<f64> = reference.iter().filter_map(|r| r.value()).filter(|v| !v.is_nan()).collect();
    if values.is_empty() {
        return Err(EngineError::InsufficientData(
            "reference set has no numeric values".to_string(),
        ));
    }
    let scores: Vec<f64> = reference.iter().filter_map(|r| r.score()).filter(|v| !v.is_nan()).collect();

    Ok(ReferenceMean {
        value: mean(&values),
        score: (!scores.is_empty()).then(|| mean(&scores)),
        unit: units.into_iter().next().unwrap_or_default().to_string(),
        n: values.len(),
    })
}

/// Emit one averaged record per year in `years` for `country_code`.
///
/// `item_type` must be `"Dataset"` or `"Indicator"`; it selects whether the
/// records carry `DatasetCode` or `IndicatorCode = item_code`.
pub fn impute_global_average<R: SeriesRecord>(
    reference: &[R],
    country_code: &str,
    years: RangeInclusive<i32>,
    item_type: &str,
    item_code: &str,
) -> Result<Vec<SyntheticRecord>, EngineError> {
    let item_type: ItemType = item_type.parse()?;
    let stats = reference_mean(reference)?;

    let out = years
        .map(|year| {
            let imputation = Imputation::new(ImputationMethod::GlobalAverage, 0);
            match item_type {
                ItemType::Dataset => SyntheticRecord::Dataset(DatasetRecord {
                    dataset_code: item_code.to_string(),
                    country_code: country_code.to_string(),
                    year,
                    value: Some(stats.value),
                    unit: stats.unit.clone(),
                    score: stats.score,
                    imputation: Some(imputation),
                }),
                ItemType::Indicator => {
                    let mut record = IndicatorRecord::new(item_code, country_code, year);
                    record.value = Some(stats.value);
                    record.score = stats.score;
                    record.unit = Some(stats.unit.clone());
                    record.imputation = Some(imputation);
                    SyntheticRecord::Indicator(record)
                }
            }
        })
        .collect();
    Ok(out)
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> Vec<DatasetRecord> {
        vec![
            DatasetRecord::new("X", "FRA", 2020, 10.0).with_unit("%").with_score(0.8),
            DatasetRecord::new("X", "DEU", 2020, 20.0).with_unit("%").with_score(0.6),
        ]
    }

    #[test]
    fn averages_value_and_score_per_year() {
        let out = impute_global_average(&reference(), "USA", 2020..=2021, "Dataset", "X").unwrap();
        assert_eq!(out.len(), 2);
        for (record, year) in out.into_iter().zip(2020..) {
            let d = record.into_dataset().unwrap();
            assert_eq!(d.dataset_code, "X");
            assert_eq!(d.country_code, "USA");
            assert_eq!(d.year, year);
            assert_eq!(d.value, Some(15.0));
            assert!((d.score.unwrap() - 0.7).abs() < 1e-12);
            assert_eq!(d.unit, "%");
            assert_eq!(d.imputation.unwrap().method, ImputationMethod::GlobalAverage);
        }
    }

    #[test]
    fn indicator_item_type_emits_indicator_records() {
        let out = impute_global_average(&reference(), "USA", 2020..=2020, "Indicator", "IND").unwrap();
        let r = out.into_iter().next().unwrap().into_indicator().unwrap();
        assert_eq!(r.indicator_code, "IND");
        assert!(r.is_complete());
    }

    #[test]
    fn mixed_units_fail() {
        let mut refs = reference();
        refs[1].unit = "Index".to_string();
        let err = impute_global_average(&refs, "USA", 2020..=2021, "Dataset", "X").unwrap_err();
        assert_eq!(
            err,
            EngineError::InconsistentUnits {
                units: vec!["%".to_string(), "Index".to_string()]
            }
        );
    }

    #[test]
    fn unknown_item_type_fails() {
        let err = impute_global_average(&reference(), "USA", 2020..=2021, "Category", "X").unwrap_err();
        assert_eq!(err, EngineError::InvalidItemType("Category".to_string()));
    }

    #[test]
    fn scores_are_optional() {
        let refs = vec![DatasetRecord::new("X", "FRA", 2020, 2.0), DatasetRecord::new("X", "DEU", 2020, 4.0)];
        let stats = reference_mean(&refs).unwrap();
        assert_eq!(stats.value, 3.0);
        assert_eq!(stats.score, None);
        assert!(matches!(
            reference_mean::<DatasetRecord>(&[]),
            Err(EngineError::InsufficientData(_))
        ));
    }
}
