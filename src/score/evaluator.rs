//! Indicator evaluation.
//!
//! Pipeline per indicator:
//!
//! 1. drop observations without a usable value
//! 2. keep only the indicator's dataset dependencies
//! 3. group by `(CountryCode, Year)` into indicator records
//! 4. look up each declared dataset's value and call the score function
//! 5. set `Score` (clamped to [0,1]), `Value` and `Unit`
//! 6. partition into complete / incomplete
//!
//! A record with a missing dataset, a non-numeric value, or a failing score
//! function is left unscored. That is data, not an error.

use tracing::{debug, info};

use crate::domain::{DatasetRecord, Goalposts, IndicatorRecord, RawDatasetRecord};
use crate::error::EngineError;
use crate::math::{goalpost, score_with};
use crate::records::{drop_missing, group_by_indicator, normalize};
use crate::registry::MetadataRegistry;
use crate::score::definition::IndicatorDefinition;
use crate::score::validate::filter_incomplete_data;

/// `(complete, incomplete)` indicator records.
pub type Scored = (Vec<IndicatorRecord>, Vec<IndicatorRecord>);

/// Score already-normalized dataset records for one indicator.
pub fn score_indicator(datasets: Vec<DatasetRecord>, definition: &IndicatorDefinition) -> Result<Scored, EngineError> {
    let (kept, dropped) = drop_missing(datasets);
    let relevant: Vec<DatasetRecord> = kept
        .into_iter()
        .filter(|d| definition.datasets.contains(&d.dataset_code))
        .collect();

    let mut records = group_by_indicator(relevant, &definition.code)?;
    for record in &mut records {
        evaluate_record(record, definition);
    }

    let (complete, incomplete) = filter_incomplete_data(records);
    info!(
        indicator = %definition.code,
        complete = complete.len(),
        incomplete = incomplete.len(),
        dropped = dropped.len(),
        "scored indicator"
    );
    Ok((complete, incomplete))
}

/// Normalize provider records, then score them.
pub fn score_raw_indicator(raw: Vec<RawDatasetRecord>, definition: &IndicatorDefinition) -> Result<Scored, EngineError> {
    score_indicator(normalize(raw)?, definition)
}

/// Score an indicator backed by exactly one dataset.
///
/// The dataset's own `Score` is used when it was pre-scored; otherwise the value
/// is goalposted with `goalposts`. `Value` is the raw dataset value.
pub fn score_single_indicator(
    datasets: Vec<DatasetRecord>,
    indicator_code: &str,
    dataset_code: &str,
    unit: &str,
    goalposts: Goalposts,
) -> Result<Scored, EngineError> {
    let (kept, _) = drop_missing(datasets);
    let relevant: Vec<DatasetRecord> = kept.into_iter().filter(|d| d.dataset_code == dataset_code).collect();

    let mut records = group_by_indicator(relevant, indicator_code)?;
    for record in &mut records {
        let Some(value) = record.dataset(dataset_code).and_then(|d| d.numeric_value()) else {
            continue;
        };
        let score = match record.dataset(dataset_code).and_then(|d| d.score) {
            Some(s) if !s.is_nan() => s,
            _ => score_with(value, goalposts)?,
        };
        record.score = Some(score.clamp(0.0, 1.0));
        record.value = Some(value);
        record.unit = Some(unit.to_string());
    }

    Ok(filter_incomplete_data(records))
}

/// Attach `Score = goalpost(Value, registry bounds)` to dataset records.
///
/// Records without a usable value are passed through unscored.
pub fn score_datasets(
    records: Vec<DatasetRecord>,
    registry: &dyn MetadataRegistry,
) -> Result<Vec<DatasetRecord>, EngineError> {
    records
        .into_iter()
        .map(|mut record| {
            if let Some(value) = record.numeric_value() {
                let gp = registry.goalposts(&record.dataset_code)?;
                record.score = Some(goalpost(value, gp.lower, gp.upper)?);
            }
            Ok(record)
        })
        .collect()
}

fn evaluate_record(record: &mut IndicatorRecord, definition: &IndicatorDefinition) {
    let inputs: Option<Vec<f64>> = definition
        .datasets
        .iter()
        .map(|code| record.dataset(code).and_then(|d| d.numeric_value()))
        .collect();
    let Some(inputs) = inputs else {
        return;
    };

    let score = match definition.score(&inputs) {
        Ok(s) if !s.is_nan() => s,
        Ok(_) => {
            debug!(country = %record.country_code, year = record.year, "score function returned NaN");
            return;
        }
        Err(e) => {
            debug!(country = %record.country_code, year = record.year, error = %e, "score function failed");
            return;
        }
    };
    let value = match definition.value(&inputs) {
        None => score,
        Some(Ok(v)) => v,
        Some(Err(e)) => {
            debug!(country = %record.country_code, year = record.year, error = %e, "value function failed");
            return;
        }
    };

    record.score = Some(score.clamp(0.0, 1.0));
    record.value = Some(value);
    record.unit = Some(definition.unit.resolve(&inputs));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RawField;
    use crate::registry::tree::tests::registry;
    use rand::prelude::*;
    use rand::rngs::StdRng;
    use rand_distr::Normal;

    fn two_dataset_definition() -> IndicatorDefinition {
        IndicatorDefinition::new("IND", &["DS_A", "DS_B"], "Index", |v| Ok((v[0] + v[1]) / 40.0))
    }

    #[test]
    fn scores_complete_records_and_routes_the_rest() {
        let datasets = vec![
            DatasetRecord::new("DS_A", "USA", 2018, 10.0),
            DatasetRecord::new("DS_B", "USA", 2018, 20.0),
            DatasetRecord::new("DS_A", "USA", 2019, 15.0),
        ];
        let (complete, incomplete) = score_indicator(datasets, &two_dataset_definition()).unwrap();

        assert_eq!(complete.len(), 1);
        assert_eq!(complete[0].year, 2018);
        assert!((complete[0].score.unwrap() - 0.75).abs() < 1e-12);
        assert_eq!(complete[0].value, complete[0].score);
        assert_eq!(complete[0].unit.as_deref(), Some("Index"));

        assert_eq!(incomplete.len(), 1);
        assert_eq!(incomplete[0].year, 2019);
        assert!(incomplete[0].score.is_none());
    }

    #[test]
    fn ignores_datasets_outside_the_definition() {
        let datasets = vec![
            DatasetRecord::new("DS_A", "USA", 2018, 10.0),
            DatasetRecord::new("DS_B", "USA", 2018, 20.0),
            DatasetRecord::new("OTHER", "USA", 2018, 99.0),
        ];
        let (complete, _) = score_indicator(datasets, &two_dataset_definition()).unwrap();
        assert_eq!(complete[0].datasets.len(), 2);
    }

    #[test]
    fn failing_score_function_leaves_record_unscored() {
        let def = IndicatorDefinition::new("IND", &["DS_A"], "%", |v| {
            if v[0] < 0.0 {
                Err(EngineError::InvariantViolation("negative share".into()))
            } else {
                Ok(v[0])
            }
        });
        let datasets = vec![
            DatasetRecord::new("DS_A", "USA", 2018, -1.0),
            DatasetRecord::new("DS_A", "FRA", 2018, 0.4),
        ];
        let (complete, incomplete) = score_indicator(datasets, &def).unwrap();
        assert_eq!(complete.len(), 1);
        assert_eq!(complete[0].country_code, "FRA");
        assert_eq!(incomplete[0].country_code, "USA");
    }

    #[test]
    fn value_function_overrides_value_and_score_is_clamped() {
        let def = IndicatorDefinition::new("IND", &["DS_A"], "%", |v| Ok(v[0] / 10.0)).with_value_fn(|v| Ok(v[0]));
        let (complete, _) = score_indicator(vec![DatasetRecord::new("DS_A", "USA", 2018, 25.0)], &def).unwrap();
        assert_eq!(complete[0].score, Some(1.0));
        assert_eq!(complete[0].value, Some(25.0));
    }

    #[test]
    fn null_values_never_reach_the_score_function() {
        let raw = vec![
            RawDatasetRecord {
                dataset_code: Some("DS_A".into()),
                country_code: Some("USA".into()),
                year: Some(RawField::Text("2018".into())),
                value: Some(RawField::Null),
                unit: None,
                score: None,
            },
            RawDatasetRecord {
                dataset_code: Some("DS_A".into()),
                country_code: Some("USA".into()),
                year: Some(RawField::Number(2019.0)),
                value: Some(RawField::Text("0.3".into())),
                unit: None,
                score: None,
            },
        ];
        let def = IndicatorDefinition::new("IND", &["DS_A"], "%", |v| Ok(v[0]));
        let (complete, incomplete) = score_raw_indicator(raw, &def).unwrap();
        assert_eq!(complete.len(), 1);
        assert_eq!(complete[0].year, 2019);
        assert!(incomplete.is_empty());
    }

    #[test]
    fn duplicate_datasets_resolve_to_the_last_observation() {
        let def = IndicatorDefinition::new("IND", &["DS_A"], "%", |v| Ok(v[0]));
        let datasets = vec![
            DatasetRecord::new("DS_A", "USA", 2018, 0.2),
            DatasetRecord::new("DS_A", "USA", 2018, 0.6),
        ];
        let (complete, _) = score_indicator(datasets, &def).unwrap();
        assert_eq!(complete[0].score, Some(0.6));
        assert_eq!(complete[0].datasets.len(), 2);
    }

    #[test]
    fn single_dataset_indicator_prefers_existing_scores() {
        let datasets = vec![
            DatasetRecord::new("ILO_UNEMPL", "USA", 2018, 10.0),
            DatasetRecord::new("ILO_UNEMPL", "FRA", 2018, 10.0).with_score(0.9),
        ];
        let (complete, incomplete) =
            score_single_indicator(datasets, "UNEMPL", "ILO_UNEMPL", "%", Goalposts::new(40.0, 0.0)).unwrap();
        assert!(incomplete.is_empty());
        assert!((complete[0].score.unwrap() - 0.75).abs() < 1e-12);
        assert_eq!(complete[0].value, Some(10.0));
        assert_eq!(complete[1].score, Some(0.9));
    }

    #[test]
    fn dataset_prescoring_uses_registry_goalposts() {
        let reg = registry();
        let mut missing = DatasetRecord::new("EPI_NITROG", "USA", 2018, 0.0);
        missing.value = None;
        let out = score_datasets(vec![DatasetRecord::new("EPI_NITROG", "USA", 2019, 30.0), missing], &reg).unwrap();
        assert!((out[0].score.unwrap() - 0.7).abs() < 1e-12);
        assert!(out[1].score.is_none());

        let err = score_datasets(vec![DatasetRecord::new("NOPE", "USA", 2019, 1.0)], &reg).unwrap_err();
        assert!(matches!(err, EngineError::UnknownItem(_)));
    }

    #[test]
    fn scores_stay_in_unit_interval_on_random_panels() {
        let mut rng = StdRng::seed_from_u64(11);
        let normal = Normal::new(0.0, 100.0).unwrap();
        let def = IndicatorDefinition::new("IND", &["DS_A", "DS_B"], "Index", |v| Ok(v[0] / (1.0 + v[1].abs())));

        let countries = ["USA", "FRA", "DEU", "JPN"];
        let mut datasets = Vec::new();
        for country in countries {
            for year in 2000..2020 {
                for code in ["DS_A", "DS_B"] {
                    if rng.gen_bool(0.85) {
                        datasets.push(DatasetRecord::new(code, country, year, normal.sample(&mut rng)));
                    }
                }
            }
        }
        let total = datasets.len();
        let (complete, incomplete) = score_indicator(datasets, &def).unwrap();
        assert!(!complete.is_empty());
        for r in &complete {
            let s = r.score.unwrap();
            assert!((0.0..=1.0).contains(&s), "score {s} out of range");
        }
        let regrouped: usize = complete.iter().chain(&incomplete).map(|r| r.datasets.len()).sum();
        assert_eq!(regrouped, total);
    }
}
