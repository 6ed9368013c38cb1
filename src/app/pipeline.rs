//! Per-indicator pipelines shared by the CLI subcommands.
//!
//! The workflow is:
//! load raw data -> normalize -> resolve scope -> (per indicator, in parallel)
//! score or impute -> validate -> optionally persist.
//!
//! Indicators are independent and read the dataset list and the registry
//! without mutation, so they run on the rayon pool; results are collected in
//! scope order so output stays deterministic.

use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use rayon::prelude::*;
use tracing::info;

use crate::coverage::CoverageReport;
use crate::domain::{DatasetRecord, IndicatorRecord, RunConfig};
use crate::error::{AppError, EngineError};
use crate::impute::impute_indicator;
use crate::io::load_raw_records;
use crate::records::normalize;
use crate::registry::{MetadataRegistry, StaticRegistry};
use crate::report::IndicatorOutcome;
use crate::score::{IndicatorDefinition, score_indicator, validate_indicator_records};
use crate::store::{DocumentStore, Filter, MemoryStore, filter, from_documents, to_documents};

/// Normalized inputs of a run.
#[derive(Debug, Clone)]
pub struct Inputs {
    pub registry: StaticRegistry,
    pub datasets: Vec<DatasetRecord>,
}

/// Which indicators, countries and years a run covers.
#[derive(Debug, Clone)]
pub struct Scope {
    pub indicators: Vec<String>,
    pub countries: Vec<String>,
    pub years: RangeInclusive<i32>,
}

pub fn load_inputs(config: &RunConfig) -> Result<Inputs, AppError> {
    let registry = StaticRegistry::from_path(&config.registry_path)?;
    let datasets = normalize(load_raw_records(&config.data_path)?)?;
    info!(records = datasets.len(), index = %registry.index_code(), "loaded inputs");
    Ok(Inputs { registry, datasets })
}

pub fn resolve_scope(config: &RunConfig, inputs: &Inputs) -> Result<Scope, AppError> {
    if config.year_start > config.year_end {
        return Err(AppError::new(
            2,
            format!("Invalid year range: {} > {}", config.year_start, config.year_end),
        ));
    }

    let indicators = if config.indicators.is_empty() {
        inputs.registry.indicator_codes()
    } else {
        let known = inputs.registry.indicator_codes();
        if let Some(unknown) = config.indicators.iter().find(|c| !known.contains(c)) {
            return Err(EngineError::UnknownItem(unknown.clone()).into());
        }
        config.indicators.clone()
    };

    let countries = match &config.country_group {
        Some(group) => inputs.registry.country_group(group)?,
        None => inputs
            .datasets
            .iter()
            .map(|d| d.country_code.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect(),
    };

    Ok(Scope {
        indicators,
        countries,
        years: config.year_start..=config.year_end,
    })
}

/// Build an indicator's definition from the registry.
///
/// Single-dataset indicators keep the raw dataset value (and its unit);
/// composites average their datasets' goalposted scores.
pub fn definition_for(
    code: &str,
    registry: &dyn MetadataRegistry,
    datasets: &[DatasetRecord],
) -> Result<IndicatorDefinition, EngineError> {
    let deps = registry.dataset_dependencies(code)?;
    match deps.as_slice() {
        [dataset] => {
            let goalposts = registry.goalposts(code).or_else(|_| registry.goalposts(dataset))?;
            let unit = datasets
                .iter()
                .find(|d| &d.dataset_code == dataset && !d.unit.is_empty())
                .map_or("Index", |d| d.unit.as_str());
            Ok(IndicatorDefinition::single(code, dataset, unit, goalposts))
        }
        _ => IndicatorDefinition::goalposted_mean(code, registry),
    }
}

fn relevant_datasets(inputs: &Inputs, definition: &IndicatorDefinition) -> Vec<DatasetRecord> {
    inputs
        .datasets
        .iter()
        .filter(|d| definition.datasets.contains(&d.dataset_code))
        .cloned()
        .collect()
}

/// Score every indicator in scope from observed data only.
pub fn run_score(inputs: &Inputs, scope: &Scope) -> Result<Vec<IndicatorOutcome>, AppError> {
    let outcomes = scope
        .indicators
        .par_iter()
        .map(|code| score_one(code, inputs, scope))
        .collect::<Result<Vec<_>, EngineError>>()?;
    Ok(outcomes)
}

fn score_one(code: &str, inputs: &Inputs, scope: &Scope) -> Result<IndicatorOutcome, EngineError> {
    let definition = definition_for(code, &inputs.registry, &inputs.datasets)?;
    let (complete, incomplete) = score_indicator(relevant_datasets(inputs, &definition), &definition)?;
    let in_scope = |r: &IndicatorRecord| scope.years.contains(&r.year) && scope.countries.contains(&r.country_code);

    let complete: Vec<IndicatorRecord> = complete.into_iter().filter(|r| in_scope(r)).collect();
    let incomplete: Vec<IndicatorRecord> = incomplete.into_iter().filter(|r| in_scope(r)).collect();
    validate_indicator_records(&complete)?;

    Ok(IndicatorOutcome {
        code: code.to_string(),
        complete,
        incomplete,
    })
}

/// Impute every indicator in scope; only records carrying synthetic data are returned.
pub fn run_impute(inputs: &Inputs, scope: &Scope) -> Result<Vec<(String, Vec<IndicatorRecord>)>, AppError> {
    let imputed = scope
        .indicators
        .par_iter()
        .map(|code| {
            let definition = definition_for(code, &inputs.registry, &inputs.datasets)?;
            let records = impute_indicator(
                relevant_datasets(inputs, &definition),
                &definition,
                &scope.countries,
                scope.years.clone(),
            )?;
            validate_indicator_records(&records)?;
            Ok((code.clone(), records))
        })
        .collect::<Result<Vec<_>, EngineError>>()?;
    Ok(imputed)
}

/// Replace every stored record of `indicator_code` with `records`.
///
/// Returns the number of documents inserted.
pub fn store_indicator(
    store: &mut dyn DocumentStore,
    indicator_code: &str,
    records: &[IndicatorRecord],
) -> Result<usize, EngineError> {
    let removed = store.delete(&filter([("IndicatorCode", indicator_code)]))?;
    let inserted = store.insert_many(to_documents(records)?)?;
    info!(indicator = %indicator_code, removed, inserted, "stored indicator records");
    Ok(inserted)
}

/// Score + impute everything in scope, persist it, and report coverage from the store.
pub fn run_coverage(inputs: &Inputs, scope: &Scope) -> Result<CoverageReport, AppError> {
    let scored = run_score(inputs, scope)?;
    let imputed = run_impute(inputs, scope)?;

    let mut store = MemoryStore::new();
    for (outcome, (_, synthetic)) in scored.into_iter().zip(imputed) {
        let mut records = outcome.complete;
        records.extend(synthetic);
        store_indicator(&mut store, &outcome.code, &records)?;
    }

    let records: Vec<IndicatorRecord> = from_documents(store.find(&Filter::new())?)?;
    Ok(CoverageReport::new(
        &records,
        &scope.indicators,
        &scope.countries,
        scope.years.clone(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tree::tests::registry;

    fn inputs() -> Inputs {
        let datasets = vec![
            DatasetRecord::new("ILO_UNEMPL", "USA", 2018, 4.0).with_unit("%"),
            DatasetRecord::new("ILO_UNEMPL", "USA", 2020, 8.0).with_unit("%"),
            DatasetRecord::new("ILO_UNEMPL", "FRA", 2019, 10.0).with_unit("%"),
            DatasetRecord::new("UNSDG_MARINE", "USA", 2019, 50.0),
            DatasetRecord::new("UNSDG_TERRST", "USA", 2019, 30.0),
        ];
        Inputs {
            registry: registry(),
            datasets,
        }
    }

    fn scope(indicators: &[&str]) -> Scope {
        Scope {
            indicators: indicators.iter().map(|s| s.to_string()).collect(),
            countries: vec!["USA".to_string(), "FRA".to_string(), "DEU".to_string()],
            years: 2018..=2020,
        }
    }

    #[test]
    fn single_dataset_indicators_keep_raw_values_and_units() {
        let inputs = inputs();
        let def = definition_for("UNEMPL", &inputs.registry, &inputs.datasets).unwrap();
        assert_eq!(def.datasets, vec!["ILO_UNEMPL"]);

        let outcomes = run_score(&inputs, &scope(&["UNEMPL"])).unwrap();
        let usa = outcomes[0].complete.iter().find(|r| r.country_code == "USA" && r.year == 2018).unwrap();
        assert_eq!(usa.value, Some(4.0));
        assert_eq!(usa.unit.as_deref(), Some("%"));
        assert!((usa.score.unwrap() - 0.9).abs() < 1e-12);
    }

    #[test]
    fn composites_average_goalposted_scores() {
        let inputs = inputs();
        let outcomes = run_score(&inputs, &scope(&["BIODIV", "UNEMPL"])).unwrap();
        assert_eq!(outcomes[0].code, "BIODIV");
        let r = &outcomes[0].complete[0];
        assert!((r.score.unwrap() - 0.4).abs() < 1e-12);
        assert_eq!(r.unit.as_deref(), Some("Index"));
    }

    #[test]
    fn storing_twice_replaces_previous_records() {
        let inputs = inputs();
        let outcome = run_score(&inputs, &scope(&["UNEMPL"])).unwrap().remove(0);
        let mut store = MemoryStore::new();
        store_indicator(&mut store, "UNEMPL", &outcome.complete).unwrap();
        store_indicator(&mut store, "UNEMPL", &outcome.complete).unwrap();
        assert_eq!(store.len(), outcome.complete.len());
    }

    #[test]
    fn coverage_counts_imputed_cells() {
        let mut inputs = inputs();
        // No UNSDG_TERRST reference inside the range, so only USA gets it (carried from 2015).
        inputs.datasets.retain(|d| d.dataset_code != "UNSDG_TERRST");
        inputs.datasets.push(DatasetRecord::new("UNSDG_TERRST", "USA", 2015, 30.0));

        let report = run_coverage(&inputs, &scope(&["UNEMPL", "BIODIV", "REDLST"])).unwrap();
        // UNEMPL: USA/FRA by extrapolation and interpolation, DEU by the group average.
        // BIODIV: FRA/DEU never get UNSDG_TERRST.
        assert_eq!(report.complete(), vec!["UNEMPL"]);
        assert_eq!(report.incomplete(), vec!["BIODIV"]);
        assert_eq!(report.unimplemented(), vec!["REDLST"]);
    }
}
