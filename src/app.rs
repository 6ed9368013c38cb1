//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` defaults and parses CLI arguments
//! - installs logging
//! - runs the scoring / imputation / coverage pipelines
//! - prints reports and writes optional exports

use chrono::Datelike;
use clap::Parser;

use crate::cli::{Cli, Command, RunArgs};
use crate::domain::{IndicatorRecord, RunConfig};
use crate::error::AppError;
use crate::io::{write_indicator_csv, write_indicator_json};
use crate::report::{format_imputation_summary, format_records, format_score_summary};

pub mod pipeline;

/// Entry point for the `pix` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    crate::telemetry::init(&cli.log_level)?;

    match cli.command {
        Command::Score(args) => handle_score(&run_config_from_args(&args)),
        Command::Impute(args) => handle_impute(&run_config_from_args(&args)),
        Command::Coverage(args) => handle_coverage(&run_config_from_args(&args)),
    }
}

fn handle_score(config: &RunConfig) -> Result<(), AppError> {
    let inputs = pipeline::load_inputs(config)?;
    let scope = pipeline::resolve_scope(config, &inputs)?;
    let outcomes = pipeline::run_score(&inputs, &scope)?;

    println!("{}", format_score_summary(&outcomes));

    let records: Vec<IndicatorRecord> = outcomes.into_iter().flat_map(|o| o.complete).collect();
    if config.print_records {
        println!("{}", format_records(&records));
    }
    export(config, &records)
}

fn handle_impute(config: &RunConfig) -> Result<(), AppError> {
    let inputs = pipeline::load_inputs(config)?;
    let scope = pipeline::resolve_scope(config, &inputs)?;
    let imputed = pipeline::run_impute(&inputs, &scope)?;

    println!("{}", format_imputation_summary(&imputed));

    let mut records: Vec<IndicatorRecord> = Vec::new();
    if !config.impute_only {
        let outcomes = pipeline::run_score(&inputs, &scope)?;
        records.extend(outcomes.into_iter().flat_map(|o| o.complete));
    }
    records.extend(imputed.into_iter().flat_map(|(_, r)| r));

    if config.print_records {
        println!("{}", format_records(&records));
    }
    export(config, &records)
}

fn handle_coverage(config: &RunConfig) -> Result<(), AppError> {
    let inputs = pipeline::load_inputs(config)?;
    let scope = pipeline::resolve_scope(config, &inputs)?;
    let report = pipeline::run_coverage(&inputs, &scope)?;

    println!("{}", report.summary());
    for code in report.incomplete() {
        println!("{}", report.indicator_report(&code));
    }
    if config.print_records {
        for country in &scope.countries {
            println!("{}", report.country_report(country));
        }
    }
    Ok(())
}

fn export(config: &RunConfig, records: &[IndicatorRecord]) -> Result<(), AppError> {
    if let Some(path) = &config.export_csv {
        write_indicator_csv(path, records)?;
    }
    if let Some(path) = &config.export_json {
        write_indicator_json(path, records)?;
    }
    Ok(())
}

pub fn run_config_from_args(args: &RunArgs) -> RunConfig {
    RunConfig {
        data_path: args.data.clone(),
        registry_path: args.registry.clone(),
        indicators: args.indicators.clone(),
        country_group: args.group.clone(),
        year_start: args.year_start,
        year_end: args.year_end.unwrap_or_else(|| chrono::Local::now().year()),
        impute_only: args.impute_only,
        print_records: args.records,
        export_csv: args.export_csv.clone(),
        export_json: args.export_json.clone(),
    }
}
