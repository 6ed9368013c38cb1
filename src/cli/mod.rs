//! Command-line parsing for `pix`.
//!
//! Argument parsing and command dispatch stay separate from the engine code.
//! `PIX_REGISTRY` and `PIX_LOG` (also read from `.env`) provide defaults.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "pix", version, about = "Composite policy index: scoring and imputation")]
pub struct Cli {
    /// Log level or tracing filter (overridden by RUST_LOG).
    #[arg(long, global = true, env = "PIX_LOG", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Score indicators from raw dataset observations.
    Score(RunArgs),
    /// Impute missing country-years and re-score.
    Impute(RunArgs),
    /// Report which indicators cover a country group over a year range.
    Coverage(RunArgs),
}

/// Options shared by every subcommand.
#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// Raw dataset observations (CSV, or JSON array when the extension is `.json`).
    #[arg(short = 'd', long, value_name = "FILE")]
    pub data: PathBuf,

    /// Metadata registry JSON.
    #[arg(long, env = "PIX_REGISTRY", value_name = "JSON")]
    pub registry: PathBuf,

    /// Indicator code to evaluate (repeatable). Defaults to every registry indicator.
    #[arg(short = 'i', long = "indicator", value_name = "CODE")]
    pub indicators: Vec<String>,

    /// Country group from the registry. Defaults to every country in the data.
    #[arg(short = 'g', long)]
    pub group: Option<String>,

    /// First year of the range.
    #[arg(long = "from", default_value_t = 2000)]
    pub year_start: i32,

    /// Last year of the range (defaults to the current year).
    #[arg(long = "to")]
    pub year_end: Option<i32>,

    /// Print only synthetic records (impute).
    #[arg(long)]
    pub impute_only: bool,

    /// Print the record-level table.
    #[arg(long)]
    pub records: bool,

    /// Export indicator records to CSV.
    #[arg(long = "export-csv", value_name = "CSV")]
    pub export_csv: Option<PathBuf>,

    /// Export indicator records to JSON.
    #[arg(long = "export-json", value_name = "JSON")]
    pub export_json: Option<PathBuf>,
}
