//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - raw and canonical dataset records (`RawDatasetRecord`, `DatasetRecord`)
//! - assembled indicator records (`IndicatorRecord`) and regression features
//! - the imputation annotation (`Imputation`, `ImputationMethod`)
//! - the `SeriesRecord` abstraction the imputation cascade works over

pub mod types;

pub use types::*;
