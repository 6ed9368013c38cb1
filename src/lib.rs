//! `policy-index` library crate.
//!
//! Scoring and imputation engine for a hierarchical composite index
//! (Index -> Pillar -> Category -> Indicator -> Dataset).
//!
//! The binary (`pix`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the engine can be embedded behind other front-ends (HTTP, notebooks)

pub mod app;
pub mod cli;
pub mod coverage;
pub mod domain;
pub mod error;
pub mod impute;
pub mod io;
pub mod math;
pub mod records;
pub mod registry;
pub mod report;
pub mod score;
pub mod store;
pub mod telemetry;
