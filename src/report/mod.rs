//! Terminal reporting.
//!
//! Formatting lives here so the engine modules stay free of presentation code.

pub mod format;

pub use format::*;
