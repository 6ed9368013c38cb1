//! Input/output adapters.
//!
//! - raw dataset ingest from CSV or JSON (`ingest`)
//! - indicator exports to CSV/JSON (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
