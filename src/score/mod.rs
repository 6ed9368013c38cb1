//! Indicator scoring.
//!
//! - `definition`: declarative indicator definitions (dataset codes + score function)
//! - `evaluator`: the per-indicator scoring pipeline
//! - `computed`: virtual datasets derived inside indicator records
//! - `validate`: completeness partition and structural invariant checks

pub mod computed;
pub mod definition;
pub mod evaluator;
pub mod validate;

pub use computed::*;
pub use definition::*;
pub use evaluator::*;
pub use validate::*;
