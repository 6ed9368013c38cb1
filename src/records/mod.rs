//! Record preparation: normalization (typed `Year`/`Value`, missing-value
//! routing) and grouping into indicator records or arbitrary series.

pub mod group;
pub mod normalize;

pub use group::*;
pub use normalize::*;
