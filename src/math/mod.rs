//! Numerical kernels: goalpost normalization and least squares.

pub mod goalpost;
pub mod ols;

pub use goalpost::*;
pub use ols::*;
