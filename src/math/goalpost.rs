//! Goalpost normalization.
//!
//! Every score the engine produces is ultimately a composition of `goalpost`
//! calls: a raw value is placed on the line between a `lower` and an `upper`
//! bound and clamped to [0,1].
//!
//! Inverted goalposts (`lower > upper`, "smaller is better") need no special
//! casing: the same formula flips the direction and clamping does the rest.

use crate::domain::Goalposts;
use crate::error::EngineError;

/// Map `value` onto [0,1] using the `(lower, upper)` window.
///
/// - `lower == upper`: 0.5 at the goalpost, 0 below it, 1 above it.
/// - otherwise `(value - lower) / (upper - lower)`, clamped.
///
/// NaN inputs are upstream data-quality failures and are reported rather than
/// propagated.
pub fn goalpost(value: f64, lower: f64, upper: f64) -> Result<f64, EngineError> {
    if lower.is_nan() || upper.is_nan() {
        return Err(EngineError::NaNGoalpost { lower, upper });
    }
    if value.is_nan() {
        return Err(EngineError::NaNValue);
    }

    if lower == upper {
        return Ok(if value == lower {
            0.5
        } else if value < lower {
            0.0
        } else {
            1.0
        });
    }

    // Infinite values: the ratio is ±inf (or NaN when both bounds are infinite
    // in the same direction, which clamps via the sign test below).
    let t = (value - lower) / (upper - lower);
    if t.is_nan() {
        let rising = upper > lower;
        return Ok(if (value > lower) == rising { 1.0 } else { 0.0 });
    }
    Ok(t.clamp(0.0, 1.0))
}

/// `goalpost` with a `Goalposts` pair.
pub fn score_with(value: f64, goalposts: Goalposts) -> Result<f64, EngineError> {
    goalpost(value, goalposts.lower, goalposts.upper)
}
