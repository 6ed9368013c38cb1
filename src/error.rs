//! Error types.
//!
//! - `EngineError` is returned by the scoring/imputation library. Each variant is
//!   a distinct failure kind so callers can match on it.
//! - `AppError` is what the `pix` binary surfaces: a message plus a process exit code.
//!
//! Recoverable data problems (a score function failing, a dataset missing for a
//! record) are *not* errors. Those records are routed to the `incomplete` partition.

use std::fmt;

/// Failure kinds raised by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// A required key is absent from an input record.
    MissingKey { key: String, context: String },
    /// A `Year`/`Value` field could not be converted to its numeric type.
    TypeCoercion { key: &'static str, raw: String },
    /// `goalpost` was handed a NaN value.
    NaNValue,
    /// `goalpost` was handed a NaN bound.
    NaNGoalpost { lower: f64, upper: f64 },
    /// A regression predictor row is missing one of the model's features.
    NaNInput {
        country_code: String,
        year: i32,
        feature_code: String,
    },
    /// A reference set used for averaging mixes units.
    InconsistentUnits { units: Vec<String> },
    /// `item_type` outside {"Dataset", "Indicator"}.
    InvalidItemType(String),
    /// The metadata registry has no entry for this code.
    UnknownItem(String),
    /// Not enough usable rows to fit a regression.
    InsufficientData(String),
    /// The regression design matrix is too ill-conditioned to solve.
    SingularRegression,
    /// An output record breaks a structural invariant.
    InvariantViolation(String),
    /// Filesystem failure in an adapter.
    Io(String),
    /// Malformed input document (CSV/JSON) in an adapter.
    Parse(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::MissingKey { key, context } => {
                write!(f, "missing required key `{key}` ({context})")
            }
            EngineError::TypeCoercion { key, raw } => {
                write!(f, "cannot coerce `{key}` value '{raw}'")
            }
            EngineError::NaNValue => write!(f, "goalpost value is NaN"),
            EngineError::NaNGoalpost { lower, upper } => {
                write!(f, "goalpost bounds contain NaN (lower={lower}, upper={upper})")
            }
            EngineError::NaNInput {
                country_code,
                year,
                feature_code,
            } => write!(
                f,
                "regression input for {country_code}/{year} is missing feature `{feature_code}`"
            ),
            EngineError::InconsistentUnits { units } => {
                write!(f, "reference records mix units: {}", units.join(", "))
            }
            EngineError::InvalidItemType(value) => write!(
                f,
                "invalid item type '{value}' (expected \"Dataset\" or \"Indicator\")"
            ),
            EngineError::UnknownItem(code) => write!(f, "unknown item code `{code}`"),
            EngineError::InsufficientData(msg) => write!(f, "insufficient data: {msg}"),
            EngineError::SingularRegression => {
                write!(f, "regression design matrix is singular")
            }
            EngineError::InvariantViolation(msg) => write!(f, "invariant violated: {msg}"),
            EngineError::Io(msg) => write!(f, "io error: {msg}"),
            EngineError::Parse(msg) => write!(f, "parse error: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Debug for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        // 2 = bad input, 3 = not enough data, 4 = numerical/internal.
        let exit_code = match &err {
            EngineError::MissingKey { .. }
            | EngineError::TypeCoercion { .. }
            | EngineError::InvalidItemType(_)
            | EngineError::UnknownItem(_)
            | EngineError::Io(_)
            | EngineError::Parse(_) => 2,
            EngineError::InsufficientData(_) | EngineError::NaNInput { .. } => 3,
            EngineError::NaNValue
            | EngineError::NaNGoalpost { .. }
            | EngineError::InconsistentUnits { .. }
            | EngineError::SingularRegression
            | EngineError::InvariantViolation(_) => 4,
        };
        AppError::new(exit_code, err.to_string())
    }
}
