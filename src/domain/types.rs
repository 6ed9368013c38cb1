//! Shared domain types.
//!
//! Records are serializable so they can be:
//!
//! - read from raw JSON/CSV dumps
//! - passed by move through each pipeline stage
//! - exported (and reloaded) with the provider field names (`DatasetCode`, `Year`, ...)

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::EngineError;

/// A raw `Year`/`Value` cell before coercion.
///
/// Providers hand us numbers, numeric strings, or explicit nulls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawField {
    Number(f64),
    Text(String),
    Null,
}

impl fmt::Display for RawField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawField::Number(v) => write!(f, "{v}"),
            RawField::Text(s) => write!(f, "{s}"),
            RawField::Null => write!(f, "null"),
        }
    }
}

/// A dataset observation as it arrives from a provider dump.
///
/// `None` means the key is absent; `Some(RawField::Null)` means the key is
/// present with a null value. The distinction matters: an absent key is a
/// caller bug, a null value is missing data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawDatasetRecord {
    #[serde(default)]
    pub dataset_code: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default, deserialize_with = "present_field")]
    pub year: Option<RawField>,
    #[serde(default, deserialize_with = "present_field")]
    pub value: Option<RawField>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
}

fn present_field<'de, D>(deserializer: D) -> Result<Option<RawField>, D::Error>
where
    D: Deserializer<'de>,
{
    RawField::deserialize(deserializer).map(Some)
}

impl From<DatasetRecord> for RawDatasetRecord {
    fn from(record: DatasetRecord) -> Self {
        Self {
            dataset_code: Some(record.dataset_code),
            country_code: Some(record.country_code),
            year: Some(RawField::Number(f64::from(record.year))),
            value: Some(record.value.map(RawField::Number).unwrap_or(RawField::Null)),
            unit: Some(record.unit),
            score: record.score,
        }
    }
}

/// A canonical dataset observation (the leaf of the hierarchy).
///
/// Serialized as one flat bag: imputation fields (`Imputed`,
/// `ImputationMethod`, `ImputationDistance`, ...) sit next to `Value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DatasetRecord {
    pub dataset_code: String,
    pub country_code: String,
    pub year: i32,
    /// `None` for null observations; `Some(NaN)` is also possible until
    /// `drop_missing` routes it out.
    #[serde(default, with = "float_token")]
    pub value: Option<f64>,
    #[serde(default)]
    pub unit: String,
    #[serde(default, with = "float_token", skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(flatten)]
    pub imputation: Option<Imputation>,
}

impl DatasetRecord {
    pub fn new(
        dataset_code: impl Into<String>,
        country_code: impl Into<String>,
        year: i32,
        value: f64,
    ) -> Self {
        Self {
            dataset_code: dataset_code.into(),
            country_code: country_code.into(),
            year,
            value: Some(value),
            unit: String::new(),
            score: None,
            imputation: None,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    /// Finite (or infinite) numeric value; `None` for null/NaN.
    pub fn numeric_value(&self) -> Option<f64> {
        self.value.filter(|v| !v.is_nan())
    }
}

/// An indicator observation assembled per `(IndicatorCode, CountryCode, Year)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IndicatorRecord {
    pub indicator_code: String,
    pub country_code: String,
    pub year: i32,
    #[serde(default)]
    pub datasets: Vec<DatasetRecord>,
    #[serde(default, with = "float_token", skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, with = "float_token", skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Indicator-level imputation (regression, averaged indicators, extrapolated
    /// indicator series). Dataset-level flags live on `datasets`.
    #[serde(flatten)]
    pub imputation: Option<Imputation>,
}

impl IndicatorRecord {
    pub fn new(indicator_code: impl Into<String>, country_code: impl Into<String>, year: i32) -> Self {
        Self {
            indicator_code: indicator_code.into(),
            country_code: country_code.into(),
            year,
            datasets: Vec::new(),
            value: None,
            score: None,
            unit: None,
            imputation: None,
        }
    }

    /// Complete = identifiers plus `Value`, `Unit` and `Score`.
    pub fn is_complete(&self) -> bool {
        self.score.is_some() && self.value.is_some() && self.unit.is_some()
    }

    /// Where (if anywhere) this record carries synthetic data.
    ///
    /// Indicator-level flags win over dataset-level ones.
    pub fn imputation_level(&self) -> Option<ImputationLevel> {
        if self.imputation.is_some() {
            Some(ImputationLevel::Indicator)
        } else if self.datasets.iter().any(|d| d.imputation.is_some()) {
            Some(ImputationLevel::Dataset)
        } else {
            None
        }
    }

    pub fn dataset(&self, dataset_code: &str) -> Option<&DatasetRecord> {
        self.datasets.iter().rev().find(|d| d.dataset_code == dataset_code)
    }
}

/// A feature observation used as a regression input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FeatureRecord {
    pub feature_code: String,
    pub country_code: String,
    pub year: i32,
    pub score: f64,
}

impl FeatureRecord {
    pub fn new(feature_code: impl Into<String>, country_code: impl Into<String>, year: i32, score: f64) -> Self {
        Self {
            feature_code: feature_code.into(),
            country_code: country_code.into(),
            year,
            score,
        }
    }
}

/// How a synthetic record was produced.
///
/// Method-specific fields live in the variants rather than as optional flat fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "ImputationMethod")]
pub enum ImputationMethod {
    #[serde(rename = "Forward Extrapolation")]
    ForwardExtrapolation,
    #[serde(rename = "Backward Extrapolation")]
    BackwardExtrapolation,
    #[serde(rename = "Linear Interpolation")]
    LinearInterpolation,
    #[serde(rename = "ImputeGlobalAverage")]
    GlobalAverage,
    #[serde(rename = "RegressionImputation")]
    Regression {
        #[serde(rename = "ImputationRegessionModel")]
        model: String,
        #[serde(rename = "ImputationDetails")]
        details: String,
        #[serde(rename = "LowerGoalpost")]
        lower_goalpost: f64,
        #[serde(rename = "UpperGoalpost")]
        upper_goalpost: f64,
    },
    #[serde(rename = "ManualSourcing")]
    ManualSourcing {
        #[serde(rename = "ImputationDetails")]
        details: String,
    },
}

impl ImputationMethod {
    /// Label used in exports and reports.
    pub fn label(&self) -> &'static str {
        match self {
            ImputationMethod::ForwardExtrapolation => "Forward Extrapolation",
            ImputationMethod::BackwardExtrapolation => "Backward Extrapolation",
            ImputationMethod::LinearInterpolation => "Linear Interpolation",
            ImputationMethod::GlobalAverage => "ImputeGlobalAverage",
            ImputationMethod::Regression { .. } => "RegressionImputation",
            ImputationMethod::ManualSourcing { .. } => "ManualSourcing",
        }
    }
}

/// Imputation annotation carried by any synthetic record.
///
/// On the wire it always carries `Imputed: true`; a bag without that flag
/// (or with `Imputed: false`) is not an imputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ImputationFields", into = "ImputationFields")]
pub struct Imputation {
    pub method: ImputationMethod,
    /// Year-distance to the nearest real observation that produced the record.
    pub distance: u32,
}

impl Imputation {
    pub fn new(method: ImputationMethod, distance: u32) -> Self {
        Self { method, distance }
    }
}

#[derive(Serialize, Deserialize)]
struct ImputationFields {
    #[serde(rename = "Imputed", default = "flag_set")]
    imputed: bool,
    #[serde(flatten)]
    method: ImputationMethod,
    #[serde(rename = "ImputationDistance")]
    distance: u32,
}

fn flag_set() -> bool {
    true
}

impl From<Imputation> for ImputationFields {
    fn from(imputation: Imputation) -> Self {
        Self {
            imputed: true,
            method: imputation.method,
            distance: imputation.distance,
        }
    }
}

impl TryFrom<ImputationFields> for Imputation {
    type Error = String;

    fn try_from(fields: ImputationFields) -> Result<Self, Self::Error> {
        if !fields.imputed {
            return Err("`Imputed` is false".to_string());
        }
        Ok(Imputation::new(fields.method, fields.distance))
    }
}

/// `Option<f64>` fields that keep non-finite values through JSON.
///
/// serde_json writes `inf` and `NaN` as `null`; here they become the strings
/// `"inf"`, `"-inf"` and `"NaN"`, and are read back from the same tokens.
mod float_token {
    use serde::de::Error as _;

    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Token {
        Number(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            None => serializer.serialize_none(),
            Some(v) if v.is_finite() => serializer.serialize_some(v),
            Some(v) if v.is_nan() => serializer.serialize_some("NaN"),
            Some(v) if *v > 0.0 => serializer.serialize_some("inf"),
            Some(_) => serializer.serialize_some("-inf"),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Token>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Token::Number(v)) => Ok(Some(v)),
            Some(Token::Text(s)) => match s.to_ascii_lowercase().as_str() {
                "inf" | "+inf" | "infinity" => Ok(Some(f64::INFINITY)),
                "-inf" | "-infinity" => Ok(Some(f64::NEG_INFINITY)),
                "nan" => Ok(Some(f64::NAN)),
                _ => Err(D::Error::custom(format!("invalid number '{s}'"))),
            },
        }
    }
}

/// Level at which an indicator record is synthetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImputationLevel {
    Dataset,
    Indicator,
}

/// Which code key a synthesized record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemType {
    Dataset,
    Indicator,
}

impl FromStr for ItemType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Dataset" => Ok(ItemType::Dataset),
            "Indicator" => Ok(ItemType::Indicator),
            other => Err(EngineError::InvalidItemType(other.to_string())),
        }
    }
}

/// A `(lower, upper)` normalization window.
///
/// `lower > upper` is allowed and means "smaller is better".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Goalposts {
    pub lower: f64,
    pub upper: f64,
}

impl Goalposts {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// Map a score in [0,1] back to the value scale.
    pub fn value_at(&self, score: f64) -> f64 {
        (self.upper - self.lower) * score + self.lower
    }
}

/// Uniform access to the fields the imputation cascade manipulates.
///
/// A series is identified by `(CountryCode, code())`, where `code()` is the
/// record's own item code: `DatasetCode` for dataset records, `IndicatorCode`
/// for indicator records.
pub trait SeriesRecord: Clone {
    fn code(&self) -> &str;
    fn country_code(&self) -> &str;
    fn year(&self) -> i32;
    fn set_year(&mut self, year: i32);
    fn value(&self) -> Option<f64>;
    fn set_value(&mut self, value: Option<f64>);
    fn score(&self) -> Option<f64>;
    fn set_score(&mut self, score: Option<f64>);
    fn imputation(&self) -> Option<&Imputation>;
    fn set_imputation(&mut self, imputation: Imputation);
    fn unit(&self) -> Option<&str>;

    /// Drop nested observations that would be stale on a synthesized copy
    /// whose value was not copied verbatim.
    fn detach_components(&mut self) {}

    fn is_imputed(&self) -> bool {
        self.imputation().is_some()
    }

    fn series_key(&self) -> (String, String) {
        (self.country_code().to_string(), self.code().to_string())
    }
}

impl SeriesRecord for DatasetRecord {
    fn code(&self) -> &str {
        &self.dataset_code
    }
    fn country_code(&self) -> &str {
        &self.country_code
    }
    fn year(&self) -> i32 {
        self.year
    }
    fn set_year(&mut self, year: i32) {
        self.year = year;
    }
    fn value(&self) -> Option<f64> {
        self.value
    }
    fn set_value(&mut self, value: Option<f64>) {
        self.value = value;
    }
    fn score(&self) -> Option<f64> {
        self.score
    }
    fn set_score(&mut self, score: Option<f64>) {
        self.score = score;
    }
    fn imputation(&self) -> Option<&Imputation> {
        self.imputation.as_ref()
    }
    fn set_imputation(&mut self, imputation: Imputation) {
        self.imputation = Some(imputation);
    }
    fn unit(&self) -> Option<&str> {
        Some(&self.unit)
    }
}

impl SeriesRecord for IndicatorRecord {
    fn code(&self) -> &str {
        &self.indicator_code
    }
    fn country_code(&self) -> &str {
        &self.country_code
    }
    fn year(&self) -> i32 {
        self.year
    }
    // Nested datasets must keep matching the record's (CountryCode, Year).
    fn set_year(&mut self, year: i32) {
        self.year = year;
        for dataset in &mut self.datasets {
            dataset.year = year;
        }
    }
    fn value(&self) -> Option<f64> {
        self.value
    }
    fn set_value(&mut self, value: Option<f64>) {
        self.value = value;
    }
    fn score(&self) -> Option<f64> {
        self.score
    }
    fn set_score(&mut self, score: Option<f64>) {
        self.score = score;
    }
    fn imputation(&self) -> Option<&Imputation> {
        self.imputation.as_ref()
    }
    fn set_imputation(&mut self, imputation: Imputation) {
        self.imputation = Some(imputation);
    }
    fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }
    fn detach_components(&mut self) {
        self.datasets.clear();
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus `.env` defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub data_path: PathBuf,
    pub registry_path: PathBuf,
    /// Indicators to evaluate; empty means every indicator in the registry.
    pub indicators: Vec<String>,
    pub country_group: Option<String>,
    pub year_start: i32,
    pub year_end: i32,
    /// Emit only synthetic records from imputation runs.
    pub impute_only: bool,
    /// Print record-level tables in addition to summaries.
    pub print_records: bool,
    pub export_csv: Option<PathBuf>,
    pub export_json: Option<PathBuf>,
}
