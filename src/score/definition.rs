//! Indicator definitions.
//!
//! An indicator's evaluation is declared as data: an ordered list of
//! `DatasetCode`s plus a pure function over the correspondingly-ordered values.
//! The evaluator builds the argument slice by explicit lookup.

use std::fmt;
use std::sync::Arc;

use crate::domain::Goalposts;
use crate::error::EngineError;
use crate::math::score_with;
use crate::registry::MetadataRegistry;

/// Pure function of dataset values (in `IndicatorDefinition::datasets` order).
pub type ScoreFn = Arc<dyn Fn(&[f64]) -> Result<f64, EngineError> + Send + Sync>;

/// Unit derived from the same inputs as the score.
pub type UnitFn = Arc<dyn Fn(&[f64]) -> String + Send + Sync>;

#[derive(Clone)]
pub enum UnitSpec {
    Fixed(String),
    Computed(UnitFn),
}

impl UnitSpec {
    pub fn resolve(&self, inputs: &[f64]) -> String {
        match self {
            UnitSpec::Fixed(unit) => unit.clone(),
            UnitSpec::Computed(f) => f(inputs),
        }
    }
}

impl From<&str> for UnitSpec {
    fn from(value: &str) -> Self {
        UnitSpec::Fixed(value.to_string())
    }
}

impl From<String> for UnitSpec {
    fn from(value: String) -> Self {
        UnitSpec::Fixed(value)
    }
}

impl fmt::Debug for UnitSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitSpec::Fixed(unit) => f.debug_tuple("Fixed").field(unit).finish(),
            UnitSpec::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// How one indicator is computed from its datasets.
#[derive(Clone)]
pub struct IndicatorDefinition {
    pub code: String,
    pub datasets: Vec<String>,
    pub unit: UnitSpec,
    score_fn: ScoreFn,
    value_fn: Option<ScoreFn>,
}

impl IndicatorDefinition {
    pub fn new<F>(code: impl Into<String>, datasets: &[&str], unit: impl Into<UnitSpec>, score_fn: F) -> Self
    where
        F: Fn(&[f64]) -> Result<f64, EngineError> + Send + Sync + 'static,
    {
        Self {
            code: code.into(),
            datasets: datasets.iter().map(|d| d.to_string()).collect(),
            unit: unit.into(),
            score_fn: Arc::new(score_fn),
            value_fn: None,
        }
    }

    /// One dataset, goalposted; `Value` is the raw dataset value.
    pub fn single(code: impl Into<String>, dataset: &str, unit: impl Into<UnitSpec>, goalposts: Goalposts) -> Self {
        Self::new(code, &[dataset], unit, move |v: &[f64]| score_with(v[0], goalposts))
            .with_value_fn(|v: &[f64]| Ok(v[0]))
    }

    /// Average of the datasets' goalposted scores, bounds taken from the registry.
    pub fn goalposted_mean(code: &str, registry: &dyn MetadataRegistry) -> Result<Self, EngineError> {
        let datasets = registry.dataset_dependencies(code)?;
        if datasets.is_empty() {
            return Err(EngineError::InsufficientData(format!(
                "indicator `{code}` has no dataset dependencies"
            )));
        }
        let goalposts = datasets
            .iter()
            .map(|d| registry.goalposts(d))
            .collect::<Result<Vec<_>, _>>()?;

        let n = goalposts.len() as f64;
        let score_fn: ScoreFn = Arc::new(move |inputs: &[f64]| -> Result<f64, EngineError> {
            let mut total = 0.0;
            for (value, gp) in inputs.iter().zip(&goalposts) {
                total += score_with(*value, *gp)?;
            }
            Ok(total / n)
        });

        Ok(Self {
            code: code.to_string(),
            datasets,
            unit: UnitSpec::Fixed("Index".to_string()),
            score_fn,
            value_fn: None,
        })
    }

    /// Override `Value` (which otherwise mirrors the score).
    pub fn with_value_fn<F>(mut self, value_fn: F) -> Self
    where
        F: Fn(&[f64]) -> Result<f64, EngineError> + Send + Sync + 'static,
    {
        self.value_fn = Some(Arc::new(value_fn));
        self
    }

    pub fn with_unit_fn<F>(mut self, unit_fn: F) -> Self
    where
        F: Fn(&[f64]) -> String + Send + Sync + 'static,
    {
        self.unit = UnitSpec::Computed(Arc::new(unit_fn));
        self
    }

    pub fn score(&self, inputs: &[f64]) -> Result<f64, EngineError> {
        (self.score_fn)(inputs)
    }

    /// `None` when no value function is configured.
    pub fn value(&self, inputs: &[f64]) -> Option<Result<f64, EngineError>> {
        self.value_fn.as_ref().map(|f| f(inputs))
    }
}

impl fmt::Debug for IndicatorDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndicatorDefinition")
            .field("code", &self.code)
            .field("datasets", &self.datasets)
            .field("unit", &self.unit)
            .field("value_fn", &self.value_fn.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tree::tests::registry;

    #[test]
    fn goalposted_mean_uses_registry_bounds() {
        let reg = registry();
        let def = IndicatorDefinition::goalposted_mean("NITROG", &reg).unwrap();
        assert_eq!(def.datasets, vec!["EPI_NITROG", "UNSDG_TERRST"]);
        // EPI_NITROG is inverted (100 -> 0): 25 scores 0.75; UNSDG_TERRST 50 scores 0.5.
        let score = def.score(&[25.0, 50.0]).unwrap();
        assert!((score - 0.625).abs() < 1e-12);
        assert!(def.value(&[25.0, 50.0]).is_none());
    }

    #[test]
    fn single_keeps_raw_value() {
        let def = IndicatorDefinition::single("UNEMPL", "ILO_UNEMPL", "%", Goalposts::new(40.0, 0.0));
        assert_eq!(def.score(&[10.0]).unwrap(), 0.75);
        assert_eq!(def.value(&[10.0]).unwrap().unwrap(), 10.0);
    }

    #[test]
    fn unit_can_depend_on_inputs() {
        let def = IndicatorDefinition::new("X", &["A"], "%", |v| Ok(v[0]))
            .with_unit_fn(|v| if v[0] > 1.0 { "count".to_string() } else { "share".to_string() });
        assert_eq!(def.unit.resolve(&[2.0]), "count");
        assert_eq!(def.unit.resolve(&[0.5]), "share");
    }
}
