//! Regression imputation.
//!
//! Predict an indicator's score from correlated feature scores:
//!
//! 1. pivot features + outcome to a wide table keyed by `(CountryCode, Year)`
//! 2. drop rows with any missing cell
//! 3. fit `score ~ 1 + features` by OLS (SVD least squares)
//! 4. pivot the predictor records the same way and predict, clamping to [0,1]
//! 5. map each score back to the value scale with the goalposts

use std::collections::{BTreeSet, HashMap};

use nalgebra::{DMatrix, DVector};
use tracing::info;

use crate::domain::{FeatureRecord, Goalposts, Imputation, ImputationMethod, IndicatorRecord};
use crate::error::EngineError;
use crate::math::{r_squared, solve_least_squares};

/// A fitted linear model.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionModel {
    pub target_indicator: String,
    pub feature_codes: Vec<String>,
    pub intercept: f64,
    pub coefficients: Vec<f64>,
    pub r_squared: f64,
    pub n_obs: usize,
}

impl RegressionModel {
    /// Predict for a row ordered like `feature_codes`.
    pub fn predict(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(b, x)| b * x)
                .sum::<f64>()
    }

    /// Human-readable formula, e.g. `SCORE(GTRANS) ~ 0.1200 + 0.5000*ENRPRI`.
    pub fn formula(&self) -> String {
        let mut out = format!("SCORE({}) ~ {:.4}", self.target_indicator, self.intercept);
        for (code, b) in self.feature_codes.iter().zip(&self.coefficients) {
            let sign = if *b < 0.0 { '-' } else { '+' };
            out.push_str(&format!(" {sign} {:.4}*{code}", b.abs()));
        }
        out
    }
}

/// Inputs for one regression imputation call.
#[derive(Debug, Clone)]
pub struct RegressionRequest<'a> {
    pub feature_list: &'a [FeatureRecord],
    pub outcome_list: &'a [IndicatorRecord],
    pub predictor_list: &'a [FeatureRecord],
    pub target_indicator: &'a str,
    pub unit: &'a str,
    /// Rendered from the fitted model when `None`.
    pub model_string: Option<&'a str>,
    pub details: &'a str,
    pub goalposts: Goalposts,
}

/// Fit `target ~ features` on rows where every cell is present.
pub fn fit_regression(
    feature_list: &[FeatureRecord],
    outcome_list: &[IndicatorRecord],
    target_indicator: &str,
) -> Result<RegressionModel, EngineError> {
    let feature_codes: Vec<String> = feature_list
        .iter()
        .map(|f| f.feature_code.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if feature_codes.is_empty() {
        return Err(EngineError::InsufficientData("no feature records".to_string()));
    }

    let outcomes: HashMap<(&str, i32), f64> = outcome_list
        .iter()
        .filter(|r| r.indicator_code == target_indicator)
        .filter_map(|r| r.score.filter(|s| !s.is_nan()).map(|s| ((r.country_code.as_str(), r.year), s)))
        .collect();

    let table = pivot(feature_list, &feature_codes);
    let mut rows: Vec<(Vec<f64>, f64)> = Vec::new();
    for (key, cells) in &table {
        let Some(&y) = outcomes.get(&(key.0.as_str(), key.1)) else {
            continue;
        };
        let row: Option<Vec<f64>> = cells.iter().map(|c| c.filter(|v| !v.is_nan())).collect();
        if let Some(row) = row {
            rows.push((row, y));
        }
    }

    let p = feature_codes.len() + 1;
    if rows.len() < p {
        return Err(EngineError::InsufficientData(format!(
            "{} complete rows for {p} parameters",
            rows.len()
        )));
    }

    let n = rows.len();
    let mut x = DMatrix::<f64>::zeros(n, p);
    let mut y = DVector::<f64>::zeros(n);
    for (i, (row, target)) in rows.iter().enumerate() {
        x[(i, 0)] = 1.0;
        for (j, v) in row.iter().enumerate() {
            x[(i, j + 1)] = *v;
        }
        y[i] = *target;
    }

    let beta = solve_least_squares(&x, &y).ok_or(EngineError::SingularRegression)?;
    let fitted = &x * &beta;

    Ok(RegressionModel {
        target_indicator: target_indicator.to_string(),
        feature_codes,
        intercept: beta[0],
        coefficients: beta.iter().skip(1).copied().collect(),
        r_squared: r_squared(&y, &fitted),
        n_obs: n,
    })
}

/// Fit, predict for every predictor row, and emit imputed indicator records.
pub fn regression_imputation(req: &RegressionRequest<'_>) -> Result<Vec<IndicatorRecord>, EngineError> {
    let model = fit_regression(req.feature_list, req.outcome_list, req.target_indicator)?;
    info!(
        indicator = %req.target_indicator,
        n = model.n_obs,
        r_squared = model.r_squared,
        "fitted regression imputation model"
    );
    let model_string = req.model_string.map_or_else(|| model.formula(), str::to_string);

    let table = pivot(req.predictor_list, &model.feature_codes);
    let mut out = Vec::with_capacity(table.len());
    for ((country_code, year), cells) in table {
        let mut row = Vec::with_capacity(cells.len());
        for (code, cell) in model.feature_codes.iter().zip(&cells) {
            match cell {
                Some(v) if !v.is_nan() => row.push(*v),
                _ => {
                    return Err(EngineError::NaNInput {
                        country_code,
                        year,
                        feature_code: code.clone(),
                    });
                }
            }
        }

        let score = model.predict(&row).clamp(0.0, 1.0);
        let mut record = IndicatorRecord::new(req.target_indicator, country_code, year);
        record.score = Some(score);
        record.value = Some(req.goalposts.value_at(score));
        record.unit = Some(req.unit.to_string());
        record.imputation = Some(Imputation::new(
            ImputationMethod::Regression {
                model: model_string.clone(),
                details: req.details.to_string(),
                lower_goalpost: req.goalposts.lower,
                upper_goalpost: req.goalposts.upper,
            },
            0,
        ));
        out.push(record);
    }
    Ok(out)
}

/// Wide table: one row per `(CountryCode, Year)` in first-seen order, one cell
/// per code in `codes`. A repeated cell keeps the last observation.
fn pivot(records: &[FeatureRecord], codes: &[String]) -> Vec<((String, i32), Vec<Option<f64>>)> {
    let column: HashMap<&str, usize> = codes.iter().enumerate().map(|(i, c)| (c.as_str(), i)).collect();
    let mut index: HashMap<(String, i32), usize> = HashMap::new();
    let mut rows: Vec<((String, i32), Vec<Option<f64>>)> = Vec::new();

    for f in records {
        let key = (f.country_code.clone(), f.year);
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            rows.push((key, vec![None; codes.len()]));
            rows.len() - 1
        });
        if let Some(&col) = column.get(f.feature_code.as_str()) {
            rows[slot].1[col] = Some(f.score);
        }
    }
    rows
}
