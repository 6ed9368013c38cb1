//! Record normalization.
//!
//! Turns provider records (where `Year`/`Value` may be numbers or strings) into
//! canonical `DatasetRecord`s, then separates observations that carry no usable
//! value.
//!
//! Missing keys and unparseable numerics fail fast: they are caller bugs.
//! Null/NaN values are data, not errors, and are routed to `dropped`.

use tracing::debug;

use crate::domain::{DatasetRecord, RawDatasetRecord, RawField};
use crate::error::EngineError;

/// Textual spellings providers use for "no observation".
const NULL_TOKENS: [&str; 5] = ["", "null", "none", "na", "n/a"];

/// Coerce raw records to typed `Year`/`Value`.
pub fn normalize(records: Vec<RawDatasetRecord>) -> Result<Vec<DatasetRecord>, EngineError> {
    records
        .into_iter()
        .enumerate()
        .map(|(idx, raw)| normalize_record(idx, raw))
        .collect()
}

/// Split records into `(kept, dropped)`.
///
/// `kept` holds every record whose `Value` is a number (zero, negatives and
/// ±∞ included); `dropped` holds null and NaN observations.
pub fn drop_missing(records: Vec<DatasetRecord>) -> (Vec<DatasetRecord>, Vec<DatasetRecord>) {
    let (kept, dropped): (Vec<_>, Vec<_>) = records
        .into_iter()
        .partition(|r| r.numeric_value().is_some());
    if !dropped.is_empty() {
        debug!(kept = kept.len(), dropped = dropped.len(), "dropped records without values");
    }
    (kept, dropped)
}

fn normalize_record(idx: usize, raw: RawDatasetRecord) -> Result<DatasetRecord, EngineError> {
    let context = || {
        format!(
            "record #{idx} DatasetCode={} CountryCode={}",
            raw.dataset_code.as_deref().unwrap_or("?"),
            raw.country_code.as_deref().unwrap_or("?")
        )
    };
    let missing = |key: &str| EngineError::MissingKey {
        key: key.to_string(),
        context: context(),
    };

    let dataset_code = raw
        .dataset_code
        .clone()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| missing("DatasetCode"))?;
    let country_code = raw
        .country_code
        .clone()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| missing("CountryCode"))?;

    let year = match &raw.year {
        None | Some(RawField::Null) => return Err(missing("Year")),
        Some(field) => coerce_year(field)?,
    };
    let value = match &raw.value {
        None => return Err(missing("Value")),
        Some(field) => coerce_value(field)?,
    };

    Ok(DatasetRecord {
        dataset_code: dataset_code.trim().to_string(),
        country_code: country_code.trim().to_string(),
        year,
        value,
        unit: raw.unit.unwrap_or_default(),
        score: raw.score,
        imputation: None,
    })
}

fn coerce_year(field: &RawField) -> Result<i32, EngineError> {
    let fail = || EngineError::TypeCoercion {
        key: "Year",
        raw: field.to_string(),
    };
    let v = match field {
        RawField::Number(v) => *v,
        RawField::Text(s) => {
            let s = s.trim();
            if let Ok(year) = s.parse::<i32>() {
                return Ok(year);
            }
            s.parse::<f64>().map_err(|_| fail())?
        }
        RawField::Null => return Err(fail()),
    };
    if !v.is_finite() || v.fract() != 0.0 || v < f64::from(i32::MIN) || v > f64::from(i32::MAX) {
        return Err(fail());
    }
    Ok(v as i32)
}

fn coerce_value(field: &RawField) -> Result<Option<f64>, EngineError> {
    match field {
        RawField::Number(v) => Ok(Some(*v)),
        RawField::Null => Ok(None),
        RawField::Text(s) => {
            let s = s.trim();
            if NULL_TOKENS.iter().any(|t| s.eq_ignore_ascii_case(t)) {
                return Ok(None);
            }
            s.parse::<f64>().map(Some).map_err(|_| EngineError::TypeCoercion {
                key: "Value",
                raw: s.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(year: RawField, value: RawField) -> RawDatasetRecord {
        RawDatasetRecord {
            dataset_code: Some("UNFAO_LANDAR".to_string()),
            country_code: Some("USA".to_string()),
            year: Some(year),
            value: Some(value),
            unit: Some("sq km".to_string()),
            score: None,
        }
    }

    #[test]
    fn coerces_strings_and_numbers() {
        let out = normalize(vec![
            raw(RawField::Text("2019".into()), RawField::Text(" 12.5 ".into())),
            raw(RawField::Number(2020.0), RawField::Number(-3.0)),
        ])
        .unwrap();
        assert_eq!(out[0].year, 2019);
        assert_eq!(out[0].value, Some(12.5));
        assert_eq!(out[1].year, 2020);
        assert_eq!(out[1].value, Some(-3.0));
    }

    #[test]
    fn null_values_are_data_not_errors() {
        let out = normalize(vec![
            raw(RawField::Number(2019.0), RawField::Null),
            raw(RawField::Number(2019.0), RawField::Text("".into())),
            raw(RawField::Number(2019.0), RawField::Text("NaN".into())),
        ])
        .unwrap();
        assert_eq!(out[0].value, None);
        assert_eq!(out[1].value, None);
        assert!(out[2].value.unwrap().is_nan());
    }

    #[test]
    fn missing_keys_fail_fast() {
        let mut r = raw(RawField::Number(2019.0), RawField::Number(1.0));
        r.value = None;
        let err = normalize(vec![r]).unwrap_err();
        assert!(matches!(err, EngineError::MissingKey { ref key, .. } if key == "Value"));

        let mut r = raw(RawField::Number(2019.0), RawField::Number(1.0));
        r.country_code = None;
        assert!(matches!(
            normalize(vec![r]),
            Err(EngineError::MissingKey { .. })
        ));
    }

    #[test]
    fn unparseable_numerics_fail_fast() {
        let err = normalize(vec![raw(RawField::Text("twenty".into()), RawField::Number(1.0))]).unwrap_err();
        assert!(matches!(err, EngineError::TypeCoercion { key: "Year", .. }));

        let err = normalize(vec![raw(RawField::Number(2019.5), RawField::Number(1.0))]).unwrap_err();
        assert!(matches!(err, EngineError::TypeCoercion { key: "Year", .. }));

        let err = normalize(vec![raw(RawField::Number(2019.0), RawField::Text("1,0x".into()))]).unwrap_err();
        assert!(matches!(err, EngineError::TypeCoercion { key: "Value", .. }));
    }

    #[test]
    fn drop_missing_keeps_zero_negative_and_infinite() {
        let mut null = DatasetRecord::new("A", "USA", 2000, 0.0);
        null.value = None;
        let records = vec![
            DatasetRecord::new("A", "USA", 2001, 0.0),
            DatasetRecord::new("A", "USA", 2002, -4.0),
            DatasetRecord::new("A", "USA", 2003, f64::INFINITY),
            DatasetRecord::new("A", "USA", 2004, f64::NAN),
            null,
        ];
        let (kept, dropped) = drop_missing(records);
        assert_eq!(kept.len(), 3);
        assert_eq!(dropped.len(), 2);

        // Idempotent.
        let (again, none) = drop_missing(kept.clone());
        assert_eq!(again, kept);
        assert!(none.is_empty());
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize(vec![
            raw(RawField::Text("2019".into()), RawField::Text("7".into())),
            raw(RawField::Number(2020.0), RawField::Null),
        ])
        .unwrap();
        let twice = normalize(once.iter().cloned().map(RawDatasetRecord::from).collect()).unwrap();
        assert_eq!(once, twice);
    }
}
