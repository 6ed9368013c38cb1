//! Record grouping.
//!
//! - `group_by_indicator` assembles indicator records from dataset observations
//!   sharing a `(CountryCode, Year)`.
//! - `group_series` exposes the same partitioning over arbitrary identifier
//!   tuples on the flat attribute-bag view of any serializable record.
//!
//! Both preserve first-seen partition order and insertion order within a partition.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::{DatasetRecord, IndicatorRecord};
use crate::error::EngineError;

/// One partition produced by `group_series`.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesGroup {
    /// Identifier values in `key_fields` order.
    pub key: Vec<(String, Value)>,
    /// Member records with key and excluded fields removed.
    pub observations: Vec<Map<String, Value>>,
}

/// Partition dataset records by `(CountryCode, Year)` into indicator records.
///
/// Duplicate `(DatasetCode, CountryCode, Year)` inputs are kept in insertion
/// order; resolving them is the scorer's job.
pub fn group_by_indicator(
    datasets: Vec<DatasetRecord>,
    indicator_code: &str,
) -> Result<Vec<IndicatorRecord>, EngineError> {
    let mut index: HashMap<(String, i32), usize> = HashMap::new();
    let mut out: Vec<IndicatorRecord> = Vec::new();

    for dataset in datasets {
        if dataset.country_code.trim().is_empty() {
            return Err(EngineError::MissingKey {
                key: "CountryCode".to_string(),
                context: format!("DatasetCode={} Year={}", dataset.dataset_code, dataset.year),
            });
        }
        let key = (dataset.country_code.clone(), dataset.year);
        let slot = *index.entry(key).or_insert_with(|| {
            out.push(IndicatorRecord::new(
                indicator_code,
                dataset.country_code.clone(),
                dataset.year,
            ));
            out.len() - 1
        });
        out[slot].datasets.push(dataset);
    }

    Ok(out)
}

/// Flatten indicator records back to their dataset observations.
pub fn flatten_datasets(records: Vec<IndicatorRecord>) -> Vec<DatasetRecord> {
    records.into_iter().flat_map(|r| r.datasets).collect()
}

/// Partition any serializable records by the values of `key_fields`.
///
/// Field names are the serialized ones (`CountryCode`, `IndicatorCode`, ...).
/// A record missing a key field (or holding null there) fails the whole call.
pub fn group_series<R: Serialize>(
    records: &[R],
    key_fields: &[&str],
    exclude_fields: &[&str],
) -> Result<Vec<SeriesGroup>, EngineError> {
    let mut index: HashMap<Vec<String>, usize> = HashMap::new();
    let mut out: Vec<SeriesGroup> = Vec::new();

    for (idx, record) in records.iter().enumerate() {
        let mut bag = match serde_json::to_value(record) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                return Err(EngineError::Parse(format!(
                    "record #{idx} is not an attribute bag: {other}"
                )));
            }
            Err(e) => return Err(EngineError::Parse(format!("record #{idx}: {e}"))),
        };

        let mut key = Vec::with_capacity(key_fields.len());
        for field in key_fields {
            match bag.remove(*field) {
                Some(v) if !v.is_null() => key.push((field.to_string(), v)),
                _ => {
                    return Err(EngineError::MissingKey {
                        key: field.to_string(),
                        context: format!("record #{idx}"),
                    });
                }
            }
        }
        for field in exclude_fields {
            bag.remove(*field);
        }

        let fingerprint: Vec<String> = key.iter().map(|(_, v)| v.to_string()).collect();
        match index.get(&fingerprint) {
            Some(&slot) => out[slot].observations.push(bag),
            None => {
                index.insert(fingerprint, out.len());
                out.push(SeriesGroup {
                    key,
                    observations: vec![bag],
                });
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<DatasetRecord> {
        vec![
            DatasetRecord::new("DS_A", "USA", 2018, 10.0),
            DatasetRecord::new("DS_A", "FRA", 2018, 11.0),
            DatasetRecord::new("DS_B", "USA", 2018, 20.0),
            DatasetRecord::new("DS_A", "USA", 2019, 15.0),
            DatasetRecord::new("DS_A", "USA", 2018, 12.0),
        ]
    }

    #[test]
    fn groups_preserve_first_seen_and_insertion_order() {
        let grouped = group_by_indicator(sample(), "IND").unwrap();
        let keys: Vec<(&str, i32)> = grouped.iter().map(|r| (r.country_code.as_str(), r.year)).collect();
        assert_eq!(keys, vec![("USA", 2018), ("FRA", 2018), ("USA", 2019)]);

        let usa: Vec<f64> = grouped[0].datasets.iter().filter_map(|d| d.value).collect();
        assert_eq!(usa, vec![10.0, 20.0, 12.0]);
        assert!(grouped.iter().all(|r| r.indicator_code == "IND"));
    }

    #[test]
    fn flattening_returns_the_same_multiset() {
        let input = sample();
        let mut flat = flatten_datasets(group_by_indicator(input.clone(), "IND").unwrap());
        let mut expected = input;
        let order = |a: &DatasetRecord, b: &DatasetRecord| {
            (&a.dataset_code, &a.country_code, a.year)
                .cmp(&(&b.dataset_code, &b.country_code, b.year))
                .then(a.value.partial_cmp(&b.value).unwrap_or(std::cmp::Ordering::Equal))
        };
        flat.sort_by(order);
        expected.sort_by(order);
        assert_eq!(flat, expected);
    }

    #[test]
    fn empty_country_fails_fast() {
        let mut bad = DatasetRecord::new("DS_A", "", 2018, 1.0);
        bad.country_code = "  ".to_string();
        assert!(matches!(
            group_by_indicator(vec![bad], "IND"),
            Err(EngineError::MissingKey { .. })
        ));
    }

    #[test]
    fn series_grouping_by_arbitrary_keys() {
        let groups = group_series(&sample(), &["CountryCode", "DatasetCode"], &["Unit"]).unwrap();
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].key[0], ("CountryCode".to_string(), Value::from("USA")));
        assert_eq!(groups[0].key[1], ("DatasetCode".to_string(), Value::from("DS_A")));
        assert_eq!(groups[0].observations.len(), 3);

        let obs = &groups[0].observations[0];
        assert!(obs.contains_key("Year"));
        assert!(!obs.contains_key("Unit"));
        assert!(!obs.contains_key("CountryCode"));
    }

    #[test]
    fn series_grouping_requires_key_fields() {
        let err = group_series(&sample(), &["IndicatorCode"], &[]).unwrap_err();
        assert!(matches!(err, EngineError::MissingKey { ref key, .. } if key == "IndicatorCode"));
    }
}
