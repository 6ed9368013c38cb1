//! Export indicator records to CSV or JSON.
//!
//! The CSV is flat (one row per indicator record) and easy to consume in
//! spreadsheets; the imputation annotation is flattened to `Imputed`,
//! `ImputationMethod` and `ImputationDistance`. The JSON keeps the full nested
//! structure and reloads as `IndicatorRecord`s.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::domain::{IndicatorRecord, SeriesRecord};
use crate::error::EngineError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ExportRow<'a> {
    indicator_code: &'a str,
    country_code: &'a str,
    year: i32,
    value: Option<f64>,
    score: Option<f64>,
    unit: Option<&'a str>,
    imputed: bool,
    imputation_method: Option<&'static str>,
    imputation_distance: Option<u32>,
    /// `;`-separated dataset codes, `*` marks an imputed dataset.
    datasets: String,
}

impl<'a> From<&'a IndicatorRecord> for ExportRow<'a> {
    fn from(r: &'a IndicatorRecord) -> Self {
        // Indicator-level annotation wins; otherwise report the first imputed dataset.
        let imputation = r
            .imputation
            .as_ref()
            .or_else(|| r.datasets.iter().find_map(|d| d.imputation.as_ref()));
        let datasets = r
            .datasets
            .iter()
            .map(|d| {
                if d.is_imputed() {
                    format!("{}*", d.dataset_code)
                } else {
                    d.dataset_code.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(";");

        Self {
            indicator_code: &r.indicator_code,
            country_code: &r.country_code,
            year: r.year,
            value: r.value,
            score: r.score,
            unit: r.unit.as_deref(),
            imputed: imputation.is_some(),
            imputation_method: imputation.map(|i| i.method.label()),
            imputation_distance: imputation.map(|i| i.distance),
            datasets,
        }
    }
}

pub fn write_indicator_csv_to<W: Write>(writer: W, records: &[IndicatorRecord]) -> Result<(), EngineError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for r in records {
        wtr.serialize(ExportRow::from(r))
            .map_err(|e| EngineError::Io(format!("failed to write export CSV row: {e}")))?;
    }
    wtr.flush()
        .map_err(|e| EngineError::Io(format!("failed to flush export CSV: {e}")))
}

pub fn write_indicator_csv(path: &Path, records: &[IndicatorRecord]) -> Result<(), EngineError> {
    let file = File::create(path)
        .map_err(|e| EngineError::Io(format!("failed to create export CSV '{}': {e}", path.display())))?;
    write_indicator_csv_to(file, records)
}

pub fn write_indicator_json(path: &Path, records: &[IndicatorRecord]) -> Result<(), EngineError> {
    let file = File::create(path)
        .map_err(|e| EngineError::Io(format!("failed to create export JSON '{}': {e}", path.display())))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, records)
        .map_err(|e| EngineError::Io(format!("failed to write export JSON: {e}")))?;
    writer
        .flush()
        .map_err(|e| EngineError::Io(format!("failed to flush export JSON: {e}")))
}

pub fn read_indicator_json(path: &Path) -> Result<Vec<IndicatorRecord>, EngineError> {
    let file = File::open(path)
        .map_err(|e| EngineError::Io(format!("failed to open '{}': {e}", path.display())))?;
    serde_json::from_reader(file).map_err(|e| EngineError::Parse(format!("invalid indicator JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DatasetRecord, Imputation, ImputationMethod};

    fn records() -> Vec<IndicatorRecord> {
        let mut real = IndicatorRecord::new("IND", "USA", 2019);
        real.datasets.push(DatasetRecord::new("A", "USA", 2019, 10.0));
        real.value = Some(0.25);
        real.score = Some(0.25);
        real.unit = Some("Index".to_string());

        let mut imputed = real.clone();
        imputed.set_year(2020);
        imputed.datasets[0].set_imputation(Imputation::new(ImputationMethod::ForwardExtrapolation, 1));
        vec![real, imputed]
    }

    #[test]
    fn csv_flattens_imputation() {
        let mut buf = Vec::new();
        write_indicator_csv_to(&mut buf, &records()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "IndicatorCode,CountryCode,Year,Value,Score,Unit,Imputed,ImputationMethod,ImputationDistance,Datasets"
        );
        assert_eq!(lines[1], "IND,USA,2019,0.25,0.25,Index,false,,,A");
        assert_eq!(lines[2], "IND,USA,2020,0.25,0.25,Index,true,Forward Extrapolation,1,A*");
    }

    #[test]
    fn json_export_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_indicator_json(&path, &records()).unwrap();
        assert_eq!(read_indicator_json(&path).unwrap(), records());
    }

    #[test]
    fn json_export_keeps_infinite_values() {
        let mut recs = records();
        recs[0].value = Some(f64::NEG_INFINITY);
        recs[0].datasets[0].value = Some(f64::NEG_INFINITY);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inf.json");
        write_indicator_json(&path, &recs).unwrap();
        let back = read_indicator_json(&path).unwrap();
        assert_eq!(back[0].value, Some(f64::NEG_INFINITY));
        assert_eq!(back[0].datasets[0].value, Some(f64::NEG_INFINITY));
        assert_eq!(back, recs);
    }
}
