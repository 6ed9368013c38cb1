//! Raw dataset ingest.
//!
//! Provider dumps arrive as CSV or as JSON arrays of objects. Both are read into
//! `RawDatasetRecord`s without coercion; `records::normalize` does the typing.
//!
//! CSV rules:
//! - header names are matched case-insensitively (a UTF-8 BOM is ignored)
//! - an absent column leaves the field unset, so `normalize` reports the missing key
//! - a blank `Year`/`Value` cell is an explicit null

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use tracing::debug;

use crate::domain::{RawDatasetRecord, RawField};
use crate::error::EngineError;

/// Load raw records, picking the format from the file extension
/// (`.json` is JSON, anything else is CSV).
pub fn load_raw_records(path: &Path) -> Result<Vec<RawDatasetRecord>, EngineError> {
    let file = File::open(path)
        .map_err(|e| EngineError::Io(format!("failed to open data file '{}': {e}", path.display())))?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let records = if is_json { read_raw_json(file)? } else { read_raw_csv(file)? };

    debug!(path = %path.display(), rows = records.len(), "loaded raw dataset records");
    Ok(records)
}

pub fn read_raw_json<R: Read>(reader: R) -> Result<Vec<RawDatasetRecord>, EngineError> {
    serde_json::from_reader(reader).map_err(|e| EngineError::Parse(format!("invalid dataset JSON: {e}")))
}

pub fn read_raw_csv<R: Read>(reader: R) -> Result<Vec<RawDatasetRecord>, EngineError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| EngineError::Parse(format!("failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let mut out = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        let record = result.map_err(|e| EngineError::Parse(format!("CSV parse error on line {line}: {e}")))?;
        out.push(parse_row(&record, &header_map, line)?);
    }
    Ok(out)
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Excel exports often prefix the first header with a BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn parse_row(record: &StringRecord, header_map: &HashMap<String, usize>, line: usize) -> Result<RawDatasetRecord, EngineError> {
    let score = match get_optional(record, header_map, "score") {
        None => None,
        Some(s) => Some(
            s.parse::<f64>()
                .map_err(|_| EngineError::Parse(format!("invalid `Score` '{s}' on line {line}")))?,
        ),
    };

    Ok(RawDatasetRecord {
        dataset_code: get_optional(record, header_map, "datasetcode").map(str::to_string),
        country_code: get_optional(record, header_map, "countrycode").map(str::to_string),
        year: get_cell(record, header_map, "year"),
        value: get_cell(record, header_map, "value"),
        unit: get_optional(record, header_map, "unit").map(str::to_string),
        score,
    })
}

/// `None` when the column is absent, `Null` when the cell is blank.
fn get_cell(record: &StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<RawField> {
    let idx = header_map.get(name)?;
    let cell = record.get(*idx).map(str::trim).unwrap_or("");
    if cell.is_empty() {
        Some(RawField::Null)
    } else {
        Some(RawField::Text(cell.to_string()))
    }
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}
