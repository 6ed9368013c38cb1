//! Forward and backward extrapolation.
//!
//! No slope is inferred: the nearest observation on that side is carried
//! verbatim to every missing year up to the target.

use std::collections::HashSet;

use tracing::debug;

use crate::domain::{Imputation, ImputationMethod, SeriesRecord};
use crate::impute::{assemble, numeric_anchors, series_indices};

/// Carry each series' latest observation forward through `target_year`.
///
/// The anchor is the latest record with a numeric value. Null-valued records
/// after it are not anchors, so the years between the anchor and such a record
/// are filled by carrying, not interpolated. Callers that want interpolation
/// there should pass `drop_missing` output and run `interpolate_linear` first.
pub fn extrapolate_forward<R: SeriesRecord>(records: Vec<R>, target_year: i32, impute_only: bool) -> Vec<R> {
    let mut synthetic = Vec::new();
    for members in series_indices(&records) {
        let present: HashSet<i32> = members.iter().map(|&i| records[i].year()).collect();
        let Some((&last_year, &idx)) = numeric_anchors(&records, &members).iter().next_back() else {
            continue;
        };
        let nulls_after = present.iter().filter(|&&y| y > last_year).count();
        if nulls_after > 0 {
            let r = &records[idx];
            debug!(
                country = %r.country_code(),
                code = %r.code(),
                anchor = last_year,
                nulls_after,
                "carrying forward past null observations"
            );
        }
        let base = records[idx].imputation().map_or(0, |imp| imp.distance);
        for year in (last_year + 1)..=target_year {
            if present.contains(&year) {
                continue;
            }
            synthetic.push(carry(&records[idx], year, ImputationMethod::ForwardExtrapolation, base + (year - last_year) as u32));
        }
    }
    assemble(records, synthetic, impute_only)
}

/// Carry each series' earliest observation backward to `target_year`.
///
/// Mirrors `extrapolate_forward`: null-valued records before the earliest
/// numeric one are skipped over, not used as anchors.
pub fn extrapolate_backward<R: SeriesRecord>(records: Vec<R>, target_year: i32, impute_only: bool) -> Vec<R> {
    let mut synthetic = Vec::new();
    for members in series_indices(&records) {
        let present: HashSet<i32> = members.iter().map(|&i| records[i].year()).collect();
        let Some((&first_year, &idx)) = numeric_anchors(&records, &members).iter().next() else {
            continue;
        };
        let nulls_before = present.iter().filter(|&&y| y < first_year).count();
        if nulls_before > 0 {
            let r = &records[idx];
            debug!(
                country = %r.country_code(),
                code = %r.code(),
                anchor = first_year,
                nulls_before,
                "carrying backward past null observations"
            );
        }
        let base = records[idx].imputation().map_or(0, |imp| imp.distance);
        for year in target_year..first_year {
            if present.contains(&year) {
                continue;
            }
            synthetic.push(carry(&records[idx], year, ImputationMethod::BackwardExtrapolation, base + (first_year - year) as u32));
        }
    }
    assemble(records, synthetic, impute_only)
}

fn carry<R: SeriesRecord>(anchor: &R, year: i32, method: ImputationMethod, distance: u32) -> R {
    let mut copy = anchor.clone();
    copy.set_year(year);
    copy.set_imputation(Imputation::new(method, distance));
    copy
}
