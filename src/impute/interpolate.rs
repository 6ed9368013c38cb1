//! Linear interpolation between bracketing observations.
//!
//! For a gap between observed years `y_a < y_b`, each missing year `y` gets
//! `v_a + (v_b - v_a) * (y - y_a) / (y_b - y_a)`. Scores are interpolated the
//! same way when both ends carry one. Nothing is emitted outside the observed
//! envelope.

use std::collections::HashSet;

use crate::domain::{Imputation, ImputationMethod, SeriesRecord};
use crate::impute::{assemble, numeric_anchors, series_indices};

pub fn interpolate_linear<R: SeriesRecord>(records: Vec<R>, impute_only: bool) -> Vec<R> {
    let mut synthetic = Vec::new();
    for members in series_indices(&records) {
        let present: HashSet<i32> = members.iter().map(|&i| records[i].year()).collect();
        let anchors: Vec<(i32, usize)> = numeric_anchors(&records, &members).into_iter().collect();

        for pair in anchors.windows(2) {
            let (ya, ia) = pair[0];
            let (yb, ib) = pair[1];
            let (a, b) = (&records[ia], &records[ib]);
            let (Some(va), Some(vb)) = (a.value(), b.value()) else {
                continue;
            };

            for year in (ya + 1)..yb {
                if present.contains(&year) {
                    continue;
                }
                let (num, den) = (f64::from(year - ya), f64::from(yb - ya));
                let value = lerp(va, vb, num, den);
                if value.is_nan() {
                    continue;
                }
                let score = match (a.score(), b.score()) {
                    (Some(sa), Some(sb)) => Some(lerp(sa, sb, num, den)),
                    _ => None,
                };

                let mut copy = a.clone();
                copy.detach_components();
                copy.set_year(year);
                copy.set_value(Some(value));
                copy.set_score(score);
                let distance = (year - ya).min(yb - year) as u32;
                copy.set_imputation(Imputation::new(ImputationMethod::LinearInterpolation, distance));
                synthetic.push(copy);
            }
        }
    }
    assemble(records, synthetic, impute_only)
}

fn lerp(a: f64, b: f64, num: f64, den: f64) -> f64 {
    a + (b - a) * num / den
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rand::prelude::*;
    use rand::rngs::StdRng;

    use super::*;
    use crate::domain::{DatasetRecord, IndicatorRecord};
    use crate::impute::tests::random_panel;
    use crate::score::validate_unique_years;

    #[test]
    fn fills_interior_gaps() {
        let records = vec![
            DatasetRecord::new("GDP", "USA", 2000, 100.0),
            DatasetRecord::new("GDP", "USA", 2003, 400.0),
        ];
        let out = interpolate_linear(records.clone(), false);
        assert_eq!(out.len(), 4);
        assert_eq!(&out[..2], &records[..]);
        assert_eq!((out[2].year, out[2].value), (2001, Some(200.0)));
        assert_eq!((out[3].year, out[3].value), (2002, Some(300.0)));
        assert!(out[2..].iter().all(|r| r.imputation.as_ref().unwrap().distance == 1));
    }

    #[test]
    fn distance_is_to_the_nearer_end() {
        let records = vec![
            DatasetRecord::new("GDP", "USA", 2000, 0.0),
            DatasetRecord::new("GDP", "USA", 2006, 6.0),
        ];
        let distances: Vec<u32> = interpolate_linear(records, true)
            .iter()
            .map(|r| r.imputation.as_ref().unwrap().distance)
            .collect();
        assert_eq!(distances, vec![1, 2, 3, 2, 1]);
    }

    #[test]
    fn contiguous_series_emit_nothing() {
        let records: Vec<DatasetRecord> = (2000..2005).map(|y| DatasetRecord::new("GDP", "USA", y, 1.0)).collect();
        assert!(interpolate_linear(records.clone(), true).is_empty());
        assert_eq!(interpolate_linear(records.clone(), false), records);
    }

    #[test]
    fn input_order_is_irrelevant_and_series_stay_separate() {
        let records = vec![
            DatasetRecord::new("GDP", "USA", 2002, 4.0),
            DatasetRecord::new("GDP", "FRA", 2000, 10.0),
            DatasetRecord::new("GDP", "USA", 2000, 0.0),
        ];
        let out = interpolate_linear(records, true);
        assert_eq!(out.len(), 1);
        assert_eq!((out[0].country_code.as_str(), out[0].year, out[0].value), ("USA", 2001, Some(2.0)));
    }

    #[test]
    fn indicator_scores_are_interpolated_and_datasets_detached() {
        let mut a = IndicatorRecord::new("IND", "USA", 2000);
        a.value = Some(10.0);
        a.score = Some(0.2);
        a.datasets.push(DatasetRecord::new("A", "USA", 2000, 10.0));
        let mut b = IndicatorRecord::new("IND", "USA", 2002);
        b.value = Some(30.0);
        b.score = Some(0.6);

        let out = interpolate_linear(vec![a, b], true);
        assert_eq!(out[0].value, Some(20.0));
        assert!((out[0].score.unwrap() - 0.4).abs() < 1e-12);
        assert!(out[0].datasets.is_empty());
    }

    #[test]
    fn random_contiguous_series_are_left_alone() {
        let mut rng = StdRng::seed_from_u64(31);
        for _ in 0..50 {
            let mut records = Vec::new();
            for country in ["USA", "FRA"] {
                let start = rng.gen_range(1990..2000);
                let len = rng.gen_range(1..12);
                for year in start..start + len {
                    records.push(DatasetRecord::new("GDP", country, year, rng.gen_range(-100.0..100.0)));
                }
            }
            records.shuffle(&mut rng);
            assert!(interpolate_linear(records.clone(), true).is_empty());
            assert_eq!(interpolate_linear(records.clone(), false), records);
        }
    }

    #[test]
    fn random_gapped_panels_keep_real_records() {
        let mut rng = StdRng::seed_from_u64(37);
        for _ in 0..50 {
            let panel = random_panel(&mut rng);
            let n = panel.len();
            let out = interpolate_linear(panel.clone(), false);
            assert_eq!(&out[..n], &panel[..]);
            validate_unique_years(&out).unwrap();

            // Synthetic records stay strictly inside each series' numeric envelope.
            let mut envelope: HashMap<(String, String), (i32, i32, f64, f64)> = HashMap::new();
            for r in panel.iter().filter(|r| r.value.is_some()) {
                let v = r.value.unwrap();
                let e = envelope.entry(r.series_key()).or_insert((r.year, r.year, v, v));
                *e = (e.0.min(r.year), e.1.max(r.year), e.2.min(v), e.3.max(v));
            }
            for r in &out[n..] {
                let (first, last, lo, hi) = envelope[&r.series_key()];
                assert!(first < r.year && r.year < last);
                let v = r.value.unwrap();
                assert!(lo - 1e-9 <= v && v <= hi + 1e-9);
                assert_eq!(r.imputation.as_ref().unwrap().method, ImputationMethod::LinearInterpolation);
            }
            assert_eq!(interpolate_linear(out.clone(), false), out);
        }
    }
}
