//! Coverage report.
//!
//! Given scored (real + imputed) indicator records, a country group and a year
//! range, classify every indicator as complete, incomplete or unimplemented and
//! list the missing `(country, year)` cells.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};

use crate::domain::IndicatorRecord;

#[derive(Debug, Clone)]
pub struct CoverageReport {
    indicator_codes: Vec<String>,
    countries: Vec<String>,
    years: RangeInclusive<i32>,
    /// indicator -> country -> years with a scored record
    observed: BTreeMap<String, BTreeMap<String, BTreeSet<i32>>>,
    pub generated_at: DateTime<Utc>,
}

impl CoverageReport {
    /// Only scored records inside `countries` x `years` count.
    pub fn new(
        records: &[IndicatorRecord],
        indicator_codes: &[String],
        countries: &[String],
        years: RangeInclusive<i32>,
    ) -> Self {
        let mut observed: BTreeMap<String, BTreeMap<String, BTreeSet<i32>>> = BTreeMap::new();
        for r in records {
            if r.score.is_none() || !years.contains(&r.year) || !countries.contains(&r.country_code) {
                continue;
            }
            observed
                .entry(r.indicator_code.clone())
                .or_default()
                .entry(r.country_code.clone())
                .or_default()
                .insert(r.year);
        }

        Self {
            indicator_codes: indicator_codes.to_vec(),
            countries: countries.to_vec(),
            years,
            observed,
            generated_at: Utc::now(),
        }
    }

    /// Indicators covering every `(country, year)` cell.
    pub fn complete(&self) -> Vec<String> {
        self.classified(Coverage::Complete)
    }

    /// Indicators with some, but not all, cells covered.
    pub fn incomplete(&self) -> Vec<String> {
        self.classified(Coverage::Partial)
    }

    /// Indicators without a single record in scope.
    pub fn unimplemented(&self) -> Vec<String> {
        self.classified(Coverage::None)
    }

    /// Missing years per country for one indicator.
    pub fn indicator_report(&self, indicator_code: &str) -> String {
        let mut out = format!("{indicator_code}:\n");
        let by_country = self.observed.get(indicator_code);
        for country in &self.countries {
            match by_country.and_then(|m| m.get(country)) {
                None => out.push_str(&format!("  problem: {country} has no observations\n")),
                Some(years) => {
                    let missing = self.missing(years);
                    if !missing.is_empty() {
                        out.push_str(&format!("  {country}: missing {}\n", fmt_years(&missing)));
                    }
                }
            }
        }
        out
    }

    /// Missing years per indicator for one country.
    pub fn country_report(&self, country_code: &str) -> String {
        let mut out = format!("{country_code}:\n");
        for code in &self.indicator_codes {
            match self.observed.get(code).and_then(|m| m.get(country_code)) {
                None => out.push_str(&format!("  problem: {code} has no observations\n")),
                Some(years) => {
                    let missing = self.missing(years);
                    if !missing.is_empty() {
                        out.push_str(&format!("  {code}: missing {}\n", fmt_years(&missing)));
                    }
                }
            }
        }
        out
    }

    pub fn summary(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Coverage {}-{} over {} countries (generated {})\n",
            self.years.start(),
            self.years.end(),
            self.countries.len(),
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        ));
        for (label, codes) in [
            ("complete", self.complete()),
            ("incomplete", self.incomplete()),
            ("unimplemented", self.unimplemented()),
        ] {
            out.push_str(&format!("{label:<14} {:>3}  {}\n", codes.len(), codes.join(", ")).trim_end());
            out.push('\n');
        }
        out
    }

    fn classified(&self, wanted: Coverage) -> Vec<String> {
        self.indicator_codes
            .iter()
            .filter(|code| self.coverage(code) == wanted)
            .cloned()
            .collect()
    }

    fn coverage(&self, code: &str) -> Coverage {
        let Some(by_country) = self.observed.get(code) else {
            return Coverage::None;
        };
        let full = self.countries.iter().all(|c| {
            by_country
                .get(c)
                .is_some_and(|years| self.missing(years).is_empty())
        });
        if full { Coverage::Complete } else { Coverage::Partial }
    }

    fn missing(&self, years: &BTreeSet<i32>) -> Vec<i32> {
        self.years.clone().filter(|y| !years.contains(y)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Coverage {
    Complete,
    Partial,
    None,
}

/// `[2001, 2002, 2003, 2007]` -> `2001-2003, 2007`.
fn fmt_years(years: &[i32]) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut iter = years.iter().copied().peekable();
    while let Some(start) = iter.next() {
        let mut end = start;
        while iter.peek() == Some(&(end + 1)) {
            end += 1;
            iter.next();
        }
        if start == end {
            parts.push(start.to_string());
        } else {
            parts.push(format!("{start}-{end}"));
        }
    }
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(code: &str, country: &str, year: i32) -> IndicatorRecord {
        let mut r = IndicatorRecord::new(code, country, year);
        r.score = Some(0.5);
        r
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn report() -> CoverageReport {
        let mut records = Vec::new();
        for country in ["USA", "FRA"] {
            for year in 2018..=2020 {
                records.push(scored("FULL", country, year));
            }
        }
        records.push(scored("PART", "USA", 2018));
        records.push(scored("PART", "USA", 2020));
        // Out of scope: other country, other year, unscored.
        records.push(scored("NONE", "DEU", 2019));
        records.push(scored("NONE", "USA", 2010));
        records.push(IndicatorRecord::new("NONE", "USA", 2019));

        CoverageReport::new(&records, &strings(&["FULL", "PART", "NONE"]), &strings(&["USA", "FRA"]), 2018..=2020)
    }

    #[test]
    fn classifies_indicators() {
        let r = report();
        assert_eq!(r.complete(), vec!["FULL"]);
        assert_eq!(r.incomplete(), vec!["PART"]);
        assert_eq!(r.unimplemented(), vec!["NONE"]);
    }

    #[test]
    fn indicator_report_flags_countries_without_data() {
        let text = report().indicator_report("PART");
        assert!(text.contains("USA: missing 2019"));
        assert!(text.contains("problem: FRA has no observations"));
        assert!(!report().indicator_report("FULL").contains("missing"));
    }

    #[test]
    fn country_report_lists_indicators() {
        let text = report().country_report("USA");
        assert!(text.contains("PART: missing 2019"));
        assert!(text.contains("problem: NONE has no observations"));
        assert!(!text.contains("FULL:"));
    }

    #[test]
    fn summary_counts_each_class() {
        let text = report().summary();
        assert!(text.starts_with("Coverage 2018-2020 over 2 countries"));
        assert!(text.contains("complete         1  FULL"));
        assert!(text.contains("unimplemented    1  NONE"));
    }

    #[test]
    fn year_runs_are_compressed() {
        assert_eq!(fmt_years(&[2001, 2002, 2003, 2007, 2009, 2010]), "2001-2003, 2007, 2009-2010");
        assert_eq!(fmt_years(&[]), "");
    }
}
