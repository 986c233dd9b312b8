use serde::Serialize;

use crate::domain::{CountryTotal, DatasetsByCountry, EmissionsByYear};

const SCALE: f64 = 10_000.0;

// Half away from zero.
pub fn round4(value: f64) -> f64 {
    (value * SCALE).round() / SCALE
}

pub fn transform(data: &DatasetsByCountry) -> EmissionsByYear {
    let mut by_year = EmissionsByYear::new();
    for (country, records) in data {
        for record in records {
            let total = round4(record.carbon);
            let bucket = by_year.entry(record.year).or_default();
            if total != 0.0 && !total.is_nan() {
                bucket.push(CountryTotal::new(country.as_str(), total));
            }
        }
    }
    by_year
}

pub fn sort_descending(emissions: &mut EmissionsByYear) {
    for entries in emissions.values_mut() {
        entries.sort_by(|a, b| b.total.total_cmp(&a.total));
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearSummary {
    pub year: i32,
    pub countries: usize,
    pub total: f64,
    pub leader: Option<String>,
}

pub fn summarize(emissions: &EmissionsByYear) -> Vec<YearSummary> {
    emissions
        .iter()
        .map(|(year, entries)| YearSummary {
            year: *year,
            countries: entries.len(),
            total: round4(entries.iter().map(|entry| entry.total).sum()),
            leader: entries
                .iter()
                .max_by(|a, b| a.total.total_cmp(&b.total))
                .map(|entry| entry.country.clone()),
        })
        .collect()
}
