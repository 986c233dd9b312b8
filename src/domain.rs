use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Country {
    pub country_code: String,
    pub country_name: String,
    #[serde(default, alias = "isoCode", deserialize_with = "null_as_empty")]
    pub isoa2: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub score: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub short_name: String,
}

impl Country {
    pub fn normalized_name(&self) -> CountryName {
        CountryName::normalize(&self.country_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyRecord {
    pub year: i32,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub carbon: f64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub country_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub country_code: String,
}

impl YearlyRecord {
    pub fn new(year: i32, carbon: f64) -> Self {
        Self {
            year,
            carbon,
            country_name: String::new(),
            country_code: String::new(),
        }
    }

    pub fn for_country(mut self, name: &str, code: &str) -> Self {
        self.country_name = name.to_string();
        self.country_code = code.to_string();
        self
    }
}

fn null_as_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CountryName(String);

impl CountryName {
    pub fn normalize(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CountryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CountryName {
    fn from(value: &str) -> Self {
        Self::normalize(value)
    }
}

pub type CountryDirectory = Vec<Country>;

pub type CountryDataset = Vec<YearlyRecord>;

pub type DatasetsByCountry = BTreeMap<CountryName, CountryDataset>;

pub type SkipSet = BTreeSet<CountryName>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryTotal {
    pub country: String,
    pub total: f64,
}

impl CountryTotal {
    pub fn new(country: impl Into<String>, total: f64) -> Self {
        Self {
            country: country.into(),
            total,
        }
    }
}

pub type EmissionsByYear = BTreeMap<i32, Vec<CountryTotal>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmissionsSnapshot {
    pub emissions_per_country: EmissionsByYear,
    pub is_completed: bool,
}
