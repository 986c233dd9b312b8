#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::thread;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use footprint_seed::cache::{CacheStore, MemoryCache};
use footprint_seed::domain::{Country, YearlyRecord};
use footprint_seed::error::EmissionsError;
use footprint_seed::footprint::FootprintClient;

pub fn country(code: &str, name: &str) -> Country {
    Country {
        country_code: code.to_string(),
        country_name: name.to_string(),
        isoa2: String::new(),
        score: "3A".to_string(),
        short_name: name.to_string(),
    }
}

pub fn records(name: &str, code: &str, series: &[(i32, f64)]) -> Vec<YearlyRecord> {
    series
        .iter()
        .map(|(year, carbon)| YearlyRecord::new(*year, *carbon).for_country(name, code))
        .collect()
}

#[derive(Debug, Clone, Copy)]
pub enum Failure {
    RateLimited,
    Status(u16),
}

impl Failure {
    fn into_error(self) -> EmissionsError {
        match self {
            Failure::RateLimited => EmissionsError::UpstreamRateLimited,
            Failure::Status(status) => EmissionsError::UpstreamStatus {
                status,
                message: "stub failure".to_string(),
            },
        }
    }
}

/// Upstream double with per-code canned responses and call counters.
#[derive(Default)]
pub struct StubFootprint {
    countries: Vec<Country>,
    directory_failure: Option<Failure>,
    data: HashMap<String, Vec<YearlyRecord>>,
    failures: HashMap<String, Failure>,
    pub directory_calls: AtomicUsize,
    pub data_calls: AtomicUsize,
    requested: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl StubFootprint {
    pub fn new(countries: Vec<Country>) -> Self {
        Self {
            countries,
            ..Self::default()
        }
    }

    pub fn with_data(mut self, code: &str, data: Vec<YearlyRecord>) -> Self {
        self.data.insert(code.to_string(), data);
        self
    }

    pub fn failing(mut self, code: &str, failure: Failure) -> Self {
        self.failures.insert(code.to_string(), failure);
        self
    }

    pub fn directory_failing(mut self, failure: Failure) -> Self {
        self.directory_failure = Some(failure);
        self
    }

    pub fn directory_calls(&self) -> usize {
        self.directory_calls.load(Ordering::SeqCst)
    }

    pub fn data_calls(&self) -> usize {
        self.data_calls.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> HashSet<String> {
        self.requested.lock().unwrap().iter().cloned().collect()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

impl FootprintClient for StubFootprint {
    fn list_countries(&self) -> Result<Vec<Country>, EmissionsError> {
        self.directory_calls.fetch_add(1, Ordering::SeqCst);
        match self.directory_failure {
            Some(failure) => Err(failure.into_error()),
            None => Ok(self.countries.clone()),
        }
    }

    fn country_data(&self, country_code: &str) -> Result<Vec<YearlyRecord>, EmissionsError> {
        self.data_calls.fetch_add(1, Ordering::SeqCst);
        self.requested
            .lock()
            .unwrap()
            .push(country_code.to_string());
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(2));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if let Some(failure) = self.failures.get(country_code) {
            return Err(failure.into_error());
        }
        Ok(self.data.get(country_code).cloned().unwrap_or_default())
    }
}

/// Memory store that counts traffic and can refuse writes to chosen keys.
#[derive(Default)]
pub struct CountingCache {
    inner: MemoryCache,
    pub reads: AtomicUsize,
    pub writes: AtomicUsize,
    read_only_keys: HashSet<String>,
    broken: bool,
    ttls: Mutex<HashMap<String, Duration>>,
}

impl CountingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refusing_writes_to(mut self, key: &str) -> Self {
        self.read_only_keys.insert(key.to_string());
        self
    }

    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Self::default()
        }
    }

    pub fn seed(&self, key: &str, value: &str) {
        self.inner
            .set_with_expiry(key, Duration::from_secs(3600), value)
            .unwrap();
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.inner.get(key).unwrap()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn ttl_for(&self, key: &str) -> Option<Duration> {
        self.ttls.lock().unwrap().get(key).copied()
    }
}

impl CacheStore for CountingCache {
    fn get(&self, key: &str) -> Result<Option<String>, EmissionsError> {
        if self.broken {
            return Err(EmissionsError::CacheUnavailable("connection refused".to_string()));
        }
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key)
    }

    fn set_with_expiry(
        &self,
        key: &str,
        ttl: Duration,
        value: &str,
    ) -> Result<(), EmissionsError> {
        if self.broken || self.read_only_keys.contains(key) {
            return Err(EmissionsError::CacheUnavailable("write refused".to_string()));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.ttls.lock().unwrap().insert(key.to_string(), ttl);
        self.inner.set_with_expiry(key, ttl, value)
    }

    fn flush_all(&self) -> Result<(), EmissionsError> {
        self.inner.flush_all()
    }
}
