use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::cache::{CacheKeys, CacheStore, read_json, write_json};
use crate::config::CacheTtls;
use crate::domain::{CountryDataset, CountryDirectory};
use crate::error::EmissionsError;
use crate::footprint::FootprintClient;

// Empty results are returned but never stored.
pub fn get_or_populate<T, C, F>(
    cache: &C,
    key: &str,
    ttl: Duration,
    fetch: F,
) -> Result<Vec<T>, EmissionsError>
where
    T: Serialize + DeserializeOwned,
    C: CacheStore + ?Sized,
    F: FnOnce() -> Result<Vec<T>, EmissionsError>,
{
    if let Some(cached) = read_json::<Vec<T>, _>(cache, key)? {
        tracing::debug!(key, "cache hit");
        return Ok(cached);
    }

    tracing::debug!(key, "cache miss");
    let fetched = fetch()?;
    if !fetched.is_empty() {
        write_json(cache, key, ttl, &fetched)?;
    }
    Ok(fetched)
}

pub struct CacheAsideFetcher<'a, C: CacheStore + ?Sized, F: FootprintClient + ?Sized> {
    cache: &'a C,
    client: &'a F,
    ttls: CacheTtls,
}

impl<'a, C: CacheStore + ?Sized, F: FootprintClient + ?Sized> CacheAsideFetcher<'a, C, F> {
    pub fn new(cache: &'a C, client: &'a F, ttls: CacheTtls) -> Self {
        Self {
            cache,
            client,
            ttls,
        }
    }

    pub fn country_directory(&self) -> Result<CountryDirectory, EmissionsError> {
        get_or_populate(
            self.cache,
            CacheKeys::COUNTRIES,
            self.ttls.directory,
            || {
                self.client.list_countries().map_err(|err| match err {
                    EmissionsError::UpstreamRateLimited => err,
                    other => EmissionsError::DirectoryFetchFailed(other.to_string()),
                })
            },
        )
    }

    pub fn country_dataset(&self, country_code: &str) -> Result<CountryDataset, EmissionsError> {
        get_or_populate(
            self.cache,
            &CacheKeys::country_data(country_code),
            self.ttls.country,
            || self.client.country_data(country_code),
        )
    }
}
