use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;

use crate::config::UpstreamSettings;
use crate::domain::{Country, YearlyRecord};
use crate::error::EmissionsError;

// Total ecological footprint of consumption.
pub const RECORD_TYPE: &str = "EFCtot";

pub trait FootprintClient: Send + Sync {
    fn list_countries(&self) -> Result<Vec<Country>, EmissionsError>;
    fn country_data(&self, country_code: &str) -> Result<Vec<YearlyRecord>, EmissionsError>;
}

impl<F: FootprintClient + ?Sized> FootprintClient for Arc<F> {
    fn list_countries(&self) -> Result<Vec<Country>, EmissionsError> {
        (**self).list_countries()
    }

    fn country_data(&self, country_code: &str) -> Result<Vec<YearlyRecord>, EmissionsError> {
        (**self).country_data(country_code)
    }
}

#[derive(Clone)]
pub struct FootprintHttpClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl FootprintHttpClient {
    pub fn new(settings: &UpstreamSettings) -> Result<Self, EmissionsError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("footprint-seed/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| EmissionsError::UpstreamHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| EmissionsError::UpstreamHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: settings.base_url()?.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
        })
    }

    pub fn countries_url(&self) -> String {
        format!("{}/countries", self.base_url)
    }

    pub fn country_data_url(&self, country_code: &str) -> String {
        format!("{}/data/{country_code}/all/{RECORD_TYPE}", self.base_url)
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, EmissionsError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(EmissionsError::UpstreamRateLimited);
        }
        let message = response
            .text()
            .unwrap_or_else(|_| "footprint request failed".to_string());
        Err(EmissionsError::UpstreamStatus {
            status: status.as_u16(),
            message,
        })
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, EmissionsError> {
        let mut request = self.client.get(url);
        if let Some(key) = &self.api_key {
            request = request.basic_auth("any", Some(key));
        }
        let response = request
            .send()
            .map_err(|err| EmissionsError::UpstreamHttp(err.to_string()))?;
        let response = Self::handle_status(response)?;
        response
            .json()
            .map_err(|err| EmissionsError::UpstreamHttp(err.to_string()))
    }
}

impl FootprintClient for FootprintHttpClient {
    fn list_countries(&self) -> Result<Vec<Country>, EmissionsError> {
        self.get_json(&self.countries_url())
    }

    fn country_data(&self, country_code: &str) -> Result<Vec<YearlyRecord>, EmissionsError> {
        self.get_json(&self.country_data_url(country_code))
    }
}
