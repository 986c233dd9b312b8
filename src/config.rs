use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{CountryName, SkipSet};
use crate::error::EmissionsError;

pub const DEFAULT_CONFIG_FILE: &str = "footprint-seed.json";
pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";
pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_MAX_CONCURRENCY: usize = 16;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub batch_size: Option<usize>,
    #[serde(default)]
    pub skipped_countries: Option<Vec<String>>,
    #[serde(default)]
    pub ttl: TtlEntry,
    #[serde(default)]
    pub upstream: UpstreamEntry,
    #[serde(default)]
    pub redis_url: Option<String>,
    #[serde(default)]
    pub max_concurrency: Option<usize>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct TtlEntry {
    #[serde(default)]
    pub directory_secs: Option<u64>,
    #[serde(default)]
    pub country_secs: Option<u64>,
    #[serde(default)]
    pub cursor_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UpstreamEntry {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub directory: Duration,
    pub country: Duration,
    pub cursor: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            directory: Duration::from_secs(86_400),
            country: Duration::from_secs(3_600),
            cursor: Duration::from_secs(86_400),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub batch_size: usize,
    pub skipped: SkipSet,
    pub ttls: CacheTtls,
    pub max_concurrency: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            skipped: default_skipped_countries(),
            ttls: CacheTtls::default(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpstreamSettings {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

impl UpstreamSettings {
    pub fn base_url(&self) -> Result<&str, EmissionsError> {
        self.base_url
            .as_deref()
            .ok_or(EmissionsError::MissingSetting("FOOT_PRINT_BASE_URL"))
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub pipeline: PipelineSettings,
    pub upstream: UpstreamSettings,
    pub redis_url: String,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, EmissionsError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let config = if path.is_none() && !config_path.exists() {
            Config::default()
        } else {
            let content = fs::read_to_string(&config_path)
                .map_err(|_| EmissionsError::ConfigRead(config_path.clone()))?;
            serde_json::from_str(&content)
                .map_err(|err| EmissionsError::ConfigParse(err.to_string()))?
        };

        let mut resolved = Self::resolve_config(config)?;
        Self::apply_env(&mut resolved, |name| std::env::var(name).ok());
        Ok(resolved)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, EmissionsError> {
        let batch_size = config.batch_size.unwrap_or(DEFAULT_BATCH_SIZE);
        if batch_size == 0 {
            return Err(EmissionsError::InvalidSetting(
                "batch_size must be greater than zero".to_string(),
            ));
        }
        let max_concurrency = config.max_concurrency.unwrap_or(DEFAULT_MAX_CONCURRENCY);
        if max_concurrency == 0 {
            return Err(EmissionsError::InvalidSetting(
                "max_concurrency must be greater than zero".to_string(),
            ));
        }

        let skipped = match config.skipped_countries {
            Some(names) => names.iter().map(|name| CountryName::normalize(name)).collect(),
            None => default_skipped_countries(),
        };

        let defaults = CacheTtls::default();
        let ttls = CacheTtls {
            directory: config
                .ttl
                .directory_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.directory),
            country: config
                .ttl
                .country_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.country),
            cursor: config
                .ttl
                .cursor_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.cursor),
        };

        Ok(ResolvedConfig {
            pipeline: PipelineSettings {
                batch_size,
                skipped,
                ttls,
                max_concurrency,
            },
            upstream: UpstreamSettings {
                base_url: config.upstream.base_url,
                api_key: config.upstream.api_key,
            },
            redis_url: config
                .redis_url
                .unwrap_or_else(|| DEFAULT_REDIS_URL.to_string()),
        })
    }

    pub fn apply_env<F>(resolved: &mut ResolvedConfig, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        if let Some(url) = non_empty("FOOT_PRINT_BASE_URL") {
            resolved.upstream.base_url = Some(url);
        }
        if let Some(key) = non_empty("FOOT_PRINT_API_KEY") {
            resolved.upstream.api_key = Some(key);
        }
        if let Some(url) = non_empty("REDIS_URL") {
            resolved.redis_url = url;
        }
    }
}

// "all" is the aggregate pseudo-country in the upstream directory.
pub fn default_skipped_countries() -> SkipSet {
    SkipSet::from([CountryName::normalize("all")])
}
