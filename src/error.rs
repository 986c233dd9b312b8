use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum EmissionsError {
    #[error("upstream rate limit exceeded")]
    #[diagnostic(help("wait a moment and invoke the pipeline again"))]
    UpstreamRateLimited,

    #[error("footprint request failed: {0}")]
    UpstreamHttp(String),

    #[error("footprint returned status {status}: {message}")]
    UpstreamStatus { status: u16, message: String },

    #[error("failed to fetch country directory: {0}")]
    DirectoryFetchFailed(String),

    #[error("cache store unavailable: {0}")]
    CacheUnavailable(String),

    #[error("malformed cache entry at {key}: {message}")]
    CacheDecode { key: String, message: String },

    #[error("missing setting: {0}")]
    MissingSetting(&'static str),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid setting: {0}")]
    InvalidSetting(String),
}

impl EmissionsError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, EmissionsError::UpstreamRateLimited)
    }

    pub fn status_code(&self) -> u16 {
        if self.is_rate_limited() { 429 } else { 500 }
    }
}

impl From<redis::RedisError> for EmissionsError {
    fn from(err: redis::RedisError) -> Self {
        EmissionsError::CacheUnavailable(err.to_string())
    }
}
