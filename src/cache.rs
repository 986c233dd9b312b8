use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::EmissionsError;

pub struct CacheKeys;

impl CacheKeys {
    pub const COUNTRIES: &'static str = "footprint:countries";
    pub const OFFSET: &'static str = "footprint:offset";

    pub fn country_data(country_code: &str) -> String {
        format!("footprint:country:{country_code}")
    }
}

pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, EmissionsError>;
    fn set_with_expiry(&self, key: &str, ttl: Duration, value: &str)
    -> Result<(), EmissionsError>;
    fn flush_all(&self) -> Result<(), EmissionsError>;
}

impl<C: CacheStore + ?Sized> CacheStore for Arc<C> {
    fn get(&self, key: &str) -> Result<Option<String>, EmissionsError> {
        (**self).get(key)
    }

    fn set_with_expiry(
        &self,
        key: &str,
        ttl: Duration,
        value: &str,
    ) -> Result<(), EmissionsError> {
        (**self).set_with_expiry(key, ttl, value)
    }

    fn flush_all(&self) -> Result<(), EmissionsError> {
        (**self).flush_all()
    }
}

// Undecodable content is reported as a miss.
pub fn read_json<T, C>(store: &C, key: &str) -> Result<Option<T>, EmissionsError>
where
    T: DeserializeOwned,
    C: CacheStore + ?Sized,
{
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(err) => {
            let err = EmissionsError::CacheDecode {
                key: key.to_string(),
                message: err.to_string(),
            };
            tracing::warn!(%err, "discarding cache entry");
            Ok(None)
        }
    }
}

pub fn write_json<T, C>(store: &C, key: &str, ttl: Duration, value: &T) -> Result<(), EmissionsError>
where
    T: Serialize + ?Sized,
    C: CacheStore + ?Sized,
{
    let content = serde_json::to_string(value).map_err(|err| EmissionsError::CacheDecode {
        key: key.to_string(),
        message: err.to_string(),
    })?;
    store.set_with_expiry(key, ttl, &content)
}

pub struct RedisCache {
    conn: Mutex<redis::Connection>,
}

impl RedisCache {
    pub fn connect(url: &str) -> Result<Self, EmissionsError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection()?;
        tracing::info!("connected to redis");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T, F>(&self, op: F) -> Result<T, EmissionsError>
    where
        F: FnOnce(&mut redis::Connection) -> redis::RedisResult<T>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| EmissionsError::CacheUnavailable("redis connection poisoned".to_string()))?;
        op(&mut *conn).map_err(EmissionsError::from)
    }
}

impl CacheStore for RedisCache {
    fn get(&self, key: &str) -> Result<Option<String>, EmissionsError> {
        self.with_conn(|conn| redis::cmd("GET").arg(key).query(conn))
    }

    fn set_with_expiry(
        &self,
        key: &str,
        ttl: Duration,
        value: &str,
    ) -> Result<(), EmissionsError> {
        let secs = ttl.as_secs().max(1);
        self.with_conn(|conn| {
            redis::cmd("SETEX")
                .arg(key)
                .arg(secs)
                .arg(value)
                .query::<()>(conn)
        })
    }

    fn flush_all(&self) -> Result<(), EmissionsError> {
        self.with_conn(|conn| redis::cmd("FLUSHALL").query::<()>(conn))
    }
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, MemoryEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .map(|entries| entries.len())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, MemoryEntry>>, EmissionsError> {
        self.entries
            .lock()
            .map_err(|_| EmissionsError::CacheUnavailable("memory cache poisoned".to_string()))
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>, EmissionsError> {
        let mut entries = self.lock()?;
        let expired = match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                return Ok(Some(entry.value.clone()));
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(key);
        }
        Ok(None)
    }

    fn set_with_expiry(
        &self,
        key: &str,
        ttl: Duration,
        value: &str,
    ) -> Result<(), EmissionsError> {
        let mut entries = self.lock()?;
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    fn flush_all(&self) -> Result<(), EmissionsError> {
        self.lock()?.clear();
        Ok(())
    }
}
