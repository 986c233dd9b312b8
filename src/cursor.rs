use std::time::Duration;

use crate::cache::{CacheKeys, CacheStore};
use crate::error::EmissionsError;

pub struct CursorManager<'a, C: CacheStore + ?Sized> {
    cache: &'a C,
    ttl: Duration,
}

impl<'a, C: CacheStore + ?Sized> CursorManager<'a, C> {
    pub fn new(cache: &'a C, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    pub fn read(&self) -> Result<usize, EmissionsError> {
        let raw = self.cache.get(CacheKeys::OFFSET)?;
        Ok(raw.as_deref().map(parse_offset).unwrap_or(0))
    }

    // Best effort: a lost write only means the next run redoes cached work.
    pub fn persist(&self, offset: usize) {
        if let Err(err) =
            self.cache
                .set_with_expiry(CacheKeys::OFFSET, self.ttl, &offset.to_string())
        {
            tracing::warn!(%err, offset, "failed to persist pagination offset");
        }
    }

    pub fn reset(&self) -> Result<(), EmissionsError> {
        self.cache.set_with_expiry(CacheKeys::OFFSET, self.ttl, "0")
    }
}

// Not clamped; slicing clamps instead.
pub fn advance(current: usize, batch_size: usize, directory_len: usize) -> usize {
    if current < directory_len {
        current.saturating_add(batch_size)
    } else {
        current
    }
}

fn parse_offset(raw: &str) -> usize {
    raw.trim().parse::<usize>().unwrap_or(0)
}
