//! Cache adapters implementing [`PostCache`].

use std::num::NonZeroUsize;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use lru::LruCache;
use metrics::counter;
use tokio::time::Instant;

use crate::application::cache::{CacheError, MAX_CACHE_TTL, PostCache, PostCacheKey};
use crate::domain::entities::PostRecord;

use super::lock::{rw_read, rw_write};

pub const METRIC_CACHE_HIT: &str = "postcache_cache_hit_total";
pub const METRIC_CACHE_MISS: &str = "postcache_cache_miss_total";
pub const METRIC_CACHE_EXPIRED: &str = "postcache_cache_expired_total";
pub const METRIC_CACHE_EVICT: &str = "postcache_cache_evict_total";

const SOURCE: &str = "infra::cache";

struct CachedPost {
    post: PostRecord,
    expires_at: Instant,
}

/// Bounded in-process cache with per-entry expiry.
///
/// The least recently used entry is evicted once `capacity` is reached.
/// Expired entries are dropped when read.
pub struct MemoryPostCache {
    entries: RwLock<LruCache<PostCacheKey, CachedPost>>,
}

impl MemoryPostCache {
    /// A capacity of zero is clamped to one entry.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &PostCacheKey) -> bool {
        rw_read(&self.entries, SOURCE, "contains").contains(key)
    }
}

#[async_trait]
impl PostCache for MemoryPostCache {
    async fn get(&self, key: &PostCacheKey) -> Result<Option<PostRecord>, CacheError> {
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        let dimension = key.dimension();

        let expired = match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                counter!(METRIC_CACHE_HIT, "dimension" => dimension).increment(1);
                return Ok(Some(entry.post.clone()));
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.pop(key);
            counter!(METRIC_CACHE_EXPIRED, "dimension" => dimension).increment(1);
        }
        counter!(METRIC_CACHE_MISS, "dimension" => dimension).increment(1);
        Ok(None)
    }

    async fn set(
        &self,
        key: &PostCacheKey,
        ttl: Duration,
        post: &PostRecord,
    ) -> Result<(), CacheError> {
        let expires_at = Instant::now()
            .checked_add(ttl.min(MAX_CACHE_TTL))
            .ok_or_else(|| CacheError::unavailable(format!("ttl of {ttl:?} overflows the clock")))?;
        let entry = CachedPost {
            post: post.clone(),
            expires_at,
        };

        let displaced = rw_write(&self.entries, SOURCE, "set").push(key.clone(), entry);
        match displaced {
            Some((evicted, _)) if &evicted != key => {
                counter!(METRIC_CACHE_EVICT, "dimension" => evicted.dimension()).increment(1);
            }
            _ => {}
        }
        Ok(())
    }

    async fn delete(&self, key: &PostCacheKey) -> Result<(), CacheError> {
        rw_write(&self.entries, SOURCE, "delete").pop(key);
        Ok(())
    }
}

/// Stand-in used when caching is switched off: every read misses and
/// writes are accepted and dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledPostCache;

#[async_trait]
impl PostCache for DisabledPostCache {
    async fn get(&self, _key: &PostCacheKey) -> Result<Option<PostRecord>, CacheError> {
        Ok(None)
    }

    async fn set(
        &self,
        _key: &PostCacheKey,
        _ttl: Duration,
        _post: &PostRecord,
    ) -> Result<(), CacheError> {
        Ok(())
    }

    async fn delete(&self, _key: &PostCacheKey) -> Result<(), CacheError> {
        Ok(())
    }
}
