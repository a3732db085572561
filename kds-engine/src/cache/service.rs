//! Tagged TTL cache with bounded capacity

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::core::EngineResult;

struct CacheEntry {
    data: Arc<dyn Any + Send + Sync>,
    /// Insertion time; doubles as eviction age
    stored_at: Instant,
    ttl: Duration,
    tags: HashSet<String>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.stored_at) >= self.ttl
    }
}

/// Counter snapshot for observability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

struct CacheInner {
    map: RwLock<HashMap<String, CacheEntry>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

/// In-memory cache with TTL expiry, tag-driven eviction, and a bounded
/// size fallback (expired entries evicted first, then oldest).
///
/// Values are stored type-erased; a key read back at a different type
/// counts as a miss, so callers always key one shape per key.
#[derive(Clone)]
pub struct CacheService {
    inner: Arc<CacheInner>,
}

impl std::fmt::Debug for CacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheService")
            .field("len", &self.inner.map.read().len())
            .field("capacity", &self.inner.capacity)
            .finish()
    }
}

impl CacheService {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                map: RwLock::new(HashMap::new()),
                capacity,
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                evictions: AtomicU64::new(0),
            }),
        }
    }

    /// Fetch a live entry; expired entries count as a miss and are dropped
    pub fn get<T>(&self, key: &str) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let now = Instant::now();
        {
            let map = self.inner.map.read();
            if let Some(entry) = map.get(key)
                && !entry.is_expired(now)
                && let Some(value) = entry.data.downcast_ref::<T>()
            {
                self.inner.hits.fetch_add(1, Ordering::Relaxed);
                return Some(value.clone());
            }
        }
        let mut map = self.inner.map.write();
        if let Some(entry) = map.get(key)
            && entry.is_expired(now)
        {
            map.remove(key);
        }
        self.inner.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub fn set<T>(&self, key: impl Into<String>, value: T, ttl: Duration, tags: &[String])
    where
        T: Send + Sync + 'static,
    {
        let mut map = self.inner.map.write();
        map.insert(
            key.into(),
            CacheEntry {
                data: Arc::new(value),
                stored_at: Instant::now(),
                ttl,
                tags: tags.iter().cloned().collect(),
            },
        );
        if map.len() > self.inner.capacity {
            self.evict_overflow(&mut map);
        }
    }

    /// Drop every entry carrying any of `tags`, returning the count
    pub fn invalidate_by_tags(&self, tags: &[String]) -> usize {
        let mut map = self.inner.map.write();
        let keys: Vec<String> = map
            .iter()
            .filter(|(_, entry)| tags.iter().any(|tag| entry.tags.contains(tag)))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &keys {
            map.remove(key);
        }
        if !keys.is_empty() {
            tracing::debug!(count = keys.len(), ?tags, "Cache invalidated by tags");
        }
        keys.len()
    }

    /// Read-through: serve a live entry or fall back to the direct fetch.
    ///
    /// The cache is advisory — a fetch error propagates, but caching the
    /// fetched value can never fail the read.
    pub async fn get_or_fetch<T, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        tags: &[String],
        fetch: F,
    ) -> EngineResult<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = EngineResult<T>>,
    {
        if let Some(value) = self.get::<T>(key) {
            return Ok(value);
        }
        let value = fetch().await?;
        self.set(key, value.clone(), ttl, tags);
        Ok(value)
    }

    pub fn clear(&self) {
        self.inner.map.write().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
            evictions: self.inner.evictions.load(Ordering::Relaxed),
        }
    }

    /// Expired entries first, then oldest, until back under capacity
    fn evict_overflow(&self, map: &mut HashMap<String, CacheEntry>) {
        let now = Instant::now();
        let expired: Vec<String> = map
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in expired {
            map.remove(&key);
            self.inner.evictions.fetch_add(1, Ordering::Relaxed);
        }
        while map.len() > self.inner.capacity {
            let Some(oldest) = map
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(key, _)| key.clone())
            else {
                break;
            };
            map.remove(&oldest);
            self.inner.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }
}
