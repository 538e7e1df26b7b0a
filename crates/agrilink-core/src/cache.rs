//! In-memory TTL cache for upstream payloads.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use time::OffsetDateTime;

use crate::clock::{Clock, SystemClock};
use crate::SourceKey;

/// Default freshness window for cached payloads.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// A payload as it was stored after a successful upstream fetch.
///
/// Entries are never mutated; a refresh replaces the whole entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: SourceKey,
    pub payload: Value,
    pub fetched_at: OffsetDateTime,
}

#[derive(Debug)]
struct CacheInner {
    map: HashMap<SourceKey, CacheEntry>,
}

impl CacheInner {
    fn get(&self, key: &SourceKey, now: OffsetDateTime, ttl: time::Duration) -> Option<CacheEntry> {
        self.map
            .get(key)
            .filter(|entry| now - entry.fetched_at < ttl)
            .cloned()
    }

    fn put(&mut self, entry: CacheEntry) {
        self.map.insert(entry.key.clone(), entry);
    }
}

/// Thread-safe TTL cache shared by all fetches of an aggregator.
///
/// Expired entries are reported as misses but stay in place until the next
/// successful fetch for the same key overwrites them.
#[derive(Clone)]
pub struct TtlCache {
    inner: Arc<tokio::sync::RwLock<CacheInner>>,
    ttl: time::Duration,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TtlCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

impl Default for TtlCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl TtlCache {
    /// Create a cache backed by the system clock.
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    /// Create a cache that reads time from `clock`.
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(tokio::sync::RwLock::new(CacheInner {
                map: HashMap::new(),
            })),
            ttl: time::Duration::try_from(ttl).unwrap_or(time::Duration::MAX),
            clock,
        }
    }

    /// Return the entry for `key` if it was fetched less than one TTL ago.
    pub async fn get(&self, key: &SourceKey) -> Option<CacheEntry> {
        let now = self.clock.now();
        let store = self.inner.read().await;
        store.get(key, now, self.ttl)
    }

    /// Store `payload` under `key`, replacing whatever was there.
    pub async fn put(&self, key: SourceKey, payload: Value) {
        let entry = CacheEntry {
            key,
            payload,
            fetched_at: self.clock.now(),
        };
        let mut store = self.inner.write().await;
        store.put(entry);
    }

    /// Number of stored entries, stale ones included.
    pub async fn len(&self) -> usize {
        self.inner.read().await.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn ttl(&self) -> Duration {
        Duration::try_from(self.ttl).unwrap_or(Duration::MAX)
    }
}
