//! In-process cache implementation backed by moka.

use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::sync::Cache as MokaCache;
use moka::Expiry;

use crate::{Cache, Lookup, Result};

/// Default maximum number of entries.
const DEFAULT_MAX_ENTRIES: u64 = 100_000;

/// A cached value together with the TTL it was stored under.
#[derive(Clone)]
struct CachedValue {
    bytes: Arc<[u8]>,
    ttl: Duration,
}

/// Expiry policy that reads the TTL off each entry.
struct PerEntryTtl;

impl Expiry<String, CachedValue> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Concurrent in-process cache with per-entry TTLs.
///
/// Entries are evicted on expiry or capacity pressure; either way callers
/// see a plain [`Lookup::Miss`] and fall back to the store.
pub struct MemoryCache {
    inner: MokaCache<String, CachedValue>,
}

impl MemoryCache {
    /// Create a cache holding at most `max_entries` values.
    #[must_use]
    pub fn new(max_entries: u64) -> Self {
        let inner = MokaCache::builder()
            .max_capacity(max_entries)
            .expire_after(PerEntryTtl)
            .build();
        Self { inner }
    }

    /// Create a cache with the default capacity.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }

    /// Number of live entries (approximate, for diagnostics).
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Result<Lookup> {
        Ok(self
            .inner
            .get(key)
            .map_or(Lookup::Miss, |value| Lookup::Hit(value.bytes.to_vec())))
    }

    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        self.inner.insert(
            key.to_string(),
            CachedValue {
                bytes: Arc::from(value),
                ttl,
            },
        );
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.inner.invalidate(key);
        Ok(())
    }
}
