//! Expiring key/value storage.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use metrics::counter;

use super::clock::{Clock, SystemClock};
use super::config::{CacheConfig, ttl_to_ms};
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

pub const HIT_TOTAL: &str = "quire_cache_hit_total";
pub const MISS_TOTAL: &str = "quire_cache_miss_total";
pub const EXPIRED_TOTAL: &str = "quire_cache_expired_total";

struct CacheEntry<V> {
    value: V,
    expires_at: i64,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at
    }
}

/// In-memory store where every entry carries an absolute expiry.
///
/// Reads check the deadline and evict stale entries on the spot. Writes are
/// last-write-wins; two callers racing on a miss may both populate the same
/// key, which is harmless because the values are interchangeable.
pub struct ExpiringCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    clock: Arc<dyn Clock>,
    default_ttl_ms: i64,
}

impl<V: Clone> ExpiringCache<V> {
    /// Create a store driven by the system clock.
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
            default_ttl_ms: config.default_ttl_ms(),
        }
    }

    /// Return the value under `key` unless it is missing or expired.
    ///
    /// An expired entry is removed before returning `None`.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now_ms();
        {
            let entries = rw_read(&self.entries, SOURCE, "get");
            match entries.get(key) {
                None => {
                    counter!(MISS_TOTAL).increment(1);
                    return None;
                }
                Some(entry) if !entry.is_expired(now) => {
                    counter!(HIT_TOTAL).increment(1);
                    return Some(entry.value.clone());
                }
                Some(_) => {}
            }
        }

        let mut entries = rw_write(&self.entries, SOURCE, "get.evict");
        // A concurrent `set` may have refreshed the key between the two locks.
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
            counter!(EXPIRED_TOTAL).increment(1);
        }
        counter!(MISS_TOTAL).increment(1);
        None
    }

    /// Store `value` with the configured default TTL.
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.insert(key.into(), value, self.default_ttl_ms);
    }

    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.insert(key.into(), value, ttl_to_ms(ttl));
    }

    fn insert(&self, key: String, value: V, ttl_ms: i64) {
        let expires_at = self.clock.now_ms().saturating_add(ttl_ms);
        rw_write(&self.entries, SOURCE, "set").insert(key, CacheEntry { value, expires_at });
    }

    /// Remove `key` regardless of its expiry. Returns whether it was present.
    pub fn delete(&self, key: &str) -> bool {
        rw_write(&self.entries, SOURCE, "delete")
            .remove(key)
            .is_some()
    }

    pub fn clear(&self) {
        rw_write(&self.entries, SOURCE, "clear").clear();
    }

    /// Number of stored entries, including expired ones not yet read.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
