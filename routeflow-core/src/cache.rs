//! Opaque key-value cache interface and an in-memory implementation.
//!
//! The engine consumes caches through [`Cache`]; implementations may be
//! process-local or persistent. Failures in an implementation must degrade
//! to a miss, never surface to the caller.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Shared key-value cache with per-entry time-to-live.
///
/// Writes are last-writer-wins; entries are deterministic for identical
/// keys, so concurrent writers are tolerated.
pub trait Cache<V>: Send + Sync {
    /// The live value stored at `key`, if any.
    fn get(&self, key: &str) -> Option<V>;

    /// Stores `value` at `key`, expiring after `ttl`.
    fn put(&self, key: &str, value: V, ttl: Duration);
}

struct StoredEntry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

/// Process-local cache backed by a mutex-guarded map.
pub struct MemoryCache<V> {
    entries: Mutex<HashMap<String, StoredEntry<V>>>,
}

impl<V> MemoryCache<V> {
    /// An empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<V> Default for MemoryCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send> Cache<V> for MemoryCache<V> {
    fn get(&self, key: &str) -> Option<V> {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => {
                log::warn!("memory cache lock poisoned; treating read as a miss");
                poisoned.into_inner()
            }
        };
        match entries.get(key) {
            Some(entry) if entry.expires_at > Utc::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn put(&self, key: &str, value: V, ttl: Duration) {
        let Ok(ttl) = chrono::Duration::from_std(ttl) else {
            log::warn!("cache ttl out of range; dropping write for {key:?}");
            return;
        };
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.insert(
            key.to_owned(),
            StoredEntry {
                value,
                expires_at: Utc::now() + ttl,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn round_trips_a_value() {
        let cache = MemoryCache::new();
        cache.put("k", 42_u32, Duration::from_secs(60));
        assert_eq!(cache.get("k"), Some(42));
    }

    #[rstest]
    fn expired_entry_reads_as_miss() {
        let cache = MemoryCache::new();
        cache.put("k", 1_u32, Duration::ZERO);
        assert_eq!(cache.get("k"), None);
    }

    #[rstest]
    fn last_writer_wins() {
        let cache = MemoryCache::new();
        cache.put("k", 1_u32, Duration::from_secs(60));
        cache.put("k", 2_u32, Duration::from_secs(60));
        assert_eq!(cache.get("k"), Some(2));
    }

    #[rstest]
    fn missing_key_is_a_miss() {
        let cache: MemoryCache<u32> = MemoryCache::new();
        assert_eq!(cache.get("absent"), None);
    }
}
