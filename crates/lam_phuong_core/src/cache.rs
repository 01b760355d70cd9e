//! crates/lam_phuong_core/src/cache.rs
//!
//! The Local Response Cache: memoized remote responses with a write
//! timestamp and a schema version.
//!
//! Caching is an optimization only. No method here returns an error; every
//! storage or decode failure is logged and behaves like a miss.

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::ports::KeyValueStore;

/// Bump whenever the shape of any cached payload changes. Entries written
/// under another version are discarded on first read; there is no migration.
pub const CACHE_SCHEMA_VERSION: u32 = 1;

/// Every storage key owned by the cache starts with this prefix.
pub const CACHE_KEY_PREFIX: &str = "lp_cache_";

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    data: Value,
    timestamp: DateTime<Utc>,
    version: u32,
}

pub struct LocalResponseCache {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    version: u32,
}

impl LocalResponseCache {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_version(store, clock, CACHE_SCHEMA_VERSION)
    }

    pub fn with_version(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, version: u32) -> Self {
        Self {
            store,
            clock,
            version,
        }
    }

    /// Returns the payload if it was written under the current version and is
    /// no older than `expiry`. Anything else is purged and reported as a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str, expiry: Duration) -> Option<T> {
        let storage_key = storage_key(key);
        let raw = match self.store.get(&storage_key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Cache read of '{}' failed: {}", key, e);
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Discarding unreadable cache entry '{}': {}", key, e);
                self.purge(&storage_key).await;
                return None;
            }
        };

        if entry.version != self.version {
            debug!(
                "Cache entry '{}' has version {}, expected {}",
                key, entry.version, self.version
            );
            self.purge(&storage_key).await;
            return None;
        }

        if self.clock.now() - entry.timestamp > expiry {
            debug!("Cache entry '{}' expired", key);
            self.purge(&storage_key).await;
            return None;
        }

        match serde_json::from_value(entry.data) {
            Ok(payload) => Some(payload),
            Err(e) => {
                warn!("Cached payload '{}' no longer matches its type: {}", key, e);
                self.purge(&storage_key).await;
                None
            }
        }
    }

    /// Overwrites `key` stamped with the current time and version.
    pub async fn set<T: Serialize>(&self, key: &str, payload: &T) {
        let data = match serde_json::to_value(payload) {
            Ok(data) => data,
            Err(e) => {
                warn!("Cannot serialize payload for cache key '{}': {}", key, e);
                return;
            }
        };
        let entry = CacheEntry {
            data,
            timestamp: self.clock.now(),
            version: self.version,
        };
        let raw = match serde_json::to_string(&entry) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Cannot encode cache entry '{}': {}", key, e);
                return;
            }
        };
        if let Err(e) = self.store.set(&storage_key(key), &raw).await {
            warn!("Cache write of '{}' failed: {}", key, e);
        }
    }

    pub async fn delete(&self, key: &str) {
        self.purge(&storage_key(key)).await;
    }

    /// Removes every cache entry. Keys outside the cache namespace are left alone.
    pub async fn clear(&self) {
        let keys = match self.store.keys().await {
            Ok(keys) => keys,
            Err(e) => {
                warn!("Cannot list cache keys: {}", e);
                return;
            }
        };
        for key in keys.iter().filter(|k| k.starts_with(CACHE_KEY_PREFIX)) {
            self.purge(key).await;
        }
    }

    async fn purge(&self, storage_key: &str) {
        if let Err(e) = self.store.remove(storage_key).await {
            warn!("Cache delete of '{}' failed: {}", storage_key, e);
        }
    }
}

fn storage_key(key: &str) -> String {
    format!("{}{}", CACHE_KEY_PREFIX, key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::memory::MemoryStore;
    use crate::ports::{PortError, PortResult};
    use async_trait::async_trait;
    use serde_json::json;

    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> PortResult<Option<String>> {
            Err(PortError::Storage("disk unavailable".to_string()))
        }

        async fn set(&self, _key: &str, _value: &str) -> PortResult<()> {
            Err(PortError::Storage("disk unavailable".to_string()))
        }

        async fn remove(&self, _key: &str) -> PortResult<()> {
            Err(PortError::Storage("disk unavailable".to_string()))
        }

        async fn keys(&self) -> PortResult<Vec<String>> {
            Err(PortError::Storage("disk unavailable".to_string()))
        }
    }

    fn setup() -> (Arc<MemoryStore>, Arc<ManualClock>, LocalResponseCache) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = LocalResponseCache::new(store.clone(), clock.clone());
        (store, clock, cache)
    }

    #[tokio::test]
    async fn fresh_entry_is_returned_unchanged() {
        let (_, _, cache) = setup();
        let payload = json!([{"id": 1, "name": "Hà Nội"}, {"id": 2, "name": "Đà Nẵng"}]);

        cache.set("locations", &payload).await;

        let cached: Option<Value> = cache.get("locations", Duration::minutes(5)).await;
        assert_eq!(cached, Some(payload));
    }

    #[tokio::test]
    async fn expired_entry_is_purged_not_skipped() {
        let (store, clock, cache) = setup();
        cache.set("job_types", &vec!["full-time", "part-time"]).await;

        clock.advance(Duration::minutes(6));

        let first: Option<Vec<String>> = cache.get("job_types", Duration::minutes(5)).await;
        assert_eq!(first, None);
        assert_eq!(store.get("lp_cache_job_types").await.unwrap(), None);

        let second: Option<Vec<String>> = cache.get("job_types", Duration::hours(24)).await;
        assert_eq!(second, None);
    }

    #[tokio::test]
    async fn entry_at_exact_expiry_is_still_valid() {
        let (_, clock, cache) = setup();
        cache.set("product_groups", &json!({"total": 3})).await;

        clock.advance(Duration::minutes(5));

        let cached: Option<Value> = cache.get("product_groups", Duration::minutes(5)).await;
        assert!(cached.is_some());
    }

    #[tokio::test]
    async fn version_bump_discards_old_entries() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let v1 = LocalResponseCache::with_version(store.clone(), clock.clone(), 1);
        v1.set("locations", &json!(["old shape"])).await;

        let v2 = LocalResponseCache::with_version(store.clone(), clock, 2);
        let cached: Option<Value> = v2.get("locations", Duration::hours(1)).await;

        assert_eq!(cached, None);
        assert_eq!(store.get("lp_cache_locations").await.unwrap(), None);
    }

    #[tokio::test]
    async fn clear_only_touches_the_cache_namespace() {
        let (store, _, cache) = setup();
        store.set("lp_auth_token", "keep-me").await.unwrap();
        cache.set("locations", &json!([])).await;
        cache.set("job_categories", &json!([])).await;

        cache.clear().await;
        cache.clear().await;
        cache.delete("locations").await;

        assert_eq!(store.keys().await.unwrap(), vec!["lp_auth_token".to_string()]);
    }

    #[tokio::test]
    async fn storage_failures_are_misses() {
        let cache = LocalResponseCache::new(
            Arc::new(BrokenStore),
            Arc::new(ManualClock::new(Utc::now())),
        );

        cache.set("locations", &json!([1, 2, 3])).await;
        let cached: Option<Value> = cache.get("locations", Duration::minutes(5)).await;
        cache.delete("locations").await;
        cache.clear().await;

        assert_eq!(cached, None);
    }
}
