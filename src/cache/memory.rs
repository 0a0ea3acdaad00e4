//! In-memory counter cache used for tests and single-instance deployments

use super::{CacheResult, SharedMemoryStore};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Cache entry with expiration
#[derive(Clone, Debug)]
pub struct MemoryEntry {
    value: i64,
    expires_at: DateTime<Utc>,
}

impl MemoryEntry {
    fn new(value: i64, ttl: Duration) -> Self {
        let expires_at = Utc::now()
            + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(3650));
        Self { value, expires_at }
    }

    fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// In-memory counter cache backed by shared storage
#[derive(Clone)]
pub struct MemoryCounterCache {
    store: SharedMemoryStore,
}

impl MemoryCounterCache {
    /// Create new memory cache with its own storage
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create memory cache from shared store (managed by CacheManager)
    pub fn from_shared_store(store: SharedMemoryStore) -> Self {
        Self { store }
    }

    pub async fn get_many(&self, keys: &[String]) -> CacheResult<Vec<Option<i64>>> {
        let mut expired = Vec::new();
        let values = {
            let store = self.store.read().await;
            keys.iter()
                .map(|key| match store.get(key) {
                    Some(entry) if entry.is_expired() => {
                        expired.push(key.clone());
                        None
                    }
                    Some(entry) => Some(entry.value),
                    None => None,
                })
                .collect()
        };

        if !expired.is_empty() {
            let mut store = self.store.write().await;
            for key in expired {
                if store.get(&key).is_some_and(|e| e.is_expired()) {
                    store.remove(&key);
                }
            }
        }

        Ok(values)
    }

    pub async fn set(&self, key: &str, value: i64, ttl: Duration) -> CacheResult<()> {
        let mut store = self.store.write().await;
        store.insert(key.to_string(), MemoryEntry::new(value, ttl));
        Ok(())
    }
}

impl Default for MemoryCounterCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = MemoryCounterCache::new();
        cache.set("k", 42, Duration::from_secs(60)).await.unwrap();

        let values = cache.get_many(&["k".to_string()]).await.unwrap();
        assert_eq!(values, vec![Some(42)]);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_value_and_ttl() {
        let cache = MemoryCounterCache::new();
        cache.set("k", 1, Duration::from_secs(60)).await.unwrap();
        cache.set("k", 2, Duration::from_secs(60)).await.unwrap();

        let values = cache.get_many(&["k".to_string()]).await.unwrap();
        assert_eq!(values, vec![Some(2)]);
    }
}
