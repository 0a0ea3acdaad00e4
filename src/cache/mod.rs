//! Read-through counter cache
//!
//! Non-authoritative duplicate of the usage counters kept in the durable
//! store. Entries expire at the natural end of their period bucket, so a
//! stale value self-heals at rollover or after one store round-trip.

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

pub mod config;
pub mod memory;
pub mod redis;

pub use memory::MemoryCounterCache;
pub use redis::RedisCounterCache;

use crate::cache::config::CacheConfig;

/// Cache error types
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache error: {0}")]
    Cache(String),
    #[error("Connection error: {0}")]
    Connection(String),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Shared store backing the memory backend
type SharedMemoryStore = Arc<RwLock<HashMap<String, memory::MemoryEntry>>>;

/// Counter cache backend implementations
#[derive(Clone)]
pub enum CounterCacheBackend {
    Memory(MemoryCounterCache),
    Redis(RedisCounterCache),
    /// Backend whose every operation fails, for exercising degraded-cache
    /// paths in tests
    #[cfg(test)]
    Failing,
}

/// String-keyed integer cache with per-key TTLs
#[derive(Clone)]
pub struct CounterCache {
    backend: CounterCacheBackend,
}

impl CounterCache {
    pub fn new(backend: CounterCacheBackend) -> Self {
        Self { backend }
    }

    /// Cache whose reads and writes always fail
    #[cfg(test)]
    pub fn new_failing() -> Self {
        Self {
            backend: CounterCacheBackend::Failing,
        }
    }

    /// Batch read; preserves the order of `keys`, misses come back as `None`
    pub async fn get_many(&self, keys: &[String]) -> CacheResult<Vec<Option<i64>>> {
        match &self.backend {
            CounterCacheBackend::Memory(cache) => cache.get_many(keys).await,
            CounterCacheBackend::Redis(cache) => cache.get_many(keys).await,
            #[cfg(test)]
            CounterCacheBackend::Failing => {
                Err(CacheError::Cache("cache unavailable".to_string()))
            }
        }
    }

    /// Set a value with an expiry
    pub async fn set(&self, key: &str, value: i64, ttl: std::time::Duration) -> CacheResult<()> {
        match &self.backend {
            CounterCacheBackend::Memory(cache) => cache.set(key, value, ttl).await,
            CounterCacheBackend::Redis(cache) => cache.set(key, value, ttl).await,
            #[cfg(test)]
            CounterCacheBackend::Failing => {
                Err(CacheError::Cache("cache unavailable".to_string()))
            }
        }
    }
}

/// Cache manager - owns the configured backend and hands out counter caches
#[derive(Clone)]
pub struct CacheManager {
    config: CacheConfig,
    redis_client: Option<::redis::Client>,
    memory_store: Option<SharedMemoryStore>,
}

impl CacheManager {
    /// Create new cache manager with memory backend (for testing/single instance)
    pub fn new_memory() -> Self {
        Self {
            config: CacheConfig {
                backend: "memory".to_string(),
                ..Default::default()
            },
            redis_client: None,
            memory_store: Some(Arc::new(RwLock::new(HashMap::new()))),
        }
    }

    /// Create cache manager from configuration
    pub async fn new_from_config(config: &CacheConfig) -> CacheResult<Self> {
        let redis_client = if config.backend == "redis" {
            let client = ::redis::Client::open(config.redis_url.as_str()).map_err(|e| {
                CacheError::Connection(format!("Redis client creation failed: {}", e))
            })?;

            // Fail early if Redis is not reachable
            let mut conn = client
                .get_multiplexed_tokio_connection()
                .await
                .map_err(|e| CacheError::Connection(format!("Redis connection failed: {}", e)))?;
            ::redis::cmd("PING")
                .query_async::<String>(&mut conn)
                .await
                .map_err(|e| CacheError::Connection(format!("Redis ping failed: {}", e)))?;

            Some(client)
        } else {
            None
        };

        let memory_store = if config.backend == "memory" {
            Some(Arc::new(RwLock::new(HashMap::new())))
        } else {
            None
        };

        Ok(Self {
            config: config.clone(),
            redis_client,
            memory_store,
        })
    }

    /// Get the counter cache for the configured backend
    pub fn counters(&self) -> CounterCache {
        if let Some(client) = &self.redis_client {
            CounterCache::new(CounterCacheBackend::Redis(RedisCounterCache::from_client(
                client.clone(),
                self.config.redis_key_prefix.clone(),
            )))
        } else if let Some(store) = &self.memory_store {
            CounterCache::new(CounterCacheBackend::Memory(
                MemoryCounterCache::from_shared_store(store.clone()),
            ))
        } else {
            panic!("No backend initialized - this should never happen")
        }
    }

    pub fn backend_type(&self) -> &str {
        &self.config.backend
    }
}

impl Default for CacheManager {
    fn default() -> Self {
        Self::new_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_memory_counter_sharing() {
        let manager = CacheManager::new_memory();

        // Two handles from the same manager share state
        let cache1 = manager.counters();
        let cache2 = manager.counters();

        cache1
            .set("usage:runs:u1:2024-06", 4, Duration::from_secs(60))
            .await
            .unwrap();

        let values = cache2
            .get_many(&["usage:runs:u1:2024-06".to_string()])
            .await
            .unwrap();
        assert_eq!(values, vec![Some(4)]);
    }

    #[tokio::test]
    async fn test_get_many_preserves_order_and_misses() {
        let cache = CacheManager::new_memory().counters();
        cache.set("b", 2, Duration::from_secs(60)).await.unwrap();

        let values = cache
            .get_many(&["a".to_string(), "b".to_string(), "c".to_string()])
            .await
            .unwrap();
        assert_eq!(values, vec![None, Some(2), None]);
    }

    #[tokio::test]
    async fn test_expired_entry_reads_as_miss() {
        let cache = CacheManager::new_memory().counters();
        cache.set("short", 1, Duration::from_millis(20)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;

        let values = cache.get_many(&["short".to_string()]).await.unwrap();
        assert_eq!(values, vec![None]);
    }
}
