//! Redis-backed counter cache

use super::{CacheError, CacheResult};
use redis::AsyncCommands;
use std::sync::Arc;
use std::time::Duration;

/// Redis-backed counter cache with a reusable multiplexed connection
#[derive(Clone)]
pub struct RedisCounterCache {
    client: redis::Client,
    key_prefix: String,
    connection: Arc<tokio::sync::Mutex<Option<redis::aio::MultiplexedConnection>>>,
}

impl RedisCounterCache {
    /// Create new Redis counter cache
    pub fn new(redis_url: &str, key_prefix: String) -> CacheResult<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| CacheError::Cache(format!("Redis client error: {}", e)))?;

        Ok(Self {
            client,
            key_prefix,
            connection: Arc::new(tokio::sync::Mutex::new(None)),
        })
    }

    /// Create Redis counter cache from existing client (for pre-initialized clients)
    pub fn from_client(client: redis::Client, key_prefix: String) -> Self {
        Self {
            client,
            key_prefix,
            connection: Arc::new(tokio::sync::Mutex::new(None)),
        }
    }

    fn prefixed(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    /// Get a working Redis connection, creating or reusing existing one
    async fn get_connection(&self) -> CacheResult<redis::aio::MultiplexedConnection> {
        let mut conn_guard = self.connection.lock().await;

        if let Some(conn) = conn_guard.take() {
            if self.test_connection(&conn).await.is_ok() {
                return Ok(conn);
            }
        }

        let new_conn = self
            .client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(|e| CacheError::Connection(format!("Connection failed: {}", e)))?;

        Ok(new_conn)
    }

    async fn test_connection(
        &self,
        conn: &redis::aio::MultiplexedConnection,
    ) -> Result<(), redis::RedisError> {
        let mut conn = conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    /// Return connection to storage for reuse
    async fn return_connection(&self, conn: redis::aio::MultiplexedConnection) {
        *self.connection.lock().await = Some(conn);
    }

    pub async fn get_many(&self, keys: &[String]) -> CacheResult<Vec<Option<i64>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.get_connection().await?;

        let prefixed: Vec<String> = keys.iter().map(|k| self.prefixed(k)).collect();
        // Counter values are stored as decimal strings; redis parses them back
        let values: Vec<Option<i64>> = conn
            .mget(&prefixed)
            .await
            .map_err(|e| CacheError::Cache(e.to_string()))?;

        self.return_connection(conn).await;
        Ok(values)
    }

    pub async fn set(&self, key: &str, value: i64, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.get_connection().await?;

        let _: () = conn
            .set_ex(
                self.prefixed(key),
                value.to_string(),
                ttl.as_secs().max(1),
            )
            .await
            .map_err(|e| CacheError::Cache(e.to_string()))?;

        self.return_connection(conn).await;
        Ok(())
    }
}
