//! Redis page cache with a managed, auto-reconnecting connection.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use yatube_core::ports::{Cache, CacheError};

/// Redis connection configuration.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis URL (e.g., redis://localhost:6379)
    pub url: String,
    pub connect_timeout: Duration,
    /// Whether to fall back to the in-memory cache if Redis is unreachable.
    pub fallback_to_memory: bool,
}

impl RedisConfig {
    /// Load from `REDIS_URL`, `REDIS_CONNECT_TIMEOUT_SECS` and
    /// `REDIS_FALLBACK_TO_MEMORY`. `None` when `REDIS_URL` is unset.
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("REDIS_URL").ok()?;
        Some(Self {
            url,
            connect_timeout: Duration::from_secs(
                std::env::var("REDIS_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            fallback_to_memory: std::env::var("REDIS_FALLBACK_TO_MEMORY")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
        })
    }
}

/// Redis-backed cache.
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub async fn new(config: &RedisConfig) -> Result<Self, CacheError> {
        let client =
            Client::open(config.url.as_str()).map_err(|e| CacheError::Connection(e.to_string()))?;

        let conn = tokio::time::timeout(config.connect_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| CacheError::Connection("Connection timed out".to_string()))?
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        tracing::info!(url = %config.url, "Connected to Redis cache");

        Ok(Self { conn })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Option<String> {
        let mut conn = self.conn.clone();
        match conn.get::<_, Option<String>>(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Redis GET failed");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();

        match ttl {
            Some(duration) => conn
                .set_ex::<_, _, ()>(key, value, duration.as_secs().max(1))
                .await,
            None => conn.set::<_, _, ()>(key, value).await,
        }
        .map_err(|e| CacheError::Operation(e.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| CacheError::Operation(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn get_test_cache() -> Option<RedisCache> {
        let config = RedisConfig {
            url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6389".to_string()),
            connect_timeout: Duration::from_secs(1),
            fallback_to_memory: false,
        };

        RedisCache::new(&config).await.ok()
    }

    #[tokio::test]
    async fn test_redis_cache_set_get() {
        let Some(cache) = get_test_cache().await else {
            tracing::warn!("Redis not available, skipping test");
            return;
        };

        cache.set("yatube_test:page", "body", None).await.unwrap();
        assert_eq!(cache.get("yatube_test:page").await, Some("body".to_string()));

        cache.delete("yatube_test:page").await.unwrap();
        assert_eq!(cache.get("yatube_test:page").await, None);
    }
}
