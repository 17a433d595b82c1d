//! Cache port - backs the rendered page cache.

use async_trait::async_trait;
use std::time::Duration;

/// String key/value cache with optional expiry (Redis or in-memory).
#[async_trait]
pub trait Cache: Send + Sync {
    /// Get a live value. Expired entries read as missing.
    async fn get(&self, key: &str) -> Option<String>;

    /// Store a value, replacing any previous one.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError>;

    /// Drop a key. Dropping a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// Cache operation errors.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Operation failed: {0}")]
    Operation(String),
}
