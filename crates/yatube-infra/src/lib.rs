//! # Yatube Infrastructure
//!
//! Concrete implementations of the ports defined in `yatube-core`.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external services, in-memory storage and cache only
//! - `postgres` - PostgreSQL repositories via SeaORM
//! - `redis` - Redis-backed page cache

pub mod auth;
pub mod cache;
pub mod database;
pub mod media;
pub mod memory;

// Re-exports - always available
pub use auth::{Argon2PasswordService, JwtConfig, JwtTokenService};
pub use cache::InMemoryCache;
pub use media::FileSystemStorage;
pub use memory::InMemoryStore;

// Re-exports - Redis
#[cfg(feature = "redis")]
pub use cache::{RedisCache, RedisConfig};
