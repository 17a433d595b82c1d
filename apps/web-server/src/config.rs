//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use yatube_infra::database::DatabaseConfig;
#[cfg(feature = "redis")]
use yatube_infra::RedisConfig;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database: Option<DatabaseConfig>,
    #[cfg(feature = "redis")]
    pub redis: Option<RedisConfig>,
    /// Directory uploaded images are written to.
    pub media_root: PathBuf,
    /// URL prefix stored image paths are served under.
    pub media_url: String,
    /// How long a rendered index page stays cached.
    pub index_cache_ttl: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database: None,
            #[cfg(feature = "redis")]
            redis: None,
            media_root: PathBuf::from("media"),
            media_url: "/media/".to_string(),
            index_cache_ttl: Duration::from_secs(20),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            database: DatabaseConfig::from_env(),
            #[cfg(feature = "redis")]
            redis: RedisConfig::from_env(),
            media_root: env::var("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.media_root),
            media_url: env::var("MEDIA_URL").unwrap_or(defaults.media_url),
            index_cache_ttl: env::var("INDEX_CACHE_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.index_cache_ttl),
        }
    }
}
