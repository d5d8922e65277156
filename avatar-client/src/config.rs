//! Resolver configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use avatar_cache::CacheConfig;
use avatar_core::constants::{DEFAULT_PROXY_URL, DEFAULT_STORAGE_KEY};

use crate::proxy::ProxyConfig;

/// Everything needed to build an [`AvatarResolver`](crate::AvatarResolver)
/// from scratch.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Proxy configuration
    pub proxy: ProxyConfig,
    /// Cache configuration
    pub cache: CacheConfig,
    /// Key of the cache blob in durable storage
    pub storage_key: String,
    /// Directory for the file store; `None` keeps the cache in memory only
    pub cache_dir: Option<PathBuf>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            proxy: ProxyConfig::default(),
            cache: CacheConfig::default(),
            storage_key: DEFAULT_STORAGE_KEY.into(),
            cache_dir: None,
        }
    }
}

impl ResolverConfig {
    /// Creates a config for the given proxy endpoint.
    pub fn with_proxy(endpoint: impl Into<String>) -> Self {
        Self {
            proxy: ProxyConfig::new(endpoint),
            ..Default::default()
        }
    }

    /// Reads configuration from the environment (and `.env`, if present).
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `AVATAR_PROXY_URL` | `http://localhost:3000/api/roblox-avatar` |
    /// | `AVATAR_PROXY_TIMEOUT_SECONDS` | transport default |
    /// | `AVATAR_CACHE_TTL_SECONDS` | `3600` |
    /// | `AVATAR_CACHE_DIR` | unset (memory only) |
    /// | `AVATAR_STORAGE_KEY` | `avatar-cache` |
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let defaults = Self::default();
        Self {
            proxy: ProxyConfig {
                endpoint: std::env::var("AVATAR_PROXY_URL")
                    .unwrap_or_else(|_| DEFAULT_PROXY_URL.into()),
                timeout_seconds: std::env::var("AVATAR_PROXY_TIMEOUT_SECONDS")
                    .ok()
                    .and_then(|v| v.parse().ok()),
            },
            cache: CacheConfig {
                ttl_seconds: std::env::var("AVATAR_CACHE_TTL_SECONDS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.cache.ttl_seconds),
            },
            storage_key: std::env::var("AVATAR_STORAGE_KEY").unwrap_or(defaults.storage_key),
            cache_dir: std::env::var_os("AVATAR_CACHE_DIR").map(PathBuf::from),
        }
    }

    /// Sets the cache TTL.
    pub fn with_ttl_seconds(mut self, seconds: u64) -> Self {
        self.cache.ttl_seconds = seconds;
        self
    }

    /// Persists the cache under the given directory.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Sets a proxy request timeout.
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.proxy.timeout_seconds = Some(seconds);
        self
    }

    /// Keeps the cache in memory only.
    pub fn no_persistence(mut self) -> Self {
        self.cache_dir = None;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ResolverConfig::default();
        assert_eq!(config.cache.ttl_seconds, 3600);
        assert_eq!(config.storage_key, "avatar-cache");
        assert!(config.proxy.timeout_seconds.is_none());
        assert!(config.cache_dir.is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = ResolverConfig::with_proxy("https://dash.example.com/api/avatar")
            .with_ttl_seconds(60)
            .with_timeout(10)
            .with_cache_dir("/tmp/avatars");

        assert_eq!(config.proxy.endpoint, "https://dash.example.com/api/avatar");
        assert_eq!(config.cache.ttl_seconds, 60);
        assert_eq!(config.proxy.timeout_seconds, Some(10));
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/avatars")));

        assert!(config.no_persistence().cache_dir.is_none());
    }
}
