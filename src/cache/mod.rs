//! Cache layer
//!
//! In-process caching for read-mostly reference data: the tag list,
//! ingredient prefix searches and short link slugs.
//!
//! # Usage
//!
//! ```rust,ignore
//! use foodgram::cache::{create_cache, CacheLayer};
//! use foodgram::config::CacheConfig;
//!
//! let cache = create_cache(&CacheConfig::default())?;
//! cache.set("tags:all", &tags, Duration::from_secs(60)).await?;
//! ```

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::CacheConfig;

/// Cache layer trait
///
/// The generic methods make this trait unusable as `dyn CacheLayer`;
/// services hold the `Cache` enum instead.
#[async_trait]
pub trait CacheLayer: Send + Sync {
    /// Get a value from cache
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>>;

    /// Set a value in cache with TTL
    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()>;

    /// Delete a value from cache
    async fn delete(&self, key: &str) -> Result<()>;

    /// Delete all values matching a pattern
    async fn delete_pattern(&self, pattern: &str) -> Result<()>;

    /// Clear all cache entries
    async fn clear(&self) -> Result<()>;
}

pub use memory::MemoryCache;

/// Unified cache enum for runtime polymorphism
#[derive(Debug)]
pub enum Cache {
    /// In-memory cache using moka
    Memory(MemoryCache),
}

impl Cache {
    /// TTL configured for this cache
    pub fn default_ttl(&self) -> Duration {
        match self {
            Cache::Memory(cache) => cache.default_ttl(),
        }
    }
}

#[async_trait]
impl CacheLayer for Cache {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        match self {
            Cache::Memory(cache) => cache.get(key).await,
        }
    }

    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        match self {
            Cache::Memory(cache) => cache.set(key, value, ttl).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match self {
            Cache::Memory(cache) => cache.delete(key).await,
        }
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<()> {
        match self {
            Cache::Memory(cache) => cache.delete_pattern(pattern).await,
        }
    }

    async fn clear(&self) -> Result<()> {
        match self {
            Cache::Memory(cache) => cache.clear().await,
        }
    }
}

/// Create a cache instance based on configuration
pub fn create_cache(config: &CacheConfig) -> Result<Arc<Cache>> {
    if config.max_capacity == 0 {
        anyhow::bail!("cache.max_capacity must be greater than 0");
    }
    let ttl = Duration::from_secs(config.ttl_seconds);
    let cache = MemoryCache::with_capacity_and_ttl(config.max_capacity, ttl);
    Ok(Arc::new(Cache::Memory(cache)))
}

/// Cache for tests: default capacity, 60 second TTL
#[cfg(test)]
pub fn create_test_cache() -> Arc<Cache> {
    Arc::new(Cache::Memory(MemoryCache::with_capacity_and_ttl(
        1_000,
        Duration::from_secs(60),
    )))
}
