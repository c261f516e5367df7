//! Cache module
//!
//! Provides caching infrastructure with pluggable backends:
//! - In-memory (default when no REDIS_URL is set, and in tests) - uses moka
//! - Redis - uses deadpool-redis

mod backend;
mod error;
mod key;
mod memory;
mod redis;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

pub use backend::CacheBackend;
pub use error::CacheError;
pub use key::CacheKey;

use memory::InMemoryCache;

use crate::core::config::RedisConfig;

/// Cache service providing typed access to the cache backend
///
/// Wraps the underlying cache backend and provides:
/// - Raw bytes API for flexibility
/// - Typed API using MessagePack serialization
pub struct CacheService {
    backend: Arc<dyn CacheBackend>,
}

impl std::fmt::Debug for CacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheService")
            .field("backend", &self.backend.backend_name())
            .finish()
    }
}

impl CacheService {
    /// Create a new cache service from configuration
    ///
    /// With a Redis config present the Redis backend is used; otherwise the
    /// process-local in-memory backend.
    pub async fn new(config: Option<&RedisConfig>) -> Result<Self, CacheError> {
        let backend: Arc<dyn CacheBackend> = match config {
            Some(redis) => Arc::new(redis::RedisCache::new(&redis.url).await?),
            None => {
                tracing::debug!("Initializing in-memory cache");
                Arc::new(InMemoryCache::new())
            }
        };

        Ok(Self { backend })
    }

    /// Create an in-memory cache service, used in tests
    pub fn in_memory() -> Self {
        Self {
            backend: Arc::new(InMemoryCache::new()),
        }
    }

    /// Get the backend name
    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    // =========================================================================
    // Raw bytes API
    // =========================================================================

    /// Get raw bytes from cache
    pub async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.backend.get(key).await
    }

    /// Set raw bytes in cache
    pub async fn set_raw(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        self.backend.set(key, value, ttl).await
    }

    // =========================================================================
    // Typed API (serde)
    // =========================================================================

    /// Get a typed value from cache
    ///
    /// Uses MessagePack for compact, fast deserialization.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.get_raw(key).await? {
            Some(bytes) => {
                let value = rmp_serde::from_slice(&bytes)
                    .map_err(|e| CacheError::Serialization(e.to_string()))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Set a typed value in cache
    ///
    /// Uses MessagePack for compact, fast serialization.
    pub async fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let bytes =
            rmp_serde::to_vec(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.set_raw(key, bytes, ttl).await
    }

    // =========================================================================
    // Other operations
    // =========================================================================

    /// Delete a key from cache
    pub async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        self.backend.delete(key).await
    }

    /// Delete a key from cache with automatic error logging.
    ///
    /// Convenience for cache invalidation where errors should be logged but
    /// not propagated.
    pub async fn invalidate_key(&self, key: &str) {
        if let Err(e) = self.backend.delete(key).await {
            tracing::warn!(key = %key, error = %e, "Cache invalidation failed");
        }
    }

    /// Check if a key exists
    pub async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        self.backend.exists(key).await
    }

    /// Health check
    pub async fn health_check(&self) -> Result<(), CacheError> {
        self.backend.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cache_service_backend_name() {
        let service = CacheService::in_memory();
        assert_eq!(service.backend_name(), "memory");
    }

    #[tokio::test]
    async fn test_typed_get_set() {
        let service = CacheService::in_memory();

        #[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
        struct User {
            id: String,
            name: String,
        }

        let user = User {
            id: "u1".to_string(),
            name: "Test User".to_string(),
        };

        service.set("user:1", &user, None).await.unwrap();
        let fetched: Option<User> = service.get("user:1").await.unwrap();
        assert_eq!(fetched, Some(user));
    }

    #[tokio::test]
    async fn test_invalidate_key_missing_is_silent() {
        let service = CacheService::in_memory();
        service.invalidate_key("missing").await;
        assert!(!service.exists("missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_health_check() {
        let service = CacheService::in_memory();
        assert!(service.health_check().await.is_ok());
    }
}
