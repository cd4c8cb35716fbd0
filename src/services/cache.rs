use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::core::FilterRequest;

/// Errors that can occur with cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Cache miss: {0}")]
    CacheMiss(String),
}

/// Multi-tier cache manager
///
/// Implements L1 (in-memory) and L2 (Redis) caching strategy.
/// L1 is fastest but limited in size, L2 is shared across instances.
pub struct CacheManager {
    redis: Arc<tokio::sync::Mutex<ConnectionManager>>,
    l1_cache: moka::future::Cache<String, Vec<u8>>,
    ttl_secs: u64,
}

impl CacheManager {
    /// Create a new cache manager
    pub async fn new(redis_url: &str, l1_size: u64, ttl_secs: u64) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let redis = redis::aio::ConnectionManager::new(client).await?;

        let l1_cache = moka::future::CacheBuilder::new(l1_size)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Ok(Self {
            redis: Arc::new(tokio::sync::Mutex::new(redis)),
            l1_cache,
            ttl_secs,
        })
    }

    /// Get a value from cache (L1 first, then L2)
    pub async fn get<T>(&self, key: &str) -> Result<T, CacheError>
    where
        T: for<'de> Deserialize<'de>,
    {
        if let Some(bytes) = self.l1_cache.get(key).await {
            tracing::trace!("L1 cache hit: {}", key);
            return Ok(serde_json::from_slice(&bytes)?);
        }

        let mut conn = self.redis.lock().await;
        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut *conn)
            .await?;
        drop(conn);

        if let Some(json) = value {
            tracing::trace!("L2 cache hit: {}", key);

            // Populate L1 cache
            self.l1_cache.insert(key.to_string(), json.as_bytes().to_vec()).await;

            return Ok(serde_json::from_str(&json)?);
        }

        tracing::trace!("Cache miss: {}", key);
        Err(CacheError::CacheMiss(key.to_string()))
    }

    /// Set a value in cache (both L1 and L2)
    pub async fn set<T>(&self, key: &str, value: &T) -> Result<(), CacheError>
    where
        T: Serialize,
    {
        let json = serde_json::to_string(value)?;

        self.l1_cache.insert(key.to_string(), json.as_bytes().to_vec()).await;

        let mut conn = self.redis.lock().await;
        redis::cmd("SETEX")
            .arg(key)
            .arg(self.ttl_secs)
            .arg(json)
            .query_async::<()>(&mut *conn)
            .await?;
        drop(conn);

        tracing::trace!("Cache set: {}", key);
        Ok(())
    }

    /// Delete a value from both cache tiers
    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.l1_cache.invalidate(key).await;
        let mut conn = self.redis.lock().await;
        redis::cmd("DEL")
            .arg(key)
            .query_async::<()>(&mut *conn)
            .await?;
        Ok(())
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            l1_size: self.l1_cache.entry_count(),
            ttl_secs: self.ttl_secs,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub l1_size: u64,
    pub ttl_secs: u64,
}

fn length_prefixed(value: &str) -> String {
    format!("{}:{}", value.len(), value)
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Build a cache key for a filtered resource listing
    ///
    /// Equivalent filters (same keyword, same category set in any order,
    /// same featured flag) map to the same key. Every text field is length
    /// prefixed, so no keyword or category can spell out another filter's key.
    pub fn resources(filter: &FilterRequest) -> String {
        let keyword = filter
            .keyword
            .as_deref()
            .map(str::to_lowercase)
            .unwrap_or_default();
        let categories: Vec<String> = filter
            .categories
            .iter()
            .map(|c| length_prefixed(c))
            .collect();

        format!(
            "resources:q={};c={};f={}",
            length_prefixed(&keyword),
            categories.join(","),
            u8::from(filter.featured_only)
        )
    }

    /// Build a cache key for a single resource
    pub fn resource(id: i32) -> String {
        format!("resource:{}", id)
    }

    /// Build a cache key for directory statistics
    pub fn stats() -> String {
        "stats".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "Requires Redis"]
    async fn test_cache_set_get() {
        let cache = CacheManager::new("redis://127.0.0.1:6379", 1000, 60)
            .await
            .expect("Failed to create cache");

        let key = CacheKey::resource(42);
        let value = vec![1, 2, 3];

        cache.set(&key, &value).await.unwrap();
        let result: Vec<i32> = cache.get(&key).await.unwrap();
        assert_eq!(result, value);

        cache.delete(&key).await.unwrap();
        assert!(cache.get::<Vec<i32>>(&key).await.is_err());
    }

    #[test]
    fn test_cache_key_builder() {
        assert_eq!(CacheKey::resource(7), "resource:7");
        assert_eq!(CacheKey::stats(), "stats");
        assert_eq!(
            CacheKey::resources(&FilterRequest::default()),
            "resources:q=0:;c=;f=0"
        );
    }

    #[test]
    fn test_equivalent_filters_share_key() {
        let a = FilterRequest::from_params(Some("Pantry"), Some("Housing,Healthcare"), Some("true"));
        let b = FilterRequest::from_params(Some(" pantry"), Some("Healthcare, Housing,Housing"), Some("TRUE"));

        assert_eq!(CacheKey::resources(&a), CacheKey::resources(&b));
        assert_eq!(CacheKey::resources(&a), "resources:q=6:pantry;c=10:Healthcare,7:Housing;f=1");
    }

    #[test]
    fn test_distinct_filters_get_distinct_keys() {
        let two_categories = FilterRequest::from_params(None, Some("Food Assistance,Healthcare"), None);
        let one_category = FilterRequest::from_params(None, Some("Food Assistance|Healthcare"), None);
        assert_ne!(CacheKey::resources(&two_categories), CacheKey::resources(&one_category));

        let by_keyword = FilterRequest::from_params(Some("a;c=b"), None, None);
        let by_category = FilterRequest::from_params(Some("a"), Some("b;c="), None);
        assert_ne!(CacheKey::resources(&by_keyword), CacheKey::resources(&by_category));

        let comma_in_name = FilterRequest::default().with_category("Housing,7:Legal");
        let two_names = FilterRequest::default().with_category("Housing").with_category("Legal");
        assert_ne!(CacheKey::resources(&comma_in_name), CacheKey::resources(&two_names));
    }

    #[tokio::test]
    #[ignore = "Requires Redis"]
    async fn test_stats_entry_is_invalidated() {
        let cache = CacheManager::new("redis://127.0.0.1:6379", 100, 60)
            .await
            .expect("Failed to create cache");

        cache.set(&CacheKey::stats(), &vec![1, 2, 3]).await.unwrap();
        cache.delete(&CacheKey::stats()).await.unwrap();

        assert!(matches!(
            cache.get::<Vec<i32>>(&CacheKey::stats()).await,
            Err(CacheError::CacheMiss(_))
        ));
    }
}
