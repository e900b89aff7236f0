use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use crate::models::PairKey;

/// Errors that can occur with cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Cache miss: {0}")]
    CacheMiss(String),

    #[error("L1 invalidation error: {0}")]
    InvalidationError(String),
}

/// Multi-tier cache manager
///
/// L1 is an in-process moka cache; L2 is Redis, shared across instances.
/// L2 is optional: without a Redis URL the manager runs on L1 alone.
pub struct CacheManager {
    redis: Option<Arc<tokio::sync::Mutex<ConnectionManager>>>,
    l1_cache: moka::future::Cache<String, Vec<u8>>,
    ttl_secs: u64,
}

impl CacheManager {
    /// Create a cache manager backed by Redis
    pub async fn new(redis_url: &str, l1_size: u64, ttl_secs: u64) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let redis = redis::aio::ConnectionManager::new(client).await?;

        Ok(Self {
            redis: Some(Arc::new(tokio::sync::Mutex::new(redis))),
            l1_cache: build_l1(l1_size, ttl_secs),
            ttl_secs,
        })
    }

    /// Create an L1-only cache manager
    pub fn in_memory(l1_size: u64, ttl_secs: u64) -> Self {
        Self {
            redis: None,
            l1_cache: build_l1(l1_size, ttl_secs),
            ttl_secs,
        }
    }

    pub fn has_redis(&self) -> bool {
        self.redis.is_some()
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

        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            let value: Option<String> = redis::cmd("GET")
                .arg(key)
                .query_async(&mut *conn)
                .await?;
            drop(conn);

            if let Some(json) = value {
                tracing::trace!("L2 cache hit: {}", key);
                self.l1_cache.insert(key.to_string(), json.as_bytes().to_vec()).await;
                return Ok(serde_json::from_str(&json)?);
            }
        }

        tracing::trace!("Cache miss: {}", key);
        Err(CacheError::CacheMiss(key.to_string()))
    }

    /// Set a value in both tiers
    pub async fn set<T>(&self, key: &str, value: &T) -> Result<(), CacheError>
    where
        T: Serialize,
    {
        let json = serde_json::to_string(value)?;
        self.l1_cache.insert(key.to_string(), json.as_bytes().to_vec()).await;

        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            let _: () = redis::cmd("SETEX")
                .arg(key)
                .arg(self.ttl_secs)
                .arg(json)
                .query_async(&mut *conn)
                .await?;
        }

        tracing::trace!("Cache set: {}", key);
        Ok(())
    }

    /// Delete a value from both tiers
    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.l1_cache.invalidate(key).await;
        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            let _: () = redis::cmd("DEL").arg(key).query_async(&mut *conn).await?;
        }
        Ok(())
    }

    /// Cached compatibility score for a pair, if any
    ///
    /// `scope` identifies the scoring weights, so scorers with different
    /// weights sharing an L2 never read each other's scores.
    pub async fn get_score(&self, scope: &str, a: &str, b: &str) -> Option<f64> {
        match self.get::<f64>(&CacheKey::score(scope, a, b)).await {
            Ok(score) => Some(score),
            Err(CacheError::CacheMiss(_)) => None,
            Err(e) => {
                tracing::warn!("Score cache read failed: {}", e);
                None
            }
        }
    }

    pub async fn set_score(&self, scope: &str, a: &str, b: &str, score: f64) {
        if let Err(e) = self.set(&CacheKey::score(scope, a, b), &score).await {
            tracing::warn!("Score cache write failed: {}", e);
        }
    }

    /// Drop every cached score involving `user_id`, whatever its scope
    pub async fn invalidate_user_scores(&self, user_id: &str) -> Result<(), CacheError> {
        let owned = user_id.to_string();
        self.l1_cache
            .invalidate_entries_if(move |key, _| CacheKey::score_involves(key, &owned))
            .map_err(|e| CacheError::InvalidationError(e.to_string()))?;

        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            for pattern in CacheKey::user_score_patterns(user_id) {
                let keys: Vec<String> = redis::cmd("KEYS")
                    .arg(&pattern)
                    .query_async(&mut *conn)
                    .await?;

                if !keys.is_empty() {
                    let _: () = redis::cmd("DEL").arg(keys).query_async(&mut *conn).await?;
                }
            }
        }

        tracing::debug!("Invalidated cached scores for user {}", user_id);
        Ok(())
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            l1_size: self.l1_cache.entry_count(),
            l2_enabled: self.has_redis(),
        }
    }
}

fn build_l1(l1_size: u64, ttl_secs: u64) -> moka::future::Cache<String, Vec<u8>> {
    moka::future::CacheBuilder::new(l1_size)
        .time_to_live(Duration::from_secs(ttl_secs))
        .support_invalidation_closures()
        .build()
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub l1_size: u64,
    pub l2_enabled: bool,
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    const SCORE_PREFIX: &'static str = "score";

    /// Key for the compatibility score of a pair, independent of argument order
    pub fn score(scope: &str, a: &str, b: &str) -> String {
        let pair = PairKey::new(a, b);
        format!("{}|{}|{}|{}", Self::SCORE_PREFIX, scope, pair.low, pair.high)
    }

    pub fn score_involves(key: &str, user_id: &str) -> bool {
        let mut parts = key.splitn(4, '|');
        if parts.next() != Some(Self::SCORE_PREFIX) || parts.next().is_none() {
            return false;
        }
        parts.any(|part| part == user_id)
    }

    /// Redis glob patterns matching every score key of a user in any scope
    pub fn user_score_patterns(user_id: &str) -> [String; 2] {
        let user_id = escape_glob(user_id);
        [
            format!("{}|*|{}|*", Self::SCORE_PREFIX, user_id),
            format!("{}|*|*|{}", Self::SCORE_PREFIX, user_id),
        ]
    }
}

/// Escape Redis glob metacharacters so `value` only matches itself
fn escape_glob(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '^' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
