//! Cache tier (spec.md §4.9): a thin facade over [`RedisClient`] exposing
//! the pieces the rest of the crate needs — the order-book mirror
//! ([`orderbook_cache::OrderbookCache`]) and its own availability check —
//! grounded on the teacher's `CacheManager`/`CacheConfig` pair referenced
//! from `main.rs` but absent from the retrieval pack.

pub mod keys;
pub mod orderbook_cache;
pub mod redis_client;
pub mod sync;

use std::sync::Arc;

pub use orderbook_cache::OrderbookCache;
pub use redis_client::{RedisClient, RedisConfig};

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub redis_url: String,
}

impl CacheConfig {
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
        }
    }
}

pub struct CacheManager {
    config: CacheConfig,
    redis: Arc<RedisClient>,
    pub orderbook: OrderbookCache,
}

impl CacheManager {
    pub async fn new(config: CacheConfig) -> Result<Self, redis::RedisError> {
        let redis = Arc::new(RedisClient::from_url(&config.redis_url).await?);
        let orderbook = OrderbookCache::new(redis.clone());
        Ok(Self { config, redis, orderbook })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn redis(&self) -> Arc<RedisClient> {
        self.redis.clone()
    }

    pub async fn is_available(&self) -> bool {
        self.redis.is_available().await
    }
}
