//! Idempotency store (spec.md §4.7): two keyed sets ("sent", "processed")
//! backed by a fast KV store with TTL, generalizing the teacher's
//! `cache::user_cache` TTL-keyed operations
//! (`ttl::SESSION`/`ttl::NONCE`-style constants) to the `sent`/`processed`
//! idempotency keys of §6's cache key layout.

use std::sync::Arc;

use crate::cache::keys::CacheKey;
use crate::cache::redis_client::RedisClient;

/// TTL applied to sent/processed entries (spec.md §6, 86,400 s).
pub const IDEMPOTENCY_TTL_SECS: u64 = 86_400;

pub struct IdempotencyStore {
    redis: Arc<RedisClient>,
}

impl IdempotencyStore {
    pub fn new(redis: Arc<RedisClient>) -> Self {
        Self { redis }
    }

    /// Record `id` (message id) in the `processed` set, scoped to the
    /// order it was processed for. Used by the ingress dispatcher after
    /// a successful coordinator invocation (spec.md §4.5 step 4).
    pub async fn mark_processed(&self, message_id: &str, order_id: i64) -> Result<(), redis::RedisError> {
        self.redis
            .set_ex(&CacheKey::idempotency_processed(message_id), order_id, IDEMPOTENCY_TTL_SECS)
            .await
    }

    /// True if `message_id` has already been processed — the ingress
    /// dispatcher's step-1 duplicate check (spec.md §4.5 step 1).
    pub async fn is_processed(&self, message_id: &str) -> Result<bool, redis::RedisError> {
        self.redis.exists(&CacheKey::idempotency_processed(message_id)).await
    }

    /// Record `id` in the `sent` set. Populated by the upstream producer
    /// before its publish (spec.md §4.7); the matching core only reads
    /// this set, it never writes to it, but the operation is exposed
    /// here so test fakes for the producer side share the same store.
    pub async fn mark_sent(&self, message_id: &str) -> Result<(), redis::RedisError> {
        self.redis
            .set_ex(&CacheKey::idempotency_sent(message_id), true, IDEMPOTENCY_TTL_SECS)
            .await
    }

    pub async fn is_sent(&self, message_id: &str) -> Result<bool, redis::RedisError> {
        self.redis.exists(&CacheKey::idempotency_sent(message_id)).await
    }

    pub async fn remove_processed(&self, message_id: &str) -> Result<bool, redis::RedisError> {
        self.redis.del(&CacheKey::idempotency_processed(message_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_per_set() {
        assert_eq!(CacheKey::idempotency_sent("abc"), "idempotency:sent:abc");
        assert_eq!(CacheKey::idempotency_processed("abc"), "idempotency:processed:abc");
    }
}
