//! Typed application configuration (SPEC_FULL.md §9), loaded from
//! environment variables (+ an optional `.env` file) via the `config`
//! crate and validated with `validator`, the same pair the teacher's
//! `AppConfig::load()`/`from_env()` call sites in `main.rs` assume.

use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AppConfig {
    pub environment: String,

    pub database_url: String,
    pub redis_url: String,
    pub nats_url: String,

    /// ingress.concurrency — worker threads consuming `order-input`.
    #[validate(range(min = 1))]
    pub ingress_concurrency: usize,
    /// ingress.retry.backoff — inter-attempt delay schedule, in ms.
    pub ingress_retry_backoff_ms: Vec<u64>,
    /// ingress.retry.max — attempts before DLQ.
    #[validate(range(min = 1))]
    pub ingress_retry_max: u32,

    /// cache.sync.interval, seconds.
    pub cache_sync_interval_secs: u64,
    /// cache.sync.initial_delay, seconds.
    pub cache_sync_initial_delay_secs: u64,

    /// idempotency.ttl, seconds.
    pub idempotency_ttl_secs: u64,

    /// persistence.version.retry.max — bounded restarts of the
    /// match-then-persist cycle on a book version conflict.
    #[validate(range(min = 1, max = 10))]
    pub persistence_version_retry_max: u32,

    /// depth.limit.max — upper bound on requested depth levels.
    #[validate(range(min = 1, max = 100))]
    pub depth_limit_max: usize,
}

impl AppConfig {
    /// Loads configuration from the process environment, falling back
    /// to `.env` if present, then validates every bounded field.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let cfg = config::Config::builder()
            .set_default("environment", "development")?
            .set_default("ingress_concurrency", 4)?
            .set_default("ingress_retry_backoff_ms", vec![100, 200, 400])?
            .set_default("ingress_retry_max", 3)?
            .set_default("cache_sync_interval_secs", 5)?
            .set_default("cache_sync_initial_delay_secs", 10)?
            .set_default("idempotency_ttl_secs", 86_400)?
            .set_default("persistence_version_retry_max", 3)?
            .set_default("depth_limit_max", 100)?
            .add_source(
                config::Environment::default()
                    .try_parsing(true)
                    .list_separator(","),
            )
            .build()?;

        let app_config: AppConfig = cfg.try_deserialize()?;
        app_config.validate()?;
        Ok(app_config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_satisfy_validation() {
        let config = AppConfig {
            environment: "test".to_string(),
            database_url: "postgres://localhost/test".to_string(),
            redis_url: "redis://localhost".to_string(),
            nats_url: "nats://localhost".to_string(),
            ingress_concurrency: 4,
            ingress_retry_backoff_ms: vec![100, 200, 400],
            ingress_retry_max: 3,
            cache_sync_interval_secs: 5,
            cache_sync_initial_delay_secs: 10,
            idempotency_ttl_secs: 86_400,
            persistence_version_retry_max: 3,
            depth_limit_max: 100,
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn depth_limit_above_cap_fails_validation() {
        let mut config = AppConfig {
            environment: "test".to_string(),
            database_url: "postgres://localhost/test".to_string(),
            redis_url: "redis://localhost".to_string(),
            nats_url: "nats://localhost".to_string(),
            ingress_concurrency: 4,
            ingress_retry_backoff_ms: vec![100, 200, 400],
            ingress_retry_max: 3,
            cache_sync_interval_secs: 5,
            cache_sync_initial_delay_secs: 10,
            idempotency_ttl_secs: 86_400,
            persistence_version_retry_max: 3,
            depth_limit_max: 100,
        };
        config.depth_limit_max = 101;
        assert!(config.validate().is_err());
    }
}
