//! Periodic cache sync scheduler (spec.md §4.9): ticks every 5 seconds
//! after a 10-second initial delay, pushing each registered symbol's
//! primary-store snapshot into the cache. Probes cache availability
//! each tick and skips the whole tick on failure, grounded on the
//! teacher's `tokio::time::interval`-driven background workers (e.g.
//! `services::matching::orchestrator::OrderFlowOrchestrator::start_persistence_worker`).

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashSet;
use tracing::{info, warn};

use crate::db::Database;

use super::CacheManager;

/// Defaults matching `AppConfig`'s `cache_sync_interval_secs` /
/// `cache_sync_initial_delay_secs` (spec.md §6), used by callers that
/// don't thread config through, e.g. tests.
pub const SYNC_INTERVAL: Duration = Duration::from_secs(5);
pub const SYNC_INITIAL_DELAY: Duration = Duration::from_secs(10);

pub struct CacheSyncScheduler {
    db: Database,
    cache: Arc<CacheManager>,
    registry: Arc<DashSet<String>>,
    interval: Duration,
    initial_delay: Duration,
}

impl CacheSyncScheduler {
    pub fn new(db: Database, cache: Arc<CacheManager>, registry: Arc<DashSet<String>>) -> Self {
        Self {
            db,
            cache,
            registry,
            interval: SYNC_INTERVAL,
            initial_delay: SYNC_INITIAL_DELAY,
        }
    }

    pub fn with_timing(mut self, interval: Duration, initial_delay: Duration) -> Self {
        self.interval = interval;
        self.initial_delay = initial_delay;
        self
    }

    /// Runs forever; intended to be `tokio::spawn`ed once at startup.
    pub async fn run(self) {
        tokio::time::sleep(self.initial_delay).await;
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    async fn tick(&self) {
        if !self.cache.is_available().await {
            warn!("cache unavailable, skipping sync tick");
            return;
        }

        for symbol in self.registry.iter().map(|s| s.clone()) {
            match self.db.books().find(&symbol).await {
                Ok(Some(snapshot)) => {
                    if let Err(e) = self.cache.orderbook.sync_book(&snapshot).await {
                        warn!(%symbol, error = %e, "scheduled cache sync failed");
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(%symbol, error = %e, "failed to load snapshot for cache sync"),
            }
        }
        info!(symbols = self.registry.len(), "cache sync tick complete");
    }
}
