//! Recovery Runner (spec.md §4.10): executed once on boot, before
//! ingress is enabled, reconciling every symbol present in the primary
//! store against its cache mirror by `version`/`updated_at`.

use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::CacheManager;
use crate::db::Database;
use crate::models::BookSnapshot;
use crate::services::matching::MatchingCoordinator;

pub struct RecoveryRunner {
    db: Database,
    cache: Arc<CacheManager>,
}

impl RecoveryRunner {
    pub fn new(db: Database, cache: Arc<CacheManager>) -> Self {
        Self { db, cache }
    }

    /// Reconciles every known symbol and seeds `coordinator` with the
    /// winning snapshot, registering each for periodic cache sync.
    pub async fn run(&self, coordinator: &MatchingCoordinator) -> Result<(), sqlx::Error> {
        let symbols = self.db.books().symbols().await?;
        info!(count = symbols.len(), "starting recovery reconciliation");

        for symbol in symbols {
            if let Err(e) = self.reconcile_symbol(&symbol, coordinator).await {
                warn!(%symbol, error = %e, "recovery reconciliation failed for symbol");
            }
        }

        Ok(())
    }

    async fn reconcile_symbol(
        &self,
        symbol: &str,
        coordinator: &MatchingCoordinator,
    ) -> Result<(), sqlx::Error> {
        let primary = self.db.books().find(symbol).await?;

        // Step 1: if the cache is unreachable, skip and fall back to
        // primary — the live book is simply seeded from the primary copy.
        if !self.cache.is_available().await {
            if let Some(snapshot) = primary {
                coordinator.seed_book(crate::services::matching::book::OrderBook::from_snapshot(snapshot));
                coordinator.sync_registry().insert(symbol.to_string());
            }
            return Ok(());
        }

        let cached = self.cache.orderbook.load_book(symbol).await.unwrap_or(None);

        let winner = match (primary, cached) {
            (Some(p), Some(c)) => Some(newer(p, c)),
            (Some(p), None) => Some(p),
            (None, Some(c)) => Some(c),
            (None, None) => None,
        };

        let Some(winner) = winner else { return Ok(()) };

        match self.reconcile_direction(symbol, &winner).await {
            Ok(()) => {
                coordinator.seed_book(crate::services::matching::book::OrderBook::from_snapshot(winner));
                coordinator.sync_registry().insert(symbol.to_string());
            }
            Err(e) => warn!(%symbol, error = %e, "failed to write back recovery winner"),
        }

        Ok(())
    }

    /// Pushes the winning snapshot to whichever side didn't already have
    /// it (spec.md §4.10 step 3).
    async fn reconcile_direction(&self, symbol: &str, winner: &BookSnapshot) -> Result<(), sqlx::Error> {
        let primary = self.db.books().find(symbol).await?;
        let primary_version = primary.as_ref().map(|p| p.version);

        if primary_version == Some(winner.version) {
            // Primary already holds the winner; push it to cache.
            if let Err(e) = self.cache.orderbook.sync_book(winner).await {
                warn!(%symbol, error = %e, "recovery cache push failed");
            }
            return Ok(());
        }

        // Cache held the winner: write it back to primary under the
        // existing row's identity and current version, then let the
        // normal conditional update bump it by one.
        match primary {
            Some(existing) => {
                self.db
                    .books()
                    .update_conditional(winner, existing.version)
                    .await?;
            }
            None => {
                self.db.books().insert_initial(winner).await?;
            }
        }
        Ok(())
    }
}

fn newer(primary: BookSnapshot, cached: BookSnapshot) -> BookSnapshot {
    if primary.version != cached.version {
        if primary.version > cached.version {
            primary
        } else {
            cached
        }
    } else if primary.updated_at >= cached.updated_at {
        primary
    } else {
        cached
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn snapshot(version: i64, updated_at: chrono::DateTime<Utc>) -> BookSnapshot {
        BookSnapshot {
            symbol: "BTC-USD".to_string(),
            bids: Vec::new(),
            asks: Vec::new(),
            version,
            updated_at,
        }
    }

    #[test]
    fn newer_prefers_higher_version() {
        let now = Utc::now();
        let primary = snapshot(2, now - Duration::seconds(10));
        let cached = snapshot(3, now);
        assert_eq!(newer(primary, cached).version, 3);
    }

    #[test]
    fn newer_breaks_ties_by_updated_at() {
        let now = Utc::now();
        let primary = snapshot(1, now - Duration::seconds(10));
        let cached = snapshot(1, now);
        assert_eq!(newer(primary, cached).updated_at, now);
    }
}
