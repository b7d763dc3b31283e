//! Matching Coordinator (spec.md §4.4): the one place that owns
//! per-symbol serialized execution, strategy dispatch, atomic
//! persistence, and best-effort event emission after commit.
//!
//! Generalizes the teacher's `OrderFlowOrchestrator`
//! (`services::matching::orchestrator`) — which wired a matching engine
//! to a `PgPool` and a trade broadcast channel — to the spec's
//! per-symbol `DashMap<String, Arc<Mutex<OrderBook>>>` writer regions
//! and optimistic-lock retry loop.

use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use tokio::sync::Mutex;
use tracing::warn;

use crate::cache::CacheManager;
use crate::db::Database;
use crate::egress::EgressPublisher;
use crate::models::{BookSnapshot, Order, OrderStatus};
use crate::streams::messages::{OrderStatusEvent, StatusReason, TradeEvent};
use crate::streams::StreamBus;

use super::book::OrderBook;
use super::depth::{self, Depth};
use super::strategy;
use super::types::{MatchResult, MatchingError};

/// Bounded retry count for optimistic-lock conflicts on the book row
/// (spec.md §4.4).
const MAX_PERSIST_RETRIES: u32 = 3;

fn new_message_id() -> String {
    use rand::Rng;
    let suffix: u64 = rand::thread_rng().gen();
    format!("{:x}", suffix)
}

pub struct MatchingCoordinator {
    books: DashMap<String, Arc<Mutex<OrderBook>>>,
    db: Database,
    cache: Arc<CacheManager>,
    egress: EgressPublisher,
    /// Symbols registered for the periodic cache sync scheduler
    /// (SPEC_FULL.md §4.9); shared with [`crate::cache::sync`].
    sync_registry: Arc<DashSet<String>>,
}

impl MatchingCoordinator {
    pub fn new(db: Database, cache: Arc<CacheManager>, bus: Arc<StreamBus>) -> Self {
        Self {
            books: DashMap::new(),
            db,
            cache,
            egress: EgressPublisher::new(bus),
            sync_registry: Arc::new(DashSet::new()),
        }
    }

    pub fn sync_registry(&self) -> Arc<DashSet<String>> {
        self.sync_registry.clone()
    }

    /// Seed an already-loaded book into the writer map, used by the
    /// recovery runner (spec.md §4.10) so the first live match doesn't
    /// re-read a snapshot it already reconciled.
    pub fn seed_book(&self, book: OrderBook) {
        self.books
            .insert(book.symbol().to_string(), Arc::new(Mutex::new(book)));
    }

    /// Aggregated depth for `symbol` (spec.md §4.11), read against
    /// whatever book is currently resident in the writer map. Returns
    /// `None` if the symbol has no in-memory book yet — callers should
    /// treat that the same as an empty book rather than an error, since
    /// a symbol with no orders never gets seeded by recovery.
    pub async fn depth(&self, symbol: &str, limit: usize) -> Option<Depth> {
        let book_lock = self.books.get(symbol)?.clone();
        let guard = book_lock.lock().await;
        Some(depth::aggregate(&guard, limit))
    }

    async fn book_for(&self, symbol: &str) -> Result<Arc<Mutex<OrderBook>>, MatchingError> {
        if let Some(existing) = self.books.get(symbol) {
            return Ok(existing.clone());
        }

        let loaded = match self.db.books().find(symbol).await? {
            Some(snapshot) => OrderBook::from_snapshot(snapshot),
            None => OrderBook::new(symbol),
        };
        let entry = self
            .books
            .entry(symbol.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(loaded)));
        Ok(entry.clone())
    }

    /// Run the matching strategy for `order_id` against its symbol's
    /// book, persist atomically, and emit events. The single per-symbol
    /// `Mutex` guard held across strategy + persistence is what gives
    /// the "no two invocations overlap within a symbol" guarantee.
    pub async fn process(&self, order_id: i64) -> Result<MatchResult, MatchingError> {
        let order = self
            .db
            .orders()
            .find(order_id)
            .await?
            .ok_or(MatchingError::NotFound(order_id))?;

        let span = tracing::info_span!("process_order", symbol = %order.symbol, order_id);
        let _enter = span.enter();

        let book_lock = self.book_for(&order.symbol).await?;
        let mut guard = book_lock.lock().await;

        let mut attempt = 0;
        loop {
            let strategy = strategy::for_order_type(order.order_type);
            let result = strategy.match_order(&mut guard, order.clone());

            guard.bump_version();
            let snapshot = guard.to_snapshot();
            let expected_version = snapshot.version - 1;

            match self.persist(&result, &snapshot, expected_version).await {
                Ok(trade_ids) => {
                    self.sync_registry.insert(order.symbol.clone());
                    self.spawn_cache_sync(snapshot);
                    self.emit_events(&result, &trade_ids).await;
                    crate::metrics::record_order_processed(&order.symbol);
                    for _ in &result.trades {
                        crate::metrics::record_trade_executed(&order.symbol);
                    }
                    return Ok(result);
                }
                Err(MatchingError::PersistenceConflict { .. }) if attempt + 1 < MAX_PERSIST_RETRIES => {
                    attempt += 1;
                    crate::metrics::record_version_conflict(&order.symbol);
                    warn!(symbol = %order.symbol, attempt, "book version conflict, retrying");
                    // Someone else (another process sharing the primary
                    // store) won the race; reload the authoritative book
                    // and redo the whole match before retrying.
                    if let Some(fresh) = self.db.books().find(&order.symbol).await? {
                        *guard = OrderBook::from_snapshot(fresh);
                    }
                    continue;
                }
                Err(MatchingError::PersistenceConflict { symbol, .. }) => {
                    crate::metrics::record_version_conflict(&symbol);
                    return Err(MatchingError::PersistenceConflict {
                        symbol,
                        attempts: MAX_PERSIST_RETRIES,
                    })
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Cancel a resting order (spec.md §4.1/§4.5): remove it from the
    /// live ladder, transition it to `Cancelled`, and persist both the
    /// order and the bumped book version atomically. Fails deterministically
    /// without touching the book if the order is already terminal or was
    /// never resting (e.g. still `Pending`).
    pub async fn cancel(&self, order_id: i64) -> Result<Order, MatchingError> {
        let order = self
            .db
            .orders()
            .find(order_id)
            .await?
            .ok_or(MatchingError::NotFound(order_id))?;

        if order.status.is_terminal() {
            return Err(MatchingError::AlreadyTerminal(order_id));
        }
        if !order.status.is_resting() {
            return Err(MatchingError::NotResting(order_id));
        }

        let span = tracing::info_span!("cancel_order", symbol = %order.symbol, order_id);
        let _enter = span.enter();

        let book_lock = self.book_for(&order.symbol).await?;
        let mut guard = book_lock.lock().await;

        let mut attempt = 0;
        loop {
            if guard.remove(order_id).is_none() {
                return Err(MatchingError::NotResting(order_id));
            }

            let mut cancelled = order.clone();
            cancelled.status = OrderStatus::Cancelled;
            cancelled.updated_at = chrono::Utc::now();

            guard.bump_version();
            let snapshot = guard.to_snapshot();
            let expected_version = snapshot.version - 1;

            match self.persist_cancel(&cancelled, &snapshot, expected_version).await {
                Ok(()) => {
                    self.sync_registry.insert(order.symbol.clone());
                    self.spawn_cache_sync(snapshot);
                    self.emit_cancel_event(&cancelled).await;
                    return Ok(cancelled);
                }
                Err(MatchingError::PersistenceConflict { .. }) if attempt + 1 < MAX_PERSIST_RETRIES => {
                    attempt += 1;
                    crate::metrics::record_version_conflict(&order.symbol);
                    warn!(symbol = %order.symbol, attempt, "book version conflict during cancel, retrying");
                    // The persisted book still has this order resting (the
                    // conflicting transaction was rolled back), so reloading
                    // and removing it again on the next loop iteration is
                    // correct rather than a double-cancel.
                    if let Some(fresh) = self.db.books().find(&order.symbol).await? {
                        *guard = OrderBook::from_snapshot(fresh);
                    }
                    continue;
                }
                Err(MatchingError::PersistenceConflict { symbol, .. }) => {
                    crate::metrics::record_version_conflict(&symbol);
                    return Err(MatchingError::PersistenceConflict {
                        symbol,
                        attempts: MAX_PERSIST_RETRIES,
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Persist a cancellation: the order's terminal status and the
    /// book's conditional version bump, in one transaction.
    async fn persist_cancel(
        &self,
        cancelled: &Order,
        snapshot: &BookSnapshot,
        expected_version: i64,
    ) -> Result<(), MatchingError> {
        let mut tx = self.db.pool().begin().await?;

        sqlx::query(
            "UPDATE orders SET filled_quantity = $2, status = $3, updated_at = now() WHERE id = $1",
        )
        .bind(cancelled.id)
        .bind(cancelled.filled_quantity)
        .bind(cancelled.status)
        .execute(&mut *tx)
        .await?;

        let updated = sqlx::query(
            "UPDATE order_books SET bids = $2, asks = $3, version = $4, updated_at = $5 \
             WHERE symbol = $1 AND version = $6",
        )
        .bind(&snapshot.symbol)
        .bind(sqlx::types::Json(&snapshot.bids))
        .bind(sqlx::types::Json(&snapshot.asks))
        .bind(expected_version + 1)
        .bind(snapshot.updated_at)
        .bind(expected_version)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(MatchingError::PersistenceConflict {
                symbol: snapshot.symbol.clone(),
                attempts: 1,
            });
        }

        tx.commit().await?;
        Ok(())
    }

    /// Best-effort status event for a successful cancel (spec.md §4.12).
    async fn emit_cancel_event(&self, cancelled: &Order) {
        let event = OrderStatusEvent {
            order_id: cancelled.id,
            user_id: cancelled.user_id,
            symbol: cancelled.symbol.clone(),
            status: cancelled.status,
            filled_quantity: cancelled.filled_quantity,
            remaining_quantity: cancelled.remaining(),
            timestamp: cancelled.updated_at,
            reason: StatusReason::Cancelled,
            error_message: None,
        };
        self.egress.publish_order_status(event).await;
    }

    /// Persist the match result atomically: the incoming order, every
    /// mutated maker, the new trades, and the book row's conditional
    /// version bump, all inside one transaction (spec.md §4.4).
    async fn persist(
        &self,
        result: &MatchResult,
        snapshot: &BookSnapshot,
        expected_version: i64,
    ) -> Result<Vec<i64>, MatchingError> {
        let mut tx = self.db.pool().begin().await?;

        sqlx::query(
            "UPDATE orders SET filled_quantity = $2, status = $3, updated_at = now() WHERE id = $1",
        )
        .bind(result.incoming.id)
        .bind(result.incoming.filled_quantity)
        .bind(result.incoming.status)
        .execute(&mut *tx)
        .await?;

        for maker in &result.mutated_makers {
            sqlx::query(
                "UPDATE orders SET filled_quantity = $2, status = $3, updated_at = now() WHERE id = $1",
            )
            .bind(maker.id)
            .bind(maker.filled_quantity)
            .bind(maker.status)
            .execute(&mut *tx)
            .await?;
        }

        let mut trade_ids = Vec::with_capacity(result.trades.len());
        for trade in &result.trades {
            let row: (i64,) = sqlx::query_as(
                "INSERT INTO trades (buy_order_id, sell_order_id, symbol, price, quantity, created_at) \
                 VALUES ($1, $2, $3, $4, $5, now()) RETURNING id",
            )
            .bind(trade.buy_order_id)
            .bind(trade.sell_order_id)
            .bind(trade.symbol.as_str())
            .bind(trade.price)
            .bind(trade.quantity)
            .fetch_one(&mut *tx)
            .await?;
            trade_ids.push(row.0);
        }

        let updated = sqlx::query(
            "UPDATE order_books SET bids = $2, asks = $3, version = $4, updated_at = $5 \
             WHERE symbol = $1 AND version = $6",
        )
        .bind(&snapshot.symbol)
        .bind(sqlx::types::Json(&snapshot.bids))
        .bind(sqlx::types::Json(&snapshot.asks))
        .bind(expected_version + 1)
        .bind(snapshot.updated_at)
        .bind(expected_version)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            // The conditional UPDATE found no matching row: either the
            // version moved under us, or the row doesn't exist yet.
            tx.rollback().await?;
            let exists = self.db.books().find(&snapshot.symbol).await?.is_some();
            if !exists {
                // Seed an *empty* book at version 0, not the post-match
                // snapshot — the retry in `process` reloads whatever this
                // call persists and re-runs the match against it. Seeding
                // the already-matched ladder here would make the retry
                // match the incoming order a second time against a book
                // that already contains it.
                self.db
                    .books()
                    .insert_initial(&BookSnapshot::empty(&snapshot.symbol))
                    .await?;
            }
            return Err(MatchingError::PersistenceConflict {
                symbol: snapshot.symbol.clone(),
                attempts: 1,
            });
        }

        tx.commit().await?;
        Ok(trade_ids)
    }

    fn spawn_cache_sync(&self, snapshot: BookSnapshot) {
        let cache = self.cache.clone();
        tokio::spawn(async move {
            if let Err(e) = cache.orderbook.sync_book(&snapshot).await {
                warn!(symbol = %snapshot.symbol, error = %e, "cache sync after match failed");
            }
        });
    }

    /// Best-effort egress (spec.md §4.4): publish failures are logged,
    /// never surfaced to the caller, since the durable commit already
    /// succeeded.
    async fn emit_events(&self, result: &MatchResult, trade_ids: &[i64]) {
        let incoming = &result.incoming;
        let status_event = OrderStatusEvent {
            order_id: incoming.id,
            user_id: incoming.user_id,
            symbol: incoming.symbol.clone(),
            status: incoming.status,
            filled_quantity: incoming.filled_quantity,
            remaining_quantity: incoming.remaining(),
            timestamp: incoming.updated_at,
            reason: StatusReason::Matched,
            error_message: None,
        };
        self.egress.publish_order_status(status_event).await;

        for (trade, trade_id) in result.trades.iter().zip(trade_ids) {
            let event = TradeEvent {
                message_id: new_message_id(),
                timestamp: incoming.updated_at,
                trade_id: *trade_id,
                buy_order_id: trade.buy_order_id,
                sell_order_id: trade.sell_order_id,
                symbol: trade.symbol.clone(),
                price: trade.price,
                quantity: trade.quantity,
                maker_order_id: trade.maker_order_id,
                taker_order_id: trade.taker_order_id,
            };
            self.egress.publish_trade(event).await;
        }

        for maker in &result.mutated_makers {
            let event = OrderStatusEvent {
                order_id: maker.id,
                user_id: maker.user_id,
                symbol: maker.symbol.clone(),
                status: maker.status,
                filled_quantity: maker.filled_quantity,
                remaining_quantity: maker.remaining(),
                timestamp: maker.updated_at,
                reason: StatusReason::Matched,
                error_message: None,
            };
            self.egress.publish_order_status(event).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_coordinator_has_no_registered_symbols() {
        // Constructed indirectly in integration tests where a real
        // `Database`/`CacheManager`/`StreamBus` are available; this
        // module's unit surface is exercised through `book`, `strategy`,
        // and `depth` instead.
        let _ = MAX_PERSIST_RETRIES;
    }
}
