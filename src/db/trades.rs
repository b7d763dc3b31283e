//! Trade rows (spec.md §4.8). Trades are append-only: once persisted they
//! are never mutated, matching the "immutable trade record" invariant.

use sqlx::PgPool;

use crate::models::{NewTrade, Trade};

pub struct TradeStore<'a> {
    pool: &'a PgPool,
}

impl<'a> TradeStore<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, trade: &NewTrade) -> Result<Trade, sqlx::Error> {
        sqlx::query_as::<_, Trade>(
            "INSERT INTO trades (buy_order_id, sell_order_id, symbol, price, quantity, created_at) \
             VALUES ($1, $2, $3, $4, $5, now()) \
             RETURNING id, buy_order_id, sell_order_id, symbol, price, quantity, created_at",
        )
        .bind(trade.buy_order_id)
        .bind(trade.sell_order_id)
        .bind(trade.symbol.as_str())
        .bind(trade.price)
        .bind(trade.quantity)
        .fetch_one(self.pool)
        .await
    }

    pub async fn insert_all(&self, trades: &[NewTrade]) -> Result<Vec<Trade>, sqlx::Error> {
        let mut persisted = Vec::with_capacity(trades.len());
        for trade in trades {
            persisted.push(self.insert(trade).await?);
        }
        Ok(persisted)
    }
}
