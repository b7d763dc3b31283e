//! OrderBook snapshot rows (spec.md §4.8): one row per symbol holding
//! `bids`/`asks` as JSONB documents plus a `version` counter. Updates are
//! conditional on `version = :expected`; a zero-row result means another
//! writer won the race and the caller must retry (spec.md §4.4).

use chrono::Utc;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::BookSnapshot;

pub struct BookStore<'a> {
    pool: &'a PgPool,
}

#[derive(sqlx::FromRow)]
struct BookRow {
    symbol: String,
    bids: Json<Vec<crate::models::Order>>,
    asks: Json<Vec<crate::models::Order>>,
    version: i64,
    updated_at: chrono::DateTime<Utc>,
}

impl From<BookRow> for BookSnapshot {
    fn from(row: BookRow) -> Self {
        BookSnapshot {
            symbol: row.symbol,
            bids: row.bids.0,
            asks: row.asks.0,
            version: row.version,
            updated_at: row.updated_at,
        }
    }
}

impl<'a> BookStore<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, symbol: &str) -> Result<Option<BookSnapshot>, sqlx::Error> {
        let row = sqlx::query_as::<_, BookRow>(
            "SELECT symbol, bids, asks, version, updated_at FROM order_books WHERE symbol = $1",
        )
        .bind(symbol)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(BookSnapshot::from))
    }

    pub async fn symbols(&self) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT symbol FROM order_books")
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(|(s,)| s).collect())
    }

    /// First-write path: inserts a row for a symbol seen for the first
    /// time (spec.md §4.4 "register the symbol... on first match").
    pub async fn insert_initial(&self, snapshot: &BookSnapshot) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO order_books (symbol, bids, asks, version, updated_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (symbol) DO NOTHING",
        )
        .bind(&snapshot.symbol)
        .bind(Json(&snapshot.bids))
        .bind(Json(&snapshot.asks))
        .bind(snapshot.version)
        .bind(snapshot.updated_at)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Conditional update (spec.md §4.8): returns `true` on success, `false`
    /// if `expected_version` no longer matches the stored row (a conflict
    /// the caller retries, up to the bounded limit in
    /// [`crate::services::matching::coordinator`]).
    pub async fn update_conditional(
        &self,
        snapshot: &BookSnapshot,
        expected_version: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE order_books SET bids = $2, asks = $3, version = $4, updated_at = $5 \
             WHERE symbol = $1 AND version = $6",
        )
        .bind(&snapshot.symbol)
        .bind(Json(&snapshot.bids))
        .bind(Json(&snapshot.asks))
        .bind(expected_version + 1)
        .bind(snapshot.updated_at)
        .bind(expected_version)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn book_snapshot_round_trips_through_row() {
        let snapshot = BookSnapshot::empty("BTC-USD");
        let row = BookRow {
            symbol: snapshot.symbol.clone(),
            bids: Json(snapshot.bids.clone()),
            asks: Json(snapshot.asks.clone()),
            version: snapshot.version,
            updated_at: snapshot.updated_at,
        };
        let back: BookSnapshot = row.into();
        assert_eq!(back.symbol, "BTC-USD");
        assert_eq!(back.version, 0);
    }
}
