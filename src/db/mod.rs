//! Primary persistence (spec.md §4.8): durable Orders, Trades, and
//! per-symbol OrderBook rows, grounded on the teacher's `TimescaleOps`
//! (`db/timescale.rs`) style of a thin `PgPool`-wrapping struct with raw
//! `sqlx::query*` calls and `Result<_, sqlx::Error>` returns.

pub mod books;
pub mod orders;
pub mod trades;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn orders(&self) -> orders::OrderStore<'_> {
        orders::OrderStore::new(&self.pool)
    }

    pub fn trades(&self) -> trades::TradeStore<'_> {
        trades::TradeStore::new(&self.pool)
    }

    pub fn books(&self) -> books::BookStore<'_> {
        books::BookStore::new(&self.pool)
    }
}
