//! Order rows (spec.md §4.8). Orders use a generated integer identity;
//! the ingress dispatcher looks an order up by id before handing it to
//! the coordinator and writes back its post-match status.

use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::models::{Order, OrderStatus};

pub struct OrderStore<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderStore<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, order_id: i64) -> Result<Option<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(
            "SELECT id, user_id, symbol, side, order_type, price, quantity, \
             filled_quantity, status, created_at, updated_at \
             FROM orders WHERE id = $1",
        )
        .bind(order_id)
        .fetch_optional(self.pool)
        .await
    }

    /// Persist the post-match state of `order`, unconditionally: orders
    /// are not under optimistic-lock discipline themselves, only the
    /// book row they belong to is (spec.md §4.8).
    pub async fn save(&self, order: &Order) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE orders SET filled_quantity = $2, status = $3, updated_at = $4 \
             WHERE id = $1",
        )
        .bind(order.id)
        .bind(order.filled_quantity)
        .bind(order.status)
        .bind(order.updated_at)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    pub async fn transition(
        &self,
        order_id: i64,
        status: OrderStatus,
        filled_quantity: Decimal,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE orders SET status = $2, filled_quantity = $3, updated_at = now() \
             WHERE id = $1",
        )
        .bind(order_id)
        .bind(status)
        .bind(filled_quantity)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    pub async fn symbols(&self) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT DISTINCT symbol FROM orders")
                .fetch_all(self.pool)
                .await?;
        Ok(rows.into_iter().map(|(s,)| s).collect())
    }
}
