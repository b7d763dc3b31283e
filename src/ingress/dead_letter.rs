//! Dead Letter Handler (spec.md §4.12): consumes the order-input DLQ,
//! transitions the still-PENDING target Order to FAILED, and publishes
//! a FAILED status event. Always acknowledges — DLQ records must not
//! re-loop. The trade-output DLQ has no handler: it is drained without
//! action, since trades are already durable at publish time.

use tracing::{info, warn};

use crate::db::Database;
use crate::egress::EgressPublisher;
use crate::models::OrderStatus;
use crate::streams::messages::{NewOrderEvent, OrderStatusEvent, StatusReason, TradeEvent};

pub struct DeadLetterHandler {
    db: Database,
    egress: EgressPublisher,
}

impl DeadLetterHandler {
    pub fn new(db: Database, egress: EgressPublisher) -> Self {
        Self { db, egress }
    }

    /// Processes one order-input-dlq record. Always returns — callers
    /// ack unconditionally after calling this, per spec.
    pub async fn handle(&self, event: NewOrderEvent) {
        let order = match self.db.orders().find(event.order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => {
                info!(order_id = event.order_id, "dead-lettered event references unknown order");
                return;
            }
            Err(e) => {
                warn!(order_id = event.order_id, error = %e, "failed to resolve order for dead letter");
                return;
            }
        };

        if order.status != OrderStatus::Pending {
            return;
        }

        if let Err(e) = self
            .db
            .orders()
            .transition(order.id, OrderStatus::Failed, order.filled_quantity)
            .await
        {
            warn!(order_id = order.id, error = %e, "failed to mark order FAILED");
            return;
        }

        self.egress
            .publish_order_status(OrderStatusEvent {
                order_id: order.id,
                user_id: order.user_id,
                symbol: order.symbol.clone(),
                status: OrderStatus::Failed,
                filled_quantity: order.filled_quantity,
                remaining_quantity: order.quantity - order.filled_quantity,
                timestamp: chrono::Utc::now(),
                reason: StatusReason::ProcessingError,
                error_message: Some("order-input processing exhausted retries".to_string()),
            })
            .await;
    }

    /// Drains a trade-output-dlq record without action (spec.md §4.12):
    /// the trade is already durable, so the record is simply acknowledged.
    pub fn drain_trade_dlq(&self, _event: TradeEvent) {}
}
