//! Ingress Dispatcher (spec.md §4.5): idempotency check, order
//! resolution, coordinator invocation, and retry-then-dead-letter on
//! failure. One instance is shared across the consumer group; each
//! call to [`IngressDispatcher::handle`] corresponds to one delivered
//! record and runs its own bounded retry loop before giving up.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::db::Database;
use crate::egress::EgressPublisher;
use crate::idempotency::IdempotencyStore;
use crate::models::OrderStatus;
use crate::services::matching::MatchingCoordinator;
use crate::streams::messages::NewOrderEvent;

const RETRY_BACKOFF_MS: [u64; 3] = [100, 200, 400];

/// What the caller should do with the delivered record's offset.
#[derive(Debug, PartialEq, Eq)]
pub enum Disposition {
    Ack,
    DeadLettered,
}

pub struct IngressDispatcher {
    db: Database,
    idempotency: IdempotencyStore,
    coordinator: Arc<MatchingCoordinator>,
    egress: EgressPublisher,
}

impl IngressDispatcher {
    pub fn new(
        db: Database,
        idempotency: IdempotencyStore,
        coordinator: Arc<MatchingCoordinator>,
        egress: EgressPublisher,
    ) -> Self {
        Self { db, idempotency, coordinator, egress }
    }

    pub async fn handle(&self, event: NewOrderEvent) -> Disposition {
        match self.idempotency.is_processed(&event.message_id).await {
            Ok(true) => return Disposition::Ack,
            Ok(false) => {}
            Err(e) => warn!(message_id = %event.message_id, error = %e, "idempotency check failed"),
        }

        let order = match self.db.orders().find(event.order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => {
                info!(order_id = event.order_id, "new-order event references unknown order, acking");
                return Disposition::Ack;
            }
            Err(e) => {
                warn!(order_id = event.order_id, error = %e, "failed to resolve order, retrying record");
                return self.retry_then_dead_letter(event).await;
            }
        };

        if order.status != OrderStatus::Pending {
            return Disposition::Ack;
        }

        match self.coordinator.process(event.order_id).await {
            Ok(_) => {
                if let Err(e) = self.idempotency.mark_processed(&event.message_id, event.order_id).await {
                    warn!(message_id = %event.message_id, error = %e, "failed to record processed marker");
                }
                Disposition::Ack
            }
            Err(e) => {
                warn!(order_id = event.order_id, error = %e, "matching failed, retrying record");
                self.retry_then_dead_letter(event).await
            }
        }
    }

    async fn retry_then_dead_letter(&self, event: NewOrderEvent) -> Disposition {
        for delay_ms in RETRY_BACKOFF_MS {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            match self.coordinator.process(event.order_id).await {
                Ok(_) => {
                    if let Err(e) = self.idempotency.mark_processed(&event.message_id, event.order_id).await {
                        warn!(message_id = %event.message_id, error = %e, "failed to record processed marker");
                    }
                    return Disposition::Ack;
                }
                Err(e) => warn!(order_id = event.order_id, error = %e, "retry attempt failed"),
            }
        }

        warn!(order_id = event.order_id, "retries exhausted, dead-lettering record");
        crate::metrics::record_dlq_message("orders.input.dlq");
        self.egress.publish_order_input_dlq(event).await;
        Disposition::DeadLettered
    }
}
