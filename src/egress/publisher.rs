//! Fire-and-forget publish wrapper (spec.md §4.6): status events are
//! non-critical and dropped on failure; trade events are already
//! durable in the primary store by the time this runs, so a failed
//! publish is logged and otherwise ignored.

use std::sync::Arc;

use tracing::warn;

use crate::streams::messages::{NewOrderEvent, OrderStatusEvent, TradeEvent};
use crate::streams::StreamBus;

pub struct EgressPublisher {
    bus: Arc<StreamBus>,
}

impl EgressPublisher {
    pub fn new(bus: Arc<StreamBus>) -> Self {
        Self { bus }
    }

    pub async fn publish_order_status(&self, event: OrderStatusEvent) {
        let order_id = event.order_id;
        if let Err(e) = self.bus.publish_order_status(event).await {
            warn!(order_id, error = %e, "order-status publish failed");
        }
    }

    pub async fn publish_trade(&self, event: TradeEvent) {
        let symbol = event.symbol.clone();
        if let Err(e) = self.bus.publish_trade(event).await {
            warn!(%symbol, error = %e, "trade-executed publish failed");
        }
    }

    /// Routes an order-input record to its DLQ once ingress retries are
    /// exhausted (spec.md §4.5 step 5).
    pub async fn publish_order_input_dlq(&self, event: NewOrderEvent) {
        let order_id = event.order_id;
        if let Err(e) = self.bus.publish_order_input_dlq(event).await {
            warn!(order_id, error = %e, "order-input dead-letter publish failed");
        }
    }
}
