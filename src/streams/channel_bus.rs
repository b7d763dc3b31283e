//! In-memory `StreamBus` backend for tests, grounded on the teacher's
//! `tokio::sync::broadcast` fan-out pattern
//! (`main.rs`'s trade/orderbook subscriber loops). Every publish pushes
//! onto an unbounded channel the test can drain; nothing here ever
//! fails, since there is no network to fail against.

use tokio::sync::mpsc;

use super::messages::{NewOrderEvent, OrderStatusEvent, TradeEvent};
use super::PublishError;

pub struct ChannelStreamBus {
    pub status_tx: mpsc::UnboundedSender<OrderStatusEvent>,
    pub trade_tx: mpsc::UnboundedSender<TradeEvent>,
    pub order_input_dlq_tx: mpsc::UnboundedSender<NewOrderEvent>,
}

impl ChannelStreamBus {
    pub fn new() -> (
        Self,
        mpsc::UnboundedReceiver<OrderStatusEvent>,
        mpsc::UnboundedReceiver<TradeEvent>,
        mpsc::UnboundedReceiver<NewOrderEvent>,
    ) {
        let (status_tx, status_rx) = mpsc::unbounded_channel();
        let (trade_tx, trade_rx) = mpsc::unbounded_channel();
        let (dlq_tx, dlq_rx) = mpsc::unbounded_channel();
        (
            Self {
                status_tx,
                trade_tx,
                order_input_dlq_tx: dlq_tx,
            },
            status_rx,
            trade_rx,
            dlq_rx,
        )
    }

    pub async fn publish_order_status(&self, event: OrderStatusEvent) -> Result<(), PublishError> {
        self.status_tx
            .send(event)
            .map_err(|_| PublishError::Unavailable("status channel closed".to_string()))
    }

    pub async fn publish_trade(&self, event: TradeEvent) -> Result<(), PublishError> {
        self.trade_tx
            .send(event)
            .map_err(|_| PublishError::Unavailable("trade channel closed".to_string()))
    }

    pub async fn publish_order_input_dlq(&self, event: NewOrderEvent) -> Result<(), PublishError> {
        self.order_input_dlq_tx
            .send(event)
            .map_err(|_| PublishError::Unavailable("dlq channel closed".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderStatus;
    use chrono::Utc;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn published_status_events_are_observable() {
        let (bus, mut status_rx, _trade_rx, _dlq_rx) = ChannelStreamBus::new();
        bus.publish_order_status(OrderStatusEvent {
            order_id: 1,
            user_id: 1,
            symbol: "BTC-USD".to_string(),
            status: OrderStatus::Filled,
            filled_quantity: Decimal::ONE,
            remaining_quantity: Decimal::ZERO,
            timestamp: Utc::now(),
            reason: super::super::messages::StatusReason::Matched,
            error_message: None,
        })
        .await
        .unwrap();

        let received = status_rx.recv().await.unwrap();
        assert_eq!(received.order_id, 1);
    }
}
