//! Event payloads (spec.md §6), carried over `StreamBus` subjects.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{OrderStatus, OrderType, Side};

/// `order-input` record (keyed by `symbol`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderEvent {
    pub message_id: String,
    pub correlation_id: String,
    pub timestamp: DateTime<Utc>,
    pub order_id: i64,
    pub user_id: i64,
    pub symbol: String,
    pub side: Side,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub price: Option<Decimal>,
    pub quantity: Decimal,
}

/// `order-status-update` record (keyed by `user_id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusEvent {
    pub order_id: i64,
    pub user_id: i64,
    pub symbol: String,
    pub status: OrderStatus,
    pub filled_quantity: Decimal,
    pub remaining_quantity: Decimal,
    pub timestamp: DateTime<Utc>,
    pub reason: StatusReason,
    pub error_message: Option<String>,
}

/// Why a status event was emitted — not part of the wire schema's field
/// set by name, but the `reason` field's value space (spec.md §4.4,
/// §4.12).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusReason {
    Matched,
    Cancelled,
    ProcessingError,
}

/// `trade-output` record (keyed by `symbol`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeEvent {
    pub message_id: String,
    pub timestamp: DateTime<Utc>,
    pub trade_id: i64,
    pub buy_order_id: i64,
    pub sell_order_id: i64,
    pub symbol: String,
    pub price: Decimal,
    pub quantity: Decimal,
    pub taker_order_id: i64,
    pub maker_order_id: i64,
}
