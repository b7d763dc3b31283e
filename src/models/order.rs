use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_side", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The opposite ladder a match walks for this side.
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Limit,
    Market,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Limit => write!(f, "limit"),
            OrderType::Market => write!(f, "market"),
        }
    }
}

/// Order lifecycle states (spec.md §3).
///
/// `Pending` is assigned at the external ingress boundary, before this
/// crate ever sees the order; it is included here because the ingress
/// dispatcher reads it back from the primary store to decide whether a
/// new-order event is still actionable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Open,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
    Failed,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Open => "open",
            OrderStatus::PartiallyFilled => "partially_filled",
            OrderStatus::Filled => "filled",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Rejected => "rejected",
            OrderStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected | OrderStatus::Failed
        )
    }

    pub fn is_resting(self) -> bool {
        matches!(self, OrderStatus::Open | OrderStatus::PartiallyFilled)
    }
}

/// An order as stored in the primary database (spec.md §3).
///
/// `id` is a generated integer identity assigned by the primary store,
/// not chosen by the caller — the new-order event references an order
/// that must already exist as PENDING (see SPEC_FULL.md §OPEN QUESTIONS b).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub price: Option<Decimal>,
    pub quantity: Decimal,
    pub filled_quantity: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn remaining(&self) -> Decimal {
        self.quantity - self.filled_quantity
    }

    pub fn is_limit(&self) -> bool {
        matches!(self.order_type, OrderType::Limit)
    }

    /// True once this order's invariants (spec.md §3) hold.
    pub fn invariants_hold(&self) -> bool {
        if self.remaining() < Decimal::ZERO {
            return false;
        }
        match self.status {
            OrderStatus::Filled => self.filled_quantity == self.quantity,
            OrderStatus::Open => self.filled_quantity == Decimal::ZERO,
            OrderStatus::PartiallyFilled => {
                self.filled_quantity > Decimal::ZERO && self.filled_quantity < self.quantity
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn base_order(status: OrderStatus, filled: Decimal, qty: Decimal) -> Order {
        Order {
            id: 1,
            user_id: 1,
            symbol: "BTC-USD".to_string(),
            side: Side::Buy,
            order_type: OrderType::Limit,
            price: Some(dec!(50000)),
            quantity: qty,
            filled_quantity: filled,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn remaining_is_quantity_minus_filled() {
        let o = base_order(OrderStatus::PartiallyFilled, dec!(0.3), dec!(1.0));
        assert_eq!(o.remaining(), dec!(0.7));
    }

    #[test]
    fn invariants_hold_for_consistent_states() {
        assert!(base_order(OrderStatus::Open, dec!(0), dec!(1.0)).invariants_hold());
        assert!(base_order(OrderStatus::Filled, dec!(1.0), dec!(1.0)).invariants_hold());
        assert!(base_order(OrderStatus::PartiallyFilled, dec!(0.5), dec!(1.0)).invariants_hold());
    }

    #[test]
    fn invariants_reject_inconsistent_states() {
        assert!(!base_order(OrderStatus::Open, dec!(0.1), dec!(1.0)).invariants_hold());
        assert!(!base_order(OrderStatus::Filled, dec!(0.9), dec!(1.0)).invariants_hold());
    }

    #[test]
    fn side_opposite_round_trips() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite(), Side::Buy);
    }
}
