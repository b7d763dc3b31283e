use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::order::Side;

/// An immutable trade record (spec.md §3).
///
/// The trade price always equals the resting (maker) order's price;
/// `buy_order_id` and `sell_order_id` refer to distinct orders on
/// opposite sides of the same symbol.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Trade {
    pub id: i64,
    pub buy_order_id: i64,
    pub sell_order_id: i64,
    pub symbol: String,
    pub price: Decimal,
    pub quantity: Decimal,
    pub created_at: DateTime<Utc>,
}

/// A trade produced by the matching strategies, not yet assigned a
/// persistent identity. `maker_order_id`/`taker_order_id` let the
/// coordinator tag egress events with maker/taker roles without
/// re-deriving them from `buy_order_id`/`sell_order_id` + `taker_side`.
#[derive(Debug, Clone)]
pub struct NewTrade {
    pub buy_order_id: i64,
    pub sell_order_id: i64,
    pub symbol: String,
    pub price: Decimal,
    pub quantity: Decimal,
    pub maker_order_id: i64,
    pub taker_order_id: i64,
    pub taker_side: Side,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn new_trade_carries_maker_taker_roles() {
        let t = NewTrade {
            buy_order_id: 2,
            sell_order_id: 1,
            symbol: "BTC-USD".to_string(),
            price: dec!(50000),
            quantity: dec!(1.0),
            maker_order_id: 1,
            taker_order_id: 2,
            taker_side: Side::Buy,
        };
        assert_eq!(t.maker_order_id, t.sell_order_id);
        assert_eq!(t.taker_order_id, t.buy_order_id);
    }
}
