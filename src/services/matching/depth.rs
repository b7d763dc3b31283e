//! Depth aggregation (spec.md §4.11): price/quantity/order-count levels
//! plus best bid/ask and spread, used by the collaborator-facing read
//! path (the matching core does not itself expose an API, see
//! `src/collab.rs`).

use rust_decimal::Decimal;
use serde::Serialize;

use super::book::OrderBook;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DepthLevel {
    pub price: Decimal,
    pub total_remaining_quantity: Decimal,
    pub order_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Depth {
    pub symbol: String,
    pub bids: Vec<DepthLevel>,
    pub asks: Vec<DepthLevel>,
    pub best_bid: Option<Decimal>,
    pub best_ask: Option<Decimal>,
    pub spread: Option<Decimal>,
}

/// Largest `limit` a caller may request (spec.md §6's `depth.limit.max`).
pub const MAX_DEPTH_LIMIT: usize = 100;

pub fn aggregate(book: &OrderBook, limit: usize) -> Depth {
    let limit = limit.clamp(1, MAX_DEPTH_LIMIT);
    let (bid_levels, ask_levels) = book.level_counts(limit);

    let best_bid = book.best_bid();
    let best_ask = book.best_ask();
    let spread = match (best_bid, best_ask) {
        (Some(bid), Some(ask)) => Some(ask - bid),
        _ => None,
    };

    Depth {
        symbol: book.symbol().to_string(),
        bids: bid_levels,
        asks: ask_levels,
        best_bid,
        best_ask,
        spread,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Order, OrderStatus, OrderType, Side};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn order(id: i64, side: Side, price: Decimal, qty: Decimal) -> Order {
        Order {
            id,
            user_id: 1,
            symbol: "BTC-USD".to_string(),
            side,
            order_type: OrderType::Limit,
            price: Some(price),
            quantity: qty,
            filled_quantity: Decimal::ZERO,
            status: OrderStatus::Open,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn aggregates_levels_and_computes_spread() {
        let mut book = OrderBook::new("BTC-USD");
        book.insert(order(1, Side::Buy, dec!(100), dec!(1)));
        book.insert(order(2, Side::Buy, dec!(100), dec!(2)));
        book.insert(order(3, Side::Sell, dec!(105), dec!(1)));

        let depth = aggregate(&book, 10);

        assert_eq!(depth.bids.len(), 1);
        assert_eq!(depth.bids[0].total_remaining_quantity, dec!(3));
        assert_eq!(depth.bids[0].order_count, 2);
        assert_eq!(depth.spread, Some(dec!(5)));
    }

    #[test]
    fn empty_book_has_no_spread() {
        let book = OrderBook::new("BTC-USD");
        let depth = aggregate(&book, 10);
        assert_eq!(depth.spread, None);
        assert!(depth.bids.is_empty());
    }

    #[test]
    fn limit_is_clamped_to_the_documented_max() {
        let book = OrderBook::new("BTC-USD");
        let depth = aggregate(&book, 1000);
        assert!(depth.bids.len() <= MAX_DEPTH_LIMIT);
    }
}
