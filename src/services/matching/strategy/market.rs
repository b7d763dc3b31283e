//! MARKET matching (spec.md §4.3): the same traversal as LIMIT with no
//! price predicate, and the incoming order never rests.

use rust_decimal::Decimal;

use crate::models::{Order, OrderStatus};

use crate::services::matching::book::OrderBook;
use crate::services::matching::types::MatchResult;

use super::walk::walk_and_fill;
use super::MatchStrategy;

pub struct MarketStrategy;

impl MatchStrategy for MarketStrategy {
    fn match_order(&self, book: &mut OrderBook, incoming: Order) -> MatchResult {
        let mut result = walk_and_fill(book, incoming, |_top_price| true);

        // A MARKET order never rests. If nothing matched at all it is
        // rejected outright; otherwise an exhausted book just leaves it
        // partially filled.
        if result.trades.is_empty() {
            result.incoming.status = OrderStatus::Rejected;
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrderType, Side};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn market_order(id: i64, side: Side, qty: Decimal) -> Order {
        Order {
            id,
            user_id: 1,
            symbol: "BTC-USD".to_string(),
            side,
            order_type: OrderType::Market,
            price: None,
            quantity: qty,
            filled_quantity: Decimal::ZERO,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn limit_order(id: i64, side: Side, price: Decimal, qty: Decimal) -> Order {
        Order {
            id,
            user_id: 1,
            symbol: "BTC-USD".to_string(),
            side,
            order_type: OrderType::Limit,
            price: Some(price),
            quantity: qty,
            filled_quantity: Decimal::ZERO,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn rejects_when_opposite_side_is_empty() {
        let mut book = OrderBook::new("BTC-USD");
        let result = MarketStrategy.match_order(&mut book, market_order(1, Side::Sell, dec!(0.1)));

        assert!(result.trades.is_empty());
        assert_eq!(result.incoming.status, OrderStatus::Rejected);
    }

    #[test]
    fn partially_fills_then_stops_on_exhausted_liquidity() {
        let mut book = OrderBook::new("BTC-USD");
        book.insert(limit_order(1, Side::Sell, dec!(50000), dec!(0.5)));

        let result = MarketStrategy.match_order(&mut book, market_order(2, Side::Buy, dec!(1.0)));

        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].quantity, dec!(0.5));
        assert_eq!(result.incoming.status, OrderStatus::PartiallyFilled);
        assert!(book.best_ask().is_none());
    }

    #[test]
    fn never_rests_remaining_quantity() {
        let mut book = OrderBook::new("BTC-USD");
        book.insert(limit_order(1, Side::Sell, dec!(50000), dec!(0.1)));

        MarketStrategy.match_order(&mut book, market_order(2, Side::Buy, dec!(1.0)));

        assert_eq!(book.best_bid(), None);
    }

    #[test]
    fn ignores_price_and_crosses_at_any_level() {
        let mut book = OrderBook::new("BTC-USD");
        book.insert(limit_order(1, Side::Sell, dec!(999999), dec!(1)));

        let result = MarketStrategy.match_order(&mut book, market_order(2, Side::Buy, dec!(1)));

        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.incoming.status, OrderStatus::Filled);
    }
}
