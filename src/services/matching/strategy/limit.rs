//! LIMIT matching (spec.md §4.2).

use crate::models::Order;

use crate::services::matching::book::OrderBook;
use crate::services::matching::types::MatchResult;

use super::walk::walk_and_fill;
use super::MatchStrategy;

pub struct LimitStrategy;

impl MatchStrategy for LimitStrategy {
    fn match_order(&self, book: &mut OrderBook, incoming: Order) -> MatchResult {
        let limit_price = incoming
            .price
            .expect("validation rejects LIMIT orders without a price");
        let side = incoming.side;

        let mut result = walk_and_fill(book, incoming, |top_price| match side {
            crate::models::Side::Buy => top_price <= limit_price,
            crate::models::Side::Sell => top_price >= limit_price,
        });

        if result.incoming.remaining() > rust_decimal::Decimal::ZERO {
            book.insert(result.incoming.clone());
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrderStatus, OrderType, Side};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn order(id: i64, side: Side, price: rust_decimal::Decimal, qty: rust_decimal::Decimal) -> Order {
        Order {
            id,
            user_id: 1,
            symbol: "BTC-USD".to_string(),
            side,
            order_type: OrderType::Limit,
            price: Some(price),
            quantity: qty,
            filled_quantity: rust_decimal::Decimal::ZERO,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn fully_matches_against_a_crossing_maker() {
        let mut book = OrderBook::new("BTC-USD");
        book.insert(order(1, Side::Sell, dec!(50000), dec!(0.5)));

        let result = LimitStrategy.match_order(&mut book, order(2, Side::Buy, dec!(50000), dec!(0.5)));

        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.incoming.status, OrderStatus::Filled);
        assert!(book.best_ask().is_none());
    }

    #[test]
    fn rests_when_no_maker_crosses() {
        let mut book = OrderBook::new("BTC-USD");
        book.insert(order(1, Side::Sell, dec!(51000), dec!(1)));

        let result = LimitStrategy.match_order(&mut book, order(2, Side::Buy, dec!(50000), dec!(1)));

        assert!(result.trades.is_empty());
        assert_eq!(result.incoming.status, OrderStatus::Open);
        assert_eq!(book.best_bid(), Some(dec!(50000)));
    }

    #[test]
    fn partial_fill_rests_remainder() {
        let mut book = OrderBook::new("BTC-USD");
        book.insert(order(1, Side::Sell, dec!(50000), dec!(0.3)));

        let result = LimitStrategy.match_order(&mut book, order(2, Side::Buy, dec!(50000), dec!(1.0)));

        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.incoming.status, OrderStatus::PartiallyFilled);
        assert_eq!(book.best_bid(), Some(dec!(50000)));
    }

    #[test]
    fn walks_multiple_price_levels_in_priority_order() {
        let mut book = OrderBook::new("BTC-USD");
        book.insert(order(1, Side::Sell, dec!(50000), dec!(0.2)));
        book.insert(order(2, Side::Sell, dec!(50001), dec!(0.2)));

        let result = LimitStrategy.match_order(&mut book, order(3, Side::Buy, dec!(50001), dec!(0.4)));

        assert_eq!(result.trades.len(), 2);
        assert_eq!(result.trades[0].price, dec!(50000));
        assert_eq!(result.trades[1].price, dec!(50001));
        assert_eq!(result.incoming.status, OrderStatus::Filled);
    }
}
