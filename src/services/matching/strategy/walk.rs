//! The traversal and fill loop shared by LIMIT and MARKET matching
//! (spec.md §4.2/§4.3: "Identical traversal and fill logic to LIMIT but
//! without the price predicate"). Factored out so each strategy only
//! supplies its stop predicate and its own terminal-status rule.

use rust_decimal::Decimal;

use crate::models::{NewTrade, Order, OrderStatus};

use crate::services::matching::book::OrderBook;
use crate::services::matching::types::MatchResult;

/// Walk the opposite ladder, filling `incoming` while `should_continue`
/// (given the top-of-book price) says to keep going. Partially consumed
/// makers are pushed back to the front of their price level.
pub(super) fn walk_and_fill(
    book: &mut OrderBook,
    mut incoming: Order,
    should_continue: impl Fn(Decimal) -> bool,
) -> MatchResult {
    let mut trades = Vec::new();
    let mut mutated_makers = Vec::new();
    let opposite = incoming.side.opposite();

    while incoming.remaining() > Decimal::ZERO {
        let top_price = match opposite {
            crate::models::Side::Buy => book.best_bid(),
            crate::models::Side::Sell => book.best_ask(),
        };
        let Some(top_price) = top_price else { break };
        if !should_continue(top_price) {
            break;
        }

        let mut maker = match book.pop_best(opposite) {
            Some(m) => m,
            None => break,
        };

        let fill_qty = incoming.remaining().min(maker.remaining());
        incoming.filled_quantity += fill_qty;
        maker.filled_quantity += fill_qty;

        let (buy_order_id, sell_order_id, maker_order_id, taker_order_id) = match incoming.side {
            crate::models::Side::Buy => (incoming.id, maker.id, maker.id, incoming.id),
            crate::models::Side::Sell => (maker.id, incoming.id, maker.id, incoming.id),
        };

        trades.push(NewTrade {
            buy_order_id,
            sell_order_id,
            symbol: incoming.symbol.clone(),
            price: top_price,
            quantity: fill_qty,
            maker_order_id,
            taker_order_id,
            taker_side: incoming.side,
        });

        if maker.remaining() == Decimal::ZERO {
            maker.status = OrderStatus::Filled;
        } else {
            maker.status = OrderStatus::PartiallyFilled;
            book.push_front(maker.clone());
        }
        mutated_makers.push(maker);
    }

    incoming.status = if incoming.remaining() == Decimal::ZERO {
        OrderStatus::Filled
    } else if incoming.filled_quantity > Decimal::ZERO {
        OrderStatus::PartiallyFilled
    } else {
        OrderStatus::Open
    };

    MatchResult {
        incoming,
        trades,
        mutated_makers,
    }
}
