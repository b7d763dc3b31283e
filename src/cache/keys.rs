//! Cache key layout (spec.md §6), centralizing the key strings the
//! teacher's `orderbook_cache.rs` referenced via a `super::keys::CacheKey`
//! that did not ship in the retrieval pack — rebuilt here from its call
//! sites.

use crate::models::Side;

pub struct CacheKey;

impl CacheKey {
    pub fn prices(symbol: &str, side: Side) -> String {
        format!("orderbook:{symbol}:{}:prices", side_tag(side))
    }

    pub fn price_orders(symbol: &str, side: Side, price: &str) -> String {
        format!("orderbook:{symbol}:{}:price:{price}", side_tag(side))
    }

    pub fn order(order_id: i64) -> String {
        format!("order:{order_id}")
    }

    pub fn metadata(symbol: &str) -> String {
        format!("orderbook:{symbol}:metadata")
    }

    pub fn idempotency_sent(message_id: &str) -> String {
        format!("idempotency:sent:{message_id}")
    }

    pub fn idempotency_processed(message_id: &str) -> String {
        format!("idempotency:processed:{message_id}")
    }
}

fn side_tag(side: Side) -> &'static str {
    match side {
        Side::Buy => "bid",
        Side::Sell => "ask",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_match_the_documented_layout() {
        assert_eq!(CacheKey::prices("BTC-USD", Side::Buy), "orderbook:BTC-USD:bid:prices");
        assert_eq!(CacheKey::order(42), "order:42");
        assert_eq!(CacheKey::metadata("BTC-USD"), "orderbook:BTC-USD:metadata");
    }
}
