use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::order::Order;

/// The durable representation of one symbol's order book (spec.md §3,
/// §4.8). `bids` and `asks` are flat, FIFO-ordered lists of resting
/// orders — grouping by price level and the descending/ascending
/// iteration discipline are reconstructed by
/// [`crate::services::matching::book::OrderBook::from_snapshot`], never
/// baked into the wire format itself.
///
/// This is the shape persisted as the `order_books.bids`/`order_books.asks`
/// JSONB columns and mirrored into the cache tier (SPEC_FULL.md §9).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BookSnapshot {
    pub symbol: String,
    pub bids: Vec<Order>,
    pub asks: Vec<Order>,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

impl BookSnapshot {
    pub fn empty(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            bids: Vec::new(),
            asks: Vec::new(),
            version: 0,
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_snapshot_has_version_zero() {
        let snap = BookSnapshot::empty("BTC-USD");
        assert_eq!(snap.version, 0);
        assert!(snap.bids.is_empty());
        assert!(snap.asks.is_empty());
    }
}
