//! The live, in-memory order book ladder (spec.md §4.1).
//!
//! Generalized from the teacher's `services::matching::orderbook::Orderbook`
//! (`BTreeMap<PriceLevel, VecDeque<OrderEntry>>` per side, plus an
//! id-to-location index for O(1) cancel) to operate directly on
//! [`Order`] records and the crate's [`PriceKey`], and to support a
//! deterministic snapshot/restore round trip with
//! [`crate::models::BookSnapshot`] for recovery (spec.md §4.10).

use std::collections::{BTreeMap, HashMap, VecDeque};

use rust_decimal::Decimal;

use crate::models::{BookSnapshot, Order, Side};

use super::types::PriceKey;

/// One symbol's resting orders, bids and asks each kept in a `BTreeMap`
/// from price key to a FIFO queue of orders at that price — price-time
/// priority falls out of `BTreeMap` iteration order plus `VecDeque`
/// push/pop-front discipline.
pub struct OrderBook {
    symbol: String,
    bids: BTreeMap<PriceKey, VecDeque<Order>>,
    asks: BTreeMap<PriceKey, VecDeque<Order>>,
    /// order id -> (side, price key), so cancel/lookup never needs to
    /// scan every price level.
    index: HashMap<i64, (Side, PriceKey)>,
    version: i64,
}

impl OrderBook {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            index: HashMap::new(),
            version: 0,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    fn ladder(&self, side: Side) -> &BTreeMap<PriceKey, VecDeque<Order>> {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    fn ladder_mut(&mut self, side: Side) -> &mut BTreeMap<PriceKey, VecDeque<Order>> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    /// Insert a resting order at the back of its price level's queue.
    /// Requires a limit order carrying a price (spec.md §3).
    pub fn insert(&mut self, order: Order) {
        let price = order.price.expect("resting orders always carry a price");
        let key = PriceKey::from_decimal(price);
        self.index.insert(order.id, (order.side, key));
        self.ladder_mut(order.side).entry(key).or_default().push_back(order);
    }

    /// Remove and return the order at the front of the best price level
    /// on `side`, used by the matching strategies to consume makers.
    /// Drops the price level entirely once its queue is empty.
    pub fn pop_best(&mut self, side: Side) -> Option<Order> {
        let key = match side {
            // Bids are matched highest price first, asks lowest first.
            Side::Buy => *self.bids.keys().next_back()?,
            Side::Sell => *self.asks.keys().next()?,
        };
        let ladder = self.ladder_mut(side);
        let queue = ladder.get_mut(&key)?;
        let order = queue.pop_front();
        if queue.is_empty() {
            ladder.remove(&key);
        }
        if let Some(ref o) = order {
            self.index.remove(&o.id);
        }
        order
    }

    /// Put a partially-consumed maker order back at the front of its
    /// price level (it keeps priority over orders placed after it).
    pub fn push_front(&mut self, order: Order) {
        let price = order.price.expect("resting orders always carry a price");
        let key = PriceKey::from_decimal(price);
        self.index.insert(order.id, (order.side, key));
        self.ladder_mut(order.side).entry(key).or_default().push_front(order);
    }

    /// Remove a resting order by id regardless of its position in the
    /// queue (spec.md §4.1 cancel), preserving the order of everything
    /// else at that price level.
    pub fn remove(&mut self, order_id: i64) -> Option<Order> {
        let (side, key) = self.index.remove(&order_id)?;
        let ladder = self.ladder_mut(side);
        let queue = ladder.get_mut(&key)?;
        let pos = queue.iter().position(|o| o.id == order_id)?;
        let removed = queue.remove(pos);
        if queue.is_empty() {
            ladder.remove(&key);
        }
        removed
    }

    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.keys().next_back().map(|k| k.to_decimal())
    }

    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.keys().next().map(|k| k.to_decimal())
    }

    /// Whether a resting order exists to cross against on `side` — the
    /// market-order strategy uses this to detect liquidity exhaustion
    /// without popping a maker it can't fully use.
    pub fn has_liquidity(&self, side: Side) -> bool {
        !self.ladder(side).is_empty()
    }

    pub fn crosses(&self, side: Side, limit_price: Decimal) -> bool {
        match side {
            Side::Buy => self.best_ask().is_some_and(|ask| limit_price >= ask),
            Side::Sell => self.best_bid().is_some_and(|bid| limit_price <= bid),
        }
    }

    pub fn bump_version(&mut self) -> i64 {
        self.version += 1;
        self.version
    }

    /// Aggregated, price-descending bid / price-ascending ask levels
    /// truncated to `depth` entries each (spec.md §4.11).
    pub fn depth(&self, levels: usize) -> (Vec<(Decimal, Decimal)>, Vec<(Decimal, Decimal)>) {
        let bids = self
            .bids
            .iter()
            .rev()
            .take(levels)
            .map(|(k, q)| (k.to_decimal(), q.iter().map(|o| o.remaining()).sum()))
            .collect();
        let asks = self
            .asks
            .iter()
            .take(levels)
            .map(|(k, q)| (k.to_decimal(), q.iter().map(|o| o.remaining()).sum()))
            .collect();
        (bids, asks)
    }

    /// Like [`Self::depth`] but also reports the number of resting
    /// orders contributing to each price level, for
    /// [`super::depth::aggregate`].
    pub fn level_counts(
        &self,
        levels: usize,
    ) -> (
        Vec<super::depth::DepthLevel>,
        Vec<super::depth::DepthLevel>,
    ) {
        use super::depth::DepthLevel;

        let build = |q: &VecDeque<Order>, price: Decimal| DepthLevel {
            price,
            total_remaining_quantity: q.iter().map(|o| o.remaining()).sum(),
            order_count: q.len(),
        };

        let bids = self
            .bids
            .iter()
            .rev()
            .take(levels)
            .map(|(k, q)| build(q, k.to_decimal()))
            .collect();
        let asks = self
            .asks
            .iter()
            .take(levels)
            .map(|(k, q)| build(q, k.to_decimal()))
            .collect();
        (bids, asks)
    }

    /// Rebuild a live book from its durable snapshot (spec.md §4.10
    /// recovery). Orders are re-inserted in their stored order, which
    /// the persistence layer is required to keep FIFO-consistent per
    /// price level (SPEC_FULL.md §9).
    pub fn from_snapshot(snapshot: BookSnapshot) -> Self {
        let mut book = Self::new(snapshot.symbol);
        book.version = snapshot.version;
        for order in snapshot.bids.into_iter().chain(snapshot.asks) {
            book.insert(order);
        }
        book
    }

    pub fn to_snapshot(&self) -> BookSnapshot {
        let bids = self.bids.values().flatten().cloned().collect();
        let asks = self.asks.values().flatten().cloned().collect();
        BookSnapshot {
            symbol: self.symbol.clone(),
            bids,
            asks,
            version: self.version,
            updated_at: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrderStatus, OrderType};
    use chrono::Utc;
    use rust_decimal_macros::dec;

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
            status: OrderStatus::Open,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn best_bid_ask_track_top_of_book() {
        let mut book = OrderBook::new("BTC-USD");
        book.insert(limit_order(1, Side::Buy, dec!(100), dec!(1)));
        book.insert(limit_order(2, Side::Buy, dec!(101), dec!(1)));
        book.insert(limit_order(3, Side::Sell, dec!(105), dec!(1)));
        book.insert(limit_order(4, Side::Sell, dec!(104), dec!(1)));

        assert_eq!(book.best_bid(), Some(dec!(101)));
        assert_eq!(book.best_ask(), Some(dec!(104)));
    }

    #[test]
    fn pop_best_respects_fifo_within_a_price_level() {
        let mut book = OrderBook::new("BTC-USD");
        book.insert(limit_order(1, Side::Buy, dec!(100), dec!(1)));
        book.insert(limit_order(2, Side::Buy, dec!(100), dec!(1)));

        let first = book.pop_best(Side::Buy).unwrap();
        assert_eq!(first.id, 1);
        let second = book.pop_best(Side::Buy).unwrap();
        assert_eq!(second.id, 2);
        assert!(book.pop_best(Side::Buy).is_none());
    }

    #[test]
    fn remove_drops_empty_price_level() {
        let mut book = OrderBook::new("BTC-USD");
        book.insert(limit_order(1, Side::Buy, dec!(100), dec!(1)));
        assert!(book.remove(1).is_some());
        assert_eq!(book.best_bid(), None);
        assert!(book.remove(1).is_none());
    }

    #[test]
    fn crosses_detects_marketable_limit_prices() {
        let mut book = OrderBook::new("BTC-USD");
        book.insert(limit_order(1, Side::Sell, dec!(100), dec!(1)));
        assert!(book.crosses(Side::Buy, dec!(100)));
        assert!(book.crosses(Side::Buy, dec!(101)));
        assert!(!book.crosses(Side::Buy, dec!(99)));
    }

    #[test]
    fn depth_aggregates_quantity_per_level_and_truncates() {
        let mut book = OrderBook::new("BTC-USD");
        book.insert(limit_order(1, Side::Buy, dec!(100), dec!(1)));
        book.insert(limit_order(2, Side::Buy, dec!(100), dec!(2)));
        book.insert(limit_order(3, Side::Buy, dec!(99), dec!(5)));

        let (bids, _asks) = book.depth(1);
        assert_eq!(bids.len(), 1);
        assert_eq!(bids[0], (dec!(100), dec!(3)));
    }

    #[test]
    fn snapshot_round_trips_resting_orders() {
        let mut book = OrderBook::new("BTC-USD");
        book.insert(limit_order(1, Side::Buy, dec!(100), dec!(1)));
        book.insert(limit_order(2, Side::Sell, dec!(105), dec!(2)));
        book.bump_version();

        let snapshot = book.to_snapshot();
        let restored = OrderBook::from_snapshot(snapshot);

        assert_eq!(restored.version(), 1);
        assert_eq!(restored.best_bid(), Some(dec!(100)));
        assert_eq!(restored.best_ask(), Some(dec!(105)));
    }
}
