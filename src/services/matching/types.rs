//! Shared types for the matching engine: the scaled price key used to
//! order ladders, the result of a match, and the component's error
//! taxonomy (spec.md §7).

use rust_decimal::Decimal;
use std::cmp::Ordering;

use crate::models::{NewTrade, Order};

/// Scale applied when converting a [`Decimal`] price into an integer key
/// for `BTreeMap` ordering. Prices are validated (spec.md §3) to have
/// scale <= 8, so this preserves exact ordering without float drift,
/// generalizing the teacher's `PriceLevel(i64)` pattern to an `i128` key
/// wide enough for the larger fiat/stablecoin quote prices this engine
/// sees.
pub const PRICE_SCALE: u32 = 8;

/// An exact, totally-ordered key for a price level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PriceKey(i128);

impl PriceKey {
    pub fn from_decimal(price: Decimal) -> Self {
        let scaled = price.round_dp(PRICE_SCALE) * Decimal::from(10i64.pow(PRICE_SCALE));
        PriceKey(scaled.mantissa() / 10i128.pow(scaled.scale()))
    }

    pub fn to_decimal(self) -> Decimal {
        Decimal::from_i128_with_scale(self.0, PRICE_SCALE)
    }
}

impl Ord for PriceKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for PriceKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The result of matching one incoming order against a book
/// (spec.md §4.2/§4.3): the updated incoming order, the trades produced
/// in execution order, and every maker order that was mutated (filled
/// makers included, so the coordinator can persist and publish status
/// for each of them).
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub incoming: Order,
    pub trades: Vec<NewTrade>,
    pub mutated_makers: Vec<Order>,
}

/// Matching engine errors (spec.md §4.4, §7).
#[derive(Debug, thiserror::Error)]
pub enum MatchingError {
    #[error("no matching strategy for order type {0}")]
    InvalidOrderType(String),

    #[error("order book version conflict for {symbol} after {attempts} attempts")]
    PersistenceConflict { symbol: String, attempts: u32 },

    #[error("upstream prerequisite unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("order not found: {0}")]
    NotFound(i64),

    #[error("order {0} is already in a terminal state")]
    AlreadyTerminal(i64),

    #[error("order {0} is not resting on the book")]
    NotResting(i64),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn price_key_preserves_ordering() {
        let a = PriceKey::from_decimal(dec!(50000.00000001));
        let b = PriceKey::from_decimal(dec!(50000.00000002));
        assert!(a < b);
    }

    #[test]
    fn price_key_round_trips() {
        let price = dec!(97500.12345678);
        let key = PriceKey::from_decimal(price);
        assert_eq!(key.to_decimal(), price);
    }

    #[test]
    fn price_key_equal_for_equal_prices() {
        let a = PriceKey::from_decimal(dec!(100));
        let b = PriceKey::from_decimal(dec!(100.00000000));
        assert_eq!(a, b);
    }
}
