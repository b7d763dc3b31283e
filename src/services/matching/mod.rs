//! Matching engine core (spec.md §4.1-§4.4, §4.11).
//!
//! ```text
//!   Ingress Dispatcher
//!          |
//!          v
//!   MatchingCoordinator  <---- per-symbol Mutex<OrderBook> writer region
//!          |
//!          v
//!   strategy::{LimitStrategy, MarketStrategy}  ---  walk the opposite ladder
//!          |
//!          v
//!   book::OrderBook  (BTreeMap<PriceKey, VecDeque<Order>> per side)
//!          |
//!          v
//!   Primary Persistence  --->  Egress Publisher
//! ```
//!
//! `depth` aggregates a book into the truncated view external readers
//! see; `coordinator` is the only writer of book state.

pub mod book;
pub mod coordinator;
pub mod depth;
pub mod strategy;
pub mod types;

pub use coordinator::MatchingCoordinator;
pub use depth::Depth;
pub use types::{MatchResult, MatchingError, PriceKey};
