//! Stream transport (SPEC_FULL.md §4.13): `StreamBus` is a small enum
//! over the production NATS transport and an in-memory stand-in for
//! tests, grounded on the teacher's internal `tokio::sync::broadcast`
//! fan-out in `main.rs`/`orchestrator.rs`. An enum (rather than a boxed
//! trait) keeps publish a plain `async fn` call, matching how the
//! teacher's `CacheManager`/`RedisClient` wrap their backends as
//! concrete structs instead of trait objects.

pub mod messages;
mod channel_bus;
mod nats_bus;

pub use channel_bus::ChannelStreamBus;
pub use nats_bus::NatsStreamBus;

use thiserror::Error;

use messages::{NewOrderEvent, OrderStatusEvent, TradeEvent};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("publish to {subject} failed after {attempts} attempts: {source}")]
    Exhausted {
        subject: String,
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },
    #[error("bus unavailable: {0}")]
    Unavailable(String),
}

/// Every publish is fire-and-forget from the caller's perspective
/// (spec.md §4.6): failures are logged by the implementation and
/// returned here only so callers can count them in metrics, never to
/// gate the durable commit that already happened.
pub enum StreamBus {
    Nats(NatsStreamBus),
    Channel(ChannelStreamBus),
}

impl StreamBus {
    pub async fn publish_order_status(&self, event: OrderStatusEvent) -> Result<(), PublishError> {
        match self {
            StreamBus::Nats(b) => b.publish_order_status(event).await,
            StreamBus::Channel(b) => b.publish_order_status(event).await,
        }
    }

    pub async fn publish_trade(&self, event: TradeEvent) -> Result<(), PublishError> {
        match self {
            StreamBus::Nats(b) => b.publish_trade(event).await,
            StreamBus::Channel(b) => b.publish_trade(event).await,
        }
    }

    pub async fn publish_order_input_dlq(&self, event: NewOrderEvent) -> Result<(), PublishError> {
        match self {
            StreamBus::Nats(b) => b.publish_order_input_dlq(event).await,
            StreamBus::Channel(b) => b.publish_order_input_dlq(event).await,
        }
    }
}
