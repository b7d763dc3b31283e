//! Production `StreamBus` backend: async-nats JetStream (SPEC_FULL.md
//! §4.13), grounded on `joaquinbejar-OrderBook-rs`'s
//! `orderbook::nats::NatsTradePublisher` — header-tagged sequence
//! numbers, non-blocking publish via a spawned task, and the same
//! exponential-backoff retry shape (`10ms * 2^attempt`, 3 retries).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_nats::jetstream::consumer::pull;
use async_nats::jetstream::{self, context::Context, stream::Config as StreamConfig};
use async_nats::HeaderMap;
use futures::StreamExt;

use super::messages::{NewOrderEvent, OrderStatusEvent, TradeEvent};
use super::PublishError;

const DEFAULT_MAX_RETRIES: u32 = 3;
const BASE_RETRY_DELAY_MS: u64 = 10;

/// Stream names backing the `orders.input.*` / `trades.output.*` subject
/// hierarchies (SPEC_FULL.md §4.13).
const ORDER_INPUT_STREAM: &str = "ORDER_INPUT";
const TRADE_OUTPUT_STREAM: &str = "TRADE_OUTPUT";

pub struct NatsStreamBus {
    jetstream: Context,
    sequence: AtomicU64,
    max_retries: u32,
}

impl NatsStreamBus {
    pub async fn connect(nats_url: &str) -> anyhow::Result<Self> {
        let client = async_nats::connect(nats_url).await?;
        let jetstream = jetstream::new(client);
        Ok(Self {
            jetstream,
            sequence: AtomicU64::new(0),
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    /// Durable pull consumer over `orders.input.>`, one per ingress worker
    /// assignment (SPEC_FULL.md §5's `JoinSet`). Each yielded item is
    /// acked by the caller only after the dispatcher resolves a
    /// [`super::super::ingress::dispatcher::Disposition`] for it, giving
    /// at-least-once redelivery on crash mid-process.
    pub async fn subscribe_order_input(
        &self,
        consumer_name: &str,
    ) -> anyhow::Result<impl futures::Stream<Item = async_nats::jetstream::Message>> {
        let stream = self
            .jetstream
            .get_or_create_stream(StreamConfig {
                name: ORDER_INPUT_STREAM.to_string(),
                subjects: vec!["orders.input.>".to_string()],
                ..Default::default()
            })
            .await?;

        let consumer = stream
            .get_or_create_consumer(
                consumer_name,
                pull::Config {
                    durable_name: Some(consumer_name.to_string()),
                    max_deliver: (DEFAULT_MAX_RETRIES + 1) as i64,
                    ack_wait: Duration::from_secs(30),
                    ..Default::default()
                },
            )
            .await?;

        let messages = consumer.messages().await?.filter_map(|m| async { m.ok() });
        Ok(messages)
    }

    /// Pull consumer over `trades.output.dlq`, drained by the Dead Letter
    /// Handler without further retry (spec.md §4.12).
    pub async fn subscribe_trade_output_dlq(
        &self,
        consumer_name: &str,
    ) -> anyhow::Result<impl futures::Stream<Item = async_nats::jetstream::Message>> {
        let stream = self
            .jetstream
            .get_or_create_stream(StreamConfig {
                name: TRADE_OUTPUT_STREAM.to_string(),
                subjects: vec!["trades.output.>".to_string()],
                ..Default::default()
            })
            .await?;

        let consumer = stream
            .get_or_create_consumer(
                consumer_name,
                pull::Config {
                    durable_name: Some(consumer_name.to_string()),
                    filter_subject: "trades.output.dlq".to_string(),
                    ..Default::default()
                },
            )
            .await?;

        let messages = consumer.messages().await?.filter_map(|m| async { m.ok() });
        Ok(messages)
    }

    /// Pull consumer over `orders.input.dlq`, drained by the Dead Letter
    /// Handler (spec.md §4.12) to transition the order to FAILED.
    pub async fn subscribe_order_input_dlq(
        &self,
        consumer_name: &str,
    ) -> anyhow::Result<impl futures::Stream<Item = async_nats::jetstream::Message>> {
        let stream = self
            .jetstream
            .get_or_create_stream(StreamConfig {
                name: ORDER_INPUT_STREAM.to_string(),
                subjects: vec!["orders.input.>".to_string()],
                ..Default::default()
            })
            .await?;

        let consumer = stream
            .get_or_create_consumer(
                consumer_name,
                pull::Config {
                    durable_name: Some(consumer_name.to_string()),
                    filter_subject: "orders.input.dlq".to_string(),
                    ..Default::default()
                },
            )
            .await?;

        let messages = consumer.messages().await?.filter_map(|m| async { m.ok() });
        Ok(messages)
    }

    fn next_headers(&self) -> HeaderMap {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let mut headers = HeaderMap::new();
        headers.insert("X-Sequence", seq.to_string().as_str());
        headers
    }

    async fn publish_with_retry(&self, subject: String, payload: Vec<u8>) -> Result<(), PublishError> {
        let headers = self.next_headers();
        let mut attempt = 0;
        loop {
            let result = self
                .jetstream
                .publish_with_headers(subject.clone(), headers.clone(), payload.clone().into())
                .await;

            match result {
                Ok(ack) => {
                    if let Err(e) = ack.await {
                        tracing::warn!(subject = %subject, error = %e, "jetstream ack failed");
                    }
                    return Ok(());
                }
                Err(e) if attempt < self.max_retries => {
                    let delay_ms = BASE_RETRY_DELAY_MS.saturating_mul(1u64 << attempt);
                    tracing::warn!(subject = %subject, attempt, error = %e, "publish failed, retrying");
                    tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(PublishError::Exhausted {
                        subject,
                        attempts: attempt + 1,
                        source: e.into(),
                    });
                }
            }
        }
    }

    pub async fn publish_order_status(&self, event: OrderStatusEvent) -> Result<(), PublishError> {
        let subject = format!("orders.status.{}", event.user_id);
        let payload = serde_json::to_vec(&event).expect("OrderStatusEvent always serializes");
        self.publish_with_retry(subject, payload).await
    }

    pub async fn publish_trade(&self, event: TradeEvent) -> Result<(), PublishError> {
        let subject = format!("trades.output.{}", event.symbol);
        let payload = serde_json::to_vec(&event).expect("TradeEvent always serializes");
        self.publish_with_retry(subject, payload).await
    }

    pub async fn publish_order_input_dlq(&self, event: NewOrderEvent) -> Result<(), PublishError> {
        let payload = serde_json::to_vec(&event).expect("NewOrderEvent always serializes");
        self.publish_with_retry("orders.input.dlq".to_string(), payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_exponentially_from_the_base_delay() {
        let delays: Vec<u64> = (0..DEFAULT_MAX_RETRIES)
            .map(|attempt| BASE_RETRY_DELAY_MS.saturating_mul(1u64 << attempt))
            .collect();
        assert_eq!(delays, vec![10, 20, 40]);
    }
}
