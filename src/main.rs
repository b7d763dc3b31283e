use std::sync::Arc;

use dashmap::DashSet;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::task::JoinSet;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cache;
mod collab;
mod config;
mod db;
mod egress;
mod idempotency;
mod ingress;
mod metrics;
mod models;
mod recovery;
mod services;
mod streams;

use crate::cache::{CacheConfig, CacheManager};
use crate::config::AppConfig;
use crate::db::Database;
use crate::egress::EgressPublisher;
use crate::idempotency::IdempotencyStore;
use crate::ingress::{DeadLetterHandler, IngressDispatcher};
use crate::recovery::RecoveryRunner;
use crate::services::matching::MatchingCoordinator;
use crate::streams::{ChannelStreamBus, NatsStreamBus, StreamBus};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "matching_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load()?;
    tracing::info!("starting matching core v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(environment = %config.environment, "environment");

    let _prometheus_handle = metrics::init_metrics();

    let db = Database::connect(&config.database_url).await?;
    tracing::info!("database connected");

    let cache = Arc::new(CacheManager::new(CacheConfig { redis_url: config.redis_url.clone() }).await?);
    if cache.is_available().await {
        tracing::info!("cache manager connected to {}", cache.config().redis_url);
    } else {
        tracing::warn!("cache manager running without redis (degraded mode)");
    }

    let idempotency = IdempotencyStore::new(cache.redis());

    let bus = if config.environment == "test" {
        let (channel_bus, _status_rx, _trade_rx, _dlq_rx) = ChannelStreamBus::new();
        Arc::new(StreamBus::Channel(channel_bus))
    } else {
        Arc::new(StreamBus::Nats(NatsStreamBus::connect(&config.nats_url).await?))
    };
    tracing::info!("stream bus connected to {}", config.nats_url);

    let coordinator = Arc::new(MatchingCoordinator::new(db.clone(), cache.clone(), bus.clone()));

    let recovery = RecoveryRunner::new(db.clone(), cache.clone());
    recovery.run(&coordinator).await?;
    tracing::info!("recovery reconciliation complete");

    let sync_registry: Arc<DashSet<String>> = coordinator.sync_registry();
    let sync_scheduler = cache::sync::CacheSyncScheduler::new(db.clone(), cache.clone(), sync_registry)
        .with_timing(
            std::time::Duration::from_secs(config.cache_sync_interval_secs),
            std::time::Duration::from_secs(config.cache_sync_initial_delay_secs),
        );
    tokio::spawn(sync_scheduler.run());
    tracing::info!("cache sync scheduler spawned");

    let egress = EgressPublisher::new(bus.clone());
    let dead_letter = Arc::new(DeadLetterHandler::new(db.clone(), EgressPublisher::new(bus.clone())));
    let dispatcher = Arc::new(IngressDispatcher::new(
        db.clone(),
        idempotency,
        coordinator.clone(),
        egress,
    ));

    let mut ingress_workers = JoinSet::new();
    match bus.as_ref() {
        StreamBus::Nats(nats) => {
            for worker_id in 0..config.ingress_concurrency {
                let consumer_name = format!("order-input-worker-{worker_id}");
                let messages = nats.subscribe_order_input(&consumer_name).await?.boxed();
                let dispatcher = dispatcher.clone();
                ingress_workers.spawn(run_ingress_worker(messages, dispatcher));
            }

            let dlq_messages = nats.subscribe_order_input_dlq("order-input-dlq-worker").await?.boxed();
            let dead_letter = dead_letter.clone();
            ingress_workers.spawn(run_dead_letter_worker(dlq_messages, dead_letter));

            let trade_dlq_messages = nats.subscribe_trade_output_dlq("trade-output-dlq-worker").await?.boxed();
            ingress_workers.spawn(run_trade_dlq_drain(trade_dlq_messages));
        }
        StreamBus::Channel(_) => {
            tracing::info!("running against an in-memory stream bus, no consumer tasks spawned");
        }
    }

    tracing::info!(workers = config.ingress_concurrency, "ingress workers spawned");

    while let Some(result) = ingress_workers.join_next().await {
        if let Err(e) = result {
            tracing::error!(error = %e, "ingress worker task panicked");
        }
    }

    Ok(())
}

/// One ingress worker: pulls `order-input` records, runs them through the
/// dispatcher, and acks on `Disposition::Ack`/`DeadLettered` alike — both
/// are terminal outcomes for this delivery (spec.md §4.5).
async fn run_ingress_worker(
    mut messages: BoxStream<'static, async_nats::jetstream::Message>,
    dispatcher: Arc<IngressDispatcher>,
) {
    while let Some(message) = messages.next().await {
        let event: crate::streams::messages::NewOrderEvent = match serde_json::from_slice(&message.payload) {
            Ok(event) => event,
            Err(e) => {
                tracing::error!(error = %e, "failed to deserialize order-input record, acking to drop it");
                let _ = message.ack().await;
                continue;
            }
        };

        dispatcher.handle(event).await;
        if let Err(e) = message.ack().await {
            tracing::warn!(error = %e, "failed to ack order-input record");
        }
    }
}

async fn run_dead_letter_worker(
    mut messages: BoxStream<'static, async_nats::jetstream::Message>,
    dead_letter: Arc<DeadLetterHandler>,
) {
    while let Some(message) = messages.next().await {
        let event: crate::streams::messages::NewOrderEvent = match serde_json::from_slice(&message.payload) {
            Ok(event) => event,
            Err(e) => {
                tracing::error!(error = %e, "failed to deserialize dead-lettered record, acking to drop it");
                let _ = message.ack().await;
                continue;
            }
        };

        dead_letter.handle(event).await;
        if let Err(e) = message.ack().await {
            tracing::warn!(error = %e, "failed to ack dead-lettered record");
        }
    }
}

/// Drains `trades.output.dlq` without action (spec.md §4.12): trades are
/// already durable in the primary store by the time they are published.
async fn run_trade_dlq_drain(mut messages: BoxStream<'static, async_nats::jetstream::Message>) {
    while let Some(message) = messages.next().await {
        if let Err(e) = message.ack().await {
            tracing::warn!(error = %e, "failed to ack drained trade dead letter");
        }
    }
}
