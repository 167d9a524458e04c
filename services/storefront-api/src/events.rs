//! Product event queue and audit consumer
//!
//! Mutation handlers publish [`ProductEvent`]s onto a bounded channel. A single
//! consumer task drains it in arrival order and writes one
//! [`ProductEventRecord`] per message.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use metrics::counter;
use storefront_db::ProductEventRepository;
use storefront_types::{ProductEvent, ProductEventRecord};
use storefront_utils::retry::{with_retry, RetryConfig};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Message id assigned on publish
pub type MessageId = String;

/// Publishing errors
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("event queue is closed")]
    Closed,
}

/// Sink for product events
#[async_trait]
pub trait ProductEventPublisher: Send + Sync {
    async fn publish(&self, event: ProductEvent) -> Result<MessageId, PublishError>;
}

/// An event as it travels through the queue
#[derive(Debug, Clone)]
pub struct QueuedEvent {
    pub message_id: MessageId,
    pub event: ProductEvent,
}

/// Bounded in-process queue
#[derive(Clone)]
pub struct ChannelPublisher {
    tx: mpsc::Sender<QueuedEvent>,
}

impl ChannelPublisher {
    /// Create a publisher and the receiving end of its queue
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<QueuedEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ProductEventPublisher for ChannelPublisher {
    async fn publish(&self, event: ProductEvent) -> Result<MessageId, PublishError> {
        let message_id = Uuid::new_v4().to_string();
        self.tx
            .send(QueuedEvent {
                message_id: message_id.clone(),
                event,
            })
            .await
            .map_err(|_| PublishError::Closed)?;
        Ok(message_id)
    }
}

/// Spawn the audit consumer; it exits once every publisher is dropped
pub fn spawn_audit_consumer(
    mut rx: mpsc::Receiver<QueuedEvent>,
    store: Arc<dyn ProductEventRepository>,
    retry: RetryConfig,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(queued) = rx.recv().await {
            record_event(&queued, store.as_ref(), retry.clone()).await;
        }
        tracing::info!("Product event queue closed, audit consumer stopping");
    })
}

async fn record_event(queued: &QueuedEvent, store: &dyn ProductEventRepository, retry: RetryConfig) {
    let record = ProductEventRecord::from_event(&queued.event, &queued.message_id, Utc::now());
    let event_type = queued.event.event_type.as_str();

    let result = with_retry(retry, || {
        let record = record.clone();
        async move { store.put(record).await }
    })
    .await;

    match result {
        Ok(()) => {
            counter!("storefront_product_events_total", "event_type" => event_type, "status" => "recorded")
                .increment(1);
            tracing::debug!(
                message_id = %queued.message_id,
                request_id = %queued.event.request_id,
                event_type,
                pk = %record.pk,
                sk = %record.sk,
                "Recorded product event"
            );
        }
        Err(e) => {
            counter!("storefront_product_events_total", "event_type" => event_type, "status" => "dropped")
                .increment(1);
            tracing::error!(
                message_id = %queued.message_id,
                request_id = %queued.event.request_id,
                event_type,
                error = %e,
                "Dropping product event after failed writes"
            );
        }
    }
}
