//! BusClient - JetStream connection, durable queues, publish and request
//!
//! Each layer queue is a JetStream stream with a single subject of the same
//! name, consumed through a durable pull consumer whose name is also the
//! queue name. Deliveries are acknowledged only after the handler returns, so
//! a crash mid-handler causes redelivery.

use crate::backoff::BackoffConfig;
use crate::error::{BusError, BusResult};
use ace_core::Queue;
use async_nats::jetstream::{self, consumer::pull, stream};
use async_nats::ConnectErrorKind;
use bytes::Bytes;
use futures::StreamExt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Receives raw payloads drained from a queue.
#[async_trait::async_trait]
pub trait DeliveryHandler: Send + Sync {
    async fn handle(&self, queue: Queue, payload: &[u8]);
}

pub struct BusClient {
    client: async_nats::Client,
    jetstream: jetstream::Context,
}

impl BusClient {
    /// Connect to the broker, retrying with exponential backoff while the
    /// connection is refused. Any other failure is returned immediately.
    pub async fn connect(address: &str, backoff: &BackoffConfig) -> BusResult<Self> {
        let url = if address.contains("://") {
            address.to_string()
        } else {
            format!("nats://{}", address)
        };

        let mut attempt: u32 = 0;
        loop {
            info!("Connecting to broker at {}...", url);
            match async_nats::connect(url.as_str()).await {
                Ok(client) => {
                    info!("Connected to broker at {}", url);
                    let jetstream = jetstream::new(client.clone());
                    return Ok(Self { client, jetstream });
                }
                Err(e) if matches!(e.kind(), ConnectErrorKind::Io) => {
                    let delay = backoff.delay(attempt);
                    warn!("Broker refused connection ({}), retrying in {:?}", e, delay);
                    tokio::time::sleep(delay).await;
                    attempt = attempt.saturating_add(1);
                }
                Err(e) => return Err(BusError::Connect(e.to_string())),
            }
        }
    }

    /// Delete and recreate the stream behind every queue.
    ///
    /// Destructive: pending messages and durable cursors are lost. Only for
    /// first-time setup.
    pub async fn establish_queues(&self, queues: &[Queue]) -> BusResult<()> {
        info!("Establishing {} queues...", queues.len());
        for queue in queues {
            let name = queue.as_str();
            if let Err(e) = self.jetstream.delete_stream(name).await {
                debug!("No stream {} to delete: {}", name, e);
            }
            self.jetstream
                .create_stream(stream::Config {
                    name: name.to_string(),
                    subjects: vec![name.to_string()],
                    ..Default::default()
                })
                .await
                .map_err(|e| BusError::Broker(format!("create stream {}: {}", name, e)))?;
            debug!("Established queue {}", name);
        }
        info!("Established all queues");
        Ok(())
    }

    /// Bind the durable consumer for `queue`. The returned subscription has
    /// not consumed anything yet.
    pub async fn subscribe(&self, queue: Queue) -> BusResult<Subscription> {
        let name = queue.as_str();
        info!("Subscribing to {}...", name);
        let subscribe_err = |reason: String| BusError::Subscribe { queue, reason };

        let stream = self
            .jetstream
            .get_stream(name)
            .await
            .map_err(|e| subscribe_err(e.to_string()))?;
        let consumer = stream
            .get_or_create_consumer(
                name,
                pull::Config {
                    durable_name: Some(name.to_string()),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| subscribe_err(e.to_string()))?;
        let messages = consumer
            .messages()
            .await
            .map_err(|e| subscribe_err(e.to_string()))?;

        info!("Subscribed to {}", name);
        Ok(Subscription { queue, messages })
    }

    /// Publish and wait for the broker's acknowledgement.
    pub async fn publish(&self, queue: Queue, payload: Vec<u8>) -> BusResult<()> {
        let publish_err = |reason: String| BusError::Publish {
            queue: queue.to_string(),
            reason,
        };
        debug!("Publishing {} bytes to {}", payload.len(), queue);
        let ack = self
            .jetstream
            .publish(queue.as_str().to_string(), Bytes::from(payload))
            .await
            .map_err(|e| publish_err(e.to_string()))?;
        ack.await.map_err(|e| publish_err(e.to_string()))?;
        Ok(())
    }

    /// Correlated request/response. Timeouts and failures are logged and
    /// yield `None`.
    pub async fn request(&self, queue: Queue, payload: Vec<u8>, timeout: Duration) -> Option<Bytes> {
        debug!("Requesting from {}", queue);
        let request = self.client.request(queue.as_str().to_string(), Bytes::from(payload));
        bounded(queue, timeout, async move { request.await.map(|response| response.payload) }).await
    }

    /// Flush outstanding publishes and drop the connection.
    pub async fn close(self) {
        if let Err(e) = self.client.flush().await {
            debug!("Flush on close failed: {}", e);
        }
    }
}

async fn bounded<T, E, F>(queue: Queue, timeout: Duration, request: F) -> Option<T>
where
    E: std::fmt::Display,
    F: std::future::Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(timeout, request).await {
        Ok(Ok(reply)) => Some(reply),
        Ok(Err(e)) => {
            warn!("Request to {} failed: {}", queue, e);
            None
        }
        Err(_) => {
            warn!("Request to {} timed out after {:?}", queue, timeout);
            None
        }
    }
}

/// A bound durable consumer on one queue.
pub struct Subscription {
    queue: Queue,
    messages: pull::Stream,
}

impl Subscription {
    pub fn queue(&self) -> Queue {
        self.queue
    }

    /// Drain deliveries until cancelled. Each delivery is handed to `handler`
    /// and acknowledged after it returns. Returns `Ok` only on cancellation;
    /// the stream ending on its own is `SubscriptionClosed`.
    pub async fn drain<H>(mut self, handler: &H, cancel: CancellationToken) -> BusResult<()>
    where
        H: DeliveryHandler + ?Sized,
    {
        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Subscription on {} cancelled", self.queue);
                    return Ok(());
                }
                next = self.messages.next() => next,
            };

            match next {
                Some(Ok(message)) => {
                    handler.handle(self.queue, &message.payload).await;
                    if let Err(e) = message.ack().await {
                        warn!("Failed to ack delivery on {}: {}", self.queue, e);
                    }
                }
                Some(Err(e)) => {
                    warn!("Delivery error on {}: {}", self.queue, e);
                }
                None => return Err(BusError::SubscriptionClosed(self.queue)),
            }
        }
    }
}
