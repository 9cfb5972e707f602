//! Outbound delivery of layer output
//!
//! A layer hands its southbound/northbound messages to an `Outbound`. Two
//! implementations: publish straight onto the next queue, or forward through
//! the controller's `/bus/{direction}` API which does the routing itself.

use crate::client::BusClient;
use crate::error::{BusError, BusResult};
use ace_core::{next_hop, BusMessage, BusResponse, Direction};
use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, error};

#[async_trait::async_trait]
pub trait Outbound: Send + Sync {
    async fn send(&self, direction: Direction, message: BusMessage) -> BusResult<()>;
}

/// Routes with the directional tables and publishes on the bus.
pub struct BusOutbound {
    client: Arc<BusClient>,
}

impl BusOutbound {
    pub fn new(client: Arc<BusClient>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Outbound for BusOutbound {
    async fn send(&self, direction: Direction, message: BusMessage) -> BusResult<()> {
        let source_queue = message.source_queue;
        let destination = next_hop(direction, source_queue).ok_or(BusError::NoRoute {
            direction,
            source_queue,
        })?;
        debug!(
            "Sending {} from {} to {}",
            message.layer_message.message_type, source_queue, destination
        );
        self.client.publish(destination, message.to_json()?).await
    }
}

/// Posts to the controller, which owns routing and publishing.
pub struct ForwardingOutbound {
    client: Client,
    base_url: String,
}

impl ForwardingOutbound {
    /// `base_url` is the controller's bus route prefix, e.g.
    /// `http://127.0.0.1:2349/v1/bus`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait::async_trait]
impl Outbound for ForwardingOutbound {
    async fn send(&self, direction: Direction, message: BusMessage) -> BusResult<()> {
        let url = format!("{}/{}", self.base_url, direction);
        let response = self.client.post(&url).json(&message).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Controller {} returned {}: {}", url, status, error_text);
            return Err(BusError::Forward(format!("{}: {}", status, error_text)));
        }

        let ack: BusResponse = response.json().await?;
        debug!("Controller acknowledged {} with {:?}", direction, ack);
        Ok(())
    }
}
