//! Wire types shared by the bus, the controller forwarding API, and the
//! model provider.

use crate::error::Result;
use crate::message::{LayerMessage, LayerSubMessage};
use crate::types::Queue;
use serde::{Deserialize, Serialize};

/// Bus envelope: `{"source_queue": "...", "layer_message": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusMessage {
    pub source_queue: Queue,
    pub layer_message: LayerMessage,
}

impl BusMessage {
    pub fn new(source_queue: Queue, layer_message: LayerMessage) -> Self {
        Self {
            source_queue,
            layer_message,
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// A decoded queue delivery. The controller publishes bare layer messages,
/// layers publish full envelopes; both are accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub source_queue: Option<Queue>,
    pub layer_message: LayerMessage,
}

impl Delivery {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Inbound {
            Envelope(BusMessage),
            Bare(LayerMessage),
        }

        let delivery = match serde_json::from_slice::<Inbound>(bytes)? {
            Inbound::Envelope(envelope) => Self {
                source_queue: Some(envelope.source_queue),
                layer_message: envelope.layer_message,
            },
            Inbound::Bare(layer_message) => Self {
                source_queue: None,
                layer_message,
            },
        };
        delivery.layer_message.validate()?;
        Ok(delivery)
    }
}

/// Acknowledgement returned by the controller's `/bus/{direction}` routes.
pub type BusResponse = Vec<LayerSubMessage>;

/// Request body for the model provider's generate endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPrompt {
    pub stack_type: String,
    pub system_prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    pub response: String,
}
