//! ACE Bus - durable JetStream queues and outbound routing for layers

pub mod backoff;
pub mod client;
pub mod error;
pub mod outbound;

pub use backoff::BackoffConfig;
pub use client::{BusClient, DeliveryHandler, Subscription};
pub use error::{BusError, BusResult};
pub use outbound::{BusOutbound, ForwardingOutbound, Outbound};
pub use tokio_util::sync::CancellationToken;
