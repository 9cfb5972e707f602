//! Bus error types

use ace_core::{Direction, Queue};

pub type BusResult<T> = Result<T, BusError>;

#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("broker error: {0}")]
    Broker(String),

    #[error("publish to {queue} failed: {reason}")]
    Publish { queue: String, reason: String },

    #[error("subscribe to {queue} failed: {reason}")]
    Subscribe { queue: Queue, reason: String },

    #[error("subscription on {0} closed")]
    SubscriptionClosed(Queue),

    #[error("{source_queue} has no {direction} route")]
    NoRoute { direction: Direction, source_queue: Queue },

    #[error("forward failed: {0}")]
    Forward(String),

    #[error("encode error: {0}")]
    Encode(#[from] ace_core::Error),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}
