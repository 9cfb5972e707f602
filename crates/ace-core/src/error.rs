//! Error types for ACE core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("unknown queue: {0}")]
    UnknownQueue(String),

    #[error("unknown layer: {0}")]
    UnknownLayer(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn invalid_message(reason: impl Into<String>) -> Self {
        Self::InvalidMessage(reason.into())
    }
}
