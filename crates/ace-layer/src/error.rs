//! Error types for layer runtime

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PromptError {
    #[error("no variable map supplied to resolve {0}")]
    MissingVariableMap(String),

    #[error("variable {name} is not a valid value: {reason}")]
    InvalidVariable { name: String, reason: String },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("missing internal.reasoning")]
    MissingReasoning,

    #[error("invalid section {section}: {reason}")]
    InvalidSection { section: String, reason: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("actor for {agent} failed while running: {reason}")]
    ActorFailed { agent: String, reason: String },

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("bus error: {0}")]
    Bus(#[from] ace_bus::BusError),

    #[error("prompt error: {0}")]
    Prompt(#[from] PromptError),
}
