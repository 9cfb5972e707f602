//! Layer runtime configuration
//!
//! Broker, model provider, controller and layer settings. Loaded from TOML at
//! startup, falls back to defaults if no config file exists.

use ace_bus::BackoffConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub bus: BusConfig,
    pub model_provider: ModelProviderConfig,
    pub controller: ControllerConfig,
    pub layer: LayerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Broker address, `host:port` or a full `nats://` URL.
    pub address: String,
    /// First reconnect delay.
    pub connect_base_ms: u64,
    /// Reconnect delay ceiling.
    pub connect_max_ms: u64,
    pub request_timeout_secs: u64,
    /// Wait before the first connect attempt, for brokers started alongside.
    pub startup_delay_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelProviderConfig {
    pub url: String,
    pub stack_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Bus route prefix; `/southbound` and `/northbound` are appended.
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutboundMode {
    /// Route locally and publish on the next queue.
    Bus,
    /// Post to the controller and let it route.
    Forward,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerConfig {
    /// Model calls per processing cycle before giving up.
    pub max_retries: u32,
    pub outbound: OutboundMode,
    pub prompts_dir: PathBuf,
    /// The hot-reloaded active agent file.
    pub agent_config: PathBuf,
}

// ============================================================
// Defaults
// ============================================================

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:4222".into(),
            connect_base_ms: 1_000,
            connect_max_ms: 10_000,
            request_timeout_secs: 30,
            startup_delay_secs: 0,
        }
    }
}

impl Default for ModelProviderConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:4223/v1/bus/generate".into(),
            stack_type: "generalist".into(),
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:2349/v1/bus".into(),
        }
    }
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            outbound: OutboundMode::Bus,
            prompts_dir: PathBuf::from("./prompts"),
            agent_config: PathBuf::from("./layers/.config"),
        }
    }
}

// ============================================================
// Loading
// ============================================================

impl RuntimeConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}, using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!("No config at {}, using defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

impl BusConfig {
    pub fn backoff(&self) -> BackoffConfig {
        BackoffConfig {
            base_ms: self.connect_base_ms,
            max_ms: self.connect_max_ms,
            ..BackoffConfig::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
