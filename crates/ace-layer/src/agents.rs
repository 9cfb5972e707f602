//! Active agent configuration
//!
//! The persisted file names the agent currently driving the layer plus one
//! table per known agent:
//!
//! ```toml
//! [base_information]
//! current_active = "atlas"   # or "none"
//!
//! [atlas]
//! mission = "Keep the greenhouse alive."
//! ```
//!
//! Kept as a raw table so rewriting `current_active` preserves every other
//! key the operator put there.

use crate::error::ConfigError;
use ace_core::NONE;
use std::path::Path;
use toml::{Table, Value};

pub const BASE_INFORMATION: &str = "base_information";
pub const CURRENT_ACTIVE: &str = "current_active";
pub const MISSION: &str = "mission";

/// Identity text for one configured agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentProfile {
    pub name: String,
    pub mission: String,
}

/// What `current_active` resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActiveSelection {
    /// Literal "none": run no actor.
    Idle,
    Agent(AgentProfile),
    /// Names no known section.
    Unknown(String),
}

#[derive(Debug, Clone)]
pub struct ActiveAgentConfig {
    table: Table,
}

impl Default for ActiveAgentConfig {
    fn default() -> Self {
        let mut base = Table::new();
        base.insert(CURRENT_ACTIVE.into(), Value::String(NONE.into()));
        let mut table = Table::new();
        table.insert(BASE_INFORMATION.into(), Value::Table(base));
        Self { table }
    }
}

impl ActiveAgentConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = content.parse::<Table>().map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { table })
    }

    /// Load the file, creating it with `current_active = "none"` first if it
    /// does not exist.
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        if path.is_file() {
            return Self::load(path);
        }
        tracing::info!("No agent config at {}, creating one", path.display());
        let config = Self::default();
        config.save(path)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let content = toml::to_string_pretty(&self.table)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Raw `current_active` value; a missing key reads as "none".
    pub fn current_active(&self) -> &str {
        self.table
            .get(BASE_INFORMATION)
            .and_then(|base| base.get(CURRENT_ACTIVE))
            .and_then(Value::as_str)
            .unwrap_or(NONE)
    }

    pub fn set_current_active(&mut self, name: &str) {
        let base = self
            .table
            .entry(BASE_INFORMATION)
            .or_insert_with(|| Value::Table(Table::new()));
        if !base.is_table() {
            *base = Value::Table(Table::new());
        }
        if let Value::Table(base) = base {
            base.insert(CURRENT_ACTIVE.into(), Value::String(name.into()));
        }
    }

    /// Names of every agent section, in file order.
    pub fn agents(&self) -> impl Iterator<Item = &str> {
        self.table
            .iter()
            .filter(|(key, value)| key.as_str() != BASE_INFORMATION && value.is_table())
            .map(|(key, _)| key.as_str())
    }

    pub fn profile(&self, name: &str) -> Option<AgentProfile> {
        if name == BASE_INFORMATION {
            return None;
        }
        let section = self.table.get(name)?.as_table()?;
        let mission = section
            .get(MISSION)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Some(AgentProfile {
            name: name.to_string(),
            mission,
        })
    }

    pub fn selection(&self) -> ActiveSelection {
        let current = self.current_active();
        if current == NONE {
            return ActiveSelection::Idle;
        }
        match self.profile(current) {
            Some(profile) => ActiveSelection::Agent(profile),
            None => ActiveSelection::Unknown(current.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[base_information]
current_active = "atlas"

[atlas]
mission = "Keep the greenhouse alive."
temperament = "calm"

[hermes]
mission = "Deliver the post."
"#;

    #[test]
    fn selection_resolves_known_agent() {
        let config = SAMPLE.parse::<Table>().map(|table| ActiveAgentConfig { table }).unwrap();
        assert_eq!(
            config.selection(),
            ActiveSelection::Agent(AgentProfile {
                name: "atlas".into(),
                mission: "Keep the greenhouse alive.".into(),
            })
        );
        assert_eq!(config.agents().collect::<Vec<_>>(), vec!["atlas", "hermes"]);
    }

    #[test]
    fn selection_flags_unknown_and_none() {
        let mut config = SAMPLE.parse::<Table>().map(|table| ActiveAgentConfig { table }).unwrap();
        config.set_current_active("zeus");
        assert_eq!(config.selection(), ActiveSelection::Unknown("zeus".into()));
        config.set_current_active(NONE);
        assert_eq!(config.selection(), ActiveSelection::Idle);
    }

    #[test]
    fn base_information_is_not_an_agent() {
        let mut config = ActiveAgentConfig::default();
        config.set_current_active(BASE_INFORMATION);
        assert_eq!(config.selection(), ActiveSelection::Unknown(BASE_INFORMATION.into()));
    }

    #[test]
    fn save_preserves_unrelated_keys() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(".config");
        let mut config = SAMPLE.parse::<Table>().map(|table| ActiveAgentConfig { table }).unwrap();
        config.set_current_active("hermes");
        config.save(&path).unwrap();

        let reloaded = ActiveAgentConfig::load(&path).unwrap();
        assert_eq!(reloaded.current_active(), "hermes");
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("temperament"));
    }
}
