//! ACE Layer - layer actors, prompt building, and the hot-reloading supervisor

pub mod actor;
pub mod agents;
pub mod config;
pub mod error;
pub mod generate;
pub mod injection;
pub mod output;
pub mod presets;
pub mod prompts;
pub mod supervisor;
pub mod watcher;

pub use actor::{ActorSettings, CycleOutcome, Dispatch, LayerActor, LayerState};
pub use agents::{ActiveAgentConfig, ActiveSelection, AgentProfile};
pub use config::{OutboundMode, RuntimeConfig};
pub use error::{ConfigError, GenerateError, LaunchError, OutputError, PromptError, SupervisorError};
pub use generate::{Generator, ModelProviderClient};
pub use injection::{build_prompt, Injection, InjectionMap, VariableMap, VariableValue};
pub use output::LayerOutput;
pub use presets::LayerBehavior;
pub use prompts::PromptPaths;
pub use supervisor::{BusLauncher, ConfigSupervisor, LayerLauncher, ReloadOutcome};
pub use watcher::{ConfigChanged, ConfigWatcher};
