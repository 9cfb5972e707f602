//! ConfigSupervisor - owns the running actor and swaps it on config change
//!
//! Watcher events arrive on a channel and are handled one at a time by the
//! supervisor's own loop. An invalid `current_active` is written back to the
//! last good value and the running actor is left alone. Once an actor has
//! reached running state, its loop ending is fatal and `run` returns an error.

use crate::actor::{ActorSettings, LayerActor};
use crate::agents::{ActiveAgentConfig, ActiveSelection, AgentProfile};
use crate::config::{OutboundMode, RuntimeConfig};
use crate::error::{LaunchError, SupervisorError};
use crate::generate::Generator;
use crate::presets::LayerBehavior;
use crate::prompts::PromptPaths;
use crate::watcher::ConfigChanged;
use ace_bus::{BusClient, BusOutbound, ForwardingOutbound, Outbound};
use ace_core::{LayerType, NONE};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// How long a stopping actor gets before its task is aborted.
const STOP_GRACE: Duration = Duration::from_secs(5);

/// Starts the actor for one agent and runs it until cancelled.
#[async_trait::async_trait]
pub trait LayerLauncher: Send + Sync {
    /// Set `running` once the actor is consuming its queue. Return only when
    /// `cancel` fires or the actor fails.
    async fn launch(
        &self,
        agent: AgentProfile,
        running: Arc<AtomicBool>,
        cancel: CancellationToken,
    ) -> Result<(), LaunchError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// Unknown agent; the file was restored to `restored`.
    Rejected { requested: String, restored: String },
    /// The file could not be read or parsed; nothing changed.
    Unreadable,
    Unchanged,
    Switched { from: String, to: String },
    /// The active agent's actor was gone and has been launched again.
    Restarted { agent: String },
    Stopped { from: String },
}

struct ActorHandle {
    agent: String,
    cancel: CancellationToken,
    running: Arc<AtomicBool>,
    task: JoinHandle<Result<(), LaunchError>>,
}

enum Step {
    Shutdown,
    Changed,
    WatcherClosed,
    ActorExited(Result<Result<(), LaunchError>, JoinError>),
}

pub struct ConfigSupervisor {
    config_path: PathBuf,
    launcher: Arc<dyn LayerLauncher>,
    /// Last `current_active` accepted from the file.
    active: String,
    current: Option<ActorHandle>,
}

impl ConfigSupervisor {
    pub fn new(config_path: impl Into<PathBuf>, launcher: Arc<dyn LayerLauncher>) -> Self {
        Self {
            config_path: config_path.into(),
            launcher,
            active: NONE.to_string(),
            current: None,
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Last accepted agent name, or "none".
    pub fn active(&self) -> &str {
        &self.active
    }

    /// Agent whose actor task is still alive.
    pub fn running_agent(&self) -> Option<&str> {
        self.current
            .as_ref()
            .filter(|handle| !handle.task.is_finished())
            .map(|handle| handle.agent.as_str())
    }

    /// Read the config (creating it if missing) and start the active agent.
    /// An unknown name is replaced with "none".
    pub async fn start(&mut self) -> Result<(), SupervisorError> {
        let mut config = ActiveAgentConfig::load_or_create(&self.config_path)?;
        match config.selection() {
            ActiveSelection::Unknown(name) => {
                warn!("Unknown active agent {} at startup, resetting to {}", name, NONE);
                config.set_current_active(NONE);
                config.save(&self.config_path)?;
            }
            ActiveSelection::Idle => info!("No active agent configured"),
            ActiveSelection::Agent(profile) => {
                self.active = profile.name.clone();
                self.launch(profile);
            }
        }
        Ok(())
    }

    /// Apply the file's current contents.
    pub async fn handle_config_change(&mut self) -> Result<ReloadOutcome, SupervisorError> {
        let mut config = match ActiveAgentConfig::load(&self.config_path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring config change: {}", e);
                return Ok(ReloadOutcome::Unreadable);
            }
        };

        match config.selection() {
            ActiveSelection::Unknown(requested) => {
                warn!(
                    "Active agent {} does not exist, restoring {}",
                    requested, self.active
                );
                config.set_current_active(&self.active);
                config.save(&self.config_path)?;
                Ok(ReloadOutcome::Rejected {
                    requested,
                    restored: self.active.clone(),
                })
            }
            ActiveSelection::Idle if self.active == NONE => Ok(ReloadOutcome::Unchanged),
            ActiveSelection::Idle => {
                let from = std::mem::replace(&mut self.active, NONE.to_string());
                info!("Stopping {}, no agent active", from);
                self.stop().await;
                Ok(ReloadOutcome::Stopped { from })
            }
            ActiveSelection::Agent(profile) if profile.name == self.active => {
                if self.running_agent() == Some(profile.name.as_str()) {
                    debug!("{} already running", profile.name);
                    return Ok(ReloadOutcome::Unchanged);
                }
                info!("{} selected again but not running, relaunching", profile.name);
                self.stop().await;
                let agent = profile.name.clone();
                self.launch(profile);
                Ok(ReloadOutcome::Restarted { agent })
            }
            ActiveSelection::Agent(profile) => {
                let from = std::mem::replace(&mut self.active, profile.name.clone());
                info!("Switching active agent {} -> {}", from, profile.name);
                self.stop().await;
                let to = profile.name.clone();
                self.launch(profile);
                Ok(ReloadOutcome::Switched { from, to })
            }
        }
    }

    /// Run until `shutdown` fires, applying every change event in order.
    pub async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<ConfigChanged>,
        shutdown: CancellationToken,
    ) -> Result<(), SupervisorError> {
        let mut watching = true;
        loop {
            let step = tokio::select! {
                _ = shutdown.cancelled() => Step::Shutdown,
                event = events.recv(), if watching => match event {
                    Some(ConfigChanged) => Step::Changed,
                    None => Step::WatcherClosed,
                },
                result = actor_exit(&mut self.current) => Step::ActorExited(result),
            };

            match step {
                Step::Shutdown => {
                    info!("Supervisor shutting down");
                    self.stop().await;
                    return Ok(());
                }
                Step::Changed => {
                    let outcome = self.handle_config_change().await?;
                    debug!("Reload: {:?}", outcome);
                }
                Step::WatcherClosed => {
                    warn!("Config watcher closed, hot reload disabled");
                    watching = false;
                }
                Step::ActorExited(result) => {
                    let Some(handle) = self.current.take() else {
                        continue;
                    };
                    let reason = match result {
                        Ok(Ok(())) => "actor stopped unexpectedly".to_string(),
                        Ok(Err(e)) => e.to_string(),
                        Err(e) => e.to_string(),
                    };
                    if handle.running.load(Ordering::SeqCst) {
                        error!("Actor for {} died: {}", handle.agent, reason);
                        return Err(SupervisorError::ActorFailed {
                            agent: handle.agent,
                            reason,
                        });
                    }
                    error!("Actor for {} failed to start: {}", handle.agent, reason);
                }
            }
        }
    }

    fn launch(&mut self, agent: AgentProfile) {
        info!("Starting actor for {}", agent.name);
        let cancel = CancellationToken::new();
        let running = Arc::new(AtomicBool::new(false));
        let name = agent.name.clone();
        let launcher = Arc::clone(&self.launcher);
        let task = tokio::spawn({
            let cancel = cancel.clone();
            let running = Arc::clone(&running);
            async move { launcher.launch(agent, running, cancel).await }
        });
        self.current = Some(ActorHandle {
            agent: name,
            cancel,
            running,
            task,
        });
    }

    /// Cancel the current actor and give it a moment to unwind. Errors are
    /// logged, never returned.
    async fn stop(&mut self) {
        let Some(mut handle) = self.current.take() else {
            return;
        };
        handle.cancel.cancel();
        match tokio::time::timeout(STOP_GRACE, &mut handle.task).await {
            Ok(Ok(Ok(()))) => info!("Stopped actor for {}", handle.agent),
            Ok(Ok(Err(e))) => warn!("Actor for {} stopped with error: {}", handle.agent, e),
            Ok(Err(e)) => warn!("Actor task for {} failed: {}", handle.agent, e),
            Err(_) => {
                warn!("Actor for {} did not stop in time, aborting", handle.agent);
                handle.task.abort();
            }
        }
    }
}

async fn actor_exit(
    current: &mut Option<ActorHandle>,
) -> Result<Result<(), LaunchError>, JoinError> {
    match current {
        Some(handle) => (&mut handle.task).await,
        None => std::future::pending().await,
    }
}

// ============================================================
// Production launcher
// ============================================================

/// Connects to the broker, builds the actor, and drains its queue.
pub struct BusLauncher {
    config: RuntimeConfig,
    layer_type: LayerType,
    generator: Arc<dyn Generator>,
}

impl BusLauncher {
    pub fn new(config: RuntimeConfig, layer_type: LayerType, generator: Arc<dyn Generator>) -> Self {
        Self {
            config,
            layer_type,
            generator,
        }
    }

    async fn connect(&self) -> Result<Arc<BusClient>, LaunchError> {
        let bus = &self.config.bus;
        if bus.startup_delay_secs > 0 {
            debug!("Waiting {}s before connecting", bus.startup_delay_secs);
            tokio::time::sleep(Duration::from_secs(bus.startup_delay_secs)).await;
        }
        Ok(Arc::new(BusClient::connect(&bus.address, &bus.backoff()).await?))
    }
}

#[async_trait::async_trait]
impl LayerLauncher for BusLauncher {
    async fn launch(
        &self,
        agent: AgentProfile,
        running: Arc<AtomicBool>,
        cancel: CancellationToken,
    ) -> Result<(), LaunchError> {
        let client = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            client = self.connect() => client?,
        };

        let outbound: Arc<dyn Outbound> = match self.config.layer.outbound {
            OutboundMode::Bus => Arc::new(BusOutbound::new(Arc::clone(&client))),
            OutboundMode::Forward => Arc::new(ForwardingOutbound::new(&self.config.controller.url)),
        };
        let settings = ActorSettings {
            max_retries: self.config.layer.max_retries,
            stack_type: self.config.model_provider.stack_type.clone(),
            prompts: PromptPaths::new(&self.config.layer.prompts_dir),
        };
        let actor = LayerActor::new(
            agent,
            LayerBehavior::for_layer(self.layer_type),
            settings,
            Arc::clone(&self.generator),
            outbound,
        )?;

        let subscription = client.subscribe(actor.queue()).await?;
        running.store(true, Ordering::SeqCst);
        info!("{} running for {}", actor.queue(), actor.agent().name);

        let result = subscription.drain(&actor, cancel).await;
        drop(actor);
        // In-flight cycles may still hold the client; only flush if we are last.
        if let Ok(client) = Arc::try_unwrap(client) {
            client.close().await;
        }
        result.map_err(LaunchError::from)
    }
}
