//! LayerActor - one layer of the hierarchy bound to its queue
//!
//! Deliveries are handled one at a time. Guidance and data are merged into
//! accumulators; when the gate opens a processing cycle is spawned so the
//! subscription keeps draining while the model is called. The `processing`
//! flag keeps a second cycle from starting until the first one finishes.

use crate::agents::AgentProfile;
use crate::error::PromptError;
use crate::generate::Generator;
use crate::injection::{VariableMap, VariableValue};
use crate::output::LayerOutput;
use crate::presets::LayerBehavior;
use crate::prompts::{self, keys, PromptPaths};
use ace_bus::{DeliveryHandler, Outbound};
use ace_core::{
    merge_messages, next_hop, BusMessage, Delivery, Direction, LayerMessage, LayerSubMessage,
    LayerType, MessageType, Queue,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

pub const POWER_ON_SELF_TEST: &str = "power_on_self_test";

/// Actor-wide settings that do not vary per layer kind.
#[derive(Debug, Clone)]
pub struct ActorSettings {
    pub max_retries: u32,
    pub stack_type: String,
    pub prompts: PromptPaths,
}

/// Mutable state, touched only under the actor's lock.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerState {
    pub guidance: Vec<LayerSubMessage>,
    pub data: Vec<LayerSubMessage>,
    pub first_run: bool,
    pub processing: bool,
}

/// What happened to a delivery.
#[derive(Debug)]
pub enum Dispatch {
    /// Command handling runs on its own task.
    Command(JoinHandle<()>),
    Cycle(JoinHandle<CycleOutcome>),
    /// Merged (or ignored) without starting a cycle.
    Buffered,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Output parsed; `sent` counts the messages handed to the outbound.
    Completed { sent: usize },
    /// Every attempt failed to produce parseable output.
    Exhausted { attempts: u32 },
    PromptFailed,
}

#[derive(Clone)]
pub struct LayerActor {
    inner: Arc<ActorInner>,
}

struct ActorInner {
    agent: AgentProfile,
    behavior: LayerBehavior,
    settings: ActorSettings,
    identity_prompt: String,
    generator: Arc<dyn Generator>,
    outbound: Arc<dyn Outbound>,
    state: Mutex<LayerState>,
}

impl LayerActor {
    /// Build the actor and its identity prompt. Fails if the prompt files
    /// cannot be loaded.
    pub fn new(
        agent: AgentProfile,
        behavior: LayerBehavior,
        settings: ActorSettings,
        generator: Arc<dyn Generator>,
        outbound: Arc<dyn Outbound>,
    ) -> Result<Self, PromptError> {
        let state = LayerState {
            guidance: behavior.default_guidance.clone(),
            data: behavior.default_data.clone(),
            first_run: true,
            processing: false,
        };
        let mut inner = ActorInner {
            agent,
            behavior,
            settings,
            identity_prompt: String::new(),
            generator,
            outbound,
            state: Mutex::new(state),
        };

        let variables = inner.variables(&inner.lock());
        inner.identity_prompt = prompts::build_identity_prompt(
            &inner.settings.prompts,
            inner.behavior.uses_mission,
            &variables,
        )?;
        debug!(
            "{} identity prompt:\n{}",
            inner.behavior.layer_type, inner.identity_prompt
        );

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    pub fn layer_type(&self) -> LayerType {
        self.inner.behavior.layer_type
    }

    pub fn queue(&self) -> Queue {
        self.inner.behavior.layer_type.queue()
    }

    pub fn agent(&self) -> &AgentProfile {
        &self.inner.agent
    }

    pub fn identity_prompt(&self) -> &str {
        &self.inner.identity_prompt
    }

    pub fn state(&self) -> LayerState {
        self.inner.lock().clone()
    }

    /// Route one decoded message through the state machine.
    pub fn on_message(&self, message: LayerMessage) -> Dispatch {
        let layer = self.layer_type();
        match message.message_type {
            MessageType::Commands => {
                let inner = Arc::clone(&self.inner);
                return Dispatch::Command(tokio::spawn(async move {
                    inner.run_commands(message).await;
                }));
            }
            MessageType::Guidance => {
                let mut state = self.inner.lock();
                state.guidance = merge_messages(&message.messages, &state.guidance);
                debug!("{} guidance now {} headings", layer, state.guidance.len());
            }
            MessageType::Data => {
                let mut state = self.inner.lock();
                state.data = merge_messages(&message.messages, &state.data);
                debug!("{} data now {} headings", layer, state.data.len());
            }
            MessageType::Internal | MessageType::Telemetry => {
                debug!("{} does not buffer {} messages", layer, message.message_type);
            }
        }

        match self.inner.try_begin_cycle() {
            Some(variables) => {
                let inner = Arc::clone(&self.inner);
                let span = info_span!("cycle", layer = %layer, cycle_id = %Uuid::new_v4());
                Dispatch::Cycle(tokio::spawn(inner.run_cycle(variables).instrument(span)))
            }
            None => Dispatch::Buffered,
        }
    }
}

#[async_trait::async_trait]
impl DeliveryHandler for LayerActor {
    async fn handle(&self, queue: Queue, payload: &[u8]) {
        let delivery = match Delivery::decode(payload) {
            Ok(delivery) => delivery,
            Err(e) => {
                warn!("Dropping malformed delivery on {}: {}", queue, e);
                return;
            }
        };
        info!(
            "Received {} ({} headings) on {} from {}",
            delivery.layer_message.message_type,
            delivery.layer_message.messages.len(),
            queue,
            delivery
                .source_queue
                .map(|q| q.as_str())
                .unwrap_or("controller"),
        );
        // Spawned work outlives this call; the subscription moves on.
        let _ = self.on_message(delivery.layer_message);
    }
}

// ============================================================
// Inner: gate, cycle, commands
// ============================================================

impl ActorInner {
    fn lock(&self) -> MutexGuard<'_, LayerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn variables(&self, state: &LayerState) -> VariableMap {
        let telemetry = self
            .behavior
            .telemetry
            .iter()
            .map(|t| t.as_str().to_string())
            .collect();
        let mut variables = VariableMap::new();
        variables.insert(keys::NAME.into(), VariableValue::Text(self.agent.name.clone()));
        variables.insert(
            keys::LAYER_TYPE.into(),
            VariableValue::Text(self.behavior.layer_type.as_str().into()),
        );
        variables.insert(keys::GUIDANCE.into(), VariableValue::Messages(state.guidance.clone()));
        variables.insert(keys::DATA.into(), VariableValue::Messages(state.data.clone()));
        variables.insert(keys::TELEMETRY.into(), VariableValue::Labels(telemetry));
        if self.behavior.uses_mission {
            variables.insert(keys::MISSION.into(), VariableValue::Text(self.agent.mission.clone()));
        }
        variables
    }

    /// Check the gate and, if open, claim the cycle. Returns the variable
    /// snapshot for the prompt; the accumulators are back at their defaults.
    fn try_begin_cycle(&self) -> Option<VariableMap> {
        let layer = self.behavior.layer_type;
        let mut state = self.lock();
        if state.processing {
            debug!("{} still processing", layer);
            return None;
        }

        let has_guidance = state.guidance != self.behavior.default_guidance;
        let ready = if self.behavior.has_data {
            has_guidance && state.data != self.behavior.default_data
        } else {
            has_guidance
        };
        if !(ready || state.first_run) {
            debug!("{} waiting for enough guidance and data", layer);
            return None;
        }

        state.first_run = false;
        state.processing = true;
        let variables = self.variables(&state);
        state.guidance = self.behavior.default_guidance.clone();
        state.data = self.behavior.default_data.clone();
        info!("Processing {}", layer);
        Some(variables)
    }

    async fn run_cycle(self: Arc<Self>, variables: VariableMap) -> CycleOutcome {
        let _processing = ProcessingGuard(&self);

        let prompt = match prompts::build_output_prompt(
            &self.identity_prompt,
            &self.settings.prompts,
            &variables,
        ) {
            Ok(prompt) => prompt,
            Err(e) => {
                error!("Failed to build output prompt: {}", e);
                return CycleOutcome::PromptFailed;
            }
        };
        debug!("Output response prompt:\n{}", prompt);

        let Some(output) = self.generate_output(&prompt).await else {
            let attempts = self.settings.max_retries;
            warn!(
                "No usable output from {} after {} attempts",
                self.behavior.layer_type, attempts
            );
            return CycleOutcome::Exhausted { attempts };
        };
        info!(reasoning = %output.reasoning, "Model reasoning");

        let mut sent = 0;
        for (direction, message) in [
            (Direction::Southbound, output.southbound),
            (Direction::Northbound, output.northbound),
        ] {
            if let Some(message) = message {
                if self.send(direction, message).await {
                    sent += 1;
                }
            }
        }
        CycleOutcome::Completed { sent }
    }

    async fn generate_output(&self, prompt: &str) -> Option<LayerOutput> {
        let max = self.settings.max_retries;
        for attempt in 1..=max {
            match self.generator.generate(&self.settings.stack_type, prompt).await {
                Ok(text) => match LayerOutput::parse(&text) {
                    Ok(output) => return Some(output),
                    Err(e) => warn!(attempt, max, "Unparseable model output: {}", e),
                },
                Err(e) => warn!(attempt, max, "Generation failed: {}", e),
            }
        }
        None
    }

    /// Send unless this layer is the end of the line for `direction`.
    async fn send(&self, direction: Direction, message: LayerMessage) -> bool {
        let queue = self.behavior.layer_type.queue();
        if next_hop(direction, queue).is_none() {
            debug!("{} has no {} destination, not sending", queue, direction);
            return false;
        }
        match self
            .outbound
            .send(direction, BusMessage::new(queue, message))
            .await
        {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to send {} from {}: {}", direction, queue, e);
                false
            }
        }
    }

    async fn run_commands(&self, message: LayerMessage) {
        let queue = self.behavior.layer_type.queue();
        let actions: Vec<String> = message.headings().map(str::to_string).collect();
        for action in actions {
            match action.as_str() {
                POWER_ON_SELF_TEST => {
                    info!("{} passing {} down", queue, action);
                    self.send(Direction::Southbound, message.clone()).await;
                }
                _ => warn!("{} does not match any known layer action", action),
            }
        }
    }
}

/// Clears `processing` when the cycle ends, however it ends.
struct ProcessingGuard<'a>(&'a ActorInner);

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.lock().processing = false;
    }
}
