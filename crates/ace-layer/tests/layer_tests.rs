//! Tests for ace-layer: injection, actor gate and retry loop, commands, and
//! config supervision. Collaborators are faked through the crate's traits.

use ace_bus::{BusError, BusResult, DeliveryHandler, Outbound};
use ace_core::{BusMessage, Direction, LayerMessage, LayerSubMessage, LayerType, MessageType, Queue};
use ace_layer::*;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

const VALID: &str = "```toml\n[internal]\nreasoning = \"all good\"\n\n[southbound]\nplan = [\"go\"]\n\n[northbound]\nstatus = [\"fine\"]\n```";

fn sub(heading: &str, content: &[&str]) -> LayerSubMessage {
    LayerSubMessage::new(heading, content.iter().map(|s| s.to_string()).collect())
}

fn message(message_type: MessageType, heading: &str, content: &[&str]) -> LayerMessage {
    LayerMessage::new(message_type, vec![sub(heading, content)])
}

async fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

// ===========================================================================
// Fixtures
// ===========================================================================

/// A prompts directory with short, recognizable files.
fn prompts_fixture() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    std::fs::create_dir_all(root.join("identities")).unwrap();
    std::fs::create_dir_all(root.join("responses/schemas")).unwrap();
    std::fs::write(
        root.join("layer"),
        "{{ context }}\n{{ identity }}\nG:\n{{ guidance }}\nD:\n{{ data }}\nT:\n{{ telemetry }}\n{{ response_format }}",
    )
    .unwrap();
    std::fs::write(root.join("ace_context"), "CONTEXT").unwrap();
    for layer in LayerType::ALL {
        std::fs::write(root.join("identities").join(layer.as_str()), format!("IDENTITY {}", layer)).unwrap();
        std::fs::write(root.join("responses/schemas").join(layer.as_str()), format!("SCHEMA {}", layer)).unwrap();
    }
    std::fs::write(root.join("identities/aspirational"), "IDENTITY aspirational: {{ mission }}").unwrap();
    std::fs::write(root.join("responses/response_format"), "FORMAT {{ schema }}").unwrap();
    dir
}

/// Replies from a script, then repeats the fallback. A semaphore can hold
/// each call until the test releases it.
struct ScriptedGenerator {
    script: Mutex<VecDeque<String>>,
    fallback: String,
    calls: AtomicU32,
    prompts: Mutex<Vec<String>>,
    gate: Option<Semaphore>,
}

impl ScriptedGenerator {
    fn always(reply: &str) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: reply.to_string(),
            calls: AtomicU32::new(0),
            prompts: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    fn scripted(replies: &[&str], fallback: &str) -> Self {
        let generator = Self::always(fallback);
        generator
            .script
            .lock()
            .unwrap()
            .extend(replies.iter().map(|r| r.to_string()));
        generator
    }

    fn gated(reply: &str) -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::always(reply)
        }
    }

    fn release(&self, calls: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(calls);
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, _stack_type: &str, system_prompt: &str) -> Result<String, GenerateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(system_prompt.to_string());
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        let next = self.script.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| self.fallback.clone()))
    }
}

#[derive(Default)]
struct RecordingOutbound {
    sent: Mutex<Vec<(Direction, BusMessage)>>,
}

impl RecordingOutbound {
    fn sent(&self) -> Vec<(Direction, BusMessage)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Outbound for RecordingOutbound {
    async fn send(&self, direction: Direction, message: BusMessage) -> BusResult<()> {
        self.sent.lock().unwrap().push((direction, message));
        Ok(())
    }
}

struct Harness {
    _prompts: TempDir,
    actor: LayerActor,
    generator: Arc<ScriptedGenerator>,
    outbound: Arc<RecordingOutbound>,
}

fn harness(layer: LayerType, generator: ScriptedGenerator) -> Harness {
    let prompts = prompts_fixture();
    let generator = Arc::new(generator);
    let outbound = Arc::new(RecordingOutbound::default());
    let actor = LayerActor::new(
        AgentProfile {
            name: "atlas".into(),
            mission: "keep the lights on".into(),
        },
        LayerBehavior::for_layer(layer),
        ActorSettings {
            max_retries: 3,
            stack_type: "generalist".into(),
            prompts: PromptPaths::new(prompts.path()),
        },
        generator.clone(),
        outbound.clone(),
    )
    .unwrap();
    Harness {
        _prompts: prompts,
        actor,
        generator,
        outbound,
    }
}

async fn expect_cycle(dispatch: Dispatch) -> CycleOutcome {
    match dispatch {
        Dispatch::Cycle(handle) => handle.await.unwrap(),
        other => panic!("expected a cycle, got {:?}", other),
    }
}

/// Spend the first-run bootstrap so the gate is in its steady state.
async fn bootstrap(h: &Harness) {
    h.generator.release(1);
    let outcome = expect_cycle(h.actor.on_message(message(MessageType::Internal, "boot", &[]))).await;
    assert!(matches!(outcome, CycleOutcome::Completed { .. }));
    h.outbound.sent.lock().unwrap().clear();
}

// ===========================================================================
// Injection engine
// ===========================================================================

fn child(_: &[VariableValue]) -> String {
    "child".into()
}

fn parent(_: &[VariableValue]) -> String {
    "parent".into()
}

#[test]
fn nested_file_map_resolves_before_parent_substitution() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("outer");
    std::fs::write(&file, "[{{ inner }}] {{ unknown }}").unwrap();

    let nested = InjectionMap::new().with(
        "inner",
        Injection::Method {
            function: child,
            arguments: vec![],
        },
    );
    let map = InjectionMap::new()
        .with(
            "outer",
            Injection::File {
                path: file,
                nested: Some(nested),
            },
        )
        .with(
            "inner",
            Injection::Method {
                function: parent,
                arguments: vec![],
            },
        );

    let out = build_prompt("{{ outer }} {{ stray }}", &map, Some(&VariableMap::new())).unwrap();
    assert_eq!(out, "[child] {{ unknown }} {{ stray }}");
}

#[test]
fn missing_file_reports_path() {
    let map = InjectionMap::new().with(
        "context",
        Injection::File {
            path: "/definitely/not/here".into(),
            nested: None,
        },
    );
    let err = build_prompt("{{ context }}", &map, None).unwrap_err();
    assert!(matches!(err, PromptError::Io { path, .. } if path == Path::new("/definitely/not/here")));
}

// ===========================================================================
// Actor: prompts
// ===========================================================================

#[tokio::test]
async fn identity_prompt_carries_mission_and_keeps_cycle_placeholders() {
    let h = harness(LayerType::Aspirational, ScriptedGenerator::always(VALID));
    let identity = h.actor.identity_prompt();
    assert!(identity.starts_with("CONTEXT\nIDENTITY aspirational: keep the lights on"));
    assert!(identity.contains("{{ guidance }}"));
    assert!(identity.contains("{{ response_format }}"));
}

#[tokio::test]
async fn output_prompt_renders_inputs_telemetry_and_schema() {
    let h = harness(LayerType::GlobalStrategy, ScriptedGenerator::always(VALID));
    let outcome = expect_cycle(
        h.actor
            .on_message(message(MessageType::Guidance, "next_steps", &["scout", "report"])),
    )
    .await;
    assert_eq!(outcome, CycleOutcome::Completed { sent: 2 });

    let prompt = h.generator.prompts.lock().unwrap()[0].clone();
    assert!(prompt.contains("G:\n### Next_Steps\n- scout\n- report\n\n"));
    assert!(prompt.contains("T:\n- time\n"));
    assert!(prompt.contains("FORMAT SCHEMA global_strategy"));
    assert!(!prompt.contains("{{"));
}

// ===========================================================================
// Actor: gate
// ===========================================================================

#[tokio::test]
async fn first_message_bootstraps_a_cycle() {
    let h = harness(LayerType::GlobalStrategy, ScriptedGenerator::always(VALID));
    let outcome = expect_cycle(h.actor.on_message(message(MessageType::Data, "status", &["ok"]))).await;
    assert_eq!(outcome, CycleOutcome::Completed { sent: 2 });

    let sent = h.outbound.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].0, Direction::Southbound);
    assert_eq!(sent[0].1.source_queue, Queue::GlobalStrategy);
    assert_eq!(sent[0].1.layer_message.message_type, MessageType::Guidance);
    assert_eq!(sent[1].0, Direction::Northbound);
    assert_eq!(sent[1].1.layer_message.message_type, MessageType::Data);

    let state = h.actor.state();
    assert!(!state.first_run);
    assert!(!state.processing);
}

#[tokio::test]
async fn gate_starts_exactly_one_cycle() {
    let h = harness(LayerType::ExecutiveFunction, ScriptedGenerator::gated(VALID));
    bootstrap(&h).await;

    // Guidance alone is not enough for a layer that consumes data.
    let dispatch = h.actor.on_message(message(MessageType::Guidance, "plan", &["a"]));
    assert!(matches!(dispatch, Dispatch::Buffered));

    let cycle = h.actor.on_message(message(MessageType::Data, "status", &["b"]));
    let Dispatch::Cycle(cycle) = cycle else {
        panic!("expected the gate to open");
    };
    assert!(h.actor.state().processing);
    assert!(h.actor.state().guidance.is_empty());

    // Both accumulators are non-default again, but a cycle is in flight.
    assert!(matches!(
        h.actor.on_message(message(MessageType::Guidance, "plan", &["c"])),
        Dispatch::Buffered
    ));
    assert!(matches!(
        h.actor.on_message(message(MessageType::Data, "status", &["d"])),
        Dispatch::Buffered
    ));

    h.generator.release(1);
    assert_eq!(cycle.await.unwrap(), CycleOutcome::Completed { sent: 2 });
    // One bootstrap call plus one gated cycle.
    assert_eq!(h.generator.calls(), 2);

    let state = h.actor.state();
    assert!(!state.processing);
    assert_eq!(state.guidance, vec![sub("plan", &["c"])]);
    assert_eq!(state.data, vec![sub("status", &["d"])]);
}

#[tokio::test]
async fn guidance_merges_until_the_gate_opens() {
    let h = harness(LayerType::AgentModel, ScriptedGenerator::always(VALID));
    bootstrap(&h).await;

    h.actor.on_message(message(MessageType::Guidance, "x", &["a"]));
    h.actor.on_message(message(MessageType::Guidance, "y", &["1"]));
    h.actor.on_message(message(MessageType::Guidance, "x", &["b"]));
    assert_eq!(
        h.actor.state().guidance,
        vec![sub("x", &["a", "b"]), sub("y", &["1"])]
    );
}

#[tokio::test]
async fn task_prosecution_gates_on_guidance_and_only_reports_up() {
    let h = harness(LayerType::TaskProsecution, ScriptedGenerator::always(VALID));
    bootstrap(&h).await;

    let outcome = expect_cycle(h.actor.on_message(message(MessageType::Guidance, "task", &["dig"]))).await;
    assert_eq!(outcome, CycleOutcome::Completed { sent: 1 });
    let sent = h.outbound.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, Direction::Northbound);
}

#[tokio::test]
async fn aspirational_default_guidance_does_not_open_gate() {
    let h = harness(LayerType::Aspirational, ScriptedGenerator::always(VALID));
    bootstrap(&h).await;
    assert_eq!(h.actor.state().guidance, vec![sub("none", &[""])]);

    let dispatch = h.actor.on_message(message(MessageType::Data, "status", &["ok"]));
    assert!(matches!(dispatch, Dispatch::Buffered));
}

// ===========================================================================
// Actor: retry loop
// ===========================================================================

#[tokio::test]
async fn unparseable_output_exhausts_retries_without_publishing() {
    let h = harness(LayerType::GlobalStrategy, ScriptedGenerator::always("I would rather chat."));
    let outcome = expect_cycle(h.actor.on_message(message(MessageType::Guidance, "plan", &["a"]))).await;

    assert_eq!(outcome, CycleOutcome::Exhausted { attempts: 3 });
    assert_eq!(h.generator.calls(), 3);
    assert!(h.outbound.sent().is_empty());
    assert!(!h.actor.state().processing);
}

#[tokio::test]
async fn retry_recovers_within_budget() {
    let h = harness(
        LayerType::GlobalStrategy,
        ScriptedGenerator::scripted(&["nope", "[southbound]\nplan = \"no reasoning\""], VALID),
    );
    let outcome = expect_cycle(h.actor.on_message(message(MessageType::Guidance, "plan", &["a"]))).await;
    assert_eq!(outcome, CycleOutcome::Completed { sent: 2 });
    assert_eq!(h.generator.calls(), 3);
}

// ===========================================================================
// Actor: commands and deliveries
// ===========================================================================

#[tokio::test]
async fn self_test_command_is_sent_south_without_touching_state() {
    let h = harness(LayerType::Aspirational, ScriptedGenerator::always(VALID));
    let command = message(MessageType::Commands, "power_on_self_test", &[]);
    let Dispatch::Command(handle) = h.actor.on_message(command.clone()) else {
        panic!("expected command dispatch");
    };
    handle.await.unwrap();

    let sent = h.outbound.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, Direction::Southbound);
    assert_eq!(sent[0].1.source_queue, Queue::Aspirational);
    assert_eq!(sent[0].1.layer_message, command);
    assert!(h.actor.state().first_run);
    assert_eq!(h.generator.calls(), 0);
}

#[tokio::test]
async fn unknown_command_sends_nothing() {
    let h = harness(LayerType::Aspirational, ScriptedGenerator::always(VALID));
    let Dispatch::Command(handle) = h.actor.on_message(message(MessageType::Commands, "dance", &[])) else {
        panic!("expected command dispatch");
    };
    handle.await.unwrap();
    assert!(h.outbound.sent().is_empty());
}

#[tokio::test]
async fn malformed_delivery_is_dropped() {
    let h = harness(LayerType::GlobalStrategy, ScriptedGenerator::always(VALID));
    h.actor.handle(Queue::GlobalStrategy, b"not json").await;
    h.actor
        .handle(
            Queue::GlobalStrategy,
            br#"{"message_type":"guidance","messages":[{"heading":" ","content":"x"}]}"#,
        )
        .await;
    let state = h.actor.state();
    assert!(state.first_run);
    assert!(state.guidance.is_empty());
}

#[tokio::test]
async fn bare_delivery_is_merged() {
    let h = harness(LayerType::GlobalStrategy, ScriptedGenerator::always(VALID));
    bootstrap(&h).await;
    h.actor
        .handle(
            Queue::GlobalStrategy,
            br#"{"message_type":"guidance","messages":[{"heading":"plan","content":"rest"}]}"#,
        )
        .await;
    assert_eq!(h.actor.state().guidance, vec![sub("plan", &["rest"])]);
}

// ===========================================================================
// Supervisor
// ===========================================================================

#[derive(Clone, Copy, PartialEq)]
enum LaunchMode {
    RunUntilCancelled,
    DieAfterRunning,
    FailToStart,
}

struct FakeLauncher {
    mode: LaunchMode,
    launched: Mutex<Vec<String>>,
    stopped: AtomicU32,
}

impl FakeLauncher {
    fn new(mode: LaunchMode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            launched: Mutex::new(Vec::new()),
            stopped: AtomicU32::new(0),
        })
    }

    fn launched(&self) -> Vec<String> {
        self.launched.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LayerLauncher for FakeLauncher {
    async fn launch(
        &self,
        agent: AgentProfile,
        running: Arc<AtomicBool>,
        cancel: CancellationToken,
    ) -> Result<(), LaunchError> {
        self.launched.lock().unwrap().push(agent.name);
        match self.mode {
            LaunchMode::FailToStart => {
                Err(BusError::Connect("connection refused".into()).into())
            }
            LaunchMode::DieAfterRunning => {
                running.store(true, Ordering::SeqCst);
                Err(BusError::SubscriptionClosed(Queue::Aspirational).into())
            }
            LaunchMode::RunUntilCancelled => {
                running.store(true, Ordering::SeqCst);
                cancel.cancelled().await;
                self.stopped.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }
    }
}

const AGENTS: &str = r#"[base_information]
current_active = "atlas"

[atlas]
mission = "Keep the greenhouse alive."
notes = "keep me"

[hermes]
mission = "Deliver the post."
"#;

fn agents_fixture(content: &str) -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(".config");
    std::fs::write(&path, content).unwrap();
    (dir, path)
}

fn set_active(path: &Path, name: &str) {
    let mut config = ActiveAgentConfig::load(path).unwrap();
    config.set_current_active(name);
    config.save(path).unwrap();
}

#[tokio::test]
async fn reload_to_unknown_agent_reverts_file_and_keeps_actor() {
    let (_dir, path) = agents_fixture(AGENTS);
    let launcher = FakeLauncher::new(LaunchMode::RunUntilCancelled);
    let mut supervisor = ConfigSupervisor::new(&path, launcher.clone());
    supervisor.start().await.unwrap();
    wait_for(|| launcher.launched().len() == 1).await;

    set_active(&path, "zeus");
    let outcome = supervisor.handle_config_change().await.unwrap();
    assert_eq!(
        outcome,
        ReloadOutcome::Rejected {
            requested: "zeus".into(),
            restored: "atlas".into(),
        }
    );

    let config = ActiveAgentConfig::load(&path).unwrap();
    assert_eq!(config.current_active(), "atlas");
    assert!(std::fs::read_to_string(&path).unwrap().contains("keep me"));
    assert_eq!(launcher.launched(), vec!["atlas"]);
    assert_eq!(launcher.stopped.load(Ordering::SeqCst), 0);
    assert_eq!(supervisor.running_agent(), Some("atlas"));
}

#[tokio::test]
async fn reload_switches_and_stops_agents() {
    let (_dir, path) = agents_fixture(AGENTS);
    let launcher = FakeLauncher::new(LaunchMode::RunUntilCancelled);
    let mut supervisor = ConfigSupervisor::new(&path, launcher.clone());
    supervisor.start().await.unwrap();

    assert_eq!(
        supervisor.handle_config_change().await.unwrap(),
        ReloadOutcome::Unchanged
    );

    set_active(&path, "hermes");
    assert_eq!(
        supervisor.handle_config_change().await.unwrap(),
        ReloadOutcome::Switched {
            from: "atlas".into(),
            to: "hermes".into(),
        }
    );
    wait_for(|| launcher.launched().len() == 2).await;
    assert_eq!(launcher.stopped.load(Ordering::SeqCst), 1);
    assert_eq!(supervisor.active(), "hermes");

    set_active(&path, "none");
    assert_eq!(
        supervisor.handle_config_change().await.unwrap(),
        ReloadOutcome::Stopped {
            from: "hermes".into()
        }
    );
    assert_eq!(launcher.stopped.load(Ordering::SeqCst), 2);
    assert_eq!(supervisor.running_agent(), None);
}

#[tokio::test]
async fn unreadable_config_changes_nothing() {
    let (_dir, path) = agents_fixture(AGENTS);
    let launcher = FakeLauncher::new(LaunchMode::RunUntilCancelled);
    let mut supervisor = ConfigSupervisor::new(&path, launcher.clone());
    supervisor.start().await.unwrap();

    std::fs::write(&path, "[base_information\ncurrent_active = ").unwrap();
    assert_eq!(
        supervisor.handle_config_change().await.unwrap(),
        ReloadOutcome::Unreadable
    );
    assert_eq!(supervisor.active(), "atlas");
}

#[tokio::test]
async fn start_creates_missing_config_and_resets_unknown() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("layers").join(".config");
    let launcher = FakeLauncher::new(LaunchMode::RunUntilCancelled);
    let mut supervisor = ConfigSupervisor::new(&path, launcher.clone());
    supervisor.start().await.unwrap();
    assert_eq!(ActiveAgentConfig::load(&path).unwrap().current_active(), "none");
    assert!(launcher.launched().is_empty());

    let (_dir, path) = agents_fixture(&AGENTS.replace("\"atlas\"\n\n[atlas]", "\"zeus\"\n\n[atlas]"));
    let mut supervisor = ConfigSupervisor::new(&path, launcher.clone());
    supervisor.start().await.unwrap();
    assert_eq!(ActiveAgentConfig::load(&path).unwrap().current_active(), "none");
    assert_eq!(supervisor.active(), "none");
}

#[tokio::test]
async fn running_actor_death_is_fatal() {
    let (_dir, path) = agents_fixture(AGENTS);
    let launcher = FakeLauncher::new(LaunchMode::DieAfterRunning);
    let mut supervisor = ConfigSupervisor::new(&path, launcher.clone());
    supervisor.start().await.unwrap();

    let (_tx, rx) = mpsc::unbounded_channel::<ConfigChanged>();
    let result = tokio::time::timeout(
        Duration::from_secs(5),
        supervisor.run(rx, CancellationToken::new()),
    )
    .await
    .unwrap();
    assert!(matches!(
        result,
        Err(SupervisorError::ActorFailed { agent, .. }) if agent == "atlas"
    ));
}

#[tokio::test]
async fn startup_failure_is_logged_not_fatal() {
    let (_dir, path) = agents_fixture(AGENTS);
    let launcher = FakeLauncher::new(LaunchMode::FailToStart);
    let mut supervisor = ConfigSupervisor::new(&path, launcher.clone());
    supervisor.start().await.unwrap();

    let (tx, rx) = mpsc::unbounded_channel();
    let shutdown = CancellationToken::new();
    let task = tokio::spawn(supervisor.run(rx, shutdown.clone()));
    wait_for(|| launcher.launched().len() == 1).await;

    // A change event after the failed start is still handled.
    set_active(&path, "hermes");
    tx.send(ConfigChanged).unwrap();
    wait_for(|| launcher.launched().len() == 2).await;

    shutdown.cancel();
    let result = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn reselecting_a_failed_agent_relaunches_it() {
    let (_dir, path) = agents_fixture(AGENTS);
    let launcher = FakeLauncher::new(LaunchMode::FailToStart);
    let mut supervisor = ConfigSupervisor::new(&path, launcher.clone());
    supervisor.start().await.unwrap();
    wait_for(|| launcher.launched().len() == 1).await;
    wait_for(|| supervisor.running_agent().is_none()).await;
    assert_eq!(supervisor.active(), "atlas");

    set_active(&path, "atlas");
    assert_eq!(
        supervisor.handle_config_change().await.unwrap(),
        ReloadOutcome::Restarted {
            agent: "atlas".into()
        }
    );
    wait_for(|| launcher.launched().len() == 2).await;
    assert_eq!(launcher.launched(), vec!["atlas", "atlas"]);
}

#[tokio::test]
async fn self_test_stops_at_task_prosecution() {
    let h = harness(LayerType::TaskProsecution, ScriptedGenerator::always(VALID));
    let command = message(MessageType::Commands, "power_on_self_test", &[]);
    let Dispatch::Command(handle) = h.actor.on_message(command) else {
        panic!("expected command dispatch");
    };
    handle.await.unwrap();
    assert!(h.outbound.sent().is_empty());
}
