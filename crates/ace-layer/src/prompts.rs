//! Prompt layout on disk and the injection maps built over it
//!
//! ```text
//! prompts/
//!   layer                      base template
//!   ace_context
//!   identities/<layer_type>
//!   responses/response_format
//!   responses/schemas/<layer_type>
//! ```
//!
//! The identity prompt is built once per actor from `layer`. It keeps the
//! per-cycle placeholders (`guidance`, `data`, `telemetry`,
//! `response_format`), which the output-response map fills on every cycle.

use crate::error::PromptError;
use crate::injection::{build_prompt, read_file, Injection, InjectionMap, VariableMap, VariableValue};
use ace_core::{render_sub_messages, NONE};
use std::path::{Path, PathBuf};

pub mod keys {
    pub const CONTEXT: &str = "context";
    pub const IDENTITY: &str = "identity";
    pub const MISSION: &str = "mission";
    pub const GUIDANCE: &str = "guidance";
    pub const DATA: &str = "data";
    pub const TELEMETRY: &str = "telemetry";
    pub const RESPONSE_FORMAT: &str = "response_format";
    pub const SCHEMA: &str = "schema";
    pub const NAME: &str = "name";
    pub const LAYER_TYPE: &str = "layer_type";
}

#[derive(Debug, Clone)]
pub struct PromptPaths {
    root: PathBuf,
}

impl PromptPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn layer(&self) -> PathBuf {
        self.root.join("layer")
    }

    pub fn context(&self) -> PathBuf {
        self.root.join("ace_context")
    }

    pub fn identities(&self) -> PathBuf {
        self.root.join("identities")
    }

    pub fn response_format(&self) -> PathBuf {
        self.root.join("responses").join("response_format")
    }

    pub fn schemas(&self) -> PathBuf {
        self.root.join("responses").join("schemas")
    }
}

// ============================================================
// Injection maps
// ============================================================

/// Context plus per-layer identity. With `uses_mission` the identity file
/// has the agent's mission injected into it first.
pub fn identity_map(paths: &PromptPaths, uses_mission: bool) -> InjectionMap {
    let nested = uses_mission.then(|| InjectionMap::new().with(keys::MISSION, Injection::Variable));
    InjectionMap::new()
        .with(
            keys::CONTEXT,
            Injection::File {
                path: paths.context(),
                nested: None,
            },
        )
        .with(
            keys::IDENTITY,
            Injection::ParameterizedFile {
                folder: paths.identities(),
                variable: keys::LAYER_TYPE.into(),
                nested,
            },
        )
}

/// Per-cycle inputs and the layer's response schema.
pub fn output_response_map(paths: &PromptPaths) -> InjectionMap {
    let schema = InjectionMap::new().with(
        keys::SCHEMA,
        Injection::ParameterizedFile {
            folder: paths.schemas(),
            variable: keys::LAYER_TYPE.into(),
            nested: None,
        },
    );
    InjectionMap::new()
        .with(
            keys::GUIDANCE,
            Injection::Method {
                function: render_messages,
                arguments: vec![keys::GUIDANCE.into()],
            },
        )
        .with(
            keys::DATA,
            Injection::Method {
                function: render_messages,
                arguments: vec![keys::DATA.into()],
            },
        )
        .with(
            keys::TELEMETRY,
            Injection::Method {
                function: render_telemetry,
                arguments: vec![keys::TELEMETRY.into()],
            },
        )
        .with(
            keys::RESPONSE_FORMAT,
            Injection::File {
                path: paths.response_format(),
                nested: Some(schema),
            },
        )
}

pub fn build_identity_prompt(
    paths: &PromptPaths,
    uses_mission: bool,
    variables: &VariableMap,
) -> Result<String, PromptError> {
    let template = read_file(&paths.layer())?;
    build_prompt(&template, &identity_map(paths, uses_mission), Some(variables))
}

pub fn build_output_prompt(
    identity_prompt: &str,
    paths: &PromptPaths,
    variables: &VariableMap,
) -> Result<String, PromptError> {
    build_prompt(identity_prompt, &output_response_map(paths), Some(variables))
}

// ============================================================
// Render functions
// ============================================================

fn render_messages(args: &[VariableValue]) -> String {
    match args.first() {
        Some(VariableValue::Messages(messages)) => render_sub_messages(messages),
        Some(VariableValue::Text(text)) => text.clone(),
        _ => String::new(),
    }
}

/// Capability names as bullets. Live readings come from outside the layer.
fn render_telemetry(args: &[VariableValue]) -> String {
    let labels: Vec<&str> = match args.first() {
        Some(VariableValue::Labels(labels)) => labels
            .iter()
            .map(String::as_str)
            .filter(|label| *label != NONE)
            .collect(),
        _ => Vec::new(),
    };
    if labels.is_empty() {
        return "- None".into();
    }
    labels
        .iter()
        .map(|label| format!("- {}", label))
        .collect::<Vec<_>>()
        .join("\n")
}
