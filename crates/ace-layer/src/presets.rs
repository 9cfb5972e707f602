//! Per-layer presets and behaviors
//!
//! Every layer runs the same actor. What differs per [`LayerType`] is carried
//! by a [`LayerBehavior`] value: which telemetry the layer can see, whether it
//! waits on northbound data, the baseline accumulators, and whether the active
//! agent's mission is part of its identity.

use ace_core::{LayerSubMessage, LayerType, Telemetry, NONE};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq)]
pub struct LayerBehavior {
    pub layer_type: LayerType,
    pub telemetry: BTreeSet<Telemetry>,
    /// Layers without data gate on guidance alone.
    pub has_data: bool,
    pub default_guidance: Vec<LayerSubMessage>,
    pub default_data: Vec<LayerSubMessage>,
    /// Inject the active agent's mission into the identity prompt.
    pub uses_mission: bool,
}

impl LayerBehavior {
    pub fn for_layer(layer_type: LayerType) -> Self {
        let base = Self {
            layer_type,
            telemetry: telemetry_preset(layer_type).iter().copied().collect(),
            has_data: true,
            default_guidance: Vec::new(),
            default_data: Vec::new(),
            uses_mission: false,
        };
        match layer_type {
            LayerType::Aspirational => Self {
                default_guidance: vec![LayerSubMessage::new(NONE, vec![String::new()])],
                uses_mission: true,
                ..base
            },
            LayerType::TaskProsecution => Self {
                has_data: false,
                ..base
            },
            _ => base,
        }
    }
}

/// Telemetry each layer kind has access to.
pub fn telemetry_preset(layer_type: LayerType) -> &'static [Telemetry] {
    use Telemetry::*;
    match layer_type {
        LayerType::Aspirational => &[None],
        LayerType::GlobalStrategy => &[Time, Location, WorldOverview, Visual, Audio, Stdout, UserInput],
        LayerType::AgentModel => &[
            Memory,
            Embodiment,
            HardwareStatistics,
            SystemMetrics,
            SoftwareStatistics,
            SystemProcesses,
        ],
        LayerType::ExecutiveFunction => &[None],
        LayerType::CognitiveControl => &[
            SystemMetrics,
            SystemProcesses,
            Location,
            Visual,
            Audio,
            Stdout,
            UserInput,
        ],
        LayerType::TaskProsecution => &[
            Embodiment,
            Location,
            SystemMetrics,
            SystemProcesses,
            Visual,
            Audio,
            Stdout,
            UserInput,
        ],
    }
}
