//! Queue, layer, and telemetry identities

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sentinel used for "nothing here" headings, commands, and config values.
pub const NONE: &str = "none";

// ---------------------------------------------------------------------------
// Queue - every endpoint on the bus
// ---------------------------------------------------------------------------

/// A queue on the bus. Each layer owns one queue; the controller is the
/// entry point for southbound traffic and never a northbound destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Queue {
    Controller,
    Aspirational,
    GlobalStrategy,
    AgentModel,
    ExecutiveFunction,
    CognitiveControl,
    TaskProsecution,
}

impl Queue {
    pub const ALL: [Queue; 7] = [
        Queue::Controller,
        Queue::Aspirational,
        Queue::GlobalStrategy,
        Queue::AgentModel,
        Queue::ExecutiveFunction,
        Queue::CognitiveControl,
        Queue::TaskProsecution,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Controller => "controller",
            Self::Aspirational => "aspirational",
            Self::GlobalStrategy => "global_strategy",
            Self::AgentModel => "agent_model",
            Self::ExecutiveFunction => "executive_function",
            Self::CognitiveControl => "cognitive_control",
            Self::TaskProsecution => "task_prosecution",
        }
    }
}

impl fmt::Display for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Queue {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|q| q.as_str() == s)
            .ok_or_else(|| Error::UnknownQueue(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// LayerType - the six cognitive layers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerType {
    Aspirational,
    GlobalStrategy,
    AgentModel,
    ExecutiveFunction,
    CognitiveControl,
    TaskProsecution,
}

impl LayerType {
    /// Top to bottom.
    pub const ALL: [LayerType; 6] = [
        LayerType::Aspirational,
        LayerType::GlobalStrategy,
        LayerType::AgentModel,
        LayerType::ExecutiveFunction,
        LayerType::CognitiveControl,
        LayerType::TaskProsecution,
    ];

    pub fn queue(&self) -> Queue {
        match self {
            Self::Aspirational => Queue::Aspirational,
            Self::GlobalStrategy => Queue::GlobalStrategy,
            Self::AgentModel => Queue::AgentModel,
            Self::ExecutiveFunction => Queue::ExecutiveFunction,
            Self::CognitiveControl => Queue::CognitiveControl,
            Self::TaskProsecution => Queue::TaskProsecution,
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.queue().as_str()
    }
}

impl fmt::Display for LayerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayerType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|l| l.as_str() == s)
            .ok_or_else(|| Error::UnknownLayer(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Southbound flows toward execution, northbound toward strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Southbound,
    Northbound,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Southbound => "southbound",
            Self::Northbound => "northbound",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Telemetry capabilities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Telemetry {
    None,
    Time,
    Location,
    Embodiment,
    WorldOverview,
    HardwareStatistics,
    SystemMetrics,
    SoftwareStatistics,
    SystemProcesses,
    Resources,
    Memory,
    Visual,
    Audio,
    Stdout,
    UserInput,
}

impl Telemetry {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => NONE,
            Self::Time => "time",
            Self::Location => "location",
            Self::Embodiment => "embodiment",
            Self::WorldOverview => "world_overview",
            Self::HardwareStatistics => "hardware_statistics",
            Self::SystemMetrics => "system_metrics",
            Self::SoftwareStatistics => "software_statistics",
            Self::SystemProcesses => "system_processes",
            Self::Resources => "resources",
            Self::Memory => "memory",
            Self::Visual => "visual",
            Self::Audio => "audio",
            Self::Stdout => "stdout",
            Self::UserInput => "user_input",
        }
    }
}

impl fmt::Display for Telemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
