//! Structured model output
//!
//! A layer's model is asked to reply with TOML:
//!
//! ```toml
//! [internal]
//! reasoning = "..."
//!
//! [southbound]
//! heading = ["item", "item"]
//!
//! [northbound]
//! heading = "single item"
//! ```
//!
//! Replies are often wrapped in a fenced block, which is stripped first.

use crate::error::OutputError;
use ace_core::{LayerMessage, LayerSubMessage, MessageType};
use toml::{Table, Value};

const FENCE_OPEN: &str = "```toml";
const FENCE_CLOSE: &str = "```";

#[derive(Debug, Clone, PartialEq)]
pub struct LayerOutput {
    pub reasoning: String,
    /// Guidance for the layer below, if any headings were produced.
    pub southbound: Option<LayerMessage>,
    /// Data for the layer above, if any headings were produced.
    pub northbound: Option<LayerMessage>,
}

impl LayerOutput {
    pub fn parse(response: &str) -> Result<Self, OutputError> {
        let body = strip_fence(response);
        let table: Table = body.parse()?;

        let reasoning = table
            .get("internal")
            .and_then(|internal| internal.get("reasoning"))
            .and_then(Value::as_str)
            .ok_or(OutputError::MissingReasoning)?
            .to_string();

        Ok(Self {
            reasoning,
            southbound: section(&table, "southbound", MessageType::Guidance)?,
            northbound: section(&table, "northbound", MessageType::Data)?,
        })
    }
}

fn strip_fence(response: &str) -> &str {
    let trimmed = response.trim();
    match trimmed.strip_prefix(FENCE_OPEN) {
        Some(rest) => rest.strip_suffix(FENCE_CLOSE).unwrap_or(rest),
        None => trimmed,
    }
}

fn section(
    table: &Table,
    name: &str,
    message_type: MessageType,
) -> Result<Option<LayerMessage>, OutputError> {
    let Some(value) = table.get(name) else {
        return Ok(None);
    };
    let invalid = |reason: String| OutputError::InvalidSection {
        section: name.to_string(),
        reason,
    };
    let entries = value
        .as_table()
        .ok_or_else(|| invalid(format!("expected a table, got {}", value.type_str())))?;

    let mut messages = Vec::with_capacity(entries.len());
    for (heading, content) in entries {
        let content = match content {
            Value::String(item) => vec![item.clone()],
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| invalid(format!("{} holds a non-string item", heading)))
                })
                .collect::<Result<Vec<_>, _>>()?,
            other => return Err(invalid(format!("{} is a {}", heading, other.type_str()))),
        };
        messages.push(LayerSubMessage::new(heading.clone(), content));
    }

    if messages.is_empty() {
        return Ok(None);
    }
    Ok(Some(LayerMessage::new(message_type, messages)))
}
