//! Layer message model: envelope types, validation, merge, and rendering

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Commands,
    Internal,
    Guidance,
    Data,
    Telemetry,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Commands => "commands",
            Self::Internal => "internal",
            Self::Guidance => "guidance",
            Self::Data => "data",
            Self::Telemetry => "telemetry",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One headed block of content. Headings are merge keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSubMessage {
    pub heading: String,
    #[serde(deserialize_with = "one_or_many")]
    pub content: Vec<String>,
}

impl LayerSubMessage {
    pub fn new(heading: impl Into<String>, content: Vec<String>) -> Self {
        Self {
            heading: heading.into(),
            content,
        }
    }
}

/// Content arrives either as a single string or a list of strings.
fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerMessage {
    pub message_type: MessageType,
    #[serde(default)]
    pub messages: Vec<LayerSubMessage>,
}

impl LayerMessage {
    pub fn new(message_type: MessageType, messages: Vec<LayerSubMessage>) -> Self {
        Self {
            message_type,
            messages,
        }
    }

    /// Headings in order, duplicates included.
    pub fn headings(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().map(|m| m.heading.as_str())
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(pos) = self.messages.iter().position(|m| m.heading.trim().is_empty()) {
            return Err(Error::invalid_message(format!(
                "{} sub-message {} has an empty heading",
                self.message_type, pos
            )));
        }
        Ok(())
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let message: Self = serde_json::from_slice(bytes)?;
        message.validate()?;
        Ok(message)
    }
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Fold freshly arrived sub-messages into a buffered accumulator.
///
/// Result order: new (or merged) entries in `new`'s order, then every
/// untouched `old` entry in `old`'s order. A merged entry carries old content
/// followed by new content. Only the first `old` entry with a heading is used
/// as the merge source, and every `old` entry with a consumed heading is
/// dropped from the tail.
pub fn merge_messages(new: &[LayerSubMessage], old: &[LayerSubMessage]) -> Vec<LayerSubMessage> {
    let mut merged = Vec::with_capacity(new.len() + old.len());
    let mut consumed: HashSet<&str> = HashSet::new();

    for incoming in new {
        match old.iter().find(|o| o.heading == incoming.heading) {
            Some(existing) => {
                consumed.insert(existing.heading.as_str());
                let mut content = existing.content.clone();
                content.extend(incoming.content.iter().cloned());
                merged.push(LayerSubMessage::new(incoming.heading.clone(), content));
            }
            None => merged.push(incoming.clone()),
        }
    }

    merged.extend(
        old.iter()
            .filter(|o| !consumed.contains(o.heading.as_str()))
            .cloned(),
    );
    merged
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render sub-messages as a heading-bulleted text block:
///
/// ```text
/// ### Heading
/// - item
/// - item
///
/// ```
pub fn render_sub_messages(messages: &[LayerSubMessage]) -> String {
    let mut text = String::new();
    for message in messages {
        text.push_str("### ");
        text.push_str(&title_case(&message.heading));
        text.push('\n');
        if message.content.is_empty() {
            text.push_str("- ");
            text.push_str(crate::types::NONE);
            text.push_str("\n\n");
            continue;
        }
        let items: Vec<String> = message.content.iter().map(|item| format!("- {}", item)).collect();
        text.push_str(&items.join("\n"));
        text.push_str("\n\n");
    }
    text
}

/// Uppercase the first letter of every alphabetic run, lowercase the rest.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}
