//! Prompt injection engine
//!
//! A template carries `{{ name }}` placeholders. An [`InjectionMap`] says how
//! to produce the text for each one: straight from the variable map, from a
//! file, from a file picked by a variable, or from a pure render function.
//! File injections may carry their own nested map, which is applied to the
//! loaded text before it is substituted into the parent.

use crate::error::PromptError;
use ace_core::{render_sub_messages, LayerSubMessage};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A value a layer exposes to its prompt templates.
#[derive(Debug, Clone, PartialEq)]
pub enum VariableValue {
    Text(String),
    Messages(Vec<LayerSubMessage>),
    Labels(Vec<String>),
}

impl VariableValue {
    fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Messages(_) => "messages",
            Self::Labels(_) => "labels",
        }
    }
}

pub type VariableMap = HashMap<String, VariableValue>;

/// Render function for [`Injection::Method`]. Receives the named arguments
/// in declaration order.
pub type RenderFn = fn(&[VariableValue]) -> String;

#[derive(Debug, Clone)]
pub enum Injection {
    /// The variable with the same name as the placeholder.
    Variable,
    File {
        path: PathBuf,
        nested: Option<InjectionMap>,
    },
    /// Loads `folder/<value of variable>`.
    ParameterizedFile {
        folder: PathBuf,
        variable: String,
        nested: Option<InjectionMap>,
    },
    Method {
        function: RenderFn,
        arguments: Vec<String>,
    },
}

/// Placeholder name to injection, applied in insertion order.
#[derive(Debug, Clone, Default)]
pub struct InjectionMap {
    entries: Vec<(String, Injection)>,
}

impl InjectionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the injection for `name`.
    pub fn with(mut self, name: impl Into<String>, injection: Injection) -> Self {
        let name = name.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = injection,
            None => self.entries.push((name, injection)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Injection> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, injection)| injection)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Injection)> {
        self.entries.iter().map(|(name, injection)| (name.as_str(), injection))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn placeholder(name: &str) -> String {
    format!("{{{{ {} }}}}", name)
}

/// Substitute every injection in `map` into `template`.
///
/// Placeholders without an entry are left as they are.
pub fn build_prompt(
    template: &str,
    map: &InjectionMap,
    variables: Option<&VariableMap>,
) -> Result<String, PromptError> {
    let mut text = template.to_string();
    for (name, injection) in map.iter() {
        let resolved = resolve(name, injection, variables)?;
        text = text.replace(&placeholder(name), &resolved);
    }
    Ok(text)
}

fn resolve(
    name: &str,
    injection: &Injection,
    variables: Option<&VariableMap>,
) -> Result<String, PromptError> {
    match injection {
        Injection::Variable => {
            let variables =
                variables.ok_or_else(|| PromptError::MissingVariableMap(name.to_string()))?;
            match variables.get(name) {
                None => Ok(String::new()),
                Some(VariableValue::Text(text)) => Ok(text.clone()),
                Some(VariableValue::Messages(messages)) => Ok(render_sub_messages(messages)),
                Some(other) => Err(PromptError::InvalidVariable {
                    name: name.to_string(),
                    reason: format!("{} cannot be injected as text", other.kind()),
                }),
            }
        }
        Injection::File { path, nested } => {
            let text = read_file(path)?;
            apply_nested(text, nested.as_ref(), variables)
        }
        Injection::ParameterizedFile {
            folder,
            variable,
            nested,
        } => {
            let variables =
                variables.ok_or_else(|| PromptError::MissingVariableMap(name.to_string()))?;
            let file_name = match variables.get(variable) {
                Some(VariableValue::Text(file_name)) => file_name,
                Some(other) => {
                    return Err(PromptError::InvalidVariable {
                        name: variable.clone(),
                        reason: format!("expected text to pick a file, got {}", other.kind()),
                    })
                }
                None => {
                    return Err(PromptError::InvalidVariable {
                        name: variable.clone(),
                        reason: "not set".into(),
                    })
                }
            };
            let text = read_file(&folder.join(file_name))?;
            apply_nested(text, nested.as_ref(), Some(variables))
        }
        Injection::Method {
            function,
            arguments,
        } => {
            let args: Vec<VariableValue> = arguments
                .iter()
                .map(|argument| {
                    variables
                        .and_then(|variables| variables.get(argument))
                        .cloned()
                        .unwrap_or(VariableValue::Messages(Vec::new()))
                })
                .collect();
            Ok(function(&args))
        }
    }
}

fn apply_nested(
    text: String,
    nested: Option<&InjectionMap>,
    variables: Option<&VariableMap>,
) -> Result<String, PromptError> {
    match nested {
        Some(map) if !map.is_empty() => build_prompt(&text, map, variables),
        _ => Ok(text),
    }
}

pub(crate) fn read_file(path: &Path) -> Result<String, PromptError> {
    std::fs::read_to_string(path).map_err(|source| PromptError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, VariableValue)]) -> VariableMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn count_args(args: &[VariableValue]) -> String {
        match args.first() {
            Some(VariableValue::Messages(messages)) => format!("{} messages", messages.len()),
            _ => "other".into(),
        }
    }

    #[test]
    fn variable_renders_text_and_messages() {
        let map = InjectionMap::new()
            .with("mission", Injection::Variable)
            .with("guidance", Injection::Variable);
        let variables = vars(&[
            ("mission", VariableValue::Text("survive".into())),
            (
                "guidance",
                VariableValue::Messages(vec![LayerSubMessage::new("plan", vec!["rest".into()])]),
            ),
        ]);
        let out = build_prompt("{{ mission }} / {{ guidance }}", &map, Some(&variables)).unwrap();
        assert_eq!(out, "survive / ### Plan\n- rest\n\n");
    }

    #[test]
    fn variable_without_map_fails() {
        let map = InjectionMap::new().with("mission", Injection::Variable);
        let err = build_prompt("{{ mission }}", &map, None).unwrap_err();
        assert!(matches!(err, PromptError::MissingVariableMap(name) if name == "mission"));
    }

    #[test]
    fn missing_variable_is_empty_and_labels_are_rejected() {
        let map = InjectionMap::new().with("mission", Injection::Variable);
        let out = build_prompt("[{{ mission }}]", &map, Some(&VariableMap::new())).unwrap();
        assert_eq!(out, "[]");

        let variables = vars(&[("mission", VariableValue::Labels(vec!["vision".into()]))]);
        assert!(matches!(
            build_prompt("{{ mission }}", &map, Some(&variables)),
            Err(PromptError::InvalidVariable { .. })
        ));
    }

    #[test]
    fn method_missing_argument_defaults_to_empty_sequence() {
        let map = InjectionMap::new().with(
            "data",
            Injection::Method {
                function: count_args,
                arguments: vec!["data".into()],
            },
        );
        let out = build_prompt("{{ data }}", &map, Some(&VariableMap::new())).unwrap();
        assert_eq!(out, "0 messages");
    }

    #[test]
    fn parameterized_file_requires_text_variable() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("aspirational"), "be good").unwrap();
        let map = InjectionMap::new().with(
            "identity",
            Injection::ParameterizedFile {
                folder: dir.path().to_path_buf(),
                variable: "layer_type".into(),
                nested: None,
            },
        );

        let ok = vars(&[("layer_type", VariableValue::Text("aspirational".into()))]);
        assert_eq!(build_prompt("{{ identity }}", &map, Some(&ok)).unwrap(), "be good");

        let bad = vars(&[("layer_type", VariableValue::Labels(Vec::new()))]);
        assert!(matches!(
            build_prompt("{{ identity }}", &map, Some(&bad)),
            Err(PromptError::InvalidVariable { name, .. }) if name == "layer_type"
        ));
        assert!(build_prompt("{{ identity }}", &map, Some(&VariableMap::new())).is_err());
    }

    #[test]
    fn with_replaces_existing_entry() {
        let map = InjectionMap::new()
            .with("a", Injection::Variable)
            .with("a", Injection::File {
                path: "x".into(),
                nested: None,
            });
        assert_eq!(map.len(), 1);
        assert!(matches!(map.get("a"), Some(Injection::File { .. })));
    }
}
