//! Core types for Railguard

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Arguments passed to an action, keyed by parameter name
pub type ActionArgs = serde_json::Map<String, serde_json::Value>;

/// Role of the party that produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    /// Wire name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of conversation.
///
/// Turns are immutable once produced. Stages that need to attach data build
/// a new turn through the consuming `with_*` methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    role: Role,
    content: String,
    #[serde(default, skip_serializing_if = "TurnMetadata::is_empty")]
    metadata: TurnMetadata,
}

impl Turn {
    /// Create a new turn
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            metadata: TurnMetadata::default(),
        }
    }

    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a system turn
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a tool turn carrying the output of `action`
    pub fn tool(action: impl Into<String>, content: impl Into<String>) -> Self {
        let mut turn = Self::new(Role::Tool, content);
        turn.metadata.action = Some(action.into());
        turn
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn metadata(&self) -> &TurnMetadata {
        &self.metadata
    }

    /// True when the content is empty or whitespace only
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Replace this turn with one carrying an accuracy score
    pub fn with_accuracy(mut self, score: f32) -> Self {
        self.metadata.accuracy = Some(score);
        self
    }

    /// Replace this turn with one carrying an extra metadata entry
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.extra.insert(key.into(), value.into());
        self
    }
}

/// Optional data attached to a turn by pipeline stages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnMetadata {
    /// Fact-check accuracy score (0.0-1.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f32>,

    /// Action that produced this turn (tool turns only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    /// Additional key-value pairs
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl TurnMetadata {
    pub fn is_empty(&self) -> bool {
        self.accuracy.is_none() && self.action.is_none() && self.extra.is_empty()
    }
}

/// A request from a generation provider to run a registered action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Name of the action
    pub name: String,

    /// Arguments keyed by parameter name
    #[serde(default)]
    pub args: ActionArgs,
}

impl ActionRequest {
    /// Create a request with no arguments
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: ActionArgs::new(),
        }
    }

    /// Add an argument
    pub fn arg(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_constructors() {
        let turn = Turn::user("hello");
        assert_eq!(turn.role(), Role::User);
        assert_eq!(turn.content(), "hello");
        assert!(turn.metadata().is_empty());

        let tool = Turn::tool("get_weather", "sunny");
        assert_eq!(tool.role(), Role::Tool);
        assert_eq!(tool.metadata().action.as_deref(), Some("get_weather"));
    }

    #[test]
    fn test_with_accuracy_produces_new_turn() {
        let draft = Turn::assistant("Paris is in France.");
        let scored = draft.clone().with_accuracy(1.0);

        assert_eq!(draft.metadata().accuracy, None);
        assert_eq!(scored.metadata().accuracy, Some(1.0));
        assert_eq!(scored.content(), draft.content());
    }

    #[test]
    fn test_blank_turns() {
        assert!(Turn::user("").is_blank());
        assert!(Turn::user(" \t\n").is_blank());
        assert!(!Turn::user(" hi ").is_blank());
    }

    #[test]
    fn test_turn_serialization() {
        let json = serde_json::to_value(Turn::assistant("ok")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "assistant", "content": "ok"}));

        let turn: Turn = serde_json::from_str(r#"{"role": "tool", "content": "25C", "metadata": {"action": "get_weather"}}"#).unwrap();
        assert_eq!(turn.role(), Role::Tool);
        assert_eq!(turn.metadata().action.as_deref(), Some("get_weather"));
    }

    #[test]
    fn test_action_request_builder() {
        let request = ActionRequest::new("get_weather").arg("location", "Paris");
        assert_eq!(request.args.get("location").and_then(|v| v.as_str()), Some("Paris"));
    }
}
