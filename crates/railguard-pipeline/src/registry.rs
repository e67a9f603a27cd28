//! Action registry
//!
//! Maps action names to handlers. The registry is filled once at startup and
//! then shared read-only (usually behind an `Arc`) for the rest of the
//! process. Names are unique; there is no removal.

use async_trait::async_trait;
use railguard_core::{ActionArgs, ActionRequest, Error, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Value returned by an action handler
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutput {
    /// Plain text result
    Text(String),

    /// Structured JSON result
    Structured(serde_json::Value),
}

impl ActionOutput {
    /// Render the output as text for the conversation
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Structured(serde_json::Value::String(s)) => s.clone(),
            Self::Structured(value) => value.to_string(),
        }
    }

    /// Read the output as a number, if it is one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Text(text) => text.trim().parse().ok(),
            Self::Structured(value) => value
                .as_f64()
                .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok())),
        }
    }
}

impl From<String> for ActionOutput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for ActionOutput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<serde_json::Value> for ActionOutput {
    fn from(value: serde_json::Value) -> Self {
        Self::Structured(value)
    }
}

/// An invocable action handler
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn call(&self, args: ActionArgs) -> anyhow::Result<ActionOutput>;
}

#[async_trait]
impl<F, Fut> ActionHandler for F
where
    F: Fn(ActionArgs) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<ActionOutput>> + Send + 'static,
{
    async fn call(&self, args: ActionArgs) -> anyhow::Result<ActionOutput> {
        (self)(args).await
    }
}

/// Description of an action, advertised to providers that support tools
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActionSpec {
    /// Unique action name
    pub name: String,

    /// What the action does
    pub description: String,

    /// Accepted parameters
    pub parameters: Vec<ActionParam>,
}

impl ActionSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    /// Add a required string parameter
    pub fn param(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.parameters.push(ActionParam {
            name: name.into(),
            description: description.into(),
            required: true,
        });
        self
    }

    /// Add an optional string parameter
    pub fn optional_param(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.parameters.push(ActionParam {
            name: name.into(),
            description: description.into(),
            required: false,
        });
        self
    }

    /// JSON schema of the parameters object
    pub fn parameters_schema(&self) -> serde_json::Value {
        let properties: serde_json::Map<String, serde_json::Value> = self
            .parameters
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    serde_json::json!({"type": "string", "description": p.description}),
                )
            })
            .collect();
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// A single action parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionParam {
    pub name: String,
    pub description: String,
    pub required: bool,
}

/// Capability to run actions, handed to generation providers
#[async_trait]
pub trait ActionInvoker: Send + Sync {
    /// Actions available for invocation
    fn specs(&self) -> Vec<ActionSpec>;

    /// Run the requested action
    async fn invoke_action(&self, request: ActionRequest) -> Result<ActionOutput>;
}

struct RegisteredAction {
    spec: ActionSpec,
    handler: Arc<dyn ActionHandler>,
}

/// Registry of named actions
#[derive(Default)]
pub struct ActionRegistry {
    actions: BTreeMap<String, RegisteredAction>,
}

impl ActionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`
    pub fn register<H>(&mut self, name: impl Into<String>, handler: H) -> Result<()>
    where
        H: ActionHandler + 'static,
    {
        self.register_with_spec(ActionSpec::new(name, ""), handler)
    }

    /// Register `handler` with a full description
    pub fn register_with_spec<H>(&mut self, spec: ActionSpec, handler: H) -> Result<()>
    where
        H: ActionHandler + 'static,
    {
        if self.actions.contains_key(&spec.name) {
            return Err(Error::DuplicateAction(spec.name));
        }

        info!(action = %spec.name, "Registered action");
        self.actions.insert(
            spec.name.clone(),
            RegisteredAction {
                spec,
                handler: Arc::new(handler),
            },
        );
        Ok(())
    }

    /// Run the action registered under `name`
    pub async fn invoke(&self, name: &str, args: ActionArgs) -> Result<ActionOutput> {
        let action = self
            .actions
            .get(name)
            .ok_or_else(|| Error::UnknownAction(name.to_string()))?;

        debug!(action = name, "Invoking action");
        action.handler.call(args).await.map_err(|e| {
            warn!(action = name, error = %e, "Action failed");
            Error::action_execution(name, format!("{:#}", e))
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.actions.keys().map(String::as_str).collect()
    }
}

#[async_trait]
impl ActionInvoker for ActionRegistry {
    fn specs(&self) -> Vec<ActionSpec> {
        self.actions.values().map(|a| a.spec.clone()).collect()
    }

    async fn invoke_action(&self, request: ActionRequest) -> Result<ActionOutput> {
        self.invoke(&request.name, request.args).await
    }
}
