//! OpenAI-compatible chat completions provider
//!
//! Sends the conversation to `{base_url}/chat/completions`, advertising
//! registered actions as function tools. Tool calls returned by the model
//! are run through the action invoker and their results are sent back as
//! `tool` messages until the model answers or `max_tool_rounds` is spent.

use super::GenerationProvider;
use crate::config::ModelSettings;
use crate::registry::{ActionInvoker, ActionSpec};
use async_trait::async_trait;
use railguard_core::{ActionArgs, ActionRequest, Error, Result, Role, Turn};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Provider backed by an OpenAI-compatible HTTP API
pub struct OpenAiProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    temperature: Option<f32>,
    max_tool_rounds: usize,
}

impl OpenAiProvider {
    /// Create a provider from model settings, reading the API key from the
    /// configured environment variable
    pub fn from_settings(settings: &ModelSettings) -> Result<Self> {
        let api_key = std::env::var(&settings.api_key_env).ok();
        if api_key.is_none() && settings.base_url.contains("api.openai.com") {
            return Err(Error::config(format!(
                "environment variable {} is not set",
                settings.api_key_env
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", settings.base_url.trim_end_matches('/')),
            model: settings.model.clone(),
            api_key,
            temperature: settings.temperature,
            max_tool_rounds: settings.max_tool_rounds,
        })
    }

    async fn complete(&self, request: &ChatRequest<'_>) -> Result<ChatResponse> {
        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::provider(format!("request to {} failed: {}", self.endpoint, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::provider(format!(
                "backend returned {}: {}",
                status,
                truncate(&body, 200)
            )));
        }

        response
            .json::<ChatResponse>()
            .await
            .map_err(|e| Error::provider(format!("invalid completion response: {}", e)))
    }
}

#[async_trait]
impl GenerationProvider for OpenAiProvider {
    async fn generate(&self, turns: &[Turn], actions: &dyn ActionInvoker) -> Result<Turn> {
        let tools: Vec<WireTool> = actions.specs().iter().map(WireTool::from_spec).collect();
        let mut messages: Vec<WireMessage> = turns.iter().map(WireMessage::from_turn).collect();

        for round in 0..=self.max_tool_rounds {
            let request = ChatRequest {
                model: &self.model,
                messages: &messages,
                tools: &tools,
                temperature: self.temperature,
            };
            let response = self.complete(&request).await?;
            let message = response
                .choices
                .into_iter()
                .next()
                .map(|c| c.message)
                .ok_or_else(|| Error::provider("completion contained no choices"))?;

            if message.tool_calls.is_empty() {
                return Ok(Turn::assistant(message.content.unwrap_or_default()));
            }
            if round == self.max_tool_rounds {
                break;
            }

            debug!(round, calls = message.tool_calls.len(), "Model requested actions");
            let calls = message.tool_calls.clone();
            messages.push(message);

            for call in calls {
                let request = call.to_request()?;
                let output = actions.invoke_action(request).await?;
                messages.push(WireMessage::tool_result(call.id, output.to_text()));
            }
        }

        Err(Error::provider(format!(
            "model kept requesting actions after {} rounds",
            self.max_tool_rounds
        )))
    }

    fn name(&self) -> &str {
        "openai"
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [WireMessage],
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [WireTool],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl WireMessage {
    fn from_turn(turn: &Turn) -> Self {
        let (role, content) = match turn.role() {
            Role::Tool => {
                let action = turn.metadata().action.as_deref().unwrap_or("action");
                (
                    Role::System.as_str(),
                    format!("Result of {}: {}", action, turn.content()),
                )
            }
            role => (role.as_str(), turn.content().to_string()),
        };

        Self {
            role: role.to_string(),
            content: Some(content),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    fn tool_result(call_id: String, content: String) -> Self {
        Self {
            role: Role::Tool.as_str().to_string(),
            content: Some(content),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    kind: String,
    function: WireFunctionCall,
}

impl WireToolCall {
    fn to_request(&self) -> Result<ActionRequest> {
        let raw = self.function.arguments.trim();
        let args: ActionArgs = if raw.is_empty() {
            ActionArgs::new()
        } else {
            serde_json::from_str(raw).map_err(|e| {
                Error::provider(format!(
                    "invalid arguments for action '{}': {}",
                    self.function.name, e
                ))
            })?
        };

        Ok(ActionRequest {
            name: self.function.name.clone(),
            args,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction,
}

impl WireTool {
    fn from_spec(spec: &ActionSpec) -> Self {
        Self {
            kind: "function",
            function: WireFunction {
                name: spec.name.clone(),
                description: spec.description.clone(),
                parameters: spec.parameters_schema(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

fn no_tools(tools: &&[WireTool]) -> bool {
    tools.is_empty()
}

fn function_type() -> String {
    "function".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_conversion() {
        let msg = WireMessage::from_turn(&Turn::user("hi"));
        assert_eq!(msg.role, "user");
        assert_eq!(msg.content.as_deref(), Some("hi"));

        let msg = WireMessage::from_turn(&Turn::tool("get_weather", "sunny"));
        assert_eq!(msg.role, "system");
        assert_eq!(msg.content.as_deref(), Some("Result of get_weather: sunny"));
    }

    #[test]
    fn test_request_serialization_omits_empty_tools() {
        let messages = vec![WireMessage::from_turn(&Turn::user("hi"))];
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: &messages,
            tools: &[],
            temperature: None,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "gpt-4o-mini",
                "messages": [{"role": "user", "content": "hi"}]
            })
        );
    }

    #[test]
    fn test_tool_definition() {
        let spec = ActionSpec::new("get_weather", "Weather lookup").param("location", "City");
        let json = serde_json::to_value(WireTool::from_spec(&spec)).unwrap();

        assert_eq!(json["type"], "function");
        assert_eq!(json["function"]["name"], "get_weather");
        assert_eq!(json["function"]["parameters"]["required"][0], "location");
    }

    #[test]
    fn test_tool_call_parsing() {
        let body = r#"{
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "get_weather", "arguments": "{\"location\": \"Paris\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        }"#;

        let response: ChatResponse = serde_json::from_str(body).unwrap();
        let call = &response.choices[0].message.tool_calls[0];
        let request = call.to_request().unwrap();

        assert_eq!(request, ActionRequest::new("get_weather").arg("location", "Paris"));
    }

    #[test]
    fn test_malformed_arguments_are_provider_errors() {
        let call = WireToolCall {
            id: "call_1".into(),
            kind: function_type(),
            function: WireFunctionCall {
                name: "get_weather".into(),
                arguments: "{not json".into(),
            },
        };
        assert!(matches!(call.to_request(), Err(Error::Provider(_))));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééééé", 2), "éé...");
    }
}
