//! Deterministic offline provider
//!
//! Answers a small set of request shapes without a model:
//! - "weather in <place>" invokes `get_weather` and answers with its output
//! - "tell me about <topic>" drafts a short answer naming the topic
//! - anything else gets a fixed reply

use super::GenerationProvider;
use crate::actions::GET_WEATHER;
use crate::registry::ActionInvoker;
use async_trait::async_trait;
use railguard_core::{ActionRequest, Error, Result, Role, Turn};
use regex::Regex;

const FALLBACK_REPLY: &str =
    "I can check the weather for a city or tell you about a topic. What would you like to know?";

/// Rule-based provider with no network access
pub struct ScriptedProvider {
    weather: Regex,
    topic: Regex,
}

impl ScriptedProvider {
    pub fn new() -> Result<Self> {
        let weather = Regex::new(r"(?i)\bweather\s+(?:like\s+)?(?:in|for|at)\s+([^?!,;\n]+)")
            .map_err(|e| Error::internal(format!("invalid weather pattern: {}", e)))?;
        let topic = Regex::new(r"(?i)\b(?:tell me about|what do you know about|explain)\s+([^?.!;]+)")
            .map_err(|e| Error::internal(format!("invalid topic pattern: {}", e)))?;

        Ok(Self { weather, topic })
    }
}

#[async_trait]
impl GenerationProvider for ScriptedProvider {
    async fn generate(&self, turns: &[Turn], actions: &dyn ActionInvoker) -> Result<Turn> {
        let prompt = turns
            .iter()
            .rfind(|t| t.role() == Role::User)
            .map(|t| t.content().trim())
            .ok_or_else(|| Error::provider("no user turn to answer"))?;

        if let Some(caps) = self.weather.captures(prompt) {
            // periods stay inside names like "St. Louis", only a trailing one is dropped
            let location = caps[1].trim().trim_end_matches('.').trim_end();
            let request = ActionRequest::new(GET_WEATHER).arg("location", location);
            let output = actions.invoke_action(request).await?;
            return Ok(Turn::assistant(output.to_text()));
        }

        if let Some(caps) = self.topic.captures(prompt) {
            let topic = caps[1].trim();
            return Ok(Turn::assistant(format!(
                "Here is what I know about {}: it is a popular subject with plenty of stories and few verified facts.",
                topic
            )));
        }

        Ok(Turn::assistant(FALLBACK_REPLY))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::register_builtin_actions;
    use crate::registry::ActionRegistry;
    use railguard_policy::FactCheckSettings;

    fn registry() -> ActionRegistry {
        let mut registry = ActionRegistry::new();
        register_builtin_actions(&mut registry, &FactCheckSettings::default()).unwrap();
        registry
    }

    #[tokio::test]
    async fn test_weather_question_uses_action() {
        let provider = ScriptedProvider::new().unwrap();
        let draft = provider
            .generate(&[Turn::user("What's the weather in Paris?")], &registry())
            .await
            .unwrap();

        assert_eq!(draft.role(), Role::Assistant);
        assert_eq!(draft.content(), "The weather in Paris is sunny and 25°C.");
    }

    #[tokio::test]
    async fn test_multi_word_location() {
        let provider = ScriptedProvider::new().unwrap();
        let draft = provider
            .generate(&[Turn::user("weather for New York, please")], &registry())
            .await
            .unwrap();
        assert_eq!(draft.content(), "The weather in New York is sunny and 25°C.");
    }

    #[tokio::test]
    async fn test_location_with_abbreviation() {
        let provider = ScriptedProvider::new().unwrap();
        let draft = provider
            .generate(&[Turn::user("What's the weather in St. Louis?")], &registry())
            .await
            .unwrap();
        assert_eq!(draft.content(), "The weather in St. Louis is sunny and 25°C.");

        let draft = provider
            .generate(&[Turn::user("Tell me the weather in Oslo.")], &registry())
            .await
            .unwrap();
        assert_eq!(draft.content(), "The weather in Oslo is sunny and 25°C.");
    }

    #[tokio::test]
    async fn test_topic_question_names_topic() {
        let provider = ScriptedProvider::new().unwrap();
        let draft = provider
            .generate(&[Turn::user("Tell me about aliens")], &registry())
            .await
            .unwrap();
        assert!(draft.content().contains("aliens"));
    }

    #[tokio::test]
    async fn test_fallback_and_missing_user() {
        let provider = ScriptedProvider::new().unwrap();
        let draft = provider
            .generate(&[Turn::system("be nice"), Turn::user("hi")], &registry())
            .await
            .unwrap();
        assert_eq!(draft.content(), FALLBACK_REPLY);

        let err = provider
            .generate(&[Turn::system("be nice")], &registry())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
    }
}
