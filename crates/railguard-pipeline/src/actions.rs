//! Built-in actions
//!
//! - `get_weather`: canned weather report for a location
//! - `check_facts`: accuracy score for a response (0.0 or 1.0)

use crate::registry::{ActionHandler, ActionOutput, ActionRegistry, ActionSpec};
use anyhow::Context;
use async_trait::async_trait;
use railguard_core::{ActionArgs, Result};
use railguard_policy::{FactCheckSettings, KeywordFactScorer};

pub const GET_WEATHER: &str = "get_weather";
pub const CHECK_FACTS: &str = "check_facts";

/// Report the weather for `location`
pub async fn get_weather(args: ActionArgs) -> anyhow::Result<ActionOutput> {
    let location = string_arg(&args, "location")?;
    // TODO: call a real weather API once a provider and key are configured
    Ok(ActionOutput::Text(format!(
        "The weather in {} is sunny and 25°C.",
        location
    )))
}

/// Scores a response against disallowed topics
pub struct CheckFacts {
    scorer: KeywordFactScorer,
}

impl CheckFacts {
    pub fn new(scorer: KeywordFactScorer) -> Self {
        Self { scorer }
    }
}

#[async_trait]
impl ActionHandler for CheckFacts {
    async fn call(&self, args: ActionArgs) -> anyhow::Result<ActionOutput> {
        let response = string_arg(&args, "response")?;
        let score = self.scorer.score_text(response);
        Ok(ActionOutput::Structured(serde_json::json!(score)))
    }
}

/// Register every built-in action
pub fn register_builtin_actions(
    registry: &mut ActionRegistry,
    fact_settings: &FactCheckSettings,
) -> Result<()> {
    registry.register_with_spec(
        ActionSpec::new(GET_WEATHER, "Get the current weather for a location")
            .param("location", "City or place name"),
        get_weather,
    )?;

    registry.register_with_spec(
        ActionSpec::new(CHECK_FACTS, "Score the factual accuracy of a response from 0.0 to 1.0")
            .param("response", "The response to check")
            .optional_param("context", "The user message the response answers"),
        CheckFacts::new(fact_settings.keyword_scorer()?),
    )?;

    Ok(())
}

fn string_arg<'a>(args: &'a ActionArgs, key: &str) -> anyhow::Result<&'a str> {
    args.get(key)
        .with_context(|| format!("missing argument '{}'", key))?
        .as_str()
        .with_context(|| format!("argument '{}' must be a string", key))
}
