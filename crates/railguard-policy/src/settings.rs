//! Rails settings
//!
//! Which rails are active and how they are parameterized. Settings are
//! deserialized from the `rails:` section of the configuration file.

use crate::fact_check::{FactCheckStage, FactScorer, KeywordFactScorer, DEFAULT_THRESHOLD};
use crate::keyword::KeywordStage;
use crate::stage::PolicyStage;
use railguard_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Settings for every rail layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RailsSettings {
    /// Input rails screening user text
    #[serde(default)]
    pub input: KeywordRailSettings,

    /// Output rails screening draft responses
    #[serde(default)]
    pub output: KeywordRailSettings,

    /// Fact-checking rail
    #[serde(default)]
    pub fact_checking: FactCheckSettings,
}

impl RailsSettings {
    /// Check values that deserialization cannot
    pub fn validate(&self) -> Result<()> {
        self.fact_checking.validate()
    }

    /// Build the configured input-check stages
    pub fn input_stages(&self) -> Result<Vec<Arc<dyn PolicyStage>>> {
        if !self.input.enabled || self.input.blocked_patterns.is_empty() {
            return Ok(Vec::new());
        }
        let stage = KeywordStage::input("input-topics", &self.input.blocked_patterns)?;
        Ok(vec![Arc::new(stage)])
    }

    /// Build the configured output-check stages
    pub fn output_stages(&self) -> Result<Vec<Arc<dyn PolicyStage>>> {
        if !self.output.enabled || self.output.blocked_patterns.is_empty() {
            return Ok(Vec::new());
        }
        let stage = KeywordStage::output("output-topics", &self.output.blocked_patterns)?;
        Ok(vec![Arc::new(stage)])
    }
}

/// Settings for a keyword rail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordRailSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Case-insensitive substrings that block a turn
    #[serde(default)]
    pub blocked_patterns: Vec<String>,
}

impl Default for KeywordRailSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            blocked_patterns: Vec::new(),
        }
    }
}

/// Settings for the fact-checking rail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactCheckSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Minimum accuracy score (0.0-1.0)
    #[serde(default = "default_threshold")]
    pub threshold: f32,

    /// Topics that score a response 0.0
    #[serde(default = "default_disallowed_topics")]
    pub disallowed_topics: Vec<String>,

    /// Registered action used to score responses instead of the keyword scorer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

impl Default for FactCheckSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: default_threshold(),
            disallowed_topics: default_disallowed_topics(),
            action: None,
        }
    }
}

impl FactCheckSettings {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(Error::config(format!(
                "rails.fact_checking.threshold must be within [0.0, 1.0], got {}",
                self.threshold
            )));
        }
        Ok(())
    }

    /// Keyword scorer over the configured disallowed topics
    pub fn keyword_scorer(&self) -> Result<KeywordFactScorer> {
        KeywordFactScorer::new(&self.disallowed_topics)
    }

    /// Build the fact-check stage around `scorer`
    pub fn stage(&self, scorer: Arc<dyn FactScorer>) -> Result<FactCheckStage> {
        FactCheckStage::new("fact-check", scorer).with_threshold(self.threshold)
    }
}

fn default_true() -> bool {
    true
}

fn default_threshold() -> f32 {
    DEFAULT_THRESHOLD
}

fn default_disallowed_topics() -> Vec<String> {
    vec!["aliens".to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::StageKind;

    #[test]
    fn test_rails_deserialization() {
        let yaml = r#"
input:
  blocked_patterns: ["ignore previous instructions", "bomb"]
output:
  enabled: false
  blocked_patterns: ["password"]
fact_checking:
  threshold: 0.7
  action: check_facts
"#;

        let settings: RailsSettings = serde_yaml::from_str(yaml).unwrap();
        assert!(settings.input.enabled);
        assert_eq!(settings.input.blocked_patterns.len(), 2);
        assert!(!settings.output.enabled);
        assert_eq!(settings.fact_checking.threshold, 0.7);
        assert_eq!(settings.fact_checking.disallowed_topics, vec!["aliens"]);
        assert_eq!(settings.fact_checking.action.as_deref(), Some("check_facts"));
    }

    #[test]
    fn test_stage_construction() {
        let settings: RailsSettings = serde_yaml::from_str(
            "input: {blocked_patterns: [bomb]}\noutput: {enabled: false, blocked_patterns: [x]}",
        )
        .unwrap();

        let input = settings.input_stages().unwrap();
        assert_eq!(input.len(), 1);
        assert_eq!(input[0].kind(), StageKind::InputCheck);
        assert!(settings.output_stages().unwrap().is_empty());
    }

    #[test]
    fn test_empty_settings_have_defaults() {
        let settings: RailsSettings = serde_yaml::from_str("{}").unwrap();
        assert!(settings.input_stages().unwrap().is_empty());
        assert!(settings.fact_checking.enabled);
        assert_eq!(settings.fact_checking.threshold, DEFAULT_THRESHOLD);
    }

    #[test]
    fn test_threshold_validation() {
        let mut settings = RailsSettings::default();
        settings.fact_checking.threshold = -0.1;
        assert!(matches!(settings.validate(), Err(Error::Config(_))));
    }
}
