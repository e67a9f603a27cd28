//! Rails configuration
//!
//! Loaded once at startup from a configuration directory containing
//! `config.yml` (or `config.yaml`), and immutable for the session.

use railguard_core::{Error, Result};
use railguard_policy::RailsSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

const CONFIG_FILE_NAMES: [&str; 2] = ["config.yml", "config.yaml"];

/// Complete configuration of a guarded chat agent
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RailsConfig {
    /// System instructions given to the provider before the user turn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    /// Generation provider settings
    #[serde(default)]
    pub model: ModelSettings,

    /// Active rails and their thresholds
    #[serde(default)]
    pub rails: RailsSettings,
}

impl RailsConfig {
    /// Parse configuration from YAML text
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("Failed to parse configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a directory or a single file.
    ///
    /// A path that does not exist yields the default configuration.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let file = match resolve_config_file(path) {
            Some(file) => file,
            None => {
                info!("No configuration found at {}, using defaults", path.display());
                return Ok(Self::default());
            }
        };

        info!("Loading configuration from {}", file.display());
        let content = std::fs::read_to_string(&file)?;
        Self::from_yaml(&content)
    }

    pub fn validate(&self) -> Result<()> {
        self.model.validate()?;
        self.rails.validate()
    }
}

fn resolve_config_file(path: &Path) -> Option<PathBuf> {
    if path.is_file() {
        return Some(path.to_path_buf());
    }
    if path.is_dir() {
        return CONFIG_FILE_NAMES
            .iter()
            .map(|name| path.join(name))
            .find(|candidate| candidate.is_file());
    }
    None
}

/// Which generation backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Deterministic offline provider
    #[default]
    Scripted,
    /// OpenAI-compatible chat completions API
    OpenAi,
}

/// Generation provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    #[serde(default)]
    pub provider: ProviderKind,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Upper bound on tool-call round trips per turn
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            model: default_model(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            temperature: None,
            max_tool_rounds: default_max_tool_rounds(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ModelSettings {
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(Error::config("model.timeout_secs must be greater than zero"));
        }
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(Error::config(format!(
                    "model.temperature must be within [0.0, 2.0], got {}",
                    t
                )));
            }
        }
        Ok(())
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_max_tool_rounds() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
instructions: "You are a helpful assistant."
model:
  provider: openai
  model: gpt-4o
  temperature: 0.2
rails:
  input:
    blocked_patterns: ["ignore previous instructions"]
  fact_checking:
    threshold: 0.6
"#;

    #[test]
    fn test_config_parsing() {
        let config = RailsConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.instructions.as_deref(), Some("You are a helpful assistant."));
        assert_eq!(config.model.provider, ProviderKind::OpenAi);
        assert_eq!(config.model.model, "gpt-4o");
        assert_eq!(config.model.max_tool_rounds, 4);
        assert_eq!(config.rails.fact_checking.threshold, 0.6);
    }

    #[test]
    fn test_defaults() {
        let config = RailsConfig::default();
        assert_eq!(config.model.provider, ProviderKind::Scripted);
        assert!(config.instructions.is_none());
        assert!(config.rails.fact_checking.enabled);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = RailsConfig::from_yaml("rails:\n  fact_checking:\n    threshold: 2.0\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = RailsConfig::from_yaml("model:\n  provider: llama\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.yaml"), SAMPLE).unwrap();

        let config = RailsConfig::from_path(dir.path()).unwrap();
        assert_eq!(config.model.model, "gpt-4o");

        let file_config = RailsConfig::from_path(dir.path().join("config.yaml")).unwrap();
        assert_eq!(file_config.model.model, "gpt-4o");
    }

    #[test]
    fn test_missing_path_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = RailsConfig::from_path(dir.path().join("absent")).unwrap();
        assert_eq!(config.model.provider, ProviderKind::Scripted);

        let empty_dir = RailsConfig::from_path(dir.path()).unwrap();
        assert_eq!(empty_dir.model.provider, ProviderKind::Scripted);
    }
}
