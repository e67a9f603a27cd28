//! Generation providers
//!
//! A provider turns an ordered sequence of turns into a draft assistant
//! turn. Actions are reachable only through the [`ActionInvoker`] handed to
//! each call, so a provider can be exercised without a registry.

pub mod openai;
pub mod scripted;

pub use openai::OpenAiProvider;
pub use scripted::ScriptedProvider;

use crate::config::{ModelSettings, ProviderKind};
use crate::registry::ActionInvoker;
use async_trait::async_trait;
use railguard_core::{Result, Turn};
use std::sync::Arc;
use tracing::info;

/// Trait for text-generation backends
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Produce a draft assistant turn, invoking actions as needed
    async fn generate(&self, turns: &[Turn], actions: &dyn ActionInvoker) -> Result<Turn>;

    /// Get the provider name
    fn name(&self) -> &str;
}

/// Build the provider selected by `settings`
pub fn build_provider(settings: &ModelSettings) -> Result<Arc<dyn GenerationProvider>> {
    let provider: Arc<dyn GenerationProvider> = match settings.provider {
        ProviderKind::Scripted => Arc::new(ScriptedProvider::new()?),
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::from_settings(settings)?),
    };
    info!(provider = provider.name(), model = %settings.model, "Generation provider ready");
    Ok(provider)
}
