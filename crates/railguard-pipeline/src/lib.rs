//! Railguard Pipeline
//!
//! Puts the rails from `railguard-policy` around a generation provider:
//! - Action registry and the built-in `get_weather` / `check_facts` actions
//! - Generation providers (scripted, OpenAI-compatible)
//! - The orchestrator that runs a turn through input, generation, output and
//!   fact-check phases and yields `Delivered` or `Blocked`
//! - Configuration loading from a rails directory

pub mod actions;
pub mod config;
pub mod orchestrator;
pub mod providers;
pub mod registry;
pub mod scoring;

pub use actions::register_builtin_actions;
pub use config::{ModelSettings, ProviderKind, RailsConfig};
pub use orchestrator::{
    Orchestrator, OrchestratorBuilder, PipelineResult, PipelineState, RunReport,
};
pub use providers::{build_provider, GenerationProvider, OpenAiProvider, ScriptedProvider};
pub use registry::{
    ActionHandler, ActionInvoker, ActionOutput, ActionParam, ActionRegistry, ActionSpec,
};
pub use scoring::ActionFactScorer;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::RailsConfig;
    pub use crate::orchestrator::{Orchestrator, PipelineResult};
    pub use crate::providers::GenerationProvider;
    pub use crate::registry::{ActionInvoker, ActionOutput, ActionRegistry};
}
