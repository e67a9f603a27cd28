//! Pipeline orchestrator
//!
//! Runs one user turn through the rails:
//!
//! ```text
//! Received -> InputChecked -> Generated -> OutputChecked -> FactChecked -> Delivered
//!     \______________\_____________\______________\______________\-> Blocked
//! ```
//!
//! Stages within a phase run in registration order and the first block
//! halts the run. Provider and action failures never escape: they become
//! `Blocked("generation-error: ...")`.

use crate::config::RailsConfig;
use crate::providers::GenerationProvider;
use crate::registry::{ActionInvoker, ActionOutput, ActionRegistry, ActionSpec};
use crate::scoring::ActionFactScorer;
use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::Mutex;
use railguard_core::{ActionRequest, Error, Result, Role, Turn};
use railguard_policy::{FactScorer, PolicyStage, StageContext, StageKind, Verdict};
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Terminal outcome of one pipeline run
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineResult {
    /// The final assistant turn reached the user
    Delivered(Turn),

    /// A rail or a failure stopped the run
    Blocked(String),
}

impl PipelineResult {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered(_))
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked(_))
    }

    /// The delivered turn, if any
    pub fn turn(&self) -> Option<&Turn> {
        match self {
            Self::Delivered(turn) => Some(turn),
            Self::Blocked(_) => None,
        }
    }

    /// The block reason, if any
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Delivered(_) => None,
            Self::Blocked(reason) => Some(reason.as_str()),
        }
    }
}

/// States of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Received,
    InputChecked,
    Generated,
    OutputChecked,
    FactChecked,
    Delivered,
    Blocked,
}

impl PipelineState {
    /// Phase that runs when leaving this state
    fn next_phase(&self) -> &'static str {
        match self {
            Self::Received => "input",
            Self::InputChecked => "generation",
            Self::Generated => "output",
            Self::OutputChecked => "fact_check",
            Self::FactChecked | Self::Delivered | Self::Blocked => "delivery",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Everything observed during one run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Terminal outcome
    pub result: PipelineResult,

    /// States visited, in order, ending in `Delivered` or `Blocked`
    pub trace: Vec<PipelineState>,

    /// Actions invoked during generation, in call order
    pub actions: Vec<String>,

    /// Wall-clock time of the run
    pub latency_us: u64,
}

impl RunReport {
    /// Phase that blocked the run, if it was blocked
    pub fn blocked_phase(&self) -> Option<&'static str> {
        if !self.result.is_blocked() {
            return None;
        }
        let before_block = self.trace.iter().rev().nth(1)?;
        Some(before_block.next_phase())
    }
}

/// Sequences policy stages around a generation provider
pub struct Orchestrator {
    input_stages: Vec<Arc<dyn PolicyStage>>,
    output_stages: Vec<Arc<dyn PolicyStage>>,
    fact_stages: Vec<Arc<dyn PolicyStage>>,
    provider: Arc<dyn GenerationProvider>,
    actions: Arc<ActionRegistry>,
    instructions: Option<String>,
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    /// Build an orchestrator with the rails described by `config`
    pub fn from_config(
        config: &RailsConfig,
        actions: Arc<ActionRegistry>,
        provider: Arc<dyn GenerationProvider>,
    ) -> Result<Self> {
        config.validate()?;

        let mut builder = Self::builder()
            .provider(provider)
            .actions(actions.clone())
            .stages(config.rails.input_stages()?)
            .stages(config.rails.output_stages()?);

        if let Some(instructions) = &config.instructions {
            builder = builder.instructions(instructions.clone());
        }

        let facts = &config.rails.fact_checking;
        if facts.enabled {
            let scorer: Arc<dyn FactScorer> = match &facts.action {
                Some(action) => Arc::new(ActionFactScorer::new(action.clone(), actions)?),
                None => Arc::new(facts.keyword_scorer()?),
            };
            builder = builder.stage(Arc::new(facts.stage(scorer)?));
        }

        builder.build()
    }

    /// Number of stages per kind
    pub fn stage_count(&self, kind: StageKind) -> usize {
        match kind {
            StageKind::InputCheck => self.input_stages.len(),
            StageKind::OutputCheck => self.output_stages.len(),
            StageKind::FactCheck => self.fact_stages.len(),
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Run a user turn and return only its outcome
    pub async fn run(&self, user_turn: Turn) -> PipelineResult {
        self.execute(user_turn).await.result
    }

    /// Run a user turn through every phase
    pub async fn execute(&self, user_turn: Turn) -> RunReport {
        let start = Instant::now();
        let recorder = RecordingInvoker::new(self.actions.as_ref());
        let mut trace = vec![PipelineState::Received];

        let result = match self.drive(user_turn, &recorder, &mut trace).await {
            Ok(turn) => {
                trace.push(PipelineState::Delivered);
                PipelineResult::Delivered(turn)
            }
            Err(reason) => {
                trace.push(PipelineState::Blocked);
                PipelineResult::Blocked(reason)
            }
        };

        let report = RunReport {
            result,
            trace,
            actions: recorder.into_invoked(),
            latency_us: start.elapsed().as_micros() as u64,
        };

        metrics::histogram!("railguard_pipeline_latency_us").record(report.latency_us as f64);
        match report.blocked_phase() {
            Some(phase) => {
                metrics::counter!("railguard_decisions_total", "phase" => phase, "outcome" => "blocked")
                    .increment(1);
            }
            None => {
                metrics::counter!("railguard_decisions_total", "phase" => "delivery", "outcome" => "delivered")
                    .increment(1);
            }
        }

        report
    }

    async fn drive(
        &self,
        user_turn: Turn,
        recorder: &RecordingInvoker<'_>,
        trace: &mut Vec<PipelineState>,
    ) -> std::result::Result<Turn, String> {
        let mut context: Vec<Turn> = Vec::new();
        if let Some(instructions) = &self.instructions {
            context.push(Turn::system(instructions.clone()));
        }

        let user_turn = apply_stages(&self.input_stages, &context, user_turn).await?;
        advance(trace, PipelineState::InputChecked);
        context.push(user_turn);

        let draft = self.generate(&context, recorder).await?;
        context.extend(recorder.tool_turns());
        advance(trace, PipelineState::Generated);

        let draft = apply_stages(&self.output_stages, &context, draft).await?;
        advance(trace, PipelineState::OutputChecked);

        let draft = apply_stages(&self.fact_stages, &context, draft).await?;
        advance(trace, PipelineState::FactChecked);

        Ok(draft)
    }

    async fn generate(
        &self,
        context: &[Turn],
        recorder: &RecordingInvoker<'_>,
    ) -> std::result::Result<Turn, String> {
        let outcome = AssertUnwindSafe(self.provider.generate(context, recorder))
            .catch_unwind()
            .await;

        let draft = match outcome {
            Ok(Ok(draft)) => draft,
            Ok(Err(e)) => return Err(generation_error(&e)),
            Err(payload) => {
                let message = format!("provider panicked: {}", panic_message(payload.as_ref()));
                return Err(generation_error(&Error::provider(message)));
            }
        };

        if let Some(failure) = recorder.failure() {
            return Err(generation_error(&failure));
        }
        if draft.role() != Role::Assistant {
            return Err(generation_error(&Error::provider(format!(
                "provider returned a {} turn",
                draft.role()
            ))));
        }

        Ok(draft)
    }
}

fn advance(trace: &mut Vec<PipelineState>, state: PipelineState) {
    debug!(state = %state, "Pipeline advanced");
    trace.push(state);
}

async fn apply_stages(
    stages: &[Arc<dyn PolicyStage>],
    context: &[Turn],
    turn: Turn,
) -> std::result::Result<Turn, String> {
    let mut current = turn;

    for stage in stages {
        let ctx = StageContext::new(context);
        match stage.evaluate(&ctx, &current).await {
            Ok(Verdict::Allow) => {}
            Ok(Verdict::Revise(next)) => current = next,
            Ok(Verdict::Block(reason)) => {
                warn!(stage = stage.name(), kind = %stage.kind(), %reason, "Turn blocked");
                return Err(reason);
            }
            Err(e) if e.is_action_error() => return Err(generation_error(&e)),
            Err(e) => {
                warn!(stage = stage.name(), error = %e, "Stage failed, blocking turn");
                return Err(policy_error(stage.name(), &e));
            }
        }
    }

    Ok(current)
}

fn generation_error(error: &Error) -> String {
    warn!(error = %error, "Generation failed");
    match error {
        Error::Provider(message) => format!("generation-error: {}", message),
        other => format!("generation-error: {}", other),
    }
}

fn policy_error(stage: &str, error: &Error) -> String {
    match error {
        Error::Policy(message) => format!("policy-error: {}: {}", stage, message),
        other => format!("policy-error: {}: {}", stage, other),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[derive(Default)]
struct Recording {
    invoked: Vec<String>,
    tool_turns: Vec<Turn>,
    failure: Option<Error>,
}

/// Action capability for a single run: forwards to the registry and
/// records every invocation
struct RecordingInvoker<'a> {
    registry: &'a ActionRegistry,
    recording: Mutex<Recording>,
}

impl<'a> RecordingInvoker<'a> {
    fn new(registry: &'a ActionRegistry) -> Self {
        Self {
            registry,
            recording: Mutex::new(Recording::default()),
        }
    }

    fn tool_turns(&self) -> Vec<Turn> {
        self.recording.lock().tool_turns.clone()
    }

    fn failure(&self) -> Option<Error> {
        self.recording.lock().failure.take()
    }

    fn into_invoked(self) -> Vec<String> {
        self.recording.into_inner().invoked
    }
}

#[async_trait]
impl<'a> ActionInvoker for RecordingInvoker<'a> {
    fn specs(&self) -> Vec<ActionSpec> {
        self.registry.specs()
    }

    async fn invoke_action(&self, request: ActionRequest) -> Result<ActionOutput> {
        let name = request.name.clone();
        let result = self.registry.invoke(&request.name, request.args).await;

        let mut recording = self.recording.lock();
        recording.invoked.push(name.clone());
        match &result {
            Ok(output) => recording.tool_turns.push(Turn::tool(name, output.to_text())),
            Err(e) => {
                if recording.failure.is_none() {
                    recording.failure = Some(replay_error(e));
                }
            }
        }
        drop(recording);

        result
    }
}

/// Copy of a registry error, kept so a failure swallowed by the provider
/// still blocks the run
fn replay_error(error: &Error) -> Error {
    match error {
        Error::UnknownAction(name) => Error::UnknownAction(name.clone()),
        Error::ActionExecution { action, message } => Error::action_execution(action, message),
        other => Error::internal(other.to_string()),
    }
}

/// Builder for [`Orchestrator`]
#[derive(Default)]
pub struct OrchestratorBuilder {
    input_stages: Vec<Arc<dyn PolicyStage>>,
    output_stages: Vec<Arc<dyn PolicyStage>>,
    fact_stages: Vec<Arc<dyn PolicyStage>>,
    provider: Option<Arc<dyn GenerationProvider>>,
    actions: Option<Arc<ActionRegistry>>,
    instructions: Option<String>,
}

impl OrchestratorBuilder {
    /// Add a stage to the phase matching its kind
    pub fn stage(mut self, stage: Arc<dyn PolicyStage>) -> Self {
        match stage.kind() {
            StageKind::InputCheck => self.input_stages.push(stage),
            StageKind::OutputCheck => self.output_stages.push(stage),
            StageKind::FactCheck => self.fact_stages.push(stage),
        }
        self
    }

    /// Add several stages, keeping their order
    pub fn stages(self, stages: impl IntoIterator<Item = Arc<dyn PolicyStage>>) -> Self {
        stages.into_iter().fold(self, Self::stage)
    }

    pub fn provider(mut self, provider: Arc<dyn GenerationProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn actions(mut self, actions: Arc<ActionRegistry>) -> Self {
        self.actions = Some(actions);
        self
    }

    /// System instructions placed before the user turn
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn build(self) -> Result<Orchestrator> {
        let provider = self
            .provider
            .ok_or_else(|| Error::config("a generation provider is required"))?;
        let actions = self.actions.unwrap_or_default();

        info!(
            provider = provider.name(),
            input = self.input_stages.len(),
            output = self.output_stages.len(),
            fact_check = self.fact_stages.len(),
            actions = actions.len(),
            "Pipeline assembled"
        );

        Ok(Orchestrator {
            input_stages: self.input_stages,
            output_stages: self.output_stages,
            fact_stages: self.fact_stages,
            provider,
            actions,
            instructions: self.instructions,
        })
    }
}
