//! Policy stage trait and verdicts

use async_trait::async_trait;
use railguard_core::{Result, Role, Turn};
use std::fmt;

/// Trait for all policy stages (rails)
#[async_trait]
pub trait PolicyStage: Send + Sync {
    /// Evaluate a turn. Implementations must not mutate the turn; a
    /// transformed turn is returned through [`Verdict::Revise`].
    async fn evaluate(&self, context: &StageContext<'_>, turn: &Turn) -> Result<Verdict>;

    /// Get the stage name
    fn name(&self) -> &str;

    /// Get the point in the pipeline this stage runs at
    fn kind(&self) -> StageKind;
}

/// Where a stage runs in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    /// Screens the user turn before generation
    InputCheck,
    /// Screens the draft response after generation
    OutputCheck,
    /// Scores the draft response for accuracy
    FactCheck,
}

impl StageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InputCheck => "input-check",
            Self::OutputCheck => "output-check",
            Self::FactCheck => "fact-check",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of evaluating one stage
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Let the turn through unchanged
    Allow,

    /// Stop the pipeline with a human-readable reason
    Block(String),

    /// Let a replacement turn through in place of the evaluated one
    Revise(Turn),
}

impl Verdict {
    /// Create a block verdict
    pub fn block(reason: impl Into<String>) -> Self {
        Self::Block(reason.into())
    }

    pub fn is_block(&self) -> bool {
        matches!(self, Self::Block(_))
    }
}

/// Read-only view of the conversation a stage is evaluated in
#[derive(Debug, Clone, Copy, Default)]
pub struct StageContext<'a> {
    turns: &'a [Turn],
}

impl<'a> StageContext<'a> {
    /// Create a context over the turns seen so far in this run
    pub fn new(turns: &'a [Turn]) -> Self {
        Self { turns }
    }

    /// All turns, oldest first
    pub fn turns(&self) -> &'a [Turn] {
        self.turns
    }

    /// Most recent user turn
    pub fn last_user(&self) -> Option<&'a Turn> {
        self.turns.iter().rfind(|t| t.role() == Role::User)
    }

    /// Turns produced by actions during generation
    pub fn tool_turns(&self) -> impl Iterator<Item = &'a Turn> {
        self.turns.iter().filter(|t| t.role() == Role::Tool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_lookups() {
        let turns = vec![
            Turn::system("be brief"),
            Turn::user("weather in Paris?"),
            Turn::tool("get_weather", "sunny"),
        ];
        let ctx = StageContext::new(&turns);

        assert_eq!(ctx.last_user().map(|t| t.content()), Some("weather in Paris?"));
        assert_eq!(ctx.tool_turns().count(), 1);
        assert!(StageContext::default().last_user().is_none());
    }

    #[test]
    fn test_stage_kind_names() {
        assert_eq!(StageKind::InputCheck.to_string(), "input-check");
        assert_eq!(StageKind::FactCheck.as_str(), "fact-check");
    }
}
