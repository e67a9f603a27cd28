//! Fact scoring through a registered action

use crate::registry::ActionRegistry;
use async_trait::async_trait;
use railguard_core::{ActionArgs, Error, Result, Turn};
use railguard_policy::{FactScorer, StageContext};
use std::sync::Arc;

/// Scores a draft by calling an action with `{response, context}` and
/// reading a numeric result
pub struct ActionFactScorer {
    action: String,
    registry: Arc<ActionRegistry>,
}

impl ActionFactScorer {
    /// Fails if `action` is not registered
    pub fn new(action: impl Into<String>, registry: Arc<ActionRegistry>) -> Result<Self> {
        let action = action.into();
        if !registry.contains(&action) {
            return Err(Error::config(format!(
                "fact-check action '{}' is not registered",
                action
            )));
        }
        Ok(Self { action, registry })
    }
}

#[async_trait]
impl FactScorer for ActionFactScorer {
    async fn score(&self, context: &StageContext<'_>, draft: &Turn) -> Result<f32> {
        let mut args = ActionArgs::new();
        args.insert("response".into(), draft.content().into());
        if let Some(user) = context.last_user() {
            args.insert("context".into(), user.content().into());
        }

        let output = self.registry.invoke(&self.action, args).await?;
        let score = output.as_f64().ok_or_else(|| {
            Error::policy(format!(
                "action '{}' returned a non-numeric score: {}",
                self.action,
                output.to_text()
            ))
        })?;
        if !score.is_finite() {
            return Err(Error::policy(format!(
                "action '{}' returned a non-finite score",
                self.action
            )));
        }

        // narrow only after clamping, large f64 values overflow f32
        Ok(score.clamp(0.0, 1.0) as f32)
    }

    fn name(&self) -> &str {
        &self.action
    }
}
