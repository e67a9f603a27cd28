//! Fact-check rail
//!
//! The stage delegates scoring to a [`FactScorer`] and applies a fixed
//! threshold contract: a score below the threshold blocks the response,
//! anything else lets it through with the score attached as metadata.

use crate::keyword::KeywordMatcher;
use crate::stage::{PolicyStage, StageContext, StageKind, Verdict};
use async_trait::async_trait;
use railguard_core::{Error, Result, Turn};
use std::sync::Arc;
use tracing::debug;

/// Default minimum accuracy score for a response to be delivered
pub const DEFAULT_THRESHOLD: f32 = 0.5;

/// Computes an accuracy score in [0.0, 1.0] for a draft response
#[async_trait]
pub trait FactScorer: Send + Sync {
    async fn score(&self, context: &StageContext<'_>, draft: &Turn) -> Result<f32>;

    /// Get the scorer name
    fn name(&self) -> &str;
}

/// Scores 0.0 when the draft mentions a disallowed topic, otherwise 1.0
#[derive(Debug, Clone)]
pub struct KeywordFactScorer {
    topics: KeywordMatcher,
}

impl KeywordFactScorer {
    pub fn new<I, S>(disallowed_topics: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            topics: KeywordMatcher::new(disallowed_topics)?,
        })
    }

    /// Score plain text without a pipeline context
    pub fn score_text(&self, text: &str) -> f32 {
        if self.topics.is_match(text) {
            0.0
        } else {
            1.0
        }
    }
}

#[async_trait]
impl FactScorer for KeywordFactScorer {
    async fn score(&self, _context: &StageContext<'_>, draft: &Turn) -> Result<f32> {
        Ok(self.score_text(draft.content()))
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

/// Blocks draft responses whose accuracy score falls below a threshold
pub struct FactCheckStage {
    name: String,
    scorer: Arc<dyn FactScorer>,
    threshold: f32,
}

impl FactCheckStage {
    /// Create a fact-check stage with the default threshold
    pub fn new(name: impl Into<String>, scorer: Arc<dyn FactScorer>) -> Self {
        Self {
            name: name.into(),
            scorer,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    /// Set the minimum score, which must lie in [0.0, 1.0]
    pub fn with_threshold(mut self, threshold: f32) -> Result<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(Error::config(format!(
                "fact-check threshold must be within [0.0, 1.0], got {}",
                threshold
            )));
        }
        self.threshold = threshold;
        Ok(self)
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}

#[async_trait]
impl PolicyStage for FactCheckStage {
    async fn evaluate(&self, context: &StageContext<'_>, turn: &Turn) -> Result<Verdict> {
        if turn.is_blank() {
            return Ok(Verdict::Allow);
        }

        let raw = self.scorer.score(context, turn).await?;
        if !raw.is_finite() {
            return Err(Error::policy(format!(
                "scorer '{}' returned a non-finite score",
                self.scorer.name()
            )));
        }
        let score = raw.clamp(0.0, 1.0);

        debug!(stage = %self.name, scorer = self.scorer.name(), score, threshold = self.threshold, "Fact-check scored");

        if score < self.threshold {
            Ok(Verdict::block(format!(
                "fact-check failed: score {:?} < threshold {:?}",
                score, self.threshold
            )))
        } else {
            Ok(Verdict::Revise(turn.clone().with_accuracy(score)))
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> StageKind {
        StageKind::FactCheck
    }
}
