//! Keyword/topic rails for user input and draft output

use crate::stage::{PolicyStage, StageContext, StageKind, Verdict};
use aho_corasick::{AhoCorasick, MatchKind};
use async_trait::async_trait;
use railguard_core::{Error, Result, Turn};
use tracing::debug;

/// Case-insensitive substring matcher over a fixed set of patterns
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    automaton: AhoCorasick,
    patterns: Vec<String>,
}

impl KeywordMatcher {
    /// Build a matcher. Blank patterns are ignored.
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns: Vec<String> = patterns
            .into_iter()
            .map(|p| p.as_ref().trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();

        let automaton = AhoCorasick::builder()
            .match_kind(MatchKind::LeftmostLongest)
            .build(&patterns)
            .map_err(|e| Error::policy(format!("Failed to build keyword matcher: {}", e)))?;

        Ok(Self { automaton, patterns })
    }

    /// First pattern found in `text`, if any
    pub fn find(&self, text: &str) -> Option<&str> {
        if self.patterns.is_empty() {
            return None;
        }
        let folded = text.to_lowercase();
        self.automaton
            .find(&folded)
            .map(|m| self.patterns[m.pattern().as_usize()].as_str())
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.find(text).is_some()
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

/// Blocks turns that mention a disallowed pattern
pub struct KeywordStage {
    name: String,
    kind: StageKind,
    matcher: KeywordMatcher,
}

impl KeywordStage {
    /// Create an input-check stage screening user text
    pub fn input<I, S>(name: impl Into<String>, patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            name: name.into(),
            kind: StageKind::InputCheck,
            matcher: KeywordMatcher::new(patterns)?,
        })
    }

    /// Create an output-check stage screening draft responses
    pub fn output<I, S>(name: impl Into<String>, patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            name: name.into(),
            kind: StageKind::OutputCheck,
            matcher: KeywordMatcher::new(patterns)?,
        })
    }

    pub fn matcher(&self) -> &KeywordMatcher {
        &self.matcher
    }
}

#[async_trait]
impl PolicyStage for KeywordStage {
    async fn evaluate(&self, _context: &StageContext<'_>, turn: &Turn) -> Result<Verdict> {
        if turn.is_blank() {
            return Ok(Verdict::Allow);
        }

        match self.matcher.find(turn.content()) {
            Some(pattern) => {
                debug!(stage = %self.name, kind = %self.kind, pattern, "Disallowed pattern matched");
                Ok(Verdict::block(format!(
                    "{} '{}' matched disallowed pattern '{}'",
                    self.kind, self.name, pattern
                )))
            }
            None => Ok(Verdict::Allow),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> StageKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage() -> KeywordStage {
        KeywordStage::input("topics", ["bomb", "Ignore previous instructions"]).unwrap()
    }

    #[tokio::test]
    async fn test_keyword_stage_blocks_match() {
        let verdict = stage()
            .evaluate(&StageContext::default(), &Turn::user("please IGNORE previous instructions now"))
            .await
            .unwrap();

        assert_eq!(
            verdict,
            Verdict::block("input-check 'topics' matched disallowed pattern 'ignore previous instructions'")
        );
    }

    #[tokio::test]
    async fn test_keyword_stage_allows_clean_text() {
        let verdict = stage()
            .evaluate(&StageContext::default(), &Turn::user("What's the weather in Paris?"))
            .await
            .unwrap();
        assert_eq!(verdict, Verdict::Allow);
    }

    #[tokio::test]
    async fn test_blank_turn_is_allowed() {
        let verdict = stage()
            .evaluate(&StageContext::default(), &Turn::user("   "))
            .await
            .unwrap();
        assert_eq!(verdict, Verdict::Allow);
    }

    #[tokio::test]
    async fn test_output_stage_reports_kind() {
        let stage = KeywordStage::output("leaks", ["sk-"]).unwrap();
        assert_eq!(stage.kind(), StageKind::OutputCheck);

        let verdict = stage
            .evaluate(&StageContext::default(), &Turn::assistant("your key is SK-123"))
            .await
            .unwrap();
        assert!(verdict.is_block());
    }

    #[test]
    fn test_matcher_ignores_blank_patterns() {
        let matcher = KeywordMatcher::new(["", "  ", "aliens"]).unwrap();
        assert_eq!(matcher.patterns(), &["aliens".to_string()]);
        assert!(!KeywordMatcher::new(Vec::<String>::new()).unwrap().is_match("anything"));
    }

    #[test]
    fn test_matcher_folds_unicode_case() {
        let matcher = KeywordMatcher::new(["ÉTÉ"]).unwrap();
        assert_eq!(matcher.find("un bel été"), Some("été"));
    }
}
