//! Railguard Policy Stages
//!
//! Rails applied to a conversational turn around generation:
//! - Input checks (screen user text before generation)
//! - Output checks (screen the draft response)
//! - Fact checks (score the draft response against a threshold)
//!
//! Every stage returns a [`Verdict`]: allow, block with a reason, or
//! revise with a replacement turn.

pub mod fact_check;
pub mod keyword;
pub mod settings;
pub mod stage;

pub use fact_check::{FactCheckStage, FactScorer, KeywordFactScorer, DEFAULT_THRESHOLD};
pub use keyword::{KeywordMatcher, KeywordStage};
pub use settings::{FactCheckSettings, KeywordRailSettings, RailsSettings};
pub use stage::{PolicyStage, StageContext, StageKind, Verdict};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::fact_check::{FactCheckStage, FactScorer, KeywordFactScorer};
    pub use crate::keyword::KeywordStage;
    pub use crate::settings::RailsSettings;
    pub use crate::stage::{PolicyStage, StageContext, StageKind, Verdict};
}
