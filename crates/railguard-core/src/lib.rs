//! Railguard Core
//!
//! Core types shared across the Railguard conversational policy pipeline.
//!
//! This crate provides:
//! - Conversation turns (`Turn`, `Role`, `TurnMetadata`)
//! - Action invocation requests issued by generation providers
//! - Error types and result handling

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{ActionArgs, ActionRequest, Role, Turn, TurnMetadata};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{ActionArgs, ActionRequest, Role, Turn, TurnMetadata};
}
