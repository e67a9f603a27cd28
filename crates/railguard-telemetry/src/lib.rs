//! Railguard Telemetry
//!
//! Audit trail and session metrics for chat sessions.
//!
//! Provides:
//! - Hash-chained audit trail of pipeline runs, exportable as JSON lines
//! - Per-session counters for delivered and blocked turns

pub mod audit;
pub mod metrics;

pub use audit::{digest_input, AuditTrail, TurnAuditEvent, TurnOutcome};
pub use metrics::{MetricsSnapshot, SessionMetrics};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::audit::{AuditTrail, TurnAuditEvent, TurnOutcome};
    pub use crate::metrics::SessionMetrics;
}
