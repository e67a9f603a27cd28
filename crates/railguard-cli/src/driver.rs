//! Interactive chat loop
//!
//! Reads one line at a time, runs it through the orchestrator and prints
//! either the delivered answer or the block reason. A turn fully completes
//! before the next prompt is written.

use anyhow::{Context, Result};
use railguard_core::Turn;
use railguard_pipeline::{Orchestrator, PipelineResult, RunReport};
use railguard_telemetry::{AuditTrail, MetricsSnapshot, SessionMetrics, TurnAuditEvent};
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

const BANNER: &str = "🛡️  Railguard agent (input, generation, output and fact-check rails active)";
const PROMPT: &str = "\nUser: ";
const BOT_PREFIX: &str = "Bot: ";
const BLOCKED_PREFIX: &str = "🛑 Blocked by guardrails: ";
const EXIT_TOKENS: [&str; 2] = ["quit", "exit"];

/// Whether a line ends the session
pub fn is_exit(line: &str) -> bool {
    let line = line.trim();
    EXIT_TOKENS.iter().any(|token| line.eq_ignore_ascii_case(token))
}

/// Drives a chat session against one orchestrator
pub struct ChatDriver {
    orchestrator: Orchestrator,
    audit: AuditTrail,
    metrics: SessionMetrics,
}

impl ChatDriver {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator,
            audit: AuditTrail::new(),
            metrics: SessionMetrics::new(),
        }
    }

    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }

    pub fn metrics(&self) -> &SessionMetrics {
        &self.metrics
    }

    /// Run the loop until an exit token or end of input
    pub async fn run<R, W>(&mut self, mut reader: R, mut writer: W) -> Result<MetricsSnapshot>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(
            session_id = %self.audit.session_id(),
            provider = self.orchestrator.provider_name(),
            "Chat session started"
        );
        writer.write_all(BANNER.as_bytes()).await?;
        writer.write_all(b"\n").await?;

        let mut line = String::new();
        loop {
            writer.write_all(PROMPT.as_bytes()).await?;
            writer.flush().await?;

            line.clear();
            if reader.read_line(&mut line).await? == 0 {
                debug!("End of input");
                writer.write_all(b"\n").await?;
                break;
            }

            let input = line.trim_end_matches(['\r', '\n']);
            if is_exit(input) {
                break;
            }

            let report = self.orchestrator.execute(Turn::user(input)).await;
            self.record(input, &report);

            let rendered = match &report.result {
                PipelineResult::Delivered(turn) => format!("{}{}\n", BOT_PREFIX, turn.content()),
                PipelineResult::Blocked(reason) => format!("{}{}\n", BLOCKED_PREFIX, reason),
            };
            writer.write_all(rendered.as_bytes()).await?;
        }
        writer.flush().await?;

        let snapshot = self.metrics.snapshot();
        info!(
            session_id = %self.audit.session_id(),
            turns = snapshot.turns,
            delivered = snapshot.delivered,
            blocked = snapshot.blocked,
            actions = snapshot.actions_invoked,
            avg_latency_us = snapshot.avg_latency_us(),
            "Chat session ended"
        );
        Ok(snapshot)
    }

    /// Run the loop, then write the audit trail to `audit_log` even when
    /// the loop ended with an I/O error
    pub async fn run_session<R, W>(
        &mut self,
        reader: R,
        writer: W,
        audit_log: Option<&Path>,
    ) -> Result<MetricsSnapshot>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let outcome = self.run(reader, writer).await;

        if let Some(path) = audit_log {
            self.audit
                .export(path)
                .with_context(|| format!("Failed to write audit log to {}", path.display()))?;
        }

        outcome
    }

    fn record(&mut self, input: &str, report: &RunReport) {
        let event = match &report.result {
            PipelineResult::Delivered(turn) => {
                self.metrics
                    .record_delivered(report.actions.len(), report.latency_us);
                TurnAuditEvent::delivered(input, turn.metadata().accuracy)
            }
            PipelineResult::Blocked(reason) => {
                self.metrics
                    .record_blocked(report.actions.len(), report.latency_us);
                TurnAuditEvent::blocked(input, reason.clone())
            }
        };

        self.audit.record(
            event
                .with_actions(report.actions.iter().cloned())
                .with_latency(report.latency_us),
        );
    }
}
