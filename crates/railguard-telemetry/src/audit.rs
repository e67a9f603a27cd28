//! Hash-chained audit trail of pipeline runs
//!
//! Each event carries the SHA-256 of its own fields plus the hash of the
//! event before it, so editing or dropping any recorded turn breaks
//! `verify`. User input is stored only as a digest.

use railguard_core::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

/// Audit trail for one chat session
pub struct AuditTrail {
    session_id: String,
    events: Vec<TurnAuditEvent>,
    chain_hash: Option<String>,
}

impl AuditTrail {
    /// Create an audit trail with a fresh session id
    pub fn new() -> Self {
        Self::with_session_id(uuid::Uuid::new_v4().to_string())
    }

    /// Create an audit trail for a known session id
    pub fn with_session_id(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            events: Vec::new(),
            chain_hash: None,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Chain an event onto the trail, returning its hash
    pub fn record(&mut self, event: TurnAuditEvent) -> &str {
        let mut event = event;
        event.sequence = self.events.len() as u64;
        event.session_id = self.session_id.clone();
        event.previous_hash = self.chain_hash.clone();

        let hash = compute_hash(&event);
        event.hash = Some(hash.clone());

        self.chain_hash = Some(hash);
        self.events.push(event);
        self.chain_hash.as_deref().unwrap_or_default()
    }

    /// Verify the integrity of the trail
    pub fn verify(&self) -> bool {
        let mut prev_hash: Option<&String> = None;

        for (index, event) in self.events.iter().enumerate() {
            if event.sequence != index as u64 || event.previous_hash.as_ref() != prev_hash {
                return false;
            }

            if event.hash.as_deref() != Some(compute_hash(event).as_str()) {
                return false;
            }

            prev_hash = event.hash.as_ref();
        }

        true
    }

    pub fn events(&self) -> &[TurnAuditEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Write every event as one JSON object per line
    pub fn write_jsonl(&self, writer: impl Write) -> Result<()> {
        let mut writer = BufWriter::new(writer);
        for event in &self.events {
            serde_json::to_writer(&mut writer, event)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Export the trail to a JSON-lines file, replacing any existing file
    pub fn export(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.write_jsonl(File::create(path)?)?;
        info!(
            path = %path.display(),
            events = self.events.len(),
            session_id = %self.session_id,
            "Audit trail exported"
        );
        Ok(())
    }

    /// Load a previously exported trail
    ///
    /// The events are taken as-is; call `verify` to check them.
    pub fn import(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let mut events = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            events.push(serde_json::from_str::<TurnAuditEvent>(&line)?);
        }

        let session_id = events
            .first()
            .map(|e| e.session_id.clone())
            .unwrap_or_default();
        let chain_hash = events.last().and_then(|e| e.hash.clone());

        Ok(Self {
            session_id,
            events,
            chain_hash,
        })
    }
}

impl Default for AuditTrail {
    fn default() -> Self {
        Self::new()
    }
}

fn compute_hash(event: &TurnAuditEvent) -> String {
    let mut hasher = Sha256::new();

    // NUL-separated so adjacent fields cannot run into each other
    let mut field = |bytes: &[u8]| {
        hasher.update(bytes);
        hasher.update([0u8]);
    };
    field(&event.sequence.to_be_bytes());
    field(event.session_id.as_bytes());
    field(event.outcome.as_str().as_bytes());
    field(event.reason.as_deref().unwrap_or_default().as_bytes());
    field(event.input_digest.as_bytes());
    field(event.actions.join(",").as_bytes());
    field(format!("{:?}", event.accuracy).as_bytes());
    field(&event.latency_us.to_be_bytes());
    field(&event.timestamp_ms.to_be_bytes());
    field(event.previous_hash.as_deref().unwrap_or_default().as_bytes());

    format!("{:x}", hasher.finalize())
}

/// SHA-256 hex digest of a user input
pub fn digest_input(input: &str) -> String {
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnOutcome {
    Delivered,
    Blocked,
}

impl TurnOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnOutcome::Delivered => "delivered",
            TurnOutcome::Blocked => "blocked",
        }
    }
}

/// One pipeline run in the audit trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnAuditEvent {
    /// Position in the trail, assigned on record
    pub sequence: u64,

    /// Session the run belongs to, assigned on record
    pub session_id: String,

    pub outcome: TurnOutcome,

    /// Block reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// SHA-256 of the user input
    pub input_digest: String,

    /// Actions invoked during generation
    #[serde(default)]
    pub actions: Vec<String>,

    /// Accuracy score of a delivered response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f32>,

    pub latency_us: u64,

    /// Milliseconds since the Unix epoch
    pub timestamp_ms: u64,

    pub previous_hash: Option<String>,

    pub hash: Option<String>,
}

impl TurnAuditEvent {
    fn new(input: &str, outcome: TurnOutcome) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        Self {
            sequence: 0,
            session_id: String::new(),
            outcome,
            reason: None,
            input_digest: digest_input(input),
            actions: Vec::new(),
            accuracy: None,
            latency_us: 0,
            timestamp_ms,
            previous_hash: None,
            hash: None,
        }
    }

    /// Event for a run that delivered a response
    pub fn delivered(input: &str, accuracy: Option<f32>) -> Self {
        let mut event = Self::new(input, TurnOutcome::Delivered);
        event.accuracy = accuracy;
        event
    }

    /// Event for a run that was blocked
    pub fn blocked(input: &str, reason: impl Into<String>) -> Self {
        let mut event = Self::new(input, TurnOutcome::Blocked);
        event.reason = Some(reason.into());
        event
    }

    pub fn with_actions(mut self, actions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.actions = actions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_latency(mut self, latency_us: u64) -> Self {
        self.latency_us = latency_us;
        self
    }
}
