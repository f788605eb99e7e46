//! Audit trail for agenda decisions
//!
//! Append-only and hash-chained: each entry commits to the previous entry's
//! hash, so any edit or removal breaks [`AuditLog::verify`].
//!
//! ```text
//! genesis ──▶ entry 0 (prev = 0…0) ──▶ entry 1 (prev = hash 0) ──▶ …
//! ```
//!
//! Audit writes happen after the decision is committed. A failure here is
//! logged by the caller and does not undo the decision.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::ladder::AgendaStatus;
use crate::proposal::{PostId, UserId};

/// Hash of the (absent) entry before the first one.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("Audit log unavailable: {0}")]
    Unavailable(String),

    #[error("Audit chain broken at entry {sequence}")]
    ChainBroken { sequence: u64 },
}

/// Kind of audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    DecisionSubmitted,
    RescueWindowOpened,
    ExpiredDecisionRecorded,
}

impl AuditAction {
    /// Stable wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DecisionSubmitted => "decision_submitted",
            Self::RescueWindowOpened => "rescue_window_opened",
            Self::ExpiredDecisionRecorded => "expired_decision_recorded",
        }
    }
}

/// What the caller reports.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    pub post_id: PostId,
    pub actor_id: UserId,
    pub action: AuditAction,
    pub from_status: AgendaStatus,
    pub to_status: AgendaStatus,
    /// Decision name plus reason, free-form
    pub detail: String,
}

/// A sealed entry in the chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub sequence: u64,
    pub post_id: PostId,
    pub actor_id: UserId,
    pub action: AuditAction,
    pub from_status: AgendaStatus,
    pub to_status: AgendaStatus,
    pub detail: String,
    pub timestamp: DateTime<Utc>,
    pub prev_hash: String,
    pub hash: String,
}

impl AuditEntry {
    fn compute_hash(
        sequence: u64,
        event: &AuditEvent,
        timestamp: DateTime<Utc>,
        prev_hash: &str,
    ) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"agenda-audit-v1:");
        hasher.update(&sequence.to_le_bytes());
        hasher.update(prev_hash.as_bytes());
        for field in [
            event.post_id.as_str(),
            event.actor_id.as_str(),
            event.action.as_str(),
            event.from_status.as_str(),
            event.to_status.as_str(),
            event.detail.as_str(),
        ] {
            hasher.update(&(field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
        }
        hasher.update(&timestamp.timestamp_nanos_opt().unwrap_or(0).to_le_bytes());
        hasher.finalize().to_hex().to_string()
    }

    fn seal(sequence: u64, event: AuditEvent, prev_hash: String) -> Self {
        let timestamp = Utc::now();
        let hash = Self::compute_hash(sequence, &event, timestamp, &prev_hash);
        Self {
            sequence,
            post_id: event.post_id,
            actor_id: event.actor_id,
            action: event.action,
            from_status: event.from_status,
            to_status: event.to_status,
            detail: event.detail,
            timestamp,
            prev_hash,
            hash,
        }
    }

    fn recompute(&self) -> String {
        let event = AuditEvent {
            post_id: self.post_id.clone(),
            actor_id: self.actor_id.clone(),
            action: self.action,
            from_status: self.from_status,
            to_status: self.to_status,
            detail: self.detail.clone(),
        };
        Self::compute_hash(self.sequence, &event, self.timestamp, &self.prev_hash)
    }
}

/// Destination for audit events.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent) -> Result<AuditEntry, AuditError>;
}

/// Shared reference to an audit sink
pub type SharedAuditSink = Arc<dyn AuditSink>;

/// In-process hash-chained log.
#[derive(Debug, Default)]
pub struct AuditLog {
    entries: Mutex<Vec<AuditEntry>>,
}

impl AuditLog {
    /// Empty log; the first entry chains from [`GENESIS_HASH`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every entry, oldest first.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Entries for one proposal, in append order.
    pub fn entries_for(&self, post_id: &str) -> Vec<AuditEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.post_id == post_id)
            .collect()
    }

    /// Walk the chain and recompute every hash.
    pub fn verify(&self) -> Result<(), AuditError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| AuditError::Unavailable("lock poisoned".into()))?;
        verify_chain(&entries)
    }
}

impl AuditSink for AuditLog {
    fn record(&self, event: AuditEvent) -> Result<AuditEntry, AuditError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| AuditError::Unavailable("lock poisoned".into()))?;
        let prev_hash = entries
            .last()
            .map(|e| e.hash.clone())
            .unwrap_or_else(|| GENESIS_HASH.to_string());
        let entry = AuditEntry::seal(entries.len() as u64, event, prev_hash);
        entries.push(entry.clone());
        Ok(entry)
    }
}

/// Check a chain of entries independent of where it was stored.
pub fn verify_chain(entries: &[AuditEntry]) -> Result<(), AuditError> {
    let mut prev: &str = GENESIS_HASH;
    for (index, entry) in entries.iter().enumerate() {
        let sequence = index as u64;
        if entry.sequence != sequence || entry.prev_hash != prev || entry.recompute() != entry.hash {
            return Err(AuditError::ChainBroken { sequence });
        }
        prev = entry.hash.as_str();
    }
    Ok(())
}
