//! Decision Engine — validates and applies one decision at a time
//!
//! ```text
//! reason ─▶ proposal ─▶ menu ─▶ permission ─▶ CAS commit ─▶ audit ─▶ notify
//!   │          │          │          │            │
//!   ▼          ▼          ▼          ▼            ▼
//! Validation NotFound  InvalidTx  Permission   Conflict
//!                                  Denied
//! ```
//!
//! Checks run in that order and stop at the first failure, with nothing
//! written. The commit writes the proposal and its `DecisionRecord`
//! together. Audit and notifications follow the commit and never undo it.

pub mod engine;

use serde::{Deserialize, Serialize};

use crate::ladder::{AgendaLevel, AgendaStatus, DecisionType};
use crate::proposal::{PostId, UserId};

pub use engine::DecisionEngine;

/// A decision as submitted by a human decider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub post_id: PostId,
    pub decision_type: DecisionType,
    pub decider_id: UserId,
    pub reason: String,
    /// Free-form; never required.
    pub committee_id: Option<String>,
}

impl DecisionRequest {
    /// Request without a committee id.
    pub fn new(
        post_id: impl Into<PostId>,
        decision_type: DecisionType,
        decider_id: impl Into<UserId>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            post_id: post_id.into(),
            decision_type,
            decider_id: decider_id.into(),
            reason: reason.into(),
            committee_id: None,
        }
    }

    pub fn with_committee(mut self, committee_id: impl Into<String>) -> Self {
        self.committee_id = Some(committee_id.into());
        self
    }
}

/// Result of a committed decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionOutcome {
    /// Status the decision reports (a transient rejection for mid-tier rejects).
    pub new_status: AgendaStatus,
    /// Status the proposal now rests in.
    pub resting_status: AgendaStatus,
    pub agenda_level: AgendaLevel,
    /// Distinct recipients the fan-out addressed.
    pub notifications_sent: usize,
    pub record_id: String,
}
