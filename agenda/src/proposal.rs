//! Proposal and record types
//!
//! These are the persisted shapes. Records are append-only: once written
//! they are never updated.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ladder::{AgendaLevel, AgendaStatus, DecisionType, UnknownVariant};

/// Identifier of a proposal (post).
pub type PostId = String;

/// Identifier of a staff member.
pub type UserId = String;

/// A staff proposal moving through the agenda workflow.
///
/// `agenda_*` fields are owned by the decision engine and the expired
/// resolver. `agenda_score` belongs to the vote aggregator and is only read
/// here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub id: PostId,
    pub author_id: UserId,
    pub department: Option<String>,
    pub facility_id: Option<String>,
    pub proposal_type: Option<String>,
    pub agenda_score: u32,
    pub agenda_level: AgendaLevel,
    pub agenda_status: AgendaStatus,
    pub agenda_voting_deadline: Option<DateTime<Utc>>,
    pub agenda_decision_by: Option<UserId>,
    pub agenda_decision_at: Option<DateTime<Utc>>,
    pub agenda_decision_reason: Option<String>,
    pub agenda_committee_id: Option<String>,
    /// Scope a rescue would grant; set only while in a rescue window.
    pub agenda_rescue_level: Option<AgendaLevel>,
    pub created_at: DateTime<Utc>,
}

impl Proposal {
    /// A fresh proposal: `pending`, level `none`, score 0.
    pub fn new(id: impl Into<PostId>, author_id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            author_id: author_id.into(),
            department: None,
            facility_id: None,
            proposal_type: None,
            agenda_score: 0,
            agenda_level: AgendaLevel::None,
            agenda_status: AgendaStatus::Pending,
            agenda_voting_deadline: None,
            agenda_decision_by: None,
            agenda_decision_at: None,
            agenda_decision_reason: None,
            agenda_committee_id: None,
            agenda_rescue_level: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_organisation(
        mut self,
        facility_id: impl Into<String>,
        department: impl Into<String>,
    ) -> Self {
        self.facility_id = Some(facility_id.into());
        self.department = Some(department.into());
        self
    }

    pub fn with_score(mut self, score: u32) -> Self {
        self.agenda_score = score;
        self
    }

    pub fn with_status(mut self, status: AgendaStatus) -> Self {
        self.agenda_status = status;
        self
    }

    pub fn with_level(mut self, level: AgendaLevel) -> Self {
        self.agenda_level = level;
        self
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.agenda_voting_deadline = Some(deadline);
        self
    }

    /// Whether the voting deadline has passed at `now`.
    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        self.agenda_voting_deadline.is_some_and(|d| now > d)
    }
}

/// Immutable audit entry for one successful decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRecord {
    pub id: String,
    pub post_id: PostId,
    pub decider_id: UserId,
    pub decision_type: DecisionType,
    pub reason: String,
    pub previous_status: AgendaStatus,
    pub new_status: AgendaStatus,
    /// Rescue window the proposal moved into, for mid-tier rejections.
    pub rescue_status: Option<AgendaStatus>,
    pub committee_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Resolution chosen for a proposal whose voting deadline expired.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ExpiredDecision {
    ApproveAtCurrentLevel,
    Downgrade,
    Reject,
}

impl ExpiredDecision {
    /// Every resolution, in wire order.
    pub fn all() -> &'static [Self] {
        &[Self::ApproveAtCurrentLevel, Self::Downgrade, Self::Reject]
    }

    /// Terminal status the proposal takes.
    pub fn terminal_status(self) -> AgendaStatus {
        match self {
            Self::ApproveAtCurrentLevel => AgendaStatus::Approved,
            Self::Downgrade => AgendaStatus::Downgraded,
            Self::Reject => AgendaStatus::Rejected,
        }
    }

    /// Stable wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ApproveAtCurrentLevel => "approve_at_current_level",
            Self::Downgrade => "downgrade",
            Self::Reject => "reject",
        }
    }
}

impl fmt::Display for ExpiredDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpiredDecision {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "expired decision",
                value: s.to_string(),
            })
    }
}

/// Immutable record of an expired-deadline resolution.
///
/// `achievement_rate` and `days_overdue` are frozen at decision time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpiredEscalationDecision {
    pub id: String,
    pub post_id: PostId,
    pub decider_id: UserId,
    pub decision: ExpiredDecision,
    pub decision_reason: String,
    pub current_score: u32,
    pub target_score: u32,
    pub achievement_rate: f64,
    pub days_overdue: i64,
    pub agenda_level: AgendaLevel,
    pub proposal_type: Option<String>,
    pub department: Option<String>,
    pub facility_id: Option<String>,
    pub created_at: DateTime<Utc>,
}
