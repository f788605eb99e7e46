//! Expired Escalation Resolver — proposals whose voting deadline passed
//!
//! A proposal that sits at an escalated level past its deadline without
//! reaching the next rung's score gets a terminal resolution from a human
//! decider:
//!
//! ```text
//! approve_at_current_level ─▶ approved
//! downgrade                ─▶ downgraded (level one step lower)
//! reject                   ─▶ rejected
//! ```
//!
//! Achievement rate and days overdue are computed when the decision is
//! recorded and frozen into the record. The two queries are scoped by the
//! caller's permission level (see [`scope`]).

pub mod metrics;
pub mod resolver;
pub mod scope;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ladder::{AgendaLevel, AgendaStatus};
use crate::proposal::{ExpiredDecision, ExpiredEscalationDecision, PostId, UserId};

pub use metrics::{achievement_rate, days_overdue};
pub use resolver::ExpiredEscalationResolver;
pub use scope::VisibilityScope;

/// Input to `record_decision`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpiredDecisionRequest {
    pub post_id: PostId,
    pub decision: ExpiredDecision,
    pub decider_id: UserId,
    pub decision_reason: String,
    pub current_score: u32,
    pub target_score: u32,
    pub agenda_level: AgendaLevel,
    pub proposal_type: Option<String>,
    pub department: Option<String>,
    pub facility_id: Option<String>,
}

/// Input to `history`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryQuery {
    pub user_id: UserId,
    pub permission_level: f64,
    pub facility_id: Option<String>,
    pub department: Option<String>,
    /// Inclusive lower bound on `created_at`
    pub start_date: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`
    pub end_date: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: usize,
}

/// Counts per resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DecisionCounts {
    pub approve_at_current_level: usize,
    pub downgrade: usize,
    pub reject: usize,
}

impl DecisionCounts {
    fn add(&mut self, decision: ExpiredDecision) {
        match decision {
            ExpiredDecision::ApproveAtCurrentLevel => self.approve_at_current_level += 1,
            ExpiredDecision::Downgrade => self.downgrade += 1,
            ExpiredDecision::Reject => self.reject += 1,
        }
    }
}

/// Summary over every record matching a history query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistorySummary {
    pub total: usize,
    pub counts: DecisionCounts,
    pub average_achievement_rate: f64,
    pub average_days_overdue: f64,
}

impl HistorySummary {
    /// Summarise every matching record, not just one page.
    pub fn from_records<'a>(
        records: impl IntoIterator<Item = &'a ExpiredEscalationDecision>,
    ) -> Self {
        let mut summary = Self::default();
        let mut rate_sum = 0.0;
        let mut days_sum = 0.0;
        for record in records {
            summary.total += 1;
            summary.counts.add(record.decision);
            rate_sum += record.achievement_rate;
            days_sum += record.days_overdue as f64;
        }
        if summary.total > 0 {
            summary.average_achievement_rate = rate_sum / summary.total as f64;
            summary.average_days_overdue = days_sum / summary.total as f64;
        }
        summary
    }
}

/// One page of history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPage {
    pub records: Vec<ExpiredEscalationDecision>,
    /// Matching records before pagination
    pub total: usize,
    pub summary: HistorySummary,
}

/// Input to `pending_proposals`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PendingQuery {
    pub user_id: UserId,
    pub permission_level: f64,
    pub facility_id: Option<String>,
    pub department: Option<String>,
    pub limit: Option<usize>,
    pub offset: usize,
}

/// A proposal awaiting an expired-deadline resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingProposal {
    pub post_id: PostId,
    pub author_id: UserId,
    pub agenda_status: AgendaStatus,
    pub agenda_level: AgendaLevel,
    pub current_score: u32,
    /// Entry score of the next level; absent at the top level
    pub target_score: Option<u32>,
    pub achievement_rate: Option<f64>,
    pub deadline: DateTime<Utc>,
    pub days_overdue: i64,
    pub proposal_type: Option<String>,
    pub department: Option<String>,
    pub facility_id: Option<String>,
}

/// One page of pending proposals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingPage {
    pub proposals: Vec<PendingProposal>,
    pub total: usize,
}
