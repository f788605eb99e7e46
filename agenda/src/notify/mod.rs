//! Notifications for authors and reviewers
//!
//! Fire-and-forget: the decision engine hands notifications to the
//! [`NotificationDispatcher`], which broadcasts them. A [`DeliveryWorker`]
//! drains the channel into a [`NotificationSink`]. A decision never fails
//! because a notification could not be delivered.
//!
//! ```text
//! DecisionEngine ──dispatch──▶ broadcast channel ──▶ DeliveryWorker ──▶ sink
//!                                               └──▶ other subscribers
//! ```

pub mod dispatcher;
pub mod worker;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ladder::{AgendaLevel, AgendaStatus, DecisionType};
use crate::proposal::{ExpiredDecision, PostId, UserId};

pub use dispatcher::{NotificationDispatcher, SharedDispatcher};
pub use worker::{DeliveryStats, DeliveryWorker, LogSink, MemorySink, NotificationSink, NotifyError};

/// What the notification is about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationKind {
    /// Tells the author a decision was made on their proposal.
    DecisionMade {
        decision_type: DecisionType,
        new_status: AgendaStatus,
    },
    /// Asks a reviewer of the next rung to look at the proposal.
    ReviewRequested { status: AgendaStatus },
    /// Tells the author how an expired proposal was resolved.
    ExpiredResolved {
        decision: ExpiredDecision,
        agenda_level: AgendaLevel,
    },
}

impl NotificationKind {
    /// Wire tag of the variant
    pub fn name(&self) -> &'static str {
        match self {
            Self::DecisionMade { .. } => "decision_made",
            Self::ReviewRequested { .. } => "review_requested",
            Self::ExpiredResolved { .. } => "expired_resolved",
        }
    }
}

/// One message for one recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Notification {
    pub id: String,
    pub recipient_id: UserId,
    pub post_id: PostId,
    #[serde(flatten)]
    pub kind: NotificationKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// New notification stamped with a fresh id and the current time.
    pub fn new(
        recipient_id: impl Into<UserId>,
        post_id: impl Into<PostId>,
        kind: NotificationKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            recipient_id: recipient_id.into(),
            post_id: post_id.into(),
            kind,
            message: message.into(),
            created_at: Utc::now(),
        }
    }
}
