//! Agenda vocabulary — statuses, levels and decision types
//!
//! Every value here has a stable snake_case wire name. Parsing an unknown
//! wire name is a validation failure, never a fallback.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Workflow status of a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AgendaStatus {
    /// Awaiting the supervisor (initial status).
    Pending,
    /// Recommended by the supervisor, awaiting the department manager.
    RecommendedToManager,
    /// Escalated to the facility, awaiting the deputy director.
    PendingDeputyDirectorReview,
    /// Escalated to corporate review, awaiting general affairs.
    PendingGeneralAffairsReview,
    /// Escalated to the corporate agenda, awaiting the general affairs director.
    PendingGeneralAffairsDirectorReview,

    /// Rejected by the supervisor: terminal, no rescue.
    RejectedBySupervisor,
    /// Rejected by the manager: reported, then rests in the rescue window.
    RejectedByManager,
    /// Rejected by the deputy director: reported, then rests in the rescue window.
    RejectedByDeputyDirector,
    /// Rejected by general affairs: reported, then rests in the rescue window.
    RejectedByGeneralAffairs,
    /// Rejected by the general affairs director: terminal, no rescue.
    RejectedByGeneralAffairsDirector,

    /// Rescue window opened by a manager rejection.
    PendingRescueByManager,
    /// Rescue window opened by a deputy director rejection.
    PendingRescueByDeputyDirector,
    /// Rescue window opened by a general affairs rejection.
    PendingRescueByGeneralAffairs,

    ApprovedAsDeptAgenda,
    ApprovedForCommittee,
    ApprovedAsCorpAgenda,
    ApprovedForCorpMeeting,

    RescuedAsDeptAgenda,
    RescuedAsFacilityAgenda,
    /// Rescue window closed with a final rejection.
    CompletelyRejected,

    /// Expired-deadline resolution: approved at the current level.
    Approved,
    /// Expired-deadline resolution: downgraded.
    Downgraded,
    /// Expired-deadline resolution: rejected.
    Rejected,
}

impl AgendaStatus {
    /// Every status, in ladder order.
    pub fn all() -> &'static [Self] {
        use AgendaStatus::*;
        &[
            Pending,
            RecommendedToManager,
            PendingDeputyDirectorReview,
            PendingGeneralAffairsReview,
            PendingGeneralAffairsDirectorReview,
            RejectedBySupervisor,
            RejectedByManager,
            RejectedByDeputyDirector,
            RejectedByGeneralAffairs,
            RejectedByGeneralAffairsDirector,
            PendingRescueByManager,
            PendingRescueByDeputyDirector,
            PendingRescueByGeneralAffairs,
            ApprovedAsDeptAgenda,
            ApprovedForCommittee,
            ApprovedAsCorpAgenda,
            ApprovedForCorpMeeting,
            RescuedAsDeptAgenda,
            RescuedAsFacilityAgenda,
            CompletelyRejected,
            Approved,
            Downgraded,
            Rejected,
        ]
    }

    /// Whether the proposal is dormant in this status (no further transitions).
    pub fn is_terminal(self) -> bool {
        use AgendaStatus::*;
        matches!(
            self,
            RejectedBySupervisor
                | RejectedByGeneralAffairsDirector
                | ApprovedAsDeptAgenda
                | ApprovedForCommittee
                | ApprovedAsCorpAgenda
                | ApprovedForCorpMeeting
                | RescuedAsDeptAgenda
                | RescuedAsFacilityAgenda
                | CompletelyRejected
                | Approved
                | Downgraded
                | Rejected
        )
    }

    /// Rejection statuses that are reported but never rested in: the
    /// proposal moves straight on to the paired rescue window.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            Self::RejectedByManager | Self::RejectedByDeputyDirector | Self::RejectedByGeneralAffairs
        )
    }

    /// Whether this status is a rescue window.
    pub fn is_rescue_window(self) -> bool {
        matches!(
            self,
            Self::PendingRescueByManager
                | Self::PendingRescueByDeputyDirector
                | Self::PendingRescueByGeneralAffairs
        )
    }

    /// Stable wire name.
    pub fn as_str(self) -> &'static str {
        use AgendaStatus::*;
        match self {
            Pending => "pending",
            RecommendedToManager => "recommended_to_manager",
            PendingDeputyDirectorReview => "pending_deputy_director_review",
            PendingGeneralAffairsReview => "pending_general_affairs_review",
            PendingGeneralAffairsDirectorReview => "pending_general_affairs_director_review",
            RejectedBySupervisor => "rejected_by_supervisor",
            RejectedByManager => "rejected_by_manager",
            RejectedByDeputyDirector => "rejected_by_deputy_director",
            RejectedByGeneralAffairs => "rejected_by_general_affairs",
            RejectedByGeneralAffairsDirector => "rejected_by_general_affairs_director",
            PendingRescueByManager => "pending_rescue_by_manager",
            PendingRescueByDeputyDirector => "pending_rescue_by_deputy_director",
            PendingRescueByGeneralAffairs => "pending_rescue_by_general_affairs",
            ApprovedAsDeptAgenda => "approved_as_dept_agenda",
            ApprovedForCommittee => "approved_for_committee",
            ApprovedAsCorpAgenda => "approved_as_corp_agenda",
            ApprovedForCorpMeeting => "approved_for_corp_meeting",
            RescuedAsDeptAgenda => "rescued_as_dept_agenda",
            RescuedAsFacilityAgenda => "rescued_as_facility_agenda",
            CompletelyRejected => "completely_rejected",
            Approved => "approved",
            Downgraded => "downgraded",
            Rejected => "rejected",
        }
    }
}

impl fmt::Display for AgendaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgendaStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("agenda status", s))
    }
}

/// Organisational scope a proposal has reached.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum AgendaLevel {
    #[default]
    None,
    DeptReview,
    DeptAgenda,
    FacilityAgenda,
    CorpReview,
    CorpAgenda,
}

impl AgendaLevel {
    /// All levels, lowest first.
    pub fn all() -> &'static [Self] {
        &[
            Self::None,
            Self::DeptReview,
            Self::DeptAgenda,
            Self::FacilityAgenda,
            Self::CorpReview,
            Self::CorpAgenda,
        ]
    }

    /// Score at which a proposal enters this level.
    pub fn entry_score(self) -> u32 {
        match self {
            Self::None => 0,
            Self::DeptReview | Self::DeptAgenda => 50,
            Self::FacilityAgenda => 100,
            Self::CorpReview => 300,
            Self::CorpAgenda => 600,
        }
    }

    /// Highest score-driven level reached by `score`.
    ///
    /// `DeptAgenda` is granted by a manager decision, never by score alone.
    pub fn for_score(score: u32) -> Self {
        [
            Self::CorpAgenda,
            Self::CorpReview,
            Self::FacilityAgenda,
            Self::DeptReview,
        ]
        .into_iter()
        .find(|level| score >= level.entry_score())
        .unwrap_or(Self::None)
    }

    /// Score needed to reach the next rung above this level.
    pub fn next_target_score(self) -> Option<u32> {
        let current = self.entry_score();
        Self::all()
            .iter()
            .map(|level| level.entry_score())
            .find(|score| *score > current)
    }

    /// One step down; `None` stays at `None`.
    pub fn downgraded(self) -> Self {
        match self {
            Self::None | Self::DeptReview => Self::None,
            Self::DeptAgenda => Self::DeptReview,
            Self::FacilityAgenda => Self::DeptAgenda,
            Self::CorpReview => Self::FacilityAgenda,
            Self::CorpAgenda => Self::CorpReview,
        }
    }

    /// Whether the proposal has been escalated past the team.
    pub fn is_escalated(self) -> bool {
        self != Self::None
    }

    /// Stable wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::DeptReview => "dept_review",
            Self::DeptAgenda => "dept_agenda",
            Self::FacilityAgenda => "facility_agenda",
            Self::CorpReview => "corp_review",
            Self::CorpAgenda => "corp_agenda",
        }
    }
}

impl fmt::Display for AgendaLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgendaLevel {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("agenda level", s))
    }
}

/// Decision a human decider may submit against a proposal.
///
/// Which decisions are valid is decided by the ladder rung the proposal is
/// resting on, never by the shape of the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DecisionType {
    RecommendToManager,
    RejectBySupervisor,
    ApproveAsDeptAgenda,
    EscalateToFacility,
    RejectByManager,
    RescueAsDeptAgenda,
    CompleteRejection,
    ApproveForCommittee,
    EscalateToCorpReview,
    RejectByDeputyDirector,
    ApproveAsCorpAgenda,
    EscalateToCorpAgenda,
    RejectByGeneralAffairs,
    RescueAsFacilityAgenda,
    ApproveForCorpMeeting,
    RejectByGeneralAffairsDirector,
}

impl DecisionType {
    /// Every decision type, in ladder order.
    pub fn all() -> &'static [Self] {
        use DecisionType::*;
        &[
            RecommendToManager,
            RejectBySupervisor,
            ApproveAsDeptAgenda,
            EscalateToFacility,
            RejectByManager,
            RescueAsDeptAgenda,
            CompleteRejection,
            ApproveForCommittee,
            EscalateToCorpReview,
            RejectByDeputyDirector,
            ApproveAsCorpAgenda,
            EscalateToCorpAgenda,
            RejectByGeneralAffairs,
            RescueAsFacilityAgenda,
            ApproveForCorpMeeting,
            RejectByGeneralAffairsDirector,
        ]
    }

    /// Stable wire name.
    pub fn as_str(self) -> &'static str {
        use DecisionType::*;
        match self {
            RecommendToManager => "recommend_to_manager",
            RejectBySupervisor => "reject_by_supervisor",
            ApproveAsDeptAgenda => "approve_as_dept_agenda",
            EscalateToFacility => "escalate_to_facility",
            RejectByManager => "reject_by_manager",
            RescueAsDeptAgenda => "rescue_as_dept_agenda",
            CompleteRejection => "complete_rejection",
            ApproveForCommittee => "approve_for_committee",
            EscalateToCorpReview => "escalate_to_corp_review",
            RejectByDeputyDirector => "reject_by_deputy_director",
            ApproveAsCorpAgenda => "approve_as_corp_agenda",
            EscalateToCorpAgenda => "escalate_to_corp_agenda",
            RejectByGeneralAffairs => "reject_by_general_affairs",
            RescueAsFacilityAgenda => "rescue_as_facility_agenda",
            ApproveForCorpMeeting => "approve_for_corp_meeting",
            RejectByGeneralAffairsDirector => "reject_by_general_affairs_director",
        }
    }
}

impl fmt::Display for DecisionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DecisionType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|decision| decision.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("decision type", s))
    }
}

/// Organisational tier a rung belongs to. Drives reviewer scoping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Team,
    Department,
    Facility,
    Corporation,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Team => write!(f, "team"),
            Self::Department => write!(f, "department"),
            Self::Facility => write!(f, "facility"),
            Self::Corporation => write!(f, "corporation"),
        }
    }
}

/// A wire value that names no known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
