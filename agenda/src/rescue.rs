//! Rescue Flow — single-hop re-review after a mid-tier rejection
//!
//! A rejection by the manager, deputy director or general affairs does not
//! end the proposal outright. The rejection is reported, and the proposal
//! rests in a paired rescue window where the same authority tier gets exactly
//! one more decision:
//!
//! ```text
//! recommended_to_manager ──reject_by_manager──▶ rejected_by_manager
//!                                                   │ (immediately)
//!                                                   ▼
//!                                     pending_rescue_by_manager (level 7)
//!                                        │                     │
//!                          rescue_as_dept_agenda        complete_rejection
//!                                        ▼                     ▼
//!                            rescued_as_dept_agenda    completely_rejected
//! ```
//!
//! Supervisor and general-affairs-director rejections open no window.
//! Windows never chain: both exits are terminal.

use crate::ladder::{AgendaLevel, AgendaStatus, DecisionType, PermissionRange, Tier, Transition};
use crate::proposal::Proposal;

/// Static description of one rescue window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RescueWindow {
    /// Rung name used in logs and the ladder table.
    pub name: &'static str,
    /// Rejection decision that opens this window.
    pub rejection: DecisionType,
    /// Status reported for the rejection itself.
    pub rejected_status: AgendaStatus,
    /// Status the proposal rests in while the window is open.
    pub window_status: AgendaStatus,
    /// Tier of the rejecting (and rescuing) authority.
    pub tier: Tier,
    /// Permission levels allowed to act inside the window.
    pub authorized: PermissionRange,
    /// Decision that rescues the proposal at reduced scope.
    pub rescue_decision: DecisionType,
    /// Terminal status after a rescue.
    pub rescued_status: AgendaStatus,
    /// Level granted by a rescue.
    pub rescue_level: AgendaLevel,
}

/// Window opened by `reject_by_manager`.
pub const MANAGER_RESCUE: RescueWindow = RescueWindow {
    name: "manager_rescue",
    rejection: DecisionType::RejectByManager,
    rejected_status: AgendaStatus::RejectedByManager,
    window_status: AgendaStatus::PendingRescueByManager,
    tier: Tier::Department,
    authorized: PermissionRange::exactly(7.0),
    rescue_decision: DecisionType::RescueAsDeptAgenda,
    rescued_status: AgendaStatus::RescuedAsDeptAgenda,
    rescue_level: AgendaLevel::DeptAgenda,
};

/// Window opened by `reject_by_deputy_director`.
pub const DEPUTY_DIRECTOR_RESCUE: RescueWindow = RescueWindow {
    name: "deputy_director_rescue",
    rejection: DecisionType::RejectByDeputyDirector,
    rejected_status: AgendaStatus::RejectedByDeputyDirector,
    window_status: AgendaStatus::PendingRescueByDeputyDirector,
    tier: Tier::Facility,
    authorized: PermissionRange::exactly(8.0),
    rescue_decision: DecisionType::RescueAsDeptAgenda,
    rescued_status: AgendaStatus::RescuedAsDeptAgenda,
    rescue_level: AgendaLevel::DeptAgenda,
};

/// Window opened by `reject_by_general_affairs`.
pub const GENERAL_AFFAIRS_RESCUE: RescueWindow = RescueWindow {
    name: "general_affairs_rescue",
    rejection: DecisionType::RejectByGeneralAffairs,
    rejected_status: AgendaStatus::RejectedByGeneralAffairs,
    window_status: AgendaStatus::PendingRescueByGeneralAffairs,
    tier: Tier::Corporation,
    authorized: PermissionRange::exactly(11.0),
    rescue_decision: DecisionType::RescueAsFacilityAgenda,
    rescued_status: AgendaStatus::RescuedAsFacilityAgenda,
    rescue_level: AgendaLevel::FacilityAgenda,
};

static RESCUE_WINDOWS: [RescueWindow; 3] =
    [MANAGER_RESCUE, DEPUTY_DIRECTOR_RESCUE, GENERAL_AFFAIRS_RESCUE];

impl RescueWindow {
    /// All rescue windows, lowest tier first.
    pub fn all() -> &'static [RescueWindow] {
        &RESCUE_WINDOWS
    }

    /// Window opened by a rejection decision, if it opens one.
    pub fn for_rejection(decision: DecisionType) -> Option<&'static RescueWindow> {
        RESCUE_WINDOWS.iter().find(|w| w.rejection == decision)
    }

    /// Window whose resting status is `status`.
    pub fn for_status(status: AgendaStatus) -> Option<&'static RescueWindow> {
        RESCUE_WINDOWS.iter().find(|w| w.window_status == status)
    }

    /// Whether the proposal currently sits in a rescue window.
    pub fn is_open(proposal: &Proposal) -> bool {
        Self::for_status(proposal.agenda_status).is_some()
    }

    /// The rejection edge that leads into this window.
    pub fn rejection_transition(&self) -> Transition {
        Transition {
            decision: self.rejection,
            target: self.rejected_status,
            rescue_target: Some(self.window_status),
            level: None,
        }
    }

    /// The two exits of the window.
    pub fn exits(&self) -> Vec<Transition> {
        vec![
            Transition {
                decision: self.rescue_decision,
                target: self.rescued_status,
                rescue_target: None,
                level: Some(self.rescue_level),
            },
            Transition {
                decision: DecisionType::CompleteRejection,
                target: AgendaStatus::CompletelyRejected,
                rescue_target: None,
                level: None,
            },
        ]
    }
}
