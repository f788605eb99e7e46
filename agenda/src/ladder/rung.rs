//! Escalation rungs and the standard ladder table
//!
//! The table below is the one place permission levels, score thresholds and
//! decision menus live. Validation and presentation both read it.

use schemars::JsonSchema;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

use super::status::{AgendaLevel, AgendaStatus, DecisionType, Tier};
use crate::rescue::{RescueWindow, DEPUTY_DIRECTOR_RESCUE, GENERAL_AFFAIRS_RESCUE, MANAGER_RESCUE};

/// Inclusive range of permission levels. Levels are fractional (3.5 exists).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, JsonSchema)]
pub struct PermissionRange {
    pub min: f64,
    pub max: f64,
}

impl PermissionRange {
    /// Range admitting a single level.
    pub const fn exactly(level: f64) -> Self {
        Self {
            min: level,
            max: level,
        }
    }

    /// Whether `level` falls inside the range, bounds included.
    pub fn contains(&self, level: f64) -> bool {
        level >= self.min && level <= self.max
    }
}

impl fmt::Display for PermissionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.min)
        } else {
            write!(f, "{}..={}", self.min, self.max)
        }
    }
}

/// One edge of a rung's decision menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub decision: DecisionType,
    /// Status reported for this decision.
    pub target: AgendaStatus,
    /// Status the proposal rests in when the target is a transient rejection.
    pub rescue_target: Option<AgendaStatus>,
    /// Level the proposal moves to, if the decision changes it.
    pub level: Option<AgendaLevel>,
}

impl Transition {
    fn to(decision: DecisionType, target: AgendaStatus) -> Self {
        Self {
            decision,
            target,
            rescue_target: None,
            level: None,
        }
    }

    fn with_level(mut self, level: AgendaLevel) -> Self {
        self.level = Some(level);
        self
    }

    /// Status persisted on the proposal after this transition.
    pub fn resting_status(&self) -> AgendaStatus {
        self.rescue_target.unwrap_or(self.target)
    }
}

/// One tier of the ladder: the status awaiting a decision, who may decide,
/// and what they may decide.
#[derive(Debug, Clone, Serialize)]
pub struct EscalationRung {
    pub name: &'static str,
    pub status: AgendaStatus,
    pub tier: Tier,
    /// Score that brings a proposal up for this rung's review.
    pub score_threshold: Option<u32>,
    pub authorized: PermissionRange,
    pub transitions: Vec<Transition>,
}

impl EscalationRung {
    /// Menu entry for `decision`, if this rung offers it.
    pub fn transition(&self, decision: DecisionType) -> Option<&Transition> {
        self.transitions.iter().find(|t| t.decision == decision)
    }

    /// Decision types on this rung's menu, in table order.
    pub fn decisions(&self) -> impl Iterator<Item = DecisionType> + '_ {
        self.transitions.iter().map(|t| t.decision)
    }

    /// True for the three rungs that follow a mid-tier rejection.
    pub fn is_rescue_window(&self) -> bool {
        self.status.is_rescue_window()
    }
}

/// Ordered set of rungs. Statuses without a rung accept no decisions.
#[derive(Debug, Clone, Serialize)]
pub struct Ladder {
    rungs: Vec<EscalationRung>,
}

static STANDARD: OnceLock<Ladder> = OnceLock::new();

impl Ladder {
    /// The organisation's ladder: team → department → facility → corporate,
    /// followed by the three rescue windows.
    pub fn standard() -> &'static Ladder {
        STANDARD.get_or_init(Self::build_standard)
    }

    fn build_standard() -> Self {
        use AgendaLevel as L;
        use AgendaStatus as S;
        use DecisionType as D;

        let mut rungs = vec![
            EscalationRung {
                name: "supervisor_review",
                status: S::Pending,
                tier: Tier::Team,
                score_threshold: Some(50),
                authorized: PermissionRange::exactly(3.5),
                transitions: vec![
                    Transition::to(D::RecommendToManager, S::RecommendedToManager)
                        .with_level(L::DeptReview),
                    Transition::to(D::RejectBySupervisor, S::RejectedBySupervisor),
                ],
            },
            EscalationRung {
                name: "manager_review",
                status: S::RecommendedToManager,
                tier: Tier::Department,
                score_threshold: None,
                authorized: PermissionRange::exactly(7.0),
                transitions: vec![
                    Transition::to(D::ApproveAsDeptAgenda, S::ApprovedAsDeptAgenda)
                        .with_level(L::DeptAgenda),
                    Transition::to(D::EscalateToFacility, S::PendingDeputyDirectorReview)
                        .with_level(L::FacilityAgenda),
                    MANAGER_RESCUE.rejection_transition(),
                ],
            },
            EscalationRung {
                name: "deputy_director_review",
                status: S::PendingDeputyDirectorReview,
                tier: Tier::Facility,
                score_threshold: Some(100),
                authorized: PermissionRange::exactly(8.0),
                transitions: vec![
                    Transition::to(D::ApproveForCommittee, S::ApprovedForCommittee)
                        .with_level(L::FacilityAgenda),
                    Transition::to(D::EscalateToCorpReview, S::PendingGeneralAffairsReview)
                        .with_level(L::CorpReview),
                    DEPUTY_DIRECTOR_RESCUE.rejection_transition(),
                ],
            },
            EscalationRung {
                name: "general_affairs_review",
                status: S::PendingGeneralAffairsReview,
                tier: Tier::Corporation,
                score_threshold: Some(300),
                authorized: PermissionRange::exactly(11.0),
                transitions: vec![
                    Transition::to(D::ApproveAsCorpAgenda, S::ApprovedAsCorpAgenda)
                        .with_level(L::CorpReview),
                    Transition::to(
                        D::EscalateToCorpAgenda,
                        S::PendingGeneralAffairsDirectorReview,
                    )
                    .with_level(L::CorpAgenda),
                    GENERAL_AFFAIRS_RESCUE.rejection_transition(),
                ],
            },
            EscalationRung {
                name: "general_affairs_director_review",
                status: S::PendingGeneralAffairsDirectorReview,
                tier: Tier::Corporation,
                score_threshold: Some(600),
                authorized: PermissionRange::exactly(18.0),
                transitions: vec![
                    Transition::to(D::ApproveForCorpMeeting, S::ApprovedForCorpMeeting)
                        .with_level(L::CorpAgenda),
                    Transition::to(
                        D::RejectByGeneralAffairsDirector,
                        S::RejectedByGeneralAffairsDirector,
                    ),
                ],
            },
        ];

        rungs.extend(RescueWindow::all().iter().map(|window| EscalationRung {
            name: window.name,
            status: window.window_status,
            tier: window.tier,
            score_threshold: None,
            authorized: window.authorized,
            transitions: window.exits(),
        }));

        Self { rungs }
    }

    /// Build a ladder from explicit rungs.
    pub fn from_rungs(rungs: Vec<EscalationRung>) -> Self {
        Self { rungs }
    }

    /// Rungs in table order
    pub fn rungs(&self) -> &[EscalationRung] {
        &self.rungs
    }

    /// Rung awaiting a decision in `status`.
    pub fn rung(&self, status: AgendaStatus) -> Option<&EscalationRung> {
        self.rungs.iter().find(|r| r.status == status)
    }

    /// The single transition for a (status, decision) pair, if it is on the menu.
    pub fn transition(&self, status: AgendaStatus, decision: DecisionType) -> Option<&Transition> {
        self.rung(status)?.transition(decision)
    }

    /// Decisions a decider at `permission_level` may take in `status`.
    ///
    /// Empty when the status has no rung or the level is outside its range.
    pub fn available_decisions(
        &self,
        status: AgendaStatus,
        permission_level: f64,
    ) -> Vec<DecisionType> {
        match self.rung(status) {
            Some(rung) if rung.authorized.contains(permission_level) => rung.decisions().collect(),
            _ => Vec::new(),
        }
    }

    /// Whether `score` meets the review threshold of the rung for `status`.
    /// Rungs without a threshold are always open.
    pub fn threshold_reached(&self, status: AgendaStatus, score: u32) -> bool {
        match self.rung(status) {
            Some(rung) => rung.score_threshold.map_or(true, |t| score >= t),
            None => false,
        }
    }
}
