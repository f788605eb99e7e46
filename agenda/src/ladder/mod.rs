//! Escalation Ladder — the rulebook for agenda decisions
//!
//! A proposal climbs the organisation one rung at a time. Each rung binds a
//! status awaiting decision to a tier, a score threshold, the permission
//! levels allowed to decide, and the closed menu of decisions.
//!
//! ```text
//! pending (≥50, 3.5)
//!     ├─ recommend_to_manager ─▶ recommended_to_manager (7)
//!     │                              ├─ approve_as_dept_agenda ─▶ approved_as_dept_agenda
//!     │                              ├─ reject_by_manager ──────▶ rescue window (7)
//!     │                              └─ escalate_to_facility
//!     │                                   ▼
//!     │                   pending_deputy_director_review (≥100, 8)
//!     │                              ├─ approve_for_committee ──▶ approved_for_committee
//!     │                              ├─ reject_by_deputy_director ▶ rescue window (8)
//!     │                              └─ escalate_to_corp_review
//!     │                                   ▼
//!     │                   pending_general_affairs_review (≥300, 11)
//!     │                              ├─ approve_as_corp_agenda ─▶ approved_as_corp_agenda
//!     │                              ├─ reject_by_general_affairs ▶ rescue window (11)
//!     │                              └─ escalate_to_corp_agenda
//!     │                                   ▼
//!     │                   pending_general_affairs_director_review (≥600, 18)
//!     │                              ├─ approve_for_corp_meeting ▶ approved_for_corp_meeting
//!     │                              └─ reject_by_general_affairs_director ▶ terminal
//!     └─ reject_by_supervisor ─▶ rejected_by_supervisor (terminal)
//! ```

pub mod graph;
pub mod rung;
pub mod status;

pub use graph::{LadderError, TransitionEdge, TransitionGraph};
pub use rung::{EscalationRung, Ladder, PermissionRange, Transition};
pub use status::{AgendaLevel, AgendaStatus, DecisionType, Tier, UnknownVariant};
