//! Agenda Escalation Library
//!
//! This library provides the decision state machine behind agenda mode:
//! staff proposals climb an organisational escalation ladder as their score
//! grows, and human deciders at each rung approve, escalate or reject them.
//!
//! # Components
//!
//! ## Ladder
//! - [`Ladder::standard`]: the single table of rungs, thresholds, permission
//!   ranges and decision menus
//! - [`TransitionGraph`]: the ladder as a petgraph graph, with structural checks
//!
//! ## Decisions
//! - [`DecisionEngine::submit_decision`]: validate and apply one decision with
//!   a compare-and-swap commit
//! - [`RescueWindow`]: the single-hop rescue granted after a mid-tier rejection
//!
//! ## Expired deadlines
//! - [`ExpiredEscalationResolver::record_decision`]: resolve a proposal whose
//!   voting deadline passed
//! - [`ExpiredEscalationResolver::history`] and
//!   [`ExpiredEscalationResolver::pending_proposals`]: permission-scoped queries
//!
//! ## Collaborators
//! - [`AgendaStore`]: proposal and record persistence (memory, RocksDB)
//! - [`ProfileDirectory`]: permission profile lookup
//! - [`NotificationDispatcher`]: fire-and-forget fan-out over a broadcast channel
//! - [`AuditLog`]: hash-chained audit trail
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use agenda::{
//!     AgendaConfig, AgendaService, Collaborators, MemoryStore, StaticDirectory,
//!     SubmitDecisionRequest,
//! };
//!
//! let store = MemoryStore::new().shared();
//! let directory = Arc::new(StaticDirectory::default());
//! let service = AgendaService::new(
//!     Collaborators::new(store, directory),
//!     &AgendaConfig::default(),
//! );
//! let result = service.submit_decision(SubmitDecisionRequest {
//!     post_id: "post-1".into(),
//!     decision_type: "recommend_to_manager".into(),
//!     decider_id: "sup-1".into(),
//!     reason: "Broad support across the team".into(),
//!     committee_id: None,
//! });
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod api;
pub mod audit;
pub mod collaborators;
pub mod config;
pub mod decision;
pub mod error;
pub mod expired;
pub mod ladder;
pub mod notify;
pub mod profile;
pub mod proposal;
pub mod rescue;
pub mod store;

// Re-export key ladder types
pub use ladder::{
    AgendaLevel, AgendaStatus, DecisionType, EscalationRung, Ladder, LadderError,
    PermissionRange, Tier, Transition, TransitionGraph,
};
pub use rescue::RescueWindow;

// Re-export proposal and record types
pub use proposal::{
    DecisionRecord, ExpiredDecision, ExpiredEscalationDecision, PostId, Proposal, UserId,
};

// Re-export engine and resolver types
pub use decision::{DecisionEngine, DecisionOutcome, DecisionRequest};
pub use error::{DecisionError, DecisionResult, ErrorKind};
pub use expired::{
    ExpiredDecisionRequest, ExpiredEscalationResolver, HistoryPage, HistoryQuery,
    HistorySummary, PendingPage, PendingProposal, PendingQuery, VisibilityScope,
};

// Re-export collaborator types
pub use audit::{AuditEntry, AuditError, AuditLog, AuditSink, SharedAuditSink};
pub use collaborators::Collaborators;
pub use notify::{
    DeliveryStats, DeliveryWorker, LogSink, MemorySink, Notification, NotificationDispatcher,
    NotificationKind, NotificationSink, NotifyError, SharedDispatcher,
};
pub use profile::{PermissionProfile, ProfileDirectory, SharedDirectory, StaticDirectory};
pub use store::{AgendaStore, MemoryStore, SharedStore, StoreError, StoreResult};

#[cfg(feature = "rocksdb-store")]
pub use store::RocksStore;

// Re-export configuration and wire types
pub use api::{
    AgendaService, ApiFailure, ApiResult, HistoryRequest, HistoryResponse, PendingRequest,
    PendingResponse, RecordExpiredRequest, RecordExpiredResponse, SubmitDecisionRequest,
    SubmitDecisionResponse,
};
pub use config::{AgendaConfig, ConfigError, MIN_REASON_LENGTH};
