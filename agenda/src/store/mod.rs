//! Persistence for proposals and decision records
//!
//! Every status change goes through a compare-and-swap commit: the caller
//! names the status it read, and the store refuses the write if another
//! decider got there first. The proposal update and its record are written
//! together or not at all.
//!
//! `agenda_score` belongs to the vote aggregator. It moves only through
//! [`AgendaStore::update_score`], never downward, and decision commits keep
//! whatever score is stored at commit time.
//!
//! Two backends:
//!
//! - [`MemoryStore`]: single lock, optional JSON snapshot file
//! - `RocksStore` (feature `rocksdb-store`): column families, one
//!   `WriteBatch` per commit

pub mod memory;
pub mod schema;

#[cfg(feature = "rocksdb-store")]
pub mod rocks;

use std::sync::Arc;

use crate::ladder::AgendaStatus;
use crate::proposal::{DecisionRecord, ExpiredEscalationDecision, Proposal};

pub use memory::MemoryStore;
#[cfg(feature = "rocksdb-store")]
pub use rocks::RocksStore;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Status of {post_id} changed: expected {expected}, found {actual}")]
    StatusChanged {
        post_id: String,
        expected: AgendaStatus,
        actual: AgendaStatus,
    },

    #[error("Score of {post_id} may not decrease: stored {current}, requested {requested}")]
    ScoreDecreased {
        post_id: String,
        current: u32,
        requested: u32,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Lock poisoned")]
    LockPoisoned,

    #[cfg(feature = "rocksdb-store")]
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    #[cfg(feature = "rocksdb-store")]
    #[error("Column family not found: {0}")]
    ColumnFamilyNotFound(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Shared reference to a store
pub type SharedStore = Arc<dyn AgendaStore>;

/// Storage seam used by the decision engine and the expired resolver.
pub trait AgendaStore: Send + Sync {
    /// Load a proposal by post id
    fn get_proposal(&self, post_id: &str) -> StoreResult<Option<Proposal>>;

    /// Insert or replace a proposal without a status check. Seeding and
    /// import only; live proposals change through the commit and score calls.
    fn put_proposal(&self, proposal: &Proposal) -> StoreResult<()>;

    /// Raise the stored vote score, leaving every other field alone.
    /// A lower score is refused with [`StoreError::ScoreDecreased`].
    fn update_score(&self, post_id: &str, score: u32) -> StoreResult<()>;

    /// All proposals, in key order
    fn list_proposals(&self) -> StoreResult<Vec<Proposal>>;

    /// Write `proposal` and `record` atomically if the stored status is
    /// still `expected`.
    fn commit_decision(
        &self,
        expected: AgendaStatus,
        proposal: &Proposal,
        record: &DecisionRecord,
    ) -> StoreResult<()>;

    /// Expired-path counterpart of [`AgendaStore::commit_decision`].
    fn commit_expired_decision(
        &self,
        expected: AgendaStatus,
        proposal: &Proposal,
        decision: &ExpiredEscalationDecision,
    ) -> StoreResult<()>;

    /// Decision records for one proposal, oldest first.
    fn decision_records(&self, post_id: &str) -> StoreResult<Vec<DecisionRecord>>;

    /// Every expired-path resolution
    fn expired_decisions(&self) -> StoreResult<Vec<ExpiredEscalationDecision>>;

    /// The expired-path resolution for one proposal, if any
    fn expired_decision_for(&self, post_id: &str)
        -> StoreResult<Option<ExpiredEscalationDecision>>;
}

/// Compare the stored status against the one the caller read.
pub(crate) fn check_status(
    stored: Option<&Proposal>,
    post_id: &str,
    expected: AgendaStatus,
) -> StoreResult<()> {
    match stored {
        None => Err(StoreError::NotFound(post_id.to_string())),
        Some(current) if current.agenda_status != expected => Err(StoreError::StatusChanged {
            post_id: post_id.to_string(),
            expected,
            actual: current.agenda_status,
        }),
        Some(_) => Ok(()),
    }
}

/// Status check for a commit, returning the proposal to write. The stored
/// score wins over the caller's copy so a commit never rolls back a vote.
pub(crate) fn checked_update(
    stored: Option<&Proposal>,
    proposal: &Proposal,
    expected: AgendaStatus,
) -> StoreResult<Proposal> {
    check_status(stored, &proposal.id, expected)?;
    let mut next = proposal.clone();
    if let Some(current) = stored {
        next.agenda_score = next.agenda_score.max(current.agenda_score);
    }
    Ok(next)
}

/// Apply a score update to a stored proposal.
pub(crate) fn raise_score(proposal: &mut Proposal, score: u32) -> StoreResult<()> {
    if score < proposal.agenda_score {
        return Err(StoreError::ScoreDecreased {
            post_id: proposal.id.clone(),
            current: proposal.agenda_score,
            requested: score,
        });
    }
    proposal.agenda_score = score;
    Ok(())
}
