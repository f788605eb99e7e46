//! In-memory store with optional JSON snapshot

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{checked_update, raise_score, AgendaStore, StoreError, StoreResult};
use crate::ladder::AgendaStatus;
use crate::proposal::{DecisionRecord, ExpiredEscalationDecision, PostId, Proposal};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct MemoryState {
    proposals: BTreeMap<PostId, Proposal>,
    decisions: Vec<DecisionRecord>,
    expired: BTreeMap<PostId, ExpiredEscalationDecision>,
}

/// Store holding everything behind one `RwLock`.
///
/// With a snapshot path, every write is persisted before it becomes visible;
/// a failed write leaves both memory and file untouched.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    snapshot: Option<PathBuf>,
}

impl MemoryStore {
    /// Store without persistence
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store backed by a snapshot file, loading it if it exists.
    pub fn with_snapshot(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let state = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content)
                .map_err(|e| StoreError::Deserialization(e.to_string()))?
        } else {
            MemoryState::default()
        };
        debug!(path = %path.display(), "Opened agenda snapshot");
        Ok(Self {
            state: RwLock::new(state),
            snapshot: Some(path),
        })
    }

    /// Wrap in an `Arc` for sharing.
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot.as_deref()
    }

    fn persist(&self, state: &MemoryState) -> StoreResult<()> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Apply `update` to a copy of the state, persist it, then publish it.
    fn write<F>(&self, update: F) -> StoreResult<()>
    where
        F: FnOnce(&mut MemoryState) -> StoreResult<()>,
    {
        let mut guard = self.state.write().map_err(|_| StoreError::LockPoisoned)?;
        if self.snapshot.is_none() {
            return update(&mut *guard);
        }
        let mut next = guard.clone();
        update(&mut next)?;
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&MemoryState) -> T) -> StoreResult<T> {
        let guard = self.state.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(f(&*guard))
    }
}

impl AgendaStore for MemoryStore {
    fn get_proposal(&self, post_id: &str) -> StoreResult<Option<Proposal>> {
        self.read(|s| s.proposals.get(post_id).cloned())
    }

    fn put_proposal(&self, proposal: &Proposal) -> StoreResult<()> {
        self.write(|s| {
            s.proposals.insert(proposal.id.clone(), proposal.clone());
            Ok(())
        })
    }

    fn update_score(&self, post_id: &str, score: u32) -> StoreResult<()> {
        self.write(|s| {
            let proposal = s
                .proposals
                .get_mut(post_id)
                .ok_or_else(|| StoreError::NotFound(post_id.to_string()))?;
            raise_score(proposal, score)
        })
    }

    fn list_proposals(&self) -> StoreResult<Vec<Proposal>> {
        self.read(|s| s.proposals.values().cloned().collect())
    }

    fn commit_decision(
        &self,
        expected: AgendaStatus,
        proposal: &Proposal,
        record: &DecisionRecord,
    ) -> StoreResult<()> {
        self.write(|s| {
            let next = checked_update(s.proposals.get(&proposal.id), proposal, expected)?;
            s.proposals.insert(proposal.id.clone(), next);
            s.decisions.push(record.clone());
            Ok(())
        })
    }

    fn commit_expired_decision(
        &self,
        expected: AgendaStatus,
        proposal: &Proposal,
        decision: &ExpiredEscalationDecision,
    ) -> StoreResult<()> {
        self.write(|s| {
            let next = checked_update(s.proposals.get(&proposal.id), proposal, expected)?;
            s.proposals.insert(proposal.id.clone(), next);
            s.expired.insert(proposal.id.clone(), decision.clone());
            Ok(())
        })
    }

    fn decision_records(&self, post_id: &str) -> StoreResult<Vec<DecisionRecord>> {
        self.read(|s| {
            s.decisions
                .iter()
                .filter(|r| r.post_id == post_id)
                .cloned()
                .collect()
        })
    }

    fn expired_decisions(&self) -> StoreResult<Vec<ExpiredEscalationDecision>> {
        self.read(|s| s.expired.values().cloned().collect())
    }

    fn expired_decision_for(
        &self,
        post_id: &str,
    ) -> StoreResult<Option<ExpiredEscalationDecision>> {
        self.read(|s| s.expired.get(post_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ladder::DecisionType;
    use chrono::Utc;

    fn record(post_id: &str, new_status: AgendaStatus) -> DecisionRecord {
        DecisionRecord {
            id: uuid::Uuid::new_v4().to_string(),
            post_id: post_id.to_string(),
            decider_id: "sup-1".into(),
            decision_type: DecisionType::RecommendToManager,
            reason: "Strong support from the team".into(),
            previous_status: AgendaStatus::Pending,
            new_status,
            rescue_status: None,
            committee_id: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_commit_checks_status() {
        let store = MemoryStore::new();
        let proposal = Proposal::new("post-1", "author-1");
        store.put_proposal(&proposal).unwrap();

        let next = proposal
            .clone()
            .with_status(AgendaStatus::RecommendedToManager);
        let rec = record("post-1", AgendaStatus::RecommendedToManager);
        store
            .commit_decision(AgendaStatus::Pending, &next, &rec)
            .unwrap();

        // Second commit against the stale status loses.
        let err = store
            .commit_decision(AgendaStatus::Pending, &next, &rec)
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::StatusChanged {
                actual: AgendaStatus::RecommendedToManager,
                ..
            }
        ));
        assert_eq!(store.decision_records("post-1").unwrap().len(), 1);
    }

    #[test]
    fn test_commit_keeps_newer_score() {
        let store = MemoryStore::new();
        let proposal = Proposal::new("post-1", "author-1").with_score(40);
        store.put_proposal(&proposal).unwrap();

        // Votes land between the decider's read and the commit.
        store.update_score("post-1", 65).unwrap();
        let next = proposal.with_status(AgendaStatus::RecommendedToManager);
        store
            .commit_decision(
                AgendaStatus::Pending,
                &next,
                &record("post-1", AgendaStatus::RecommendedToManager),
            )
            .unwrap();

        let stored = store.get_proposal("post-1").unwrap().unwrap();
        assert_eq!(stored.agenda_status, AgendaStatus::RecommendedToManager);
        assert_eq!(stored.agenda_score, 65);
    }

    #[test]
    fn test_commit_unknown_proposal() {
        let store = MemoryStore::new();
        let proposal = Proposal::new("ghost", "author-1");
        let err = store
            .commit_decision(
                AgendaStatus::Pending,
                &proposal,
                &record("ghost", AgendaStatus::RecommendedToManager),
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(store.decision_records("ghost").unwrap().is_empty());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agenda.json");

        {
            let store = MemoryStore::with_snapshot(&path).unwrap();
            let proposal = Proposal::new("post-1", "author-1").with_score(75);
            store.put_proposal(&proposal).unwrap();
            let next = proposal.with_status(AgendaStatus::RecommendedToManager);
            store
                .commit_decision(
                    AgendaStatus::Pending,
                    &next,
                    &record("post-1", AgendaStatus::RecommendedToManager),
                )
                .unwrap();
        }

        let reopened = MemoryStore::with_snapshot(&path).unwrap();
        let proposal = reopened.get_proposal("post-1").unwrap().unwrap();
        assert_eq!(proposal.agenda_score, 75);
        assert_eq!(proposal.agenda_status, AgendaStatus::RecommendedToManager);
        assert_eq!(reopened.decision_records("post-1").unwrap().len(), 1);
    }

    #[test]
    fn test_failed_commit_leaves_snapshot_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agenda.json");
        let store = MemoryStore::with_snapshot(&path).unwrap();
        store
            .put_proposal(&Proposal::new("post-1", "author-1"))
            .unwrap();
        let before = std::fs::read_to_string(&path).unwrap();

        let stale = Proposal::new("post-1", "author-1").with_status(AgendaStatus::Approved);
        let _ = store.commit_decision(
            AgendaStatus::RecommendedToManager,
            &stale,
            &record("post-1", AgendaStatus::Approved),
        );

        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
        assert_eq!(
            store.get_proposal("post-1").unwrap().unwrap().agenda_status,
            AgendaStatus::Pending
        );
    }
}
