//! RocksDB-backed agenda store
//!
//! Proposals, decision records and expired decisions live in separate column
//! families. Values are bincode-encoded. Each commit is a single
//! `WriteBatch`, taken under the write lock so the status check and the
//! write cannot interleave with another commit.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use rocksdb::{ColumnFamilyDescriptor, Options, WriteBatch, DB};
use serde::{de::DeserializeOwned, Serialize};

use super::schema::{self, keys, ALL_CFS};
use super::{checked_update, raise_score, AgendaStore, StoreError, StoreResult};
use crate::ladder::AgendaStatus;
use crate::proposal::{DecisionRecord, ExpiredEscalationDecision, Proposal};

/// Shared reference to RocksStore
pub type SharedRocksStore = Arc<RocksStore>;

/// RocksDB-backed persistent store
pub struct RocksStore {
    db: RwLock<DB>,
    path: PathBuf,
}

fn encode<T: Serialize>(value: &T) -> StoreResult<Vec<u8>> {
    bincode::serde::encode_to_vec(value, bincode::config::standard())
        .map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StoreResult<T> {
    bincode::serde::decode_from_slice(bytes, bincode::config::standard())
        .map(|(value, _)| value)
        .map_err(|e| StoreError::Deserialization(e.to_string()))
}

fn cf<'a>(db: &'a DB, name: &str) -> StoreResult<&'a rocksdb::ColumnFamily> {
    db.cf_handle(name)
        .ok_or_else(|| StoreError::ColumnFamilyNotFound(name.to_string()))
}

impl RocksStore {
    /// Open or create a store at the given path
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect();

        let db = DB::open_cf_descriptors(&opts, &path, cf_descriptors)?;

        Ok(Self {
            db: RwLock::new(db),
            path,
        })
    }

    /// Wrap in an `Arc` for sharing.
    pub fn shared(self) -> SharedRocksStore {
        Arc::new(self)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn get_in<T: DeserializeOwned>(db: &DB, cf_name: &str, key: &str) -> StoreResult<Option<T>> {
        match db.get_cf(cf(db, cf_name)?, key.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn get<T: DeserializeOwned>(&self, cf_name: &str, key: &str) -> StoreResult<Option<T>> {
        let db = self.db.read().map_err(|_| StoreError::LockPoisoned)?;
        Self::get_in(&db, cf_name, key)
    }

    /// Values of every key with `prefix`, in key order.
    fn scan<T: DeserializeOwned>(&self, cf_name: &str, prefix: &str) -> StoreResult<Vec<T>> {
        let db = self.db.read().map_err(|_| StoreError::LockPoisoned)?;
        let handle = cf(&db, cf_name)?;

        let mut values = Vec::new();
        for item in db.prefix_iterator_cf(handle, prefix.as_bytes()) {
            let (key, bytes) = item?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            values.push(decode(&bytes)?);
        }
        Ok(values)
    }

    /// Status check plus batched write, under the exclusive lock.
    fn commit_with<F>(&self, expected: AgendaStatus, proposal: &Proposal, extra: F) -> StoreResult<()>
    where
        F: FnOnce(&DB, &mut WriteBatch) -> StoreResult<()>,
    {
        let db = self.db.write().map_err(|_| StoreError::LockPoisoned)?;
        let key = keys::proposal(&proposal.id);
        let stored: Option<Proposal> = Self::get_in(&db, schema::CF_PROPOSALS, &key)?;
        let next = checked_update(stored.as_ref(), proposal, expected)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(cf(&db, schema::CF_PROPOSALS)?, key.as_bytes(), encode(&next)?);
        extra(&db, &mut batch)?;
        db.write(batch)?;
        Ok(())
    }
}

impl AgendaStore for RocksStore {
    fn get_proposal(&self, post_id: &str) -> StoreResult<Option<Proposal>> {
        self.get(schema::CF_PROPOSALS, &keys::proposal(post_id))
    }

    fn put_proposal(&self, proposal: &Proposal) -> StoreResult<()> {
        let db = self.db.write().map_err(|_| StoreError::LockPoisoned)?;
        db.put_cf(
            cf(&db, schema::CF_PROPOSALS)?,
            keys::proposal(&proposal.id).as_bytes(),
            encode(proposal)?,
        )?;
        Ok(())
    }

    fn update_score(&self, post_id: &str, score: u32) -> StoreResult<()> {
        let db = self.db.write().map_err(|_| StoreError::LockPoisoned)?;
        let key = keys::proposal(post_id);
        let mut proposal: Proposal = Self::get_in(&db, schema::CF_PROPOSALS, &key)?
            .ok_or_else(|| StoreError::NotFound(post_id.to_string()))?;
        raise_score(&mut proposal, score)?;
        db.put_cf(cf(&db, schema::CF_PROPOSALS)?, key.as_bytes(), encode(&proposal)?)?;
        Ok(())
    }

    fn list_proposals(&self) -> StoreResult<Vec<Proposal>> {
        self.scan(schema::CF_PROPOSALS, keys::PROPOSAL_PREFIX)
    }

    fn commit_decision(
        &self,
        expected: AgendaStatus,
        proposal: &Proposal,
        record: &DecisionRecord,
    ) -> StoreResult<()> {
        let key = keys::decision(
            &record.post_id,
            record.timestamp.timestamp_nanos_opt().unwrap_or(0),
            &record.id,
        );
        self.commit_with(expected, proposal, |db, batch| {
            batch.put_cf(cf(db, schema::CF_DECISIONS)?, key.as_bytes(), encode(record)?);
            Ok(())
        })
    }

    fn commit_expired_decision(
        &self,
        expected: AgendaStatus,
        proposal: &Proposal,
        decision: &ExpiredEscalationDecision,
    ) -> StoreResult<()> {
        let key = keys::expired(&decision.post_id);
        self.commit_with(expected, proposal, |db, batch| {
            batch.put_cf(cf(db, schema::CF_EXPIRED)?, key.as_bytes(), encode(decision)?);
            Ok(())
        })
    }

    fn decision_records(&self, post_id: &str) -> StoreResult<Vec<DecisionRecord>> {
        self.scan(schema::CF_DECISIONS, &keys::decision_prefix(post_id))
    }

    fn expired_decisions(&self) -> StoreResult<Vec<ExpiredEscalationDecision>> {
        self.scan(schema::CF_EXPIRED, keys::EXPIRED_PREFIX)
    }

    fn expired_decision_for(
        &self,
        post_id: &str,
    ) -> StoreResult<Option<ExpiredEscalationDecision>> {
        self.get(schema::CF_EXPIRED, &keys::expired(post_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ladder::DecisionType;
    use chrono::Utc;
    use tempfile::TempDir;

    fn open() -> (TempDir, RocksStore) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_proposal_crud() {
        let (_dir, store) = open();
        let proposal = Proposal::new("post-1", "author-1").with_score(120);
        store.put_proposal(&proposal).unwrap();

        let loaded = store.get_proposal("post-1").unwrap().unwrap();
        assert_eq!(loaded, proposal);
        assert_eq!(store.list_proposals().unwrap().len(), 1);
        assert!(store.get_proposal("post-2").unwrap().is_none());
    }

    #[test]
    fn test_commit_is_checked_and_batched() {
        let (_dir, store) = open();
        let proposal = Proposal::new("post-1", "author-1");
        store.put_proposal(&proposal).unwrap();

        let next = proposal
            .clone()
            .with_status(AgendaStatus::RecommendedToManager);
        let record = DecisionRecord {
            id: "rec-1".into(),
            post_id: "post-1".into(),
            decider_id: "sup-1".into(),
            decision_type: DecisionType::RecommendToManager,
            reason: "Worth a department look".into(),
            previous_status: AgendaStatus::Pending,
            new_status: AgendaStatus::RecommendedToManager,
            rescue_status: None,
            committee_id: None,
            timestamp: Utc::now(),
        };
        store
            .commit_decision(AgendaStatus::Pending, &next, &record)
            .unwrap();

        let err = store
            .commit_decision(AgendaStatus::Pending, &next, &record)
            .unwrap_err();
        assert!(matches!(err, StoreError::StatusChanged { .. }));

        let records = store.decision_records("post-1").unwrap();
        assert_eq!(records, vec![record]);
        assert_eq!(
            store.get_proposal("post-1").unwrap().unwrap().agenda_status,
            AgendaStatus::RecommendedToManager
        );
    }

    #[test]
    fn test_score_update_keeps_committed_status() {
        let (_dir, store) = open();
        store
            .put_proposal(&Proposal::new("post-1", "author-1").with_score(40))
            .unwrap();
        let next = store
            .get_proposal("post-1")
            .unwrap()
            .unwrap()
            .with_status(AgendaStatus::RecommendedToManager);
        store
            .commit_with(AgendaStatus::Pending, &next, |_, _| Ok(()))
            .unwrap();

        store.update_score("post-1", 55).unwrap();
        let loaded = store.get_proposal("post-1").unwrap().unwrap();
        assert_eq!(loaded.agenda_status, AgendaStatus::RecommendedToManager);
        assert_eq!(loaded.agenda_score, 55);

        let err = store.update_score("post-1", 50).unwrap_err();
        assert!(matches!(err, StoreError::ScoreDecreased { current: 55, .. }));
    }
}
