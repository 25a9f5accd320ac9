//! Record store - the in-memory system of record.
//!
//! The store owns every [`StateRecord`] of the process, keeps a store-wide
//! hash current after each structural mutation, and hosts the per-record
//! merge decision used during pull. All operations are synchronous.

use crate::{
    error::Result,
    merkle::merkle_root,
    record::generate_id,
    resolve::{resolve, ConflictPolicy, ConflictSide, Resolution, StateConflict},
    snapshot::{state_hash, StoreSnapshot},
    Error, Payload, RecordId, StateRecord, Timestamp,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Observability summary returned by [`RecordStore::sync_status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub record_count: usize,
    /// Records not yet acknowledged by every required store
    pub pending_count: usize,
    pub last_sync: Option<Timestamp>,
    pub state_hash: String,
    /// Merkle root over record fingerprints in id order
    pub merkle_root: String,
}

/// What happened when one remote store's records were merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeReport {
    /// Records that did not exist locally and were taken verbatim
    pub adopted: Vec<RecordId>,
    /// Records whose fingerprints already matched
    pub consistent: Vec<RecordId>,
    /// Records replaced by the remote version
    pub replaced: Vec<RecordId>,
    /// Every divergence, resolved or not
    pub conflicts: Vec<StateConflict>,
}

impl MergeReport {
    /// Ids now acknowledged by the remote store.
    pub fn synced_ids(&self) -> impl Iterator<Item = &RecordId> {
        self.adopted
            .iter()
            .chain(self.consistent.iter())
            .chain(self.replaced.iter())
    }
}

/// The authoritative map from id to record.
#[derive(Debug, Clone)]
pub struct RecordStore {
    records: HashMap<RecordId, StateRecord>,
    last_sync: Option<Timestamp>,
    state_hash: String,
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore {
    /// Create an empty store.
    pub fn new() -> Self {
        let mut store = Self {
            records: HashMap::new(),
            last_sync: None,
            state_hash: String::new(),
        };
        store.refresh_hash();
        store
    }

    /// Create a record stamped with the current time.
    pub fn create(&mut self, record_type: impl Into<String>, data: Payload) -> &StateRecord {
        self.create_at(record_type, data, Utc::now())
    }

    /// Create a record with an explicit timestamp.
    pub fn create_at(
        &mut self,
        record_type: impl Into<String>,
        data: Payload,
        timestamp: Timestamp,
    ) -> &StateRecord {
        let mut id = generate_id();
        while self.records.contains_key(&id) {
            id = generate_id();
        }
        let record = StateRecord::new(id.clone(), record_type, data, timestamp);
        self.records.insert(id.clone(), record);
        self.refresh_hash();
        &self.records[&id]
    }

    /// Get a record by id.
    pub fn get(&self, id: &str) -> Option<&StateRecord> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// All records of one type, oldest first.
    pub fn get_by_type(&self, record_type: &str) -> Vec<&StateRecord> {
        self.query().of_type(record_type).all()
    }

    /// Shallow-merge `patch` into a record, stamped with the current time.
    pub fn update(&mut self, id: &str, patch: Payload) -> Result<&StateRecord> {
        self.update_at(id, patch, Utc::now())
    }

    /// Shallow-merge `patch` into a record with an explicit timestamp.
    pub fn update_at(&mut self, id: &str, patch: Payload, timestamp: Timestamp) -> Result<&StateRecord> {
        let record = self
            .records
            .get_mut(id)
            .ok_or_else(|| Error::RecordNotFound(id.to_string()))?;
        record.apply_patch(patch, timestamp);
        self.refresh_hash();
        Ok(&self.records[id])
    }

    /// Remove a record.
    ///
    /// Hard removal, no tombstone. A later pull from a store that still holds
    /// the record brings it back.
    pub fn delete(&mut self, id: &str) -> Result<StateRecord> {
        let record = self
            .records
            .remove(id)
            .ok_or_else(|| Error::RecordNotFound(id.to_string()))?;
        self.refresh_hash();
        Ok(record)
    }

    /// Start a query over all records.
    pub fn query(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(self)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over all records in arbitrary order.
    pub fn records(&self) -> impl Iterator<Item = &StateRecord> {
        self.records.values()
    }

    pub fn last_sync(&self) -> Option<Timestamp> {
        self.last_sync
    }

    /// Record the completion time of a sync.
    pub fn set_last_sync(&mut self, timestamp: Timestamp) {
        self.last_sync = Some(timestamp);
        self.refresh_hash();
    }

    /// Current store-wide hash.
    pub fn state_hash(&self) -> &str {
        &self.state_hash
    }

    /// Recompute the store-wide hash.
    pub fn refresh_hash(&mut self) {
        self.state_hash = state_hash(&self.records, self.last_sync);
    }

    /// Merkle root over record fingerprints, ordered by id.
    pub fn merkle_root(&self) -> String {
        let mut ids: Vec<&RecordId> = self.records.keys().collect();
        ids.sort();
        let fingerprints: Vec<&str> = ids
            .into_iter()
            .map(|id| self.records[id].fingerprint.as_str())
            .collect();
        merkle_root(&fingerprints)
    }

    /// Records not yet acknowledged by every store in `required`.
    pub fn pending<S: AsRef<str>>(&self, required: &[S]) -> Vec<&StateRecord> {
        let mut pending: Vec<&StateRecord> = self
            .records
            .values()
            .filter(|r| !r.is_fully_synced(required))
            .collect();
        pending.sort_by(|a, b| by_creation(a, b));
        pending
    }

    /// Mark a record as acknowledged by `store`.
    ///
    /// Only applies when the record still has `fingerprint`; a record changed
    /// since it was sent stays unacknowledged. Returns whether it was marked.
    pub fn mark_synced(&mut self, id: &str, store: &str, fingerprint: &str) -> bool {
        match self.records.get_mut(id) {
            Some(record) if record.fingerprint == fingerprint => {
                record.mark_synced(store);
                true
            }
            _ => false,
        }
    }

    /// Merge the records reported by one remote store.
    ///
    /// The caller must hold exclusive access for the whole call. The
    /// store-wide hash is not refreshed here; call [`RecordStore::refresh_hash`]
    /// once the whole batch of stores is merged.
    pub fn merge_remote(
        &mut self,
        store: &str,
        remote_records: impl IntoIterator<Item = StateRecord>,
        policy: ConflictPolicy,
    ) -> MergeReport {
        let mut report = MergeReport::default();

        for remote in remote_records {
            let Some(local) = self.records.get_mut(&remote.id) else {
                let mut adopted = remote;
                adopted.synced_to.clear();
                adopted.mark_synced(store);
                report.adopted.push(adopted.id.clone());
                self.records.insert(adopted.id.clone(), adopted);
                continue;
            };

            if local.fingerprint == remote.fingerprint {
                local.mark_synced(store);
                report.consistent.push(local.id.clone());
                continue;
            }

            let resolution = resolve(policy, local, &remote);
            report.conflicts.push(StateConflict {
                record_id: local.id.clone(),
                store: store.to_string(),
                local: ConflictSide::from(&*local),
                remote: ConflictSide::from(&remote),
                resolution,
            });

            match resolution {
                Some(Resolution::Local) => {
                    // Schedule an overwrite of the remote copy on the next push
                    local.synced_to.remove(store);
                }
                Some(Resolution::Remote) => {
                    let version = (local.version + 1).max(remote.version);
                    let mut replacement = remote;
                    replacement.version = version;
                    replacement.synced_to.clear();
                    replacement.mark_synced(store);
                    report.replaced.push(replacement.id.clone());
                    *local = replacement;
                }
                None => {}
            }
        }

        report
    }

    /// Sync summary for external observers.
    pub fn sync_status<S: AsRef<str>>(&self, required: &[S]) -> SyncStatus {
        SyncStatus {
            record_count: self.records.len(),
            pending_count: self.pending(required).len(),
            last_sync: self.last_sync,
            state_hash: self.state_hash.clone(),
            merkle_root: self.merkle_root(),
        }
    }

    /// Export the store as a snapshot document.
    pub fn export(&self) -> StoreSnapshot {
        let records = self
            .records
            .iter()
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect();
        StoreSnapshot::new(records, self.last_sync)
    }

    /// Replace the whole store with a snapshot.
    ///
    /// The snapshot is validated first; on error the store is unchanged.
    /// Sync acknowledgments are reset since import is not a sync.
    pub fn import(&mut self, snapshot: StoreSnapshot) -> Result<()> {
        snapshot.validate()?;

        self.records = snapshot
            .records
            .into_iter()
            .map(|(id, mut record)| {
                record.synced_to.clear();
                (id, record)
            })
            .collect();
        self.last_sync = snapshot.last_sync;
        self.refresh_hash();

        Ok(())
    }
}

fn by_creation(a: &StateRecord, b: &StateRecord) -> std::cmp::Ordering {
    a.created_at
        .cmp(&b.created_at)
        .then_with(|| a.id.cmp(&b.id))
}

type Predicate<'a> = Box<dyn Fn(&StateRecord) -> bool + 'a>;

/// Builder for querying records.
///
/// Filters apply in a fixed order: type, predicate, offset, limit. Results
/// are ordered by creation time, then id.
pub struct QueryBuilder<'a> {
    store: &'a RecordStore,
    record_type: Option<String>,
    predicate: Option<Predicate<'a>>,
    offset: usize,
    limit: Option<usize>,
}

impl std::fmt::Debug for QueryBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("record_type", &self.record_type)
            .field("has_predicate", &self.predicate.is_some())
            .field("offset", &self.offset)
            .field("limit", &self.limit)
            .finish()
    }
}

impl<'a> QueryBuilder<'a> {
    fn new(store: &'a RecordStore) -> Self {
        Self {
            store,
            record_type: None,
            predicate: None,
            offset: 0,
            limit: None,
        }
    }

    /// Only records of this type.
    pub fn of_type(mut self, record_type: impl Into<String>) -> Self {
        self.record_type = Some(record_type.into());
        self
    }

    /// Only records matching `predicate`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&StateRecord) -> bool + 'a,
    {
        self.predicate = Some(Box::new(predicate));
        self
    }

    /// Skip the first `offset` matches.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Return at most `limit` matches.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Get all matching records.
    pub fn all(self) -> Vec<&'a StateRecord> {
        let store = self.store;
        let mut matched: Vec<&'a StateRecord> = store
            .records
            .values()
            .filter(|r| match &self.record_type {
                Some(t) => &r.record_type == t,
                None => true,
            })
            .filter(|r| self.predicate.as_ref().map_or(true, |p| p(*r)))
            .collect();
        matched.sort_by(|a, b| by_creation(a, b));

        matched
            .into_iter()
            .skip(self.offset)
            .take(self.limit.unwrap_or(usize::MAX))
            .collect()
    }

    /// Get the first matching record.
    pub fn first(self) -> Option<&'a StateRecord> {
        self.limit(1).all().into_iter().next()
    }

    /// Count matching records.
    pub fn count(self) -> usize {
        self.all().len()
    }
}
