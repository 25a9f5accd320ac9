//! Snapshot types for persisting and restoring store state.
//!
//! A snapshot is the at-rest JSON document: `records`, `lastSync` and the
//! store-wide `hash`. The same shape is handed to remote stores as the sync
//! blob. Records live in a BTreeMap so serialization order is stable.

use crate::{
    error::Result, fingerprint::fingerprint, Error, RecordId, StateRecord, Timestamp,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Point-in-time copy of a [`crate::RecordStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    /// All records keyed by id
    pub records: BTreeMap<RecordId, StateRecord>,
    /// When the store last completed a sync
    #[serde(default)]
    pub last_sync: Option<Timestamp>,
    /// Fingerprint of `records` and `lastSync`
    #[serde(default)]
    pub hash: String,
}

/// Store-wide fingerprint over a record map and last-sync time.
pub fn state_hash<'a>(
    records: impl IntoIterator<Item = (&'a RecordId, &'a StateRecord)>,
    last_sync: Option<Timestamp>,
) -> String {
    let records: serde_json::Map<String, Value> = records
        .into_iter()
        .map(|(id, record)| (id.clone(), json!(record)))
        .collect();
    fingerprint(&json!({
        "records": records,
        "lastSync": last_sync,
    }))
}

impl StoreSnapshot {
    /// Build a snapshot and compute its hash.
    pub fn new(records: BTreeMap<RecordId, StateRecord>, last_sync: Option<Timestamp>) -> Self {
        let hash = state_hash(&records, last_sync);
        Self {
            records,
            last_sync,
            hash,
        }
    }

    /// Snapshot with no records.
    pub fn empty() -> Self {
        Self::new(BTreeMap::new(), None)
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn get_record(&self, id: &str) -> Option<&StateRecord> {
        self.records.get(id)
    }

    /// Recompute the hash this snapshot should carry.
    pub fn computed_hash(&self) -> String {
        state_hash(&self.records, self.last_sync)
    }

    /// Check map keys, record fingerprints and the document hash.
    ///
    /// An empty `hash` is accepted for hand-written documents.
    pub fn validate(&self) -> Result<()> {
        for (key, record) in &self.records {
            if key != &record.id {
                return Err(Error::InvalidSnapshot(format!(
                    "record keyed '{key}' has id '{}'",
                    record.id
                )));
            }
            record.verify_fingerprint()?;
        }

        if !self.hash.is_empty() {
            let actual = self.computed_hash();
            if actual != self.hash {
                return Err(Error::Integrity {
                    id: "snapshot".into(),
                    expected: self.hash.clone(),
                    actual,
                });
            }
        }

        Ok(())
    }

    /// Copy with every `syncedTo` set emptied and the hash refreshed.
    ///
    /// Sync acknowledgments are local bookkeeping and never leave the process.
    pub fn without_sync_marks(&self) -> Self {
        let records = self
            .records
            .iter()
            .map(|(id, record)| {
                let mut record = record.clone();
                record.synced_to.clear();
                (id.clone(), record)
            })
            .collect();
        Self::new(records, self.last_sync)
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Serialize to pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Deserialize from JSON. Does not validate.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }
}
