//! State records, the unit of synchronized state.

use crate::{
    error::Result, fingerprint::fingerprint_map, Error, Payload, RecordId, RecordType, StoreId,
    Timestamp, Version,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Generate a fresh record identifier.
///
/// UUIDv7: a millisecond timestamp followed by random bits, so ids are never
/// derived from a counter and are not reused within a process.
pub fn generate_id() -> RecordId {
    uuid::Uuid::now_v7().to_string()
}

/// A versioned, fingerprinted record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateRecord {
    /// Unique identifier, immutable after creation
    pub id: RecordId,
    /// Free-form category tag used for filtering
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// The payload
    pub data: Payload,
    /// SHA-256 of the canonical payload
    pub fingerprint: String,
    /// Local mutation counter
    pub version: Version,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    /// Remote stores that acknowledged the current fingerprint
    #[serde(default)]
    pub synced_to: BTreeSet<StoreId>,
}

impl StateRecord {
    /// Create a record at version 1.
    pub fn new(
        id: impl Into<RecordId>,
        record_type: impl Into<RecordType>,
        data: Payload,
        timestamp: Timestamp,
    ) -> Self {
        let fingerprint = fingerprint_map(&data);
        Self {
            id: id.into(),
            record_type: record_type.into(),
            data,
            fingerprint,
            version: 1,
            created_at: timestamp,
            updated_at: timestamp,
            synced_to: BTreeSet::new(),
        }
    }

    /// Shallow-merge `patch` into the payload.
    ///
    /// Top-level keys in `patch` overwrite existing ones. Always bumps the
    /// version and forgets every sync acknowledgment.
    pub fn apply_patch(&mut self, patch: Payload, timestamp: Timestamp) {
        for (key, value) in patch {
            self.data.insert(key, value);
        }
        self.fingerprint = fingerprint_map(&self.data);
        self.version += 1;
        self.updated_at = timestamp;
        self.synced_to.clear();
    }

    /// Recompute the fingerprint from the payload.
    pub fn computed_fingerprint(&self) -> String {
        fingerprint_map(&self.data)
    }

    /// Check that the stored fingerprint matches the payload.
    pub fn verify_fingerprint(&self) -> Result<()> {
        let actual = self.computed_fingerprint();
        if actual != self.fingerprint {
            return Err(Error::Integrity {
                id: self.id.clone(),
                expected: self.fingerprint.clone(),
                actual,
            });
        }
        Ok(())
    }

    pub fn is_synced_to(&self, store: &str) -> bool {
        self.synced_to.contains(store)
    }

    /// Whether every store in `required` has acknowledged this record.
    pub fn is_fully_synced<S: AsRef<str>>(&self, required: &[S]) -> bool {
        required.iter().all(|s| self.is_synced_to(s.as_ref()))
    }

    pub fn mark_synced(&mut self, store: impl Into<StoreId>) {
        self.synced_to.insert(store.into());
    }
}
