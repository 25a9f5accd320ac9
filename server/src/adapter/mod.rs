//! Remote store adapters.
//!
//! A remote store is anything that can keep one blob under a key together
//! with the blob's fingerprint: an edge KV namespace, a CRM custom object, a
//! Postgres table. The engine only ever sees this trait; concrete adapters
//! are built by the caller and handed in at construction time.

mod memory;
mod postgres;
mod retry;

pub use memory::MemoryRemote;
pub use postgres::PgRemote;
pub use retry::{RetryConfig, Retrying};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use statesync_engine::{constant_time_eq, fingerprint, Error as EngineError, StoreSnapshot};

/// Failure talking to a remote store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdapterError {
    /// Network, timeout or rate-limit class; worth retrying
    #[error("transient failure: {0}")]
    Retryable(String),
    /// Auth, validation or protocol class; retrying will not help
    #[error("permanent failure: {0}")]
    Fatal(String),
}

impl AdapterError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, AdapterError::Retryable(_))
    }
}

/// A serialized state document plus the fingerprint the writer computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteBlob {
    pub blob: String,
    pub fingerprint: String,
}

impl RemoteBlob {
    /// Serialize a snapshot and fingerprint it.
    pub fn seal(snapshot: &StoreSnapshot) -> Result<Self, EngineError> {
        let value =
            serde_json::to_value(snapshot).map_err(|e| EngineError::InvalidSnapshot(e.to_string()))?;
        Ok(Self {
            fingerprint: fingerprint(&value),
            blob: value.to_string(),
        })
    }

    /// Parse the blob after checking it against its fingerprint.
    ///
    /// The fingerprint is recomputed over the parsed document and compared in
    /// constant time. Every record's own fingerprint is checked as well, so a
    /// successful open means the whole document is verified.
    pub fn open(&self, store: &str) -> Result<StoreSnapshot, EngineError> {
        let value: serde_json::Value = serde_json::from_str(&self.blob)
            .map_err(|e| EngineError::InvalidSnapshot(format!("{store}: {e}")))?;

        let actual = fingerprint(&value);
        if !constant_time_eq(actual.as_bytes(), self.fingerprint.as_bytes()) {
            return Err(EngineError::Integrity {
                id: store.to_string(),
                expected: self.fingerprint.clone(),
                actual,
            });
        }

        let snapshot: StoreSnapshot = serde_json::from_value(value)
            .map_err(|e| EngineError::InvalidSnapshot(format!("{store}: {e}")))?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}

/// The narrow contract every backend implements.
///
/// Implementations own their retry behaviour; the engine calls each method
/// once per sync and treats any error as scoped to this store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Stable identifier recorded in `syncedTo`.
    fn id(&self) -> &str;

    /// Fetch the blob stored under `key`, if any.
    async fn retrieve(&self, key: &str) -> Result<Option<RemoteBlob>, AdapterError>;

    /// Store `blob` under `key`, replacing what was there.
    async fn store(&self, key: &str, blob: RemoteBlob) -> Result<(), AdapterError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use statesync_engine::RecordStore;

    fn snapshot() -> StoreSnapshot {
        let mut store = RecordStore::new();
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        store.create_at(
            "deployment",
            json!({"app": "x"}).as_object().cloned().unwrap(),
            ts,
        );
        store.export()
    }

    #[test]
    fn seal_then_open() {
        let original = snapshot();
        let blob = RemoteBlob::seal(&original).unwrap();
        assert_eq!(blob.fingerprint.len(), 64);

        let opened = blob.open("kv").unwrap();
        assert_eq!(opened, original);
    }

    #[test]
    fn open_rejects_wrong_fingerprint() {
        let mut blob = RemoteBlob::seal(&snapshot()).unwrap();
        blob.fingerprint = "0".repeat(64);

        let err = blob.open("kv").unwrap_err();
        assert!(err.is_integrity());
    }

    #[test]
    fn open_rejects_tampered_blob() {
        let mut blob = RemoteBlob::seal(&snapshot()).unwrap();
        blob.blob = blob.blob.replace("\"app\":\"x\"", "\"app\":\"y\"");

        assert!(blob.open("kv").unwrap_err().is_integrity());
    }

    #[test]
    fn open_rejects_record_with_forged_fingerprint() {
        // Outer fingerprint is valid, inner record fingerprint is not.
        let mut doc = serde_json::to_value(snapshot()).unwrap();
        let records = doc["records"].as_object_mut().unwrap();
        let (_, record) = records.iter_mut().next().unwrap();
        record["data"]["app"] = json!("forged");
        doc["hash"] = json!("");
        let blob = RemoteBlob {
            fingerprint: fingerprint(&doc),
            blob: doc.to_string(),
        };

        assert!(blob.open("kv").unwrap_err().is_integrity());
    }

    #[test]
    fn open_rejects_garbage() {
        let blob = RemoteBlob {
            blob: "not json".into(),
            fingerprint: String::new(),
        };
        assert!(matches!(
            blob.open("kv"),
            Err(EngineError::InvalidSnapshot(_))
        ));
    }

    #[test]
    fn error_classes() {
        assert!(AdapterError::Retryable("timeout".into()).is_retryable());
        assert!(!AdapterError::Fatal("401".into()).is_retryable());
    }
}
