//! # Statesync Engine
//!
//! The deterministic core of a multi-master state synchronizer.
//!
//! Application state lives in several independently writable stores (an edge
//! key-value store, a CRM, ...). This crate holds the local system of record
//! and everything needed to tell whether two copies of a record disagree,
//! which one should win, and to prove after the fact what was compared.
//!
//! ## Design Principles
//!
//! - **No IO**: no files, network or async runtime; the server crate drives it
//! - **Deterministic**: fingerprints are independent of map insertion order
//! - **Verifiable**: every record carries the digest of its own payload
//!
//! ## Core Concepts
//!
//! ### Hashing
//!
//! - [`digest()`] - SHA-256/384/512 hex digests, [`verify`] in constant time
//! - [`layered_hash`] - deliberately expensive multi-round construction
//! - [`fingerprint()`] - digest of canonical (key-sorted) JSON
//! - [`merkle_root`] - order-sensitive aggregation of many fingerprints
//!
//! ### Records and the store
//!
//! A [`StateRecord`] is an id, a free-form type tag, a JSON object payload,
//! its fingerprint, a version counter, timestamps and the set of remote
//! stores that acknowledged it. The [`RecordStore`] owns all records and
//! exposes create/get/update/delete and filtered queries.
//!
//! ### Conflicts
//!
//! When a remote copy's fingerprint differs from the local one the
//! [`ConflictPolicy`] decides: keep local, take remote, newest `updatedAt`,
//! or leave it for the caller.
//!
//! ## Quick Start
//!
//! ```rust
//! use statesync_engine::{ConflictPolicy, RecordStore};
//! use serde_json::json;
//!
//! let mut store = RecordStore::new();
//! let data = json!({"app": "x", "env": "prod"}).as_object().cloned().unwrap();
//! let record = store.create("deployment", data).clone();
//!
//! let patch = json!({"env": "staging"}).as_object().cloned().unwrap();
//! let updated = store.update(&record.id, patch).unwrap();
//!
//! assert_ne!(updated.fingerprint, record.fingerprint);
//! assert_eq!(updated.version, 2);
//! assert!(updated.synced_to.is_empty());
//! ```
//!
//! ## Persistence
//!
//! [`RecordStore::export`] and [`RecordStore::import`] round-trip a
//! [`StoreSnapshot`], the JSON document with `records`, `lastSync` and `hash`.

pub mod digest;
pub mod error;
pub mod fingerprint;
pub mod layered;
pub mod merkle;
pub mod record;
pub mod resolve;
pub mod snapshot;
pub mod store;

// Re-export main types at crate root
pub use digest::{
    constant_time_eq, digest, digest_named, hash_with, verify, DigestOptions, DigestResult,
    HashAlgorithm,
};
pub use error::Error;
pub use fingerprint::{canonical_json, fingerprint, fingerprint_map};
pub use layered::{layered_hash, LAYERED_ROUNDS};
pub use merkle::merkle_root;
pub use record::{generate_id, StateRecord};
pub use resolve::{resolve, ConflictPolicy, ConflictSide, Resolution, StateConflict};
pub use snapshot::StoreSnapshot;
pub use store::{MergeReport, QueryBuilder, RecordStore, SyncStatus};

/// Type aliases for clarity
pub type RecordId = String;
pub type RecordType = String;
pub type StoreId = String;
pub type Version = u64;
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Record payload: a JSON object whose fingerprint is taken over its
/// key-sorted serialization.
pub type Payload = serde_json::Map<String, serde_json::Value>;
