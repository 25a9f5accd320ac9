//! The synchronization engine.
//!
//! One [`SyncEngine`] owns a set of remote stores handed in at construction
//! and runs `Idle -> Pulling -> Merging -> Pushing -> Idle` per call:
//!
//! - **Pull** retrieves every store's blob concurrently and verifies it
//!   against its fingerprint. Stores whose data cannot be verified are
//!   reported and skipped for this cycle.
//! - **Merge** folds the verified records into the local store under the
//!   write lock, applying the conflict policy.
//! - **Push** sends the full local state to every store concurrently and
//!   records each acknowledgment in the pushed records' `syncedTo`.
//!
//! Failures are scoped to the store they came from and collected into the
//! [`StateSyncResult`]; one failing store never aborts the others.

mod engine;
mod result;

pub use engine::{EngineOptions, SharedStore, SyncEngine};
pub use result::{
    EngineStatus, FailureKind, StateSyncResult, SyncDirection, SyncFailure, SyncPhase,
    SyncRequest, SyncedRef,
};
