//! Request and result types for a sync call.

use serde::{Deserialize, Serialize};
use statesync_engine::{ConflictPolicy, RecordId, StateConflict, StoreId, SyncStatus};

/// Which phases a sync call runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncDirection {
    Pull,
    Push,
    #[default]
    Both,
}

impl SyncDirection {
    pub fn pulls(self) -> bool {
        matches!(self, SyncDirection::Pull | SyncDirection::Both)
    }

    pub fn pushes(self) -> bool {
        matches!(self, SyncDirection::Push | SyncDirection::Both)
    }
}

/// Parameters of one sync call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncRequest {
    pub direction: SyncDirection,
    /// Push every record, not only the pending ones
    pub force: bool,
    /// Overrides the engine's default policy for this call
    pub policy: Option<ConflictPolicy>,
}

impl SyncRequest {
    pub fn pull() -> Self {
        Self {
            direction: SyncDirection::Pull,
            ..Self::default()
        }
    }

    pub fn push() -> Self {
        Self {
            direction: SyncDirection::Push,
            ..Self::default()
        }
    }

    pub fn with_policy(mut self, policy: ConflictPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }
}

/// Where an engine is in its sync cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum SyncPhase {
    Idle = 0,
    Pulling = 1,
    Merging = 2,
    Pushing = 3,
}

impl SyncPhase {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => SyncPhase::Pulling,
            2 => SyncPhase::Merging,
            3 => SyncPhase::Pushing,
            _ => SyncPhase::Idle,
        }
    }
}

/// A record acknowledged by a remote store during this call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncedRef {
    pub store: StoreId,
    pub record_id: RecordId,
}

/// Classification of a failure entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    /// Retrieved data did not match its fingerprint
    Integrity,
    /// The remote store call itself failed
    Adapter,
    /// Retrieved data was not a readable state document
    Parse,
    /// Another sync was already running
    SyncInProgress,
}

/// One failure, scoped to a remote store where there is one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncFailure {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<RecordId>,
    pub kind: FailureKind,
    pub retryable: bool,
    pub reason: String,
}

/// Outcome of a sync call.
///
/// `success` means no failures; resolved conflicts do not count as failures.
/// `synced` lists the acknowledgments still held when the call returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSyncResult {
    pub success: bool,
    pub synced: Vec<SyncedRef>,
    pub failed: Vec<SyncFailure>,
    pub conflicts: Vec<StateConflict>,
}

impl StateSyncResult {
    /// Result for a call refused because a sync is already running.
    pub fn rejected() -> Self {
        Self {
            success: false,
            failed: vec![SyncFailure {
                store: None,
                record_id: None,
                kind: FailureKind::SyncInProgress,
                retryable: true,
                reason: "a sync is already in progress".into(),
            }],
            ..Self::default()
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.failed
            .iter()
            .any(|f| f.kind == FailureKind::SyncInProgress)
    }

    /// Conflicts left for the caller to settle.
    pub fn unresolved(&self) -> impl Iterator<Item = &StateConflict> {
        self.conflicts.iter().filter(|c| !c.is_resolved())
    }

    pub(crate) fn fail(
        &mut self,
        store: &str,
        kind: FailureKind,
        retryable: bool,
        reason: impl Into<String>,
    ) {
        self.failed.push(SyncFailure {
            store: Some(store.to_string()),
            record_id: None,
            kind,
            retryable,
            reason: reason.into(),
        });
    }

    pub(crate) fn finish(mut self) -> Self {
        self.success = self.failed.is_empty();
        self
    }
}

/// Snapshot of an engine for status endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    #[serde(flatten)]
    pub store: SyncStatus,
    pub phase: SyncPhase,
    pub in_progress: bool,
    pub policy: ConflictPolicy,
    pub key: String,
    pub adapters: Vec<StoreId>,
}
