use chrono::Utc;
use futures::future::join_all;
use parking_lot::RwLock;
use statesync_engine::{
    ConflictPolicy, Error as EngineError, RecordId, RecordStore, StoreId, StoreSnapshot,
};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::result::{EngineStatus, FailureKind, StateSyncResult, SyncPhase, SyncRequest, SyncedRef};
use crate::adapter::{RemoteBlob, RemoteStore};

/// The local store shared between the engine and direct callers.
pub type SharedStore = Arc<RwLock<RecordStore>>;

/// Construction-time settings of a [`SyncEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Key under which every remote store keeps the state blob
    pub key: String,
    /// Policy used when a request does not name one
    pub policy: ConflictPolicy,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            key: "statesync".into(),
            policy: ConflictPolicy::default(),
        }
    }
}

/// Pull, merge and push against a fixed set of remote stores.
///
/// At most one sync runs at a time. The store lock is only taken for the
/// synchronous merge and bookkeeping steps, never across remote calls, so
/// direct readers and writers of the store are not blocked by slow remotes.
pub struct SyncEngine {
    store: SharedStore,
    adapters: Vec<Arc<dyn RemoteStore>>,
    options: EngineOptions,
    in_flight: AtomicBool,
    phase: AtomicU8,
}

/// Holds the in-flight flag for the duration of one sync.
struct InFlight<'a> {
    engine: &'a SyncEngine,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.engine.set_phase(SyncPhase::Idle);
        self.engine.in_flight.store(false, Ordering::Release);
    }
}

impl SyncEngine {
    pub fn new(
        store: SharedStore,
        adapters: Vec<Arc<dyn RemoteStore>>,
        options: EngineOptions,
    ) -> Self {
        Self {
            store,
            adapters,
            options,
            in_flight: AtomicBool::new(false),
            phase: AtomicU8::new(SyncPhase::Idle as u8),
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Ids of the configured remote stores, in configuration order.
    pub fn adapter_ids(&self) -> Vec<StoreId> {
        self.adapters.iter().map(|a| a.id().to_string()).collect()
    }

    pub fn is_syncing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn phase(&self) -> SyncPhase {
        SyncPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub fn status(&self) -> EngineStatus {
        let adapters = self.adapter_ids();
        let store = self.store.read().sync_status(&adapters);
        EngineStatus {
            store,
            phase: self.phase(),
            in_progress: self.is_syncing(),
            policy: self.options.policy,
            key: self.options.key.clone(),
            adapters,
        }
    }

    fn set_phase(&self, phase: SyncPhase) {
        self.phase.store(phase as u8, Ordering::Release);
    }

    fn try_begin(&self) -> Option<InFlight<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight { engine: self })
    }

    /// Run one sync.
    ///
    /// Never fails as a whole: every problem is reported in the result. A
    /// call made while another sync is running returns a rejected result
    /// right away without touching the store.
    pub async fn sync(&self, request: SyncRequest) -> StateSyncResult {
        let Some(_guard) = self.try_begin() else {
            warn!("sync requested while another is in progress");
            return StateSyncResult::rejected();
        };

        let policy = request.policy.unwrap_or(self.options.policy);
        let mut result = StateSyncResult::default();
        info!(
            direction = ?request.direction,
            force = request.force,
            %policy,
            adapters = self.adapters.len(),
            "sync started"
        );

        if request.direction.pulls() {
            self.pull(policy, &mut result).await;
        }
        if request.direction.pushes() {
            self.push(request.force, &mut result).await;
        }

        self.store.write().set_last_sync(Utc::now());

        let result = result.finish();
        info!(
            success = result.success,
            synced = result.synced.len(),
            failed = result.failed.len(),
            conflicts = result.conflicts.len(),
            "sync finished"
        );
        result
    }

    async fn pull(&self, policy: ConflictPolicy, result: &mut StateSyncResult) {
        self.set_phase(SyncPhase::Pulling);
        let key = self.options.key.as_str();

        let retrieved = join_all(self.adapters.iter().map(|adapter| async move {
            (adapter.id().to_string(), adapter.retrieve(key).await)
        }))
        .await;

        let mut verified: Vec<(StoreId, StoreSnapshot)> = Vec::new();
        for (store, outcome) in retrieved {
            match outcome {
                Ok(None) => debug!(store = %store, "no remote state yet"),
                Ok(Some(blob)) => match blob.open(&store) {
                    Ok(snapshot) => verified.push((store, snapshot)),
                    Err(err @ EngineError::Integrity { .. }) => {
                        warn!(store = %store, error = %err, "remote state failed verification");
                        result.fail(&store, FailureKind::Integrity, false, err.to_string());
                    }
                    Err(err) => {
                        warn!(store = %store, error = %err, "remote state unreadable");
                        result.fail(&store, FailureKind::Parse, false, err.to_string());
                    }
                },
                Err(err) => {
                    warn!(store = %store, error = %err, "retrieve failed");
                    result.fail(&store, FailureKind::Adapter, err.is_retryable(), err.to_string());
                }
            }
        }

        self.set_phase(SyncPhase::Merging);
        let mut local = self.store.write();
        let mut acknowledged: Vec<SyncedRef> = Vec::new();
        for (store, snapshot) in verified {
            let report = local.merge_remote(&store, snapshot.records.into_values(), policy);
            info!(
                store = %store,
                adopted = report.adopted.len(),
                consistent = report.consistent.len(),
                replaced = report.replaced.len(),
                conflicts = report.conflicts.len(),
                "merged remote state"
            );
            acknowledged.extend(report.synced_ids().map(|id| SyncedRef {
                store: store.clone(),
                record_id: id.clone(),
            }));
            result.conflicts.extend(report.conflicts);
        }

        // A later store's replacement drops earlier acknowledgments
        result.synced.extend(acknowledged.into_iter().filter(|r| {
            local
                .get(&r.record_id)
                .is_some_and(|record| record.is_synced_to(&r.store))
        }));
        local.refresh_hash();
    }

    async fn push(&self, force: bool, result: &mut StateSyncResult) {
        self.set_phase(SyncPhase::Pushing);
        if self.adapters.is_empty() {
            return;
        }

        let (sealed, selected) = {
            let local = self.store.read();
            let selected: Vec<(RecordId, String)> = if force {
                local
                    .records()
                    .map(|r| (r.id.clone(), r.fingerprint.clone()))
                    .collect()
            } else {
                local
                    .pending(&self.adapter_ids())
                    .into_iter()
                    .map(|r| (r.id.clone(), r.fingerprint.clone()))
                    .collect()
            };
            if selected.is_empty() {
                debug!("nothing to push");
                return;
            }
            (RemoteBlob::seal(&local.export().without_sync_marks()), selected)
        };

        let blob = match sealed {
            Ok(blob) => blob,
            Err(err) => {
                for adapter in &self.adapters {
                    result.fail(adapter.id(), FailureKind::Parse, false, err.to_string());
                }
                return;
            }
        };

        let key = self.options.key.as_str();
        let stored = join_all(self.adapters.iter().map(|adapter| {
            let blob = blob.clone();
            async move { (adapter.id().to_string(), adapter.store(key, blob).await) }
        }))
        .await;

        let mut local = self.store.write();
        for (store, outcome) in stored {
            match outcome {
                Ok(()) => {
                    let mut acknowledged = 0;
                    for (id, fingerprint) in &selected {
                        // Skipped when the record changed while the push was in flight
                        if local.mark_synced(id, &store, fingerprint) {
                            acknowledged += 1;
                            result.synced.push(SyncedRef {
                                store: store.clone(),
                                record_id: id.clone(),
                            });
                        }
                    }
                    info!(store = %store, records = acknowledged, "pushed state");
                }
                Err(err) => {
                    warn!(store = %store, error = %err, "store failed");
                    result.fail(&store, FailureKind::Adapter, err.is_retryable(), err.to_string());
                }
            }
        }
        local.refresh_hash();
    }
}
