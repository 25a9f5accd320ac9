//! Periodic background sync.
//!
//! Nothing runs until [`AutoSync::start`] is called. Ticks that arrive while
//! a sync is still running are skipped rather than queued.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::sync::{SyncEngine, SyncRequest};

/// Starts the repeating sync task.
pub struct AutoSync;

impl AutoSync {
    /// Run `request` against `engine` every `period`, first after one period.
    pub fn start(engine: Arc<SyncEngine>, period: Duration, request: SyncRequest) -> AutoSyncHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let runs = Arc::new(AtomicUsize::new(0));
        let completed = runs.clone();

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(period_ms = period.as_millis() as u64, "auto-sync started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if engine.is_syncing() {
                            debug!("auto-sync tick skipped, sync in progress");
                            continue;
                        }
                        let result = engine.sync(request.clone()).await;
                        if !result.success {
                            warn!(failed = result.failed.len(), "auto-sync finished with failures");
                        }
                        completed.fetch_add(1, Ordering::Relaxed);
                    }
                    _ = stop_rx.changed() => break,
                }
            }

            info!("auto-sync stopped");
        });

        AutoSyncHandle {
            stop: stop_tx,
            task,
            runs,
        }
    }
}

/// Control handle for a running [`AutoSync`] task.
///
/// Dropping the handle also stops the task, without waiting for it.
pub struct AutoSyncHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
    runs: Arc<AtomicUsize>,
}

impl AutoSyncHandle {
    /// Stop the task. A sync already running is allowed to finish first.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        if let Err(err) = self.task.await {
            warn!(error = %err, "auto-sync task ended abnormally");
        }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Number of syncs this task has completed.
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::Relaxed)
    }
}
