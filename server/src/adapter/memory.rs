use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{AdapterError, RemoteBlob, RemoteStore};

/// In-process remote store.
///
/// Backs the `memory:` config scheme and doubles as a test fake: latency and
/// scripted failures can be injected, and calls are counted.
pub struct MemoryRemote {
    id: String,
    blobs: DashMap<String, RemoteBlob>,
    latency: Mutex<Option<Duration>>,
    retrieve_failures: Mutex<VecDeque<AdapterError>>,
    store_failures: Mutex<VecDeque<AdapterError>>,
    retrieve_calls: AtomicUsize,
    store_calls: AtomicUsize,
}

impl MemoryRemote {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            blobs: DashMap::new(),
            latency: Mutex::new(None),
            retrieve_failures: Mutex::new(VecDeque::new()),
            store_failures: Mutex::new(VecDeque::new()),
            retrieve_calls: AtomicUsize::new(0),
            store_calls: AtomicUsize::new(0),
        }
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = Some(latency);
    }

    /// Make the next `retrieve` fail with `error`. Failures queue up.
    pub fn fail_next_retrieve(&self, error: AdapterError) {
        self.retrieve_failures.lock().push_back(error);
    }

    /// Make the next `store` fail with `error`. Failures queue up.
    pub fn fail_next_store(&self, error: AdapterError) {
        self.store_failures.lock().push_back(error);
    }

    /// Write a blob directly, bypassing failure injection.
    pub fn put_raw(&self, key: impl Into<String>, blob: RemoteBlob) {
        self.blobs.insert(key.into(), blob);
    }

    /// Read a blob directly.
    #[must_use]
    pub fn get_raw(&self, key: &str) -> Option<RemoteBlob> {
        self.blobs.get(key).map(|b| b.value().clone())
    }

    #[must_use]
    pub fn retrieve_calls(&self) -> usize {
        self.retrieve_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn store_calls(&self) -> usize {
        self.store_calls.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    fn id(&self) -> &str {
        &self.id
    }

    async fn retrieve(&self, key: &str) -> Result<Option<RemoteBlob>, AdapterError> {
        self.retrieve_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        let failure = self.retrieve_failures.lock().pop_front();
        if let Some(error) = failure {
            return Err(error);
        }
        Ok(self.get_raw(key))
    }

    async fn store(&self, key: &str, blob: RemoteBlob) -> Result<(), AdapterError> {
        self.store_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        let failure = self.store_failures.lock().pop_front();
        if let Some(error) = failure {
            return Err(error);
        }
        self.blobs.insert(key.to_string(), blob);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(s: &str) -> RemoteBlob {
        RemoteBlob {
            blob: s.to_string(),
            fingerprint: format!("fp-{s}"),
        }
    }

    #[tokio::test]
    async fn test_store_and_retrieve() {
        let remote = MemoryRemote::new("kv");
        assert_eq!(remote.id(), "kv");

        remote.store("state", blob("a")).await.unwrap();
        let got = remote.retrieve("state").await.unwrap();
        assert_eq!(got, Some(blob("a")));
    }

    #[tokio::test]
    async fn test_retrieve_missing_returns_none() {
        let remote = MemoryRemote::new("kv");
        assert!(remote.retrieve("nothing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed_in_order() {
        let remote = MemoryRemote::new("kv");
        remote.fail_next_store(AdapterError::Retryable("busy".into()));
        remote.fail_next_store(AdapterError::Fatal("denied".into()));

        assert!(remote.store("k", blob("a")).await.unwrap_err().is_retryable());
        assert!(!remote.store("k", blob("a")).await.unwrap_err().is_retryable());
        assert!(remote.store("k", blob("a")).await.is_ok());
        assert_eq!(remote.store_calls(), 3);
    }

    #[tokio::test]
    async fn test_failed_store_leaves_blob_untouched() {
        let remote = MemoryRemote::new("kv");
        remote.put_raw("k", blob("old"));
        remote.fail_next_store(AdapterError::Fatal("denied".into()));

        let _ = remote.store("k", blob("new")).await;
        assert_eq!(remote.get_raw("k"), Some(blob("old")));
    }

    #[tokio::test]
    async fn test_latency_is_applied() {
        let remote = MemoryRemote::new("kv");
        remote.set_latency(Duration::from_millis(30));

        let start = std::time::Instant::now();
        remote.retrieve("k").await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(30));
        assert_eq!(remote.retrieve_calls(), 1);
    }
}
