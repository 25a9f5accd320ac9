//! Retry with exponential backoff for remote store calls.
//!
//! Only [`AdapterError::Retryable`] failures are retried; fatal ones return
//! immediately. The sync engine itself never retries, so wrapping an adapter
//! in [`Retrying`] is how a deployment gets transient-failure recovery.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use super::{AdapterError, RemoteBlob, RemoteStore};

/// Backoff settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: usize,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            factor: 2.0,
        }
    }
}

impl RetryConfig {
    /// Delay before the attempt following `delay`.
    pub fn next_delay(&self, delay: Duration) -> Duration {
        delay.mul_f64(self.factor).min(self.max_delay)
    }
}

/// Run `operation` until it succeeds, fails fatally, or runs out of attempts.
pub async fn retry<F, Fut, T>(
    operation_name: &str,
    config: &RetryConfig,
    mut operation: F,
) -> Result<T, AdapterError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AdapterError>>,
{
    let mut delay = config.initial_delay;
    let mut attempts = 0;

    loop {
        match operation().await {
            Ok(val) => {
                if attempts > 0 {
                    info!(operation = operation_name, retries = attempts, "succeeded after retry");
                }
                return Ok(val);
            }
            Err(err) => {
                attempts += 1;
                if !err.is_retryable() || attempts >= config.max_attempts {
                    return Err(err);
                }

                warn!(
                    operation = operation_name,
                    attempt = attempts,
                    max_attempts = config.max_attempts,
                    error = %err,
                    "retrying in {:?}",
                    delay
                );
                sleep(delay).await;
                delay = config.next_delay(delay);
            }
        }
    }
}

/// Wraps a [`RemoteStore`] with retry-on-transient-failure.
pub struct Retrying<R> {
    inner: R,
    config: RetryConfig,
}

impl<R: RemoteStore> Retrying<R> {
    pub fn new(inner: R, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

#[async_trait]
impl<R: RemoteStore> RemoteStore for Retrying<R> {
    fn id(&self) -> &str {
        self.inner.id()
    }

    async fn retrieve(&self, key: &str) -> Result<Option<RemoteBlob>, AdapterError> {
        let name = format!("{}.retrieve", self.inner.id());
        retry(&name, &self.config, || self.inner.retrieve(key)).await
    }

    async fn store(&self, key: &str, blob: RemoteBlob) -> Result<(), AdapterError> {
        let name = format!("{}.store", self.inner.id());
        retry(&name, &self.config, || self.inner.store(key, blob.clone())).await
    }
}
