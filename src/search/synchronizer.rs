//! Idempotent index schema synchronization.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::config::SearchSettings;
use crate::resilience::{retry, with_deadline, RetryPolicy};
use crate::search::client::IndexBackend;
use crate::search::schema::{expected_index, IndexDefinition};
use crate::search::IndexSyncError;

/// What a synchronization run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    /// No API key configured; no backend calls were made.
    Skipped,
    AlreadyInSync,
    Created,
    Updated,
}

impl SyncOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncOutcome::Skipped => "skipped",
            SyncOutcome::AlreadyInSync => "already_in_sync",
            SyncOutcome::Created => "created",
            SyncOutcome::Updated => "updated",
        }
    }
}

/// Converges the remote index to the expected definition.
pub struct IndexSynchronizer {
    backend: Arc<dyn IndexBackend>,
    expected: IndexDefinition,
    call_timeout: Duration,
    policy: RetryPolicy,
}

impl IndexSynchronizer {
    pub fn new(backend: Arc<dyn IndexBackend>, expected: IndexDefinition) -> Self {
        Self {
            backend,
            expected,
            call_timeout: Duration::from_secs(30),
            policy: RetryPolicy::default(),
        }
    }

    pub fn from_settings(backend: Arc<dyn IndexBackend>, settings: &SearchSettings) -> Self {
        Self::new(backend, expected_index(&settings.index_name))
            .with_call_timeout(Duration::from_secs(settings.sync_timeout_secs))
            .with_retry_policy(RetryPolicy::new(
                settings.sync_max_attempts,
                Duration::from_millis(500),
                Duration::from_secs(5),
            ))
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn expected(&self) -> &IndexDefinition {
        &self.expected
    }

    /// Ensure the remote index matches the expected schema.
    ///
    /// A missing or blank key is a successful no-op.
    pub async fn synchronize(&self, api_key: Option<&str>) -> Result<SyncOutcome, IndexSyncError> {
        let api_key = match api_key.map(str::trim) {
            Some(key) if !key.is_empty() => key,
            _ => {
                tracing::info!("No search API key configured, index synchronization skipped");
                return Ok(SyncOutcome::Skipped);
            }
        };

        let attempted = retry(self.policy, "index_sync", move |attempt| {
            tracing::debug!(index = %self.expected.name, attempt, "Synchronizing index schema");
            self.converge(api_key)
        })
        .await;

        match &attempted.result {
            Ok(outcome) => tracing::info!(
                index = %self.expected.name,
                outcome = outcome.as_str(),
                attempts = attempted.attempts,
                "Index schema synchronized"
            ),
            Err(e) => tracing::error!(
                index = %self.expected.name,
                attempts = attempted.attempts,
                error = %e,
                "Index schema synchronization failed"
            ),
        }
        attempted.result
    }

    async fn converge(&self, api_key: &str) -> Result<SyncOutcome, IndexSyncError> {
        let remote = with_deadline(
            self.call_timeout,
            self.backend.get_index(api_key, &self.expected.name),
        )
        .await?;

        let outcome = match remote {
            None => SyncOutcome::Created,
            Some(remote) => {
                let drift = self.expected.diff(&remote);
                if drift.is_empty() {
                    return Ok(SyncOutcome::AlreadyInSync);
                }
                tracing::warn!(index = %self.expected.name, drift = ?drift, "Index schema drift detected");
                SyncOutcome::Updated
            }
        };

        with_deadline(
            self.call_timeout,
            self.backend.create_or_update_index(api_key, &self.expected),
        )
        .await?;

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// In-memory backend holding at most one index.
    #[derive(Default)]
    struct MemoryBackend {
        index: Mutex<Option<IndexDefinition>>,
        gets: AtomicU32,
        puts: AtomicU32,
        fail_first_gets: AtomicU32,
        reject_key: bool,
    }

    #[async_trait]
    impl IndexBackend for MemoryBackend {
        async fn get_index(
            &self,
            _api_key: &str,
            _name: &str,
        ) -> Result<Option<IndexDefinition>, IndexSyncError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            if self.reject_key {
                return Err(IndexSyncError::Unauthorized(403));
            }
            if self.fail_first_gets.load(Ordering::SeqCst) > 0 {
                self.fail_first_gets.fetch_sub(1, Ordering::SeqCst);
                return Err(IndexSyncError::Network("connection refused".into()));
            }
            Ok(self.index.lock().unwrap().clone())
        }

        async fn create_or_update_index(
            &self,
            _api_key: &str,
            definition: &IndexDefinition,
        ) -> Result<(), IndexSyncError> {
            self.puts.fetch_add(1, Ordering::SeqCst);
            *self.index.lock().unwrap() = Some(definition.clone());
            Ok(())
        }
    }

    fn synchronizer(backend: Arc<MemoryBackend>) -> IndexSynchronizer {
        IndexSynchronizer::new(backend, expected_index("documents")).with_retry_policy(
            RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(2)),
        )
    }

    #[tokio::test]
    async fn test_blank_key_makes_no_calls() {
        let backend = Arc::new(MemoryBackend::default());
        let sync = synchronizer(backend.clone());

        assert_eq!(sync.synchronize(None).await.unwrap(), SyncOutcome::Skipped);
        assert_eq!(sync.synchronize(Some("  ")).await.unwrap(), SyncOutcome::Skipped);
        assert_eq!(backend.gets.load(Ordering::SeqCst), 0);
        assert_eq!(backend.puts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_creates_then_is_idempotent() {
        let backend = Arc::new(MemoryBackend::default());
        let sync = synchronizer(backend.clone());

        assert_eq!(sync.synchronize(Some("key")).await.unwrap(), SyncOutcome::Created);
        let after_first = backend.index.lock().unwrap().clone();

        assert_eq!(sync.synchronize(Some("key")).await.unwrap(), SyncOutcome::AlreadyInSync);
        assert_eq!(sync.synchronize(Some("key")).await.unwrap(), SyncOutcome::AlreadyInSync);

        assert_eq!(backend.puts.load(Ordering::SeqCst), 1);
        assert_eq!(*backend.index.lock().unwrap(), after_first);
    }

    #[tokio::test]
    async fn test_updates_divergent_schema() {
        let mut stale = expected_index("documents");
        stale.fields.pop();
        let backend = Arc::new(MemoryBackend {
            index: Mutex::new(Some(stale)),
            ..MemoryBackend::default()
        });
        let sync = synchronizer(backend.clone());

        assert_eq!(sync.synchronize(Some("key")).await.unwrap(), SyncOutcome::Updated);
        assert_eq!(backend.index.lock().unwrap().as_ref(), Some(sync.expected()));
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried_within_budget() {
        let backend = Arc::new(MemoryBackend::default());
        backend.fail_first_gets.store(2, Ordering::SeqCst);
        let sync = synchronizer(backend.clone());

        assert_eq!(sync.synchronize(Some("key")).await.unwrap(), SyncOutcome::Created);
        assert_eq!(backend.gets.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_budget_is_bounded() {
        let backend = Arc::new(MemoryBackend::default());
        backend.fail_first_gets.store(10, Ordering::SeqCst);
        let sync = synchronizer(backend.clone());

        let err = sync.synchronize(Some("key")).await.unwrap_err();
        assert!(matches!(err, IndexSyncError::Network(_)));
        assert_eq!(backend.gets.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_rejected_key_fails_without_retry() {
        let backend = Arc::new(MemoryBackend {
            reject_key: true,
            ..MemoryBackend::default()
        });
        let sync = synchronizer(backend.clone());

        let err = sync.synchronize(Some("wrong")).await.unwrap_err();
        assert!(matches!(err, IndexSyncError::Unauthorized(403)));
        assert_eq!(backend.gets.load(Ordering::SeqCst), 1);
    }
}
