//! Submission of job requests with bounded retry.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::context::Context;
use crate::job::JobRequest;
use crate::store::{JobStore, StoreError};
use crate::{RetryPolicy, TriggerError};

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BASE_BACKOFF: Duration = Duration::from_millis(100);

/// How often and how patiently a request is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitPolicy {
    /// Total attempts including the first. Never zero.
    pub max_attempts: u32,
    /// The wait before attempt `n + 1` is `base_backoff * n` unless the store
    /// asked for a specific delay.
    pub base_backoff: Duration,
}

impl Default for SubmitPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_backoff: DEFAULT_BASE_BACKOFF,
        }
    }
}

impl SubmitPolicy {
    fn backoff(&self, attempt: u32, after: Option<Duration>) -> Duration {
        after.unwrap_or(self.base_backoff * attempt)
    }
}

/// `[submit]` section of the trigger configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SubmitConfig {
    /// Total attempts per request, including the first.
    pub max_attempts: u32,
    /// Base backoff in milliseconds, multiplied by the attempt number.
    pub backoff_ms: u64,
    /// Upper bound on the time spent on one event, if any.
    pub timeout_secs: Option<u64>,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_ms: DEFAULT_BASE_BACKOFF.as_millis() as u64,
            timeout_secs: None,
        }
    }
}

impl SubmitConfig {
    /// The retry policy these settings describe, with at least one attempt.
    pub fn policy(&self) -> SubmitPolicy {
        SubmitPolicy {
            max_attempts: self.max_attempts.max(1),
            base_backoff: Duration::from_millis(self.backoff_ms),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Stores `request`, retrying transient store failures.
///
/// An `AlreadyExists` answer counts as success, so resubmitting a request
/// whose identity is already stored is a no-op. Non-retryable failures are
/// returned at once. If `ctx` is done before or during an attempt or a backoff
/// wait, the submission stops with [`TriggerError::Cancelled`].
pub async fn submit(
    ctx: &Context,
    store: &dyn JobStore,
    request: &JobRequest,
    policy: &SubmitPolicy,
) -> Result<(), TriggerError> {
    let max_attempts = policy.max_attempts.max(1);
    let cancelled = || TriggerError::Cancelled {
        operation: format!("submitting job '{}'", request.job),
    };

    let mut attempt = 0;
    loop {
        attempt += 1;
        if ctx.is_done() {
            return Err(cancelled());
        }

        let result = tokio::select! {
            biased;
            _ = ctx.done() => return Err(cancelled()),
            result = store.create(ctx, request) => result,
        };

        let err = match result {
            Ok(()) => return Ok(()),
            Err(StoreError::AlreadyExists { id }) => {
                debug!(job_id = %id, job = %request.job, "Job already stored");
                return Ok(());
            }
            Err(err) => err,
        };

        let after = match err.retry_policy() {
            RetryPolicy::NonRetryable => {
                return Err(TriggerError::PermanentSubmission {
                    job: request.job.clone(),
                    source: err,
                });
            }
            RetryPolicy::Retryable { after } => after,
        };

        warn!(
            job_id = %request.id,
            job = %request.job,
            attempt,
            max_attempts,
            error = %err,
            "Failed to create job"
        );

        if attempt >= max_attempts {
            return Err(TriggerError::TransientSubmission {
                job: request.job.clone(),
                attempts: attempt,
                source: err,
            });
        }

        tokio::select! {
            biased;
            _ = ctx.done() => return Err(cancelled()),
            _ = tokio::time::sleep(policy.backoff(attempt, after)) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::definition::JobDefinition;
    use crate::fakes::MemoryJobStore;
    use crate::refs::Refs;
    use crate::JobName;

    fn request(job: &str) -> JobRequest {
        let refs = Refs {
            org: "acme".to_string(),
            repo: "widgets".to_string(),
            repo_link: String::new(),
            base_ref: "main".to_string(),
            base_sha: "abc".to_string(),
            base_link: String::new(),
        };
        let def = JobDefinition::new(JobName::new(job).unwrap());
        JobRequest::postsubmit(&def, &refs, "guid", false)
    }

    /// Store whose `create` never completes.
    #[derive(Default)]
    struct HangingStore {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl JobStore for HangingStore {
        async fn create(&self, _ctx: &Context, _request: &JobRequest) -> Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::future::pending().await
        }
    }

    fn unavailable() -> StoreError {
        StoreError::Unavailable {
            message: "etcd leader changed".to_string(),
            retry_after: None,
        }
    }

    #[test]
    fn test_backoff_grows_linearly() {
        let policy = SubmitPolicy::default();
        assert_eq!(policy.backoff(1, None), Duration::from_millis(100));
        assert_eq!(policy.backoff(2, None), Duration::from_millis(200));
        assert_eq!(
            policy.backoff(2, Some(Duration::from_secs(1))),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn test_config_policy_never_has_zero_attempts() {
        let config = SubmitConfig {
            max_attempts: 0,
            backoff_ms: 5,
            timeout_secs: Some(30),
        };
        assert_eq!(config.policy().max_attempts, 1);
        assert_eq!(config.policy().base_backoff, Duration::from_millis(5));
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn test_resubmission_is_noop_success() {
        let store = MemoryJobStore::new();
        let req = request("build");
        let ctx = Context::new();

        submit(&ctx, &store, &req, &SubmitPolicy::default()).await.unwrap();
        submit(&ctx, &store, &req, &SubmitPolicy::default()).await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.attempts(req.job.as_str()), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_are_retried() {
        let store = MemoryJobStore::new();
        store.fail_job("build", unavailable());
        store.fail_job(
            "build",
            StoreError::Conflict {
                message: "stale".to_string(),
            },
        );
        let req = request("build");

        submit(&Context::new(), &store, &req, &SubmitPolicy::default())
            .await
            .unwrap();

        assert_eq!(store.attempts(req.job.as_str()), 3);
        assert_eq!(store.get(&req.id), Some(req));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_report_transient_error() {
        let store = MemoryJobStore::new();
        for _ in 0..5 {
            store.fail_job("build", unavailable());
        }
        let req = request("build");

        let err = submit(&Context::new(), &store, &req, &SubmitPolicy::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TriggerError::TransientSubmission { attempts: 3, .. }
        ));
        assert_eq!(store.attempts(req.job.as_str()), 3);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let store = MemoryJobStore::new();
        store.fail_job(
            "build",
            StoreError::Forbidden {
                message: "service account cannot create jobs".to_string(),
            },
        );
        let req = request("build");

        let err = submit(&Context::new(), &store, &req, &SubmitPolicy::default())
            .await
            .unwrap_err();

        assert!(matches!(err, TriggerError::PermanentSubmission { .. }));
        assert_eq!(store.attempts(req.job.as_str()), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_stops_backoff() {
        let store = MemoryJobStore::new();
        for _ in 0..5 {
            store.fail_job("build", unavailable());
        }
        let req = request("build");
        let policy = SubmitPolicy {
            max_attempts: 5,
            base_backoff: Duration::from_secs(10),
        };
        let ctx = Context::with_timeout(Duration::from_secs(1));

        let err = submit(&ctx, &store, &req, &policy).await.unwrap_err();

        assert!(err.is_cancellation());
        assert_eq!(store.attempts(req.job.as_str()), 1);
    }

    #[tokio::test]
    async fn test_cancelled_context_makes_no_attempt() {
        let store = MemoryJobStore::new();
        let ctx = Context::new();
        ctx.cancel();
        let req = request("build");

        let err = submit(&ctx, &store, &req, &SubmitPolicy::default())
            .await
            .unwrap_err();

        assert!(err.is_cancellation());
        assert_eq!(store.attempts(req.job.as_str()), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_during_store_call_reports_cancellation() {
        let store = HangingStore::default();
        let req = request("build");
        let ctx = Context::with_timeout(Duration::from_secs(1));

        let err = submit(&ctx, &store, &req, &SubmitPolicy::default())
            .await
            .unwrap_err();

        match err {
            TriggerError::Cancelled { operation } => {
                assert_eq!(operation, "submitting job 'build'");
            }
            other => panic!("expected cancellation, got {other:?}"),
        }
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }
}
