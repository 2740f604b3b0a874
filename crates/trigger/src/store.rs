//! Port traits for the collaborators the trigger does not own: the job
//! catalog and the job store.
//!
//! Infrastructure crates implement these; the trigger only sees the traits.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::context::Context;
use crate::definition::JobDefinition;
use crate::job::JobRequest;
use crate::{JobId, RepositoryId, RetryPolicy};

// ---------------------------------------------------------------------------
// Job store
// ---------------------------------------------------------------------------

/// Failures reported by a [`JobStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with this identity is already stored.
    ///
    /// A retried submission whose first attempt actually landed ends up here;
    /// the submitter treats it as success.
    #[error("job {id} already exists")]
    AlreadyExists {
        /// Identity of the existing record.
        id: JobId,
    },

    /// Optimistic-concurrency conflict.
    #[error("write conflict: {message}")]
    Conflict {
        /// Store-provided description.
        message: String,
    },

    /// The store could not be reached or failed transiently.
    #[error("job store unavailable: {message}")]
    Unavailable {
        /// Store-provided description.
        message: String,
        /// Delay the store asked for before the next attempt, if any.
        retry_after: Option<Duration>,
    },

    /// The request failed validation.
    #[error("invalid job request: {message}")]
    Invalid {
        /// What the store rejected.
        message: String,
    },

    /// The caller may not create jobs.
    #[error("permission denied: {message}")]
    Forbidden {
        /// Store-provided description.
        message: String,
    },
}

impl StoreError {
    /// Conflicts and unavailability are retryable; everything else is final.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Conflict { .. } => RetryPolicy::Retryable { after: None },
            Self::Unavailable { retry_after, .. } => RetryPolicy::Retryable {
                after: *retry_after,
            },
            Self::AlreadyExists { .. } | Self::Invalid { .. } | Self::Forbidden { .. } => {
                RetryPolicy::NonRetryable
            }
        }
    }
}

/// Backing store that accepts job requests.
///
/// Implementations must be idempotent by [`JobRequest::id`]: creating an id
/// that already exists returns [`StoreError::AlreadyExists`] and leaves the
/// stored record untouched.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Stores `request` under [`JobRequest::id`].
    ///
    /// The caller may drop the returned future when `ctx` is done, so an
    /// implementation must not leave partial state behind when abandoned.
    async fn create(&self, ctx: &Context, request: &JobRequest) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// Job catalog
// ---------------------------------------------------------------------------

/// Supplies the commit the catalog should be read at, for catalogs that keep
/// definitions inside the repository.
pub type BaseShaProvider<'a> = &'a (dyn Fn() -> String + Send + Sync);

/// Resolves the post-push job definitions configured for a repository.
#[async_trait]
pub trait JobCatalog: Send + Sync {
    /// Returns definitions in catalog order.
    ///
    /// Resolution does not fail the event: a catalog that cannot read
    /// repository-local definitions logs the problem and returns its static
    /// ones.
    async fn postsubmits(
        &self,
        repo: &RepositoryId,
        base_sha: BaseShaProvider<'_>,
    ) -> Vec<Arc<JobDefinition>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        let retryable = [
            StoreError::Conflict {
                message: "resource version changed".to_string(),
            },
            StoreError::Unavailable {
                message: "connection reset".to_string(),
                retry_after: None,
            },
        ];
        for err in retryable {
            assert!(matches!(err.retry_policy(), RetryPolicy::Retryable { .. }));
        }

        let permanent = [
            StoreError::Invalid {
                message: "missing refs".to_string(),
            },
            StoreError::Forbidden {
                message: "no create on jobs".to_string(),
            },
        ];
        for err in permanent {
            assert_eq!(err.retry_policy(), RetryPolicy::NonRetryable);
        }
    }

    #[test]
    fn test_retry_after_is_forwarded() {
        let err = StoreError::Unavailable {
            message: "throttled".to_string(),
            retry_after: Some(Duration::from_secs(2)),
        };
        assert_eq!(
            err.retry_policy(),
            RetryPolicy::Retryable {
                after: Some(Duration::from_secs(2))
            }
        );
    }
}
