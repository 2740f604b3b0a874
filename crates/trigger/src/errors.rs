//! Top-level error and retry-policy types for the push trigger.
//!
//! [`TriggerError`] is what the orchestrator hands back to its caller. Store
//! failures are defined next to the port in [`crate::store`] and are wrapped
//! here once the submitter has decided they are final.
//!
//! [`RetryPolicy`] is the cross-cutting part: any error that participates in
//! retry decisions must be able to produce one.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::StoreError;
use crate::JobName;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// - `Retryable`: optimistic-concurrency conflicts, transient network or
///   storage failures.
/// - `NonRetryable`: validation failures, permission errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    Retryable {
        /// Minimum back-off before the next attempt. `None` means apply the
        /// caller's own back-off schedule.
        after: Option<Duration>,
    },
    /// The operation must not be retried.
    NonRetryable,
}

// ---------------------------------------------------------------------------
// Trigger-level errors
// ---------------------------------------------------------------------------

/// Errors that stop processing of a push event.
///
/// Every variant is data for the host's redelivery policy: the orchestrator
/// never translates them, it only stops its loop.
#[derive(Debug, Error)]
pub enum TriggerError {
    /// The change-set provider or a filter predicate failed.
    ///
    /// Not retried here; the caller decides whether to redeliver the event.
    #[error("Match evaluation failed: {message}")]
    MatchEvaluation {
        /// Description of what failed.
        message: String,
    },

    /// The store kept returning retryable errors until attempts ran out.
    #[error("Submitting job '{job}' failed after {attempts} attempts: {source}")]
    TransientSubmission {
        /// Job whose request could not be stored.
        job: JobName,
        /// Number of attempts made.
        attempts: u32,
        /// The last store error observed.
        #[source]
        source: StoreError,
    },

    /// The store rejected the request (validation or permission failure).
    #[error("Submitting job '{job}' was rejected: {source}")]
    PermanentSubmission {
        /// Job whose request was rejected.
        job: JobName,
        /// The rejecting store error.
        #[source]
        source: StoreError,
    },

    /// The caller's context was cancelled or its deadline elapsed.
    #[error("Cancelled while {operation}")]
    Cancelled {
        /// What was in progress, e.g. `"submitting job 'build'"`.
        operation: String,
    },

    /// Configuration could not be parsed or failed validation.
    ///
    /// Produced at load time; a trigger never starts with an invalid config.
    #[error("Configuration error: {message}")]
    ConfigurationError {
        /// Description of the configuration problem.
        message: String,
    },
}

impl TriggerError {
    /// Returns `true` for [`TriggerError::Cancelled`].
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }
}
