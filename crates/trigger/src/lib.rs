//! Push-event trigger domain.
//!
//! Given a push notification, this crate works out which post-push job
//! definitions should fire, builds one job request per match and submits each
//! to a job store with bounded retry, stopping at the first failure.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate performs no I/O. The job
//! catalog and the job store are reached through the traits in [`store`];
//! infrastructure crates supply the implementations.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | `JobName`, `RepositoryId`, `JobId` |
//! | [`event`] | The normalised `PushEvent` |
//! | [`changes`] | `ChangeSet` extraction and the memoised `ChangedFiles` provider |
//! | [`refs`] | `Refs` derived from a push |
//! | [`definition`] | `JobDefinition` with branch and path filters |
//! | [`matcher`] | `should_run` |
//! | [`job`] | `JobRequest` construction |
//! | [`store`] | `JobStore` / `JobCatalog` ports and `StoreError` |
//! | [`context`] | Cancellation and deadline handle |
//! | [`submit`] | Retrying submission |
//! | [`orchestrator`] | `PushTrigger`, the entry point |
//! | [`catalog`] | Config-backed `StaticJobCatalog` |
//! | [`config`] | `TriggerConfig` |
//! | [`errors`] | `TriggerError`, `RetryPolicy` |
//! | [`fakes`] | In-memory `MemoryJobStore` for tests |

pub mod catalog;
pub mod changes;
pub mod config;
pub mod context;
pub mod definition;
pub mod errors;
pub mod event;
pub mod fakes;
pub mod identifiers;
pub mod job;
pub mod matcher;
pub mod orchestrator;
pub mod refs;
pub mod store;
pub mod submit;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use catalog::StaticJobCatalog;
pub use changes::{ChangeSet, ChangedFiles};
pub use config::{SchedulerConfig, TriggerConfig};
pub use context::Context;
pub use definition::{BranchFilter, JobDefinition, JobDefinitionConfig, PathFilter};
pub use errors::{RetryPolicy, TriggerError};
pub use event::{PushCommit, PushEvent, PushRepository, ZERO_SHA};
pub use identifiers::{JobId, JobName, RepositoryId};
pub use job::{JobKind, JobRequest, EVENT_GUID_LABEL};
pub use matcher::should_run;
pub use orchestrator::{PushTrigger, TriggerClients, TriggerOutcome};
pub use refs::Refs;
pub use store::{BaseShaProvider, JobCatalog, JobStore, StoreError};
pub use submit::{submit, SubmitConfig, SubmitPolicy};
