//! Turns one push event into submitted job requests.
//!
//! Definitions are evaluated and submitted one at a time in catalog order.
//! The first match or submission error stops the loop and is returned as-is;
//! requests stored before it stay stored, since each is a valid job on its
//! own and there is nothing to compensate.

use std::sync::Arc;

use tracing::{debug, info};

use crate::changes::ChangedFiles;
use crate::config::TriggerConfig;
use crate::context::Context;
use crate::event::PushEvent;
use crate::job::JobRequest;
use crate::matcher::should_run;
use crate::refs::Refs;
use crate::store::{JobCatalog, JobStore};
use crate::submit::{submit, SubmitPolicy};
use crate::{JobId, TriggerError};

/// The collaborators a [`PushTrigger`] works through.
#[derive(Clone)]
pub struct TriggerClients {
    /// Source of the repository's postsubmit definitions.
    pub catalog: Arc<dyn JobCatalog>,
    /// Destination for the job requests.
    pub store: Arc<dyn JobStore>,
}

/// How a push event was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// The push deleted a branch; nothing was evaluated.
    BranchDeleted,
    /// Every definition was evaluated. `submitted` lists the requests stored
    /// for this event, in catalog order.
    Completed { submitted: Vec<JobId> },
}

/// Handles push events for every repository in the catalog.
pub struct PushTrigger {
    clients: TriggerClients,
    require_scheduling: bool,
    policy: SubmitPolicy,
}

impl PushTrigger {
    /// Takes the scheduling flag and the retry policy from `config`.
    pub fn new(clients: TriggerClients, config: &TriggerConfig) -> Self {
        Self {
            clients,
            require_scheduling: config.scheduler.enabled,
            policy: config.submit.policy(),
        }
    }

    /// Creates one job request per definition matching `event`.
    ///
    /// Branch deletions are skipped before the catalog is consulted. The
    /// first error ends the call; requests submitted before it are kept.
    /// `ctx` bounds catalog resolution and every submission.
    pub async fn handle(
        &self,
        ctx: &Context,
        event: &PushEvent,
    ) -> Result<TriggerOutcome, TriggerError> {
        if event.is_branch_deletion() {
            debug!(event_guid = %event.guid, git_ref = %event.git_ref, "Ignoring branch deletion");
            return Ok(TriggerOutcome::BranchDeleted);
        }

        let repo = event.repository_id();
        let base_sha = || event.after.clone();
        let definitions = tokio::select! {
            biased;
            _ = ctx.done() => {
                return Err(TriggerError::Cancelled {
                    operation: format!("resolving postsubmits for {repo}"),
                });
            }
            definitions = self.clients.catalog.postsubmits(&repo, &base_sha) => definitions,
        };

        let branch = event.branch();
        let changes = ChangedFiles::from_push(event);
        let refs = Refs::from_push(event);
        let mut submitted = Vec::new();

        for definition in &definitions {
            if !should_run(definition, branch, &changes)? {
                continue;
            }

            let request =
                JobRequest::postsubmit(definition, &refs, &event.guid, self.require_scheduling);
            submit(ctx, self.clients.store.as_ref(), &request, &self.policy).await?;

            info!(
                job_id = %request.id,
                job = %request.job,
                kind = %request.kind,
                org = %request.refs.org,
                repo = %request.refs.repo,
                base_ref = %request.refs.base_ref,
                base_sha = %request.refs.base_sha,
                event_guid = %event.guid,
                "Created postsubmit job"
            );
            submitted.push(request.id);
        }

        Ok(TriggerOutcome::Completed { submitted })
    }
}
