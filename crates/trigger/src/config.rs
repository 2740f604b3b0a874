//! Trigger configuration.
//!
//! Deserialised from TOML by the composition root; validated once at load time
//! so the trigger never starts with an invalid config.

use std::collections::{BTreeMap, HashSet};

use serde::Deserialize;

use crate::definition::JobDefinition;
use crate::submit::SubmitConfig;
use crate::{RepositoryId, TriggerError};

/// `[scheduler]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerConfig {
    /// When set, every job request is marked as requiring scheduling.
    pub enabled: bool,
}

/// Complete trigger configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TriggerConfig {
    /// Scheduling flag copied onto every request.
    pub scheduler: SchedulerConfig,
    /// Retry and deadline settings for submission.
    pub submit: SubmitConfig,
    /// Post-push job definitions keyed by `"org/repo"`, in catalog order.
    pub postsubmits: BTreeMap<String, Vec<JobDefinition>>,
}

impl TriggerConfig {
    /// Checks what deserialisation cannot: at least one submit attempt,
    /// well-formed `org/repo` keys and unique job names per repository.
    pub fn validate(&self) -> Result<(), TriggerError> {
        if self.submit.max_attempts == 0 {
            return Err(TriggerError::config("submit.max_attempts must be at least 1"));
        }

        for (repo, definitions) in &self.postsubmits {
            let well_formed = RepositoryId::new(repo.as_str()).is_some_and(|id| {
                !id.org().is_empty() && !id.repo().is_empty() && !id.repo().contains('/')
            });
            if !well_formed {
                return Err(TriggerError::config(format!(
                    "postsubmits key '{repo}' is not of the form org/repo"
                )));
            }

            let mut seen = HashSet::new();
            for definition in definitions {
                if !seen.insert(definition.name().as_str()) {
                    return Err(TriggerError::config(format!(
                        "duplicate postsubmit '{}' for {repo}",
                        definition.name()
                    )));
                }
            }
        }
        Ok(())
    }
}
