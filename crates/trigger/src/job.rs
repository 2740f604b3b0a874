//! Concrete job requests built from matched definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::definition::JobDefinition;
use crate::refs::Refs;
use crate::{JobId, JobName, RepositoryId};

/// Label carrying the correlation id of the triggering event.
pub const EVENT_GUID_LABEL: &str = "event-GUID";

/// Kind of job a request was created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Runs against a branch after commits land on it.
    Postsubmit,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Postsubmit => f.write_str("postsubmit"),
        }
    }
}

/// One instruction to run one job definition for one event.
///
/// Built fresh per match and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    /// Derived identity; the store's idempotency key.
    pub id: JobId,
    /// Definition this request was built from.
    pub job: JobName,
    pub kind: JobKind,
    /// What the job checks out.
    pub refs: Refs,
    /// Definition labels plus [`EVENT_GUID_LABEL`].
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    /// Do not report the result back to the repository.
    pub skip_report: bool,
    /// Whether the request must pass through the scheduler before running.
    pub require_scheduling: bool,
}

impl JobRequest {
    /// Builds the postsubmit request for `definition`.
    ///
    /// Labels are a copy of the definition's labels with [`EVENT_GUID_LABEL`]
    /// set to `event_guid`, overwriting any static value. Annotations are
    /// copied as-is. `require_scheduling` comes from the global scheduler
    /// setting, never from the definition.
    pub fn postsubmit(
        definition: &JobDefinition,
        refs: &Refs,
        event_guid: &str,
        require_scheduling: bool,
    ) -> Self {
        let mut labels = definition.labels().clone();
        labels.insert(EVENT_GUID_LABEL.to_string(), event_guid.to_string());

        let repo = RepositoryId::from_parts(&refs.org, &refs.repo);
        Self {
            id: JobId::derive(definition.name(), &repo, &refs.base_sha, event_guid),
            job: definition.name().clone(),
            kind: JobKind::Postsubmit,
            refs: refs.clone(),
            labels,
            annotations: definition.annotations().clone(),
            skip_report: definition.skip_report(),
            require_scheduling,
        }
    }

    /// The correlation id this request was labelled with.
    pub fn event_guid(&self) -> &str {
        self.labels
            .get(EVENT_GUID_LABEL)
            .map(String::as_str)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs() -> Refs {
        Refs {
            org: "acme".to_string(),
            repo: "widgets".to_string(),
            repo_link: "https://github.com/acme/widgets".to_string(),
            base_ref: "main".to_string(),
            base_sha: "2222222222222222222222222222222222222222".to_string(),
            base_link: String::new(),
        }
    }

    fn definition() -> JobDefinition {
        JobDefinition::new(JobName::new("build").unwrap())
            .with_label("team", "core")
            .with_label(EVENT_GUID_LABEL, "spoofed")
            .with_annotation("owner", "build-cop")
            .with_skip_report(true)
    }

    #[test]
    fn test_correlation_label_overrides_static_value() {
        let def = definition();
        let request = JobRequest::postsubmit(&def, &refs(), "guid-42", false);

        assert_eq!(request.labels[EVENT_GUID_LABEL], "guid-42");
        assert_eq!(request.labels["team"], "core");
        assert_eq!(request.event_guid(), "guid-42");
        // The shared definition keeps its own labels.
        assert_eq!(def.labels()[EVENT_GUID_LABEL], "spoofed");
    }

    #[test]
    fn test_annotations_and_flags_are_copied() {
        let request = JobRequest::postsubmit(&definition(), &refs(), "guid", true);

        assert_eq!(request.annotations["owner"], "build-cop");
        assert!(request.skip_report);
        assert!(request.require_scheduling);
        assert_eq!(request.kind, JobKind::Postsubmit);
        assert_eq!(request.refs, refs());

        let unscheduled = JobRequest::postsubmit(&definition(), &refs(), "guid", false);
        assert!(!unscheduled.require_scheduling);
    }

    #[test]
    fn test_serialised_shape() {
        let request = JobRequest::postsubmit(&definition(), &refs(), "guid", false);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["kind"], "postsubmit");
        assert_eq!(value["job"], "build");
        assert_eq!(value["refs"]["base_ref"], "main");
        assert_eq!(value["labels"][EVENT_GUID_LABEL], "guid");
        assert_eq!(value["id"], request.id.to_string());
    }

    #[test]
    fn test_request_is_deterministic() {
        let a = JobRequest::postsubmit(&definition(), &refs(), "guid", false);
        let b = JobRequest::postsubmit(&definition(), &refs(), "guid", false);
        assert_eq!(a, b);
        assert_ne!(
            a.id,
            JobRequest::postsubmit(&definition(), &refs(), "other", false).id
        );
    }
}
