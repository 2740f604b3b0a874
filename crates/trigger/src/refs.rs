//! Source references embedded in every job request spawned by a push.

use serde::{Deserialize, Serialize};

use crate::event::PushEvent;

/// What a postsubmit job checks out: the pushed branch at its new head.
///
/// Built once per event; every job request for that event carries a copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refs {
    /// Owner name, or login when the payload carries no name.
    pub org: String,
    /// Repository name without the owner.
    pub repo: String,
    /// Browser URL of the repository.
    pub repo_link: String,
    /// Short branch name, e.g. `main`.
    pub base_ref: String,
    /// Head commit after the push.
    pub base_sha: String,
    /// Compare URL covering the pushed commits.
    pub base_link: String,
}

impl Refs {
    /// Refs for the branch `event` pushed to, at its new head.
    pub fn from_push(event: &PushEvent) -> Self {
        Self {
            org: event.refs_org().to_string(),
            repo: event.repository.name.clone(),
            repo_link: event.repository.html_url.clone(),
            base_ref: event.branch().to_string(),
            base_sha: event.after.clone(),
            base_link: event.compare.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::PushRepository;

    #[test]
    fn test_refs_from_push() {
        let event = PushEvent {
            repository: PushRepository {
                owner_login: "acme".to_string(),
                owner_name: Some("acme".to_string()),
                name: "widgets".to_string(),
                html_url: "https://github.com/acme/widgets".to_string(),
            },
            git_ref: "refs/heads/release-1.2".to_string(),
            before: "1111111111111111111111111111111111111111".to_string(),
            after: "2222222222222222222222222222222222222222".to_string(),
            deleted: false,
            commits: vec![],
            compare: "https://github.com/acme/widgets/compare/111...222".to_string(),
            guid: "guid".to_string(),
        };

        let refs = Refs::from_push(&event);
        assert_eq!(
            refs,
            Refs {
                org: "acme".to_string(),
                repo: "widgets".to_string(),
                repo_link: "https://github.com/acme/widgets".to_string(),
                base_ref: "release-1.2".to_string(),
                base_sha: "2222222222222222222222222222222222222222".to_string(),
                base_link: "https://github.com/acme/widgets/compare/111...222".to_string(),
            }
        );
    }
}
