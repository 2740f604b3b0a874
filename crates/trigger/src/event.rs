//! The push event as this crate reads it.
//!
//! Wire decoding lives in the `github` crate; this is the normalised shape
//! handed to [`crate::PushTrigger::handle`].

use serde::{Deserialize, Serialize};

use crate::RepositoryId;

/// The `after` value GitHub sends when a branch is deleted.
pub const ZERO_SHA: &str = "0000000000000000000000000000000000000000";

const BRANCH_PREFIX: &str = "refs/heads/";

/// Repository identity as carried by a push notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushRepository {
    /// Owner login, used for catalog lookup.
    pub owner_login: String,
    /// Owner display name, preferred for [`crate::Refs::org`] when present.
    pub owner_name: Option<String>,
    /// Repository name without the owner.
    pub name: String,
    /// Browser URL of the repository.
    pub html_url: String,
}

/// One commit of a push, reduced to the paths it touched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushCommit {
    /// Commit SHA.
    pub id: String,
    /// Paths created by the commit.
    #[serde(default)]
    pub added: Vec<String>,
    /// Paths deleted by the commit.
    #[serde(default)]
    pub removed: Vec<String>,
    /// Paths changed in place by the commit.
    #[serde(default)]
    pub modified: Vec<String>,
}

/// A notification that commits were pushed to (or a branch removed from) a
/// repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushEvent {
    /// Repository pushed to.
    pub repository: PushRepository,
    /// Full ref, e.g. `refs/heads/main`.
    pub git_ref: String,
    /// Branch head before the push.
    pub before: String,
    /// Branch head after the push; [`ZERO_SHA`] when the branch was deleted.
    pub after: String,
    /// Set by the sender when the push deleted the ref.
    pub deleted: bool,
    /// Commits in push order.
    pub commits: Vec<PushCommit>,
    /// Compare URL for `before...after`.
    pub compare: String,
    /// Correlation id of the delivery that carried this event.
    pub guid: String,
}

impl PushEvent {
    /// The pushed branch name: the ref with `refs/heads/` stripped.
    ///
    /// Refs outside `refs/heads/` (tags) are returned unchanged.
    pub fn branch(&self) -> &str {
        self.git_ref
            .strip_prefix(BRANCH_PREFIX)
            .unwrap_or(&self.git_ref)
    }

    /// `true` when the push removed the branch rather than adding commits.
    pub fn is_branch_deletion(&self) -> bool {
        self.deleted || self.after == ZERO_SHA
    }

    /// Catalog key for this event's repository (`owner_login/name`).
    pub fn repository_id(&self) -> RepositoryId {
        RepositoryId::from_parts(&self.repository.owner_login, &self.repository.name)
    }

    /// Organisation recorded in refs: the owner name, falling back to the
    /// login when the payload carries no name.
    pub fn refs_org(&self) -> &str {
        match self.repository.owner_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.repository.owner_login,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(git_ref: &str, after: &str, deleted: bool) -> PushEvent {
        PushEvent {
            repository: PushRepository {
                owner_login: "acme".to_string(),
                owner_name: None,
                name: "widgets".to_string(),
                html_url: "https://github.com/acme/widgets".to_string(),
            },
            git_ref: git_ref.to_string(),
            before: "1111111111111111111111111111111111111111".to_string(),
            after: after.to_string(),
            deleted,
            commits: vec![],
            compare: String::new(),
            guid: "guid".to_string(),
        }
    }

    #[test]
    fn test_branch_strips_heads_prefix() {
        assert_eq!(event("refs/heads/main", "abc", false).branch(), "main");
        assert_eq!(
            event("refs/heads/feature/x", "abc", false).branch(),
            "feature/x"
        );
        assert_eq!(event("refs/tags/v1", "abc", false).branch(), "refs/tags/v1");
    }

    #[test]
    fn test_deletion_detection() {
        assert!(event("refs/heads/main", "abc", true).is_branch_deletion());
        assert!(event("refs/heads/main", ZERO_SHA, false).is_branch_deletion());
        assert!(!event("refs/heads/main", "abc", false).is_branch_deletion());
    }

    #[test]
    fn test_refs_org_prefers_owner_name() {
        let mut pe = event("refs/heads/main", "abc", false);
        assert_eq!(pe.refs_org(), "acme");

        pe.repository.owner_name = Some(String::new());
        assert_eq!(pe.refs_org(), "acme");

        pe.repository.owner_name = Some("Acme Corp".to_string());
        assert_eq!(pe.refs_org(), "Acme Corp");
        assert_eq!(pe.repository_id().as_str(), "acme/widgets");
    }
}
