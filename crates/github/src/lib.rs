//! GitHub push webhook payload adapter.
//!
//! Decodes the JSON body of a `push` webhook delivery into the
//! [`trigger::PushEvent`] the trigger works on.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Only the payload shape lives here. Receiving the HTTP
//! request and verifying its signature are the host's job; the host passes the
//! verified body and the `X-GitHub-Delivery` id in.

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use trigger::{PushCommit, PushEvent, PushRepository};

/// Errors produced while decoding a webhook body.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// The body is not a valid push payload.
    #[error("Malformed push payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The delivery carried no correlation id.
    #[error("Push delivery is missing its delivery id")]
    MissingDeliveryId,
}

/// Owner of the pushed repository.
#[derive(Debug, Clone, Deserialize)]
pub struct Owner {
    pub login: String,
    /// Display name; absent on some payload variants.
    #[serde(default)]
    pub name: Option<String>,
}

/// Repository section of a push payload.
#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub name: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub html_url: String,
    pub owner: Owner,
}

/// One entry of the `commits` array.
///
/// GitHub omits the path arrays on some commits (e.g. very large pushes);
/// missing arrays read as empty.
#[derive(Debug, Clone, Deserialize)]
pub struct Commit {
    pub id: String,
    #[serde(default)]
    pub added: Vec<String>,
    #[serde(default)]
    pub removed: Vec<String>,
    #[serde(default)]
    pub modified: Vec<String>,
}

/// Body of a `push` webhook delivery, reduced to the fields the trigger reads.
#[derive(Debug, Clone, Deserialize)]
pub struct PushPayload {
    /// Full ref pushed to, e.g. `refs/heads/main`.
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub before: String,
    pub after: String,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub compare: String,
    #[serde(default)]
    pub commits: Vec<Commit>,
    pub repository: Repository,
}

impl PushPayload {
    /// Converts the payload into a [`PushEvent`] correlated by `guid`.
    pub fn into_event(self, guid: impl Into<String>) -> PushEvent {
        PushEvent {
            repository: PushRepository {
                owner_login: self.repository.owner.login,
                owner_name: self.repository.owner.name,
                name: self.repository.name,
                html_url: self.repository.html_url,
            },
            git_ref: self.git_ref,
            before: self.before,
            after: self.after,
            deleted: self.deleted,
            commits: self
                .commits
                .into_iter()
                .map(|c| PushCommit {
                    id: c.id,
                    added: c.added,
                    removed: c.removed,
                    modified: c.modified,
                })
                .collect(),
            compare: self.compare,
            guid: guid.into(),
        }
    }
}

/// Decodes a verified push body delivered with `delivery_id`.
pub fn parse_push_event(body: &[u8], delivery_id: &str) -> Result<PushEvent, PayloadError> {
    if delivery_id.trim().is_empty() {
        return Err(PayloadError::MissingDeliveryId);
    }
    let payload: PushPayload = serde_json::from_slice(body)?;
    debug!(
        delivery_id,
        repository = payload.repository.full_name.as_deref().unwrap_or(&payload.repository.name),
        git_ref = %payload.git_ref,
        commits = payload.commits.len(),
        "Decoded push payload"
    );
    Ok(payload.into_event(delivery_id))
}
