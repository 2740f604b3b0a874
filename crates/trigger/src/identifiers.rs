//! Newtype domain identifiers.
//!
//! A job name, a repository key and a job identity are all strings or UUIDs
//! under the hood; wrapping them keeps one from being passed where another is
//! expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id! {
    /// Names a post-push job definition (e.g. `"build-main"`).
    ///
    /// Unique within one repository's catalog.
    JobName
}

string_id! {
    /// Identifies a repository in `"org/repo"` format.
    ///
    /// This is the key under which job definitions are catalogued.
    RepositoryId
}

impl RepositoryId {
    /// Joins an organisation and repository name.
    pub fn from_parts(org: &str, repo: &str) -> Self {
        Self(format!("{org}/{repo}"))
    }

    /// The organisation half, or the whole key if it has no `/`.
    pub fn org(&self) -> &str {
        self.0.split_once('/').map_or(self.0.as_str(), |(org, _)| org)
    }

    /// The repository half, or the empty string if the key has no `/`.
    pub fn repo(&self) -> &str {
        self.0.split_once('/').map_or("", |(_, repo)| repo)
    }
}

// ---------------------------------------------------------------------------
// Job identity
// ---------------------------------------------------------------------------

/// Namespace for v5 job identities. Changing it changes every derived id.
const JOB_ID_NAMESPACE: Uuid = Uuid::from_u128(0x5f0c_7a3e_91d2_4b8a_a6e4_2c1d_9b7f_0e31);

/// Identity of one job request.
///
/// Derived, not random: the same job triggered by the same event at the same
/// commit always gets the same id, which is what makes a retried or
/// redelivered submission collapse onto the record already in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(Uuid);

impl JobId {
    /// Derives the identity of `job` triggered for `repo` at `base_sha` by the
    /// event with correlation id `event_guid`.
    pub fn derive(job: &JobName, repo: &RepositoryId, base_sha: &str, event_guid: &str) -> Self {
        let key = format!("{job}\n{repo}\n{base_sha}\n{event_guid}");
        Self(Uuid::new_v5(&JOB_ID_NAMESPACE, key.as_bytes()))
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
