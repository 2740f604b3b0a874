//! Change-set extraction and the memoised change-set provider.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use crate::event::{PushCommit, PushEvent};
use crate::TriggerError;

/// The distinct file paths touched by a push.
///
/// Backed by a `BTreeSet` so iteration order is stable in logs; callers only
/// rely on membership.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet(BTreeSet<String>);

impl ChangeSet {
    /// Unions the added, removed and modified paths of every commit.
    pub fn from_commits(commits: &[PushCommit]) -> Self {
        let paths = commits
            .iter()
            .flat_map(|c| c.added.iter().chain(&c.removed).chain(&c.modified))
            .cloned()
            .collect();
        Self(paths)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains(path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

type Loader<'a> = Box<dyn Fn() -> Result<ChangeSet, TriggerError> + Send + Sync + 'a>;

/// Lazily computes a [`ChangeSet`] on first use and reuses it afterwards.
///
/// One provider is created per event and shared by every job definition
/// evaluated for it. A failed load is not cached; its error is returned as-is.
pub struct ChangedFiles<'a> {
    load: Loader<'a>,
    cached: OnceLock<ChangeSet>,
}

impl<'a> ChangedFiles<'a> {
    /// Wraps an arbitrary loader, e.g. one that has to ask a remote API.
    pub fn new(load: impl Fn() -> Result<ChangeSet, TriggerError> + Send + Sync + 'a) -> Self {
        Self {
            load: Box::new(load),
            cached: OnceLock::new(),
        }
    }

    /// Provider for a push event: the union of its commits' paths.
    pub fn from_push(event: &'a PushEvent) -> Self {
        Self::new(move || Ok(ChangeSet::from_commits(&event.commits)))
    }

    /// Returns the change set, computing it on the first call.
    pub fn get(&self) -> Result<&ChangeSet, TriggerError> {
        if let Some(changes) = self.cached.get() {
            return Ok(changes);
        }
        let changes = (self.load)()?;
        Ok(self.cached.get_or_init(|| changes))
    }
}

impl std::fmt::Debug for ChangedFiles<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangedFiles")
            .field("cached", &self.cached.get())
            .finish_non_exhaustive()
    }
}
