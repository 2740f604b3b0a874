//! Post-push job definitions and their branch and path filters.
//!
//! Definitions are static configuration. They are shared behind `Arc` by every
//! event that consults the catalog, so nothing here hands out mutable access.

use std::collections::BTreeMap;

use glob::Pattern;
use regex::Regex;
use serde::Deserialize;

use crate::changes::ChangeSet;
use crate::{JobName, TriggerError};

// ---------------------------------------------------------------------------
// Branch filter
// ---------------------------------------------------------------------------

/// Which branches a definition runs against.
///
/// Both lists hold regular expressions matched against the whole branch name.
/// `skip_branches` wins over `branches`; an empty `branches` list admits every
/// branch.
#[derive(Debug, Clone, Default)]
pub struct BranchFilter {
    run_re: Option<Regex>,
    skip_re: Option<Regex>,
}

impl BranchFilter {
    /// Compiles both pattern lists. An invalid pattern is a
    /// [`TriggerError::ConfigurationError`].
    pub fn new(branches: &[String], skip_branches: &[String]) -> Result<Self, TriggerError> {
        Ok(Self {
            run_re: compile_anchored(branches)?,
            skip_re: compile_anchored(skip_branches)?,
        })
    }

    /// Filter admitting every branch.
    pub fn any() -> Self {
        Self::default()
    }

    /// Whether `branch` (a short name such as `main`) is admitted.
    pub fn matches(&self, branch: &str) -> bool {
        if self.skip_re.as_ref().is_some_and(|re| re.is_match(branch)) {
            return false;
        }
        self.run_re.as_ref().is_none_or(|re| re.is_match(branch))
    }
}

fn compile_anchored(patterns: &[String]) -> Result<Option<Regex>, TriggerError> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let alternation = patterns
        .iter()
        .map(|p| format!("(?:{p})"))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!("^(?:{alternation})$"))
        .map(Some)
        .map_err(|e| TriggerError::config(format!("invalid branch pattern: {e}")))
}

// ---------------------------------------------------------------------------
// Path filter
// ---------------------------------------------------------------------------

/// Which changed paths make a definition run.
///
/// A path is relevant when it matches an include glob (or there are none) and
/// matches no exclude glob. The filter passes when at least one changed path
/// is relevant.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl PathFilter {
    /// Compiles both glob lists. An invalid glob is a
    /// [`TriggerError::ConfigurationError`].
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self, TriggerError> {
        Ok(Self {
            include: compile_globs(include)?,
            exclude: compile_globs(exclude)?,
        })
    }

    /// `true` when neither include nor exclude patterns are declared.
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Whether a single changed path counts towards running the job.
    pub fn is_relevant(&self, path: &str) -> bool {
        let included = self.include.is_empty() || self.include.iter().any(|p| p.matches(path));
        included && !self.exclude.iter().any(|p| p.matches(path))
    }

    /// Whether any path in `changes` is relevant. Always `false` for an empty
    /// change set.
    pub fn matches(&self, changes: &ChangeSet) -> bool {
        changes.iter().any(|path| self.is_relevant(path))
    }
}

fn compile_globs(patterns: &[String]) -> Result<Vec<Pattern>, TriggerError> {
    patterns
        .iter()
        .map(|p| {
            Pattern::new(p)
                .map_err(|e| TriggerError::config(format!("invalid path pattern '{p}': {e}")))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Job definition
// ---------------------------------------------------------------------------

/// A configured job that may run after a push.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "JobDefinitionConfig")]
pub struct JobDefinition {
    name: JobName,
    branches: BranchFilter,
    paths: PathFilter,
    labels: BTreeMap<String, String>,
    annotations: BTreeMap<String, String>,
    skip_report: bool,
}

impl JobDefinition {
    /// A definition that runs on every branch regardless of changed paths.
    pub fn new(name: JobName) -> Self {
        Self {
            name,
            branches: BranchFilter::any(),
            paths: PathFilter::default(),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
            skip_report: false,
        }
    }

    /// Restricts the branches the definition runs on.
    pub fn with_branches(mut self, branches: BranchFilter) -> Self {
        self.branches = branches;
        self
    }

    /// Requires a relevant changed path for the definition to run.
    pub fn with_paths(mut self, paths: PathFilter) -> Self {
        self.paths = paths;
        self
    }

    /// Adds a label copied onto every request built from this definition.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Adds an annotation copied onto every request built from this definition.
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// See [`JobDefinition::skip_report`].
    pub fn with_skip_report(mut self, skip_report: bool) -> Self {
        self.skip_report = skip_report;
        self
    }

    /// Name of the job, unique within its repository.
    pub fn name(&self) -> &JobName {
        &self.name
    }

    /// Branch filter; admits every branch unless configured.
    pub fn branches(&self) -> &BranchFilter {
        &self.branches
    }

    /// Path filter; empty unless configured.
    pub fn paths(&self) -> &PathFilter {
        &self.paths
    }

    /// Static labels, before the event correlation label is added.
    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    /// Static annotations.
    pub fn annotations(&self) -> &BTreeMap<String, String> {
        &self.annotations
    }

    /// When set, the job's result is not reported back to the repository.
    pub fn skip_report(&self) -> bool {
        self.skip_report
    }
}

/// Serialized form of a [`JobDefinition`], as written in the trigger config.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobDefinitionConfig {
    pub name: String,
    #[serde(default)]
    pub branches: Vec<String>,
    #[serde(default)]
    pub skip_branches: Vec<String>,
    #[serde(default)]
    pub include_paths: Vec<String>,
    #[serde(default)]
    pub exclude_paths: Vec<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub skip_report: bool,
}

impl TryFrom<JobDefinitionConfig> for JobDefinition {
    type Error = TriggerError;

    fn try_from(config: JobDefinitionConfig) -> Result<Self, Self::Error> {
        let name = JobName::new(config.name)
            .ok_or_else(|| TriggerError::config("job definition without a name"))?;
        let branches = BranchFilter::new(&config.branches, &config.skip_branches)?;
        let paths = PathFilter::new(&config.include_paths, &config.exclude_paths)?;
        Ok(Self {
            name,
            branches,
            paths,
            labels: config.labels,
            annotations: config.annotations,
            skip_report: config.skip_report,
        })
    }
}
