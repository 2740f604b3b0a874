//! Job catalog backed by the trigger configuration.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::TriggerConfig;
use crate::definition::JobDefinition;
use crate::store::{BaseShaProvider, JobCatalog};
use crate::RepositoryId;

/// Serves the definitions listed under `[postsubmits]`.
///
/// Definitions do not depend on the pushed commit, so the base SHA provider is
/// never called.
#[derive(Debug, Default, Clone)]
pub struct StaticJobCatalog {
    postsubmits: HashMap<RepositoryId, Vec<Arc<JobDefinition>>>,
}

impl StaticJobCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding every `[postsubmits]` entry of `config`, in order.
    pub fn from_config(config: &TriggerConfig) -> Self {
        let mut catalog = Self::new();
        for (repo, definitions) in &config.postsubmits {
            if let Some(repo) = RepositoryId::new(repo.as_str()) {
                for definition in definitions {
                    catalog.insert(&repo, definition.clone());
                }
            }
        }
        catalog
    }

    /// Appends `definition` to `repo`'s catalog.
    pub fn insert(&mut self, repo: &RepositoryId, definition: JobDefinition) {
        self.postsubmits
            .entry(repo.clone())
            .or_default()
            .push(Arc::new(definition));
    }

    /// Builder form of [`StaticJobCatalog::insert`].
    pub fn with(mut self, repo: &RepositoryId, definition: JobDefinition) -> Self {
        self.insert(repo, definition);
        self
    }
}

#[async_trait]
impl JobCatalog for StaticJobCatalog {
    async fn postsubmits(
        &self,
        repo: &RepositoryId,
        _base_sha: BaseShaProvider<'_>,
    ) -> Vec<Arc<JobDefinition>> {
        self.postsubmits.get(repo).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JobName;

    #[tokio::test]
    async fn test_returns_definitions_in_order() {
        let repo = RepositoryId::from_parts("acme", "widgets");
        let catalog = StaticJobCatalog::new()
            .with(&repo, JobDefinition::new(JobName::new("build").unwrap()))
            .with(&repo, JobDefinition::new(JobName::new("lint").unwrap()));

        let sha = || "abc".to_string();
        let names: Vec<_> = catalog
            .postsubmits(&repo, &sha)
            .await
            .iter()
            .map(|d| d.name().to_string())
            .collect();
        assert_eq!(names, ["build", "lint"]);

        let other = RepositoryId::from_parts("acme", "gadgets");
        assert!(catalog.postsubmits(&other, &sha).await.is_empty());
    }

    #[tokio::test]
    async fn test_from_config() {
        let config: TriggerConfig = toml::from_str(
            r#"
[[postsubmits."acme/widgets"]]
name = "build"
"#,
        )
        .unwrap();
        let catalog = StaticJobCatalog::from_config(&config);
        let sha = || "abc".to_string();

        let defs = catalog
            .postsubmits(&RepositoryId::from_parts("acme", "widgets"), &sha)
            .await;
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name().as_str(), "build");
    }
}
