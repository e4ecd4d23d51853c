//! Projects API client.

use crate::CoreError;

use super::client::AtelierClient;
use super::map_target_error;
use super::types::{ProjectListItem, ProjectMetadata};

/// Projects API client.
pub struct ProjectsClient<'a> {
    client: &'a AtelierClient,
}

impl<'a> ProjectsClient<'a> {
    pub(crate) fn new(client: &'a AtelierClient) -> Self {
        Self { client }
    }

    /// List all projects visible to this API key.
    pub async fn list(&self) -> Result<Vec<ProjectListItem>, CoreError> {
        self.client
            .http
            .get("/api/projects", None)
            .await
            .map_err(CoreError::from)
    }

    /// List project keys only.
    pub async fn keys(&self) -> Result<Vec<String>, CoreError> {
        Ok(self.list().await?.into_iter().map(|p| p.project_key).collect())
    }

    /// Get one project's metadata.
    pub async fn metadata(&self, project_key: &str) -> Result<ProjectMetadata, CoreError> {
        let path = format!("/api/projects/{}", project_key);
        self.client
            .http
            .get(&path, None)
            .await
            .map_err(|e| map_target_error(e, "project", project_key))
    }
}
