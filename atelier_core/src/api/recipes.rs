//! Recipes API client.
//!
//! Besides listing and running, this covers the schema-change pair:
//! `compute_schema_changes` reports the column delta a recipe's output
//! would undergo, and `apply_schema_changes` writes it to the output
//! dataset. Both are synchronous platform calls with no job id.

use serde_json::{json, Value};

use crate::CoreError;

use super::client::AtelierClient;
use super::map_target_error;
use super::types::{JobStartedResponse, RecipeListItem, SchemaDelta};

/// Recipes API client, scoped to one project.
pub struct RecipesClient<'a> {
    client: &'a AtelierClient,
    project_key: &'a str,
}

impl<'a> RecipesClient<'a> {
    pub(crate) fn new(client: &'a AtelierClient, project_key: &'a str) -> Self {
        Self {
            client,
            project_key,
        }
    }

    fn path(&self, rest: &str) -> String {
        format!("/api/projects/{}/recipes{}", self.project_key, rest)
    }

    /// List the project's recipes.
    pub async fn list(&self) -> Result<Vec<RecipeListItem>, CoreError> {
        self.client
            .http
            .get(&self.path(""), None)
            .await
            .map_err(|e| map_target_error(e, "project", self.project_key))
    }

    /// Start an asynchronous run of a recipe. Returns the remote job id.
    pub async fn run(&self, name: &str) -> Result<String, CoreError> {
        let response: JobStartedResponse = self
            .client
            .http
            .post_json(&self.path(&format!("/{}/run", name)), &json!({}))
            .await
            .map_err(|e| map_target_error(e, "recipe", name))?;
        Ok(response.job_id)
    }

    /// Compute the pending output-schema delta of a recipe.
    pub async fn compute_schema_changes(&self, name: &str) -> Result<SchemaDelta, CoreError> {
        self.client
            .http
            .get(&self.path(&format!("/{}/schema-changes", name)), None)
            .await
            .map_err(|e| map_target_error(e, "recipe", name))
    }

    /// Apply the pending output-schema delta of a recipe.
    pub async fn apply_schema_changes(&self, name: &str) -> Result<(), CoreError> {
        let _: Value = self
            .client
            .http
            .post_json(&self.path(&format!("/{}/schema-changes/apply", name)), &json!({}))
            .await
            .map_err(|e| map_target_error(e, "recipe", name))?;
        Ok(())
    }
}
