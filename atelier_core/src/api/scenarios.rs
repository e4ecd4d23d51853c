//! Scenarios API client.

use serde_json::{json, Value};

use crate::CoreError;

use super::client::AtelierClient;
use super::map_target_error;
use super::types::{ScenarioListItem, ScenarioRunInfo, ScenarioRunStartedResponse};

/// Scenarios API client, scoped to one project.
pub struct ScenariosClient<'a> {
    client: &'a AtelierClient,
    project_key: &'a str,
}

impl<'a> ScenariosClient<'a> {
    pub(crate) fn new(client: &'a AtelierClient, project_key: &'a str) -> Self {
        Self {
            client,
            project_key,
        }
    }

    fn path(&self, rest: &str) -> String {
        format!("/api/projects/{}/scenarios{}", self.project_key, rest)
    }

    /// List the project's scenarios.
    pub async fn list(&self) -> Result<Vec<ScenarioListItem>, CoreError> {
        self.client
            .http
            .get(&self.path(""), None)
            .await
            .map_err(|e| map_target_error(e, "project", self.project_key))
    }

    /// Trigger a scenario run. Returns the run id.
    pub async fn run(&self, scenario_id: &str) -> Result<String, CoreError> {
        let response: ScenarioRunStartedResponse = self
            .client
            .http
            .post_json(&self.path(&format!("/{}/run", scenario_id)), &json!({}))
            .await
            .map_err(|e| map_target_error(e, "scenario", scenario_id))?;
        Ok(response.run_id)
    }

    /// Read the status of one scenario run.
    ///
    /// `outcome` stays absent until the run finishes.
    pub async fn run_status(
        &self,
        scenario_id: &str,
        run_id: &str,
    ) -> Result<ScenarioRunInfo, CoreError> {
        self.client
            .http
            .get(
                &self.path(&format!("/{}/runs/{}", scenario_id, run_id)),
                None,
            )
            .await
            .map_err(|e| map_target_error(e, "scenario run", run_id))
    }

    /// Raw settings payload of a scenario, passed through untouched.
    pub async fn settings(&self, scenario_id: &str) -> Result<Value, CoreError> {
        self.client
            .http
            .get(&self.path(&format!("/{}", scenario_id)), None)
            .await
            .map_err(|e| map_target_error(e, "scenario", scenario_id))
    }
}
