//! Jobs API client.
//!
//! Builds and recipe runs surface as jobs on the platform; this client
//! reads their status and logs. It never waits; see [`crate::ops`] for
//! the poll-until-terminal layer.

use serde_json::{json, Value};

use crate::CoreError;

use super::client::AtelierClient;
use super::map_target_error;
use super::types::JobStatusPayload;

/// Jobs API client, scoped to one project.
pub struct JobsClient<'a> {
    client: &'a AtelierClient,
    project_key: &'a str,
}

impl<'a> JobsClient<'a> {
    pub(crate) fn new(client: &'a AtelierClient, project_key: &'a str) -> Self {
        Self {
            client,
            project_key,
        }
    }

    fn path(&self, job_id: &str, rest: &str) -> String {
        format!(
            "/api/projects/{}/jobs/{}{}",
            self.project_key, job_id, rest
        )
    }

    /// Get the current status of a job.
    pub async fn status(&self, job_id: &str) -> Result<JobStatusPayload, CoreError> {
        self.client
            .http
            .get(&self.path(job_id, ""), None)
            .await
            .map_err(|e| map_target_error(e, "job", job_id))
    }

    /// Fetch the full log output of a job.
    pub async fn log(&self, job_id: &str) -> Result<String, CoreError> {
        let bytes = self
            .client
            .http
            .get_bytes(&self.path(job_id, "/log"), None)
            .await
            .map_err(|e| map_target_error(e, "job", job_id))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Ask the platform to abort a running job.
    ///
    /// The abort itself is asynchronous on the platform side; a
    /// subsequent status read reports `ABORTED` once it lands.
    pub async fn abort(&self, job_id: &str) -> Result<(), CoreError> {
        let _: Value = self
            .client
            .http
            .post_json(&self.path(job_id, "/abort"), &json!({}))
            .await
            .map_err(|e| map_target_error(e, "job", job_id))?;
        Ok(())
    }
}
