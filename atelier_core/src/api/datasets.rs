//! Datasets API client.
//!
//! Covers listing, schema and row access, managed-upload creation, and the
//! asynchronous build trigger. `build` only returns once the platform has
//! accepted the request and assigned a job id; polling that job belongs to
//! [`crate::ops`].

use serde_json::json;

use crate::http::MultipartFile;
use crate::CoreError;

use super::client::AtelierClient;
use super::map_target_error;
use super::types::{
    DatasetListItem, DatasetRows, DatasetSchema, JobStartedResponse, RecordCountMetric,
};

/// How much of the upstream flow a build request recomputes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMode {
    /// Rebuild the dataset and any out-of-date upstream dependencies.
    #[default]
    RecursiveBuild,
    /// Rebuild only this dataset, even if it looks up to date.
    NonRecursiveForcedBuild,
    /// Force-rebuild the dataset and its whole upstream flow.
    RecursiveForcedBuild,
}

impl BuildMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildMode::RecursiveBuild => "RECURSIVE_BUILD",
            BuildMode::NonRecursiveForcedBuild => "NON_RECURSIVE_FORCED_BUILD",
            BuildMode::RecursiveForcedBuild => "RECURSIVE_FORCED_BUILD",
        }
    }
}

impl std::fmt::Display for BuildMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Datasets API client, scoped to one project.
pub struct DatasetsClient<'a> {
    client: &'a AtelierClient,
    project_key: &'a str,
}

impl<'a> DatasetsClient<'a> {
    pub(crate) fn new(client: &'a AtelierClient, project_key: &'a str) -> Self {
        Self {
            client,
            project_key,
        }
    }

    fn path(&self, rest: &str) -> String {
        format!("/api/projects/{}/datasets{}", self.project_key, rest)
    }

    /// List the project's datasets.
    pub async fn list(&self) -> Result<Vec<DatasetListItem>, CoreError> {
        self.client
            .http
            .get(&self.path(""), None)
            .await
            .map_err(|e| map_target_error(e, "project", self.project_key))
    }

    /// Get a dataset's schema.
    pub async fn schema(&self, name: &str) -> Result<DatasetSchema, CoreError> {
        self.client
            .http
            .get(&self.path(&format!("/{}/schema", name)), None)
            .await
            .map_err(|e| map_target_error(e, "dataset", name))
    }

    /// Read up to `limit` rows of a dataset.
    pub async fn rows(&self, name: &str, limit: usize) -> Result<DatasetRows, CoreError> {
        let limit_str = limit.to_string();
        let params = [("limit", limit_str.as_str())];
        self.client
            .http
            .get(&self.path(&format!("/{}/rows", name)), Some(&params))
            .await
            .map_err(|e| map_target_error(e, "dataset", name))
    }

    /// Last computed row-count metric, if the platform has one.
    ///
    /// Returns `Ok(None)` when no metric has been computed yet.
    pub async fn record_count(&self, name: &str) -> Result<Option<i64>, CoreError> {
        let result: Result<RecordCountMetric, _> = self
            .client
            .http
            .get(&self.path(&format!("/{}/metrics/records", name)), None)
            .await;
        match result {
            Ok(metric) => Ok(metric.count),
            Err(e) if e.status() == Some(404) => Ok(None),
            Err(e) => Err(map_target_error(e, "dataset", name)),
        }
    }

    /// Start an asynchronous build of a dataset.
    ///
    /// Returns the remote job id. An unknown dataset fails immediately
    /// with `NotFound`; no job is created.
    pub async fn build(&self, name: &str, mode: BuildMode) -> Result<String, CoreError> {
        let body = json!({ "mode": mode.as_str() });
        let response: JobStartedResponse = self
            .client
            .http
            .post_json(&self.path(&format!("/{}/build", name)), &body)
            .await
            .map_err(|e| map_target_error(e, "dataset", name))?;
        Ok(response.job_id)
    }

    /// Create a managed uploaded-files dataset.
    pub async fn create_upload(&self, name: &str, connection: &str) -> Result<(), CoreError> {
        if name.trim().is_empty() {
            return Err(CoreError::validation("dataset name must not be empty"));
        }
        let body = json!({
            "name": name,
            "type": "UploadedFiles",
            "connection": connection,
        });
        let _: serde_json::Value = self
            .client
            .http
            .post_json(&self.path(""), &body)
            .await
            .map_err(|e| map_target_error(e, "project", self.project_key))?;
        Ok(())
    }

    /// Upload a data file into an uploaded-files dataset.
    pub async fn upload_file(
        &self,
        name: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<(), CoreError> {
        let file = MultipartFile::new("file", filename, bytes, Some("text/csv".to_string()));
        let _: serde_json::Value = self
            .client
            .http
            .post_multipart(&self.path(&format!("/{}/upload", name)), &[], &[file])
            .await
            .map_err(|e| map_target_error(e, "dataset", name))?;
        Ok(())
    }

    /// Delete a dataset.
    pub async fn delete(&self, name: &str) -> Result<(), CoreError> {
        self.client
            .http
            .delete(&self.path(&format!("/{}", name)))
            .await
            .map_err(|e| map_target_error(e, "dataset", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_build_returns_job_id() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/projects/SALES/datasets/orders/build")
                .json_body(json!({"mode": "RECURSIVE_BUILD"}));
            then.status(200).json_body(json!({"job_id": "job_123"}));
        });

        let client = AtelierClient::new(&server.base_url(), "ak_test").unwrap();
        let job_id = client
            .datasets("SALES")
            .build("orders", BuildMode::default())
            .await
            .unwrap();
        assert_eq!(job_id, "job_123");
        mock.assert_hits(1);
    }

    #[tokio::test]
    async fn test_build_unknown_dataset_fails_without_job() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/api/projects/SALES/datasets/nope/build");
            then.status(404);
        });

        let client = AtelierClient::new(&server.base_url(), "ak_test").unwrap();
        let err = client
            .datasets("SALES")
            .build("nope", BuildMode::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::NotFound { kind: "dataset", .. }
        ));
    }

    #[tokio::test]
    async fn test_record_count_absent_metric_is_none() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/projects/SALES/datasets/orders/metrics/records");
            then.status(404);
        });

        let client = AtelierClient::new(&server.base_url(), "ak_test").unwrap();
        let count = client
            .datasets("SALES")
            .record_count("orders")
            .await
            .unwrap();
        assert_eq!(count, None);
    }

    #[test]
    fn test_build_mode_strings() {
        assert_eq!(BuildMode::default().as_str(), "RECURSIVE_BUILD");
        assert_eq!(
            BuildMode::NonRecursiveForcedBuild.as_str(),
            "NON_RECURSIVE_FORCED_BUILD"
        );
    }
}
