//! Main Atelier API client.
//!
//! The `AtelierClient` is the primary entry point for talking to one
//! platform instance. It provides access to sub-clients for the different
//! control-plane areas.

use crate::config::InstanceDescriptor;
use crate::http::HttpClient;
use crate::CoreError;

use super::datasets::DatasetsClient;
use super::jobs::JobsClient;
use super::projects::ProjectsClient;
use super::recipes::RecipesClient;
use super::scenarios::ScenariosClient;
use super::types::ConnectionListItem;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Authenticated client for one Atelier instance.
///
/// # Example
///
/// ```ignore
/// use atelier_core::api::AtelierClient;
///
/// let client = AtelierClient::new("https://atelier.example.com", "ak_live_...")?;
/// let projects = client.projects().list().await?;
/// let job_id = client.datasets("SALES").build("orders", Default::default()).await?;
/// ```
pub struct AtelierClient {
    pub(crate) http: HttpClient,
    base_url: String,
    instance_name: String,
}

impl AtelierClient {
    /// Create a new client for an instance.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, CoreError> {
        Self::with_timeout(base_url, api_key, DEFAULT_TIMEOUT_SECS)
    }

    /// Create a new client with a custom request timeout.
    pub fn with_timeout(base_url: &str, api_key: &str, timeout_secs: u64) -> Result<Self, CoreError> {
        let http = HttpClient::new(base_url, api_key, timeout_secs)
            .map_err(|e| CoreError::Internal(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            instance_name: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a client from a registry descriptor.
    ///
    /// Construction failures carry the instance name, so a bad credential
    /// is attributable without guessing which instance it belonged to.
    pub fn from_descriptor(descriptor: &InstanceDescriptor) -> Result<Self, CoreError> {
        let http = HttpClient::new(&descriptor.url, &descriptor.api_key, DEFAULT_TIMEOUT_SECS)
            .map_err(|e| {
                CoreError::Authentication(format!("instance '{}': {}", descriptor.name, e))
            })?;
        Ok(Self {
            http,
            base_url: descriptor.url.trim_end_matches('/').to_string(),
            instance_name: descriptor.name.clone(),
        })
    }

    /// Get the base URL for this client.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Name of the registry instance this client was built for.
    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }

    /// Get a reference to the HTTP client.
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Projects API client.
    pub fn projects(&self) -> ProjectsClient<'_> {
        ProjectsClient::new(self)
    }

    /// Datasets API client, scoped to one project.
    pub fn datasets<'a>(&'a self, project_key: &'a str) -> DatasetsClient<'a> {
        DatasetsClient::new(self, project_key)
    }

    /// Jobs API client, scoped to one project.
    pub fn jobs<'a>(&'a self, project_key: &'a str) -> JobsClient<'a> {
        JobsClient::new(self, project_key)
    }

    /// Scenarios API client, scoped to one project.
    pub fn scenarios<'a>(&'a self, project_key: &'a str) -> ScenariosClient<'a> {
        ScenariosClient::new(self, project_key)
    }

    /// Recipes API client, scoped to one project.
    pub fn recipes<'a>(&'a self, project_key: &'a str) -> RecipesClient<'a> {
        RecipesClient::new(self, project_key)
    }

    /// List the instance-wide connections.
    pub async fn list_connections(&self) -> Result<Vec<ConnectionListItem>, CoreError> {
        self.http
            .get("/api/connections", None)
            .await
            .map_err(CoreError::from)
    }
}

impl std::fmt::Debug for AtelierClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtelierClient")
            .field("instance_name", &self.instance_name)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
