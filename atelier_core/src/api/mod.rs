//! Typed client for the Atelier management API.
//!
//! [`AtelierClient`] is the entry point; per-area sub-clients borrow it,
//! so a client can be shared behind an `Arc` and handed to helpers.

pub mod client;
pub mod datasets;
pub mod jobs;
pub mod projects;
pub mod recipes;
pub mod scenarios;
pub mod types;

pub use client::AtelierClient;
pub use datasets::{BuildMode, DatasetsClient};
pub use jobs::JobsClient;
pub use projects::ProjectsClient;
pub use recipes::RecipesClient;
pub use scenarios::ScenariosClient;
pub use types::{
    ColumnSpec, ConnectionListItem, DatasetListItem, DatasetRows, DatasetSchema, JobBaseStatus,
    JobState, JobStatusPayload, ProjectListItem, ProjectMetadata, RecipeListItem,
    ScenarioListItem, ScenarioRunInfo, ScenarioStepOutcome, SchemaDelta,
};

use crate::errors::CoreError;
use crate::http::HttpError;

/// Map an HTTP error against a named target: 404 becomes `NotFound` with
/// the target attached, everything else takes the standard mapping
/// (401/403 → `Authentication`, network → `Http`, ...).
pub(crate) fn map_target_error(err: HttpError, kind: &'static str, name: &str) -> CoreError {
    if err.status() == Some(404) {
        return CoreError::not_found(kind, name);
    }
    CoreError::from(err)
}
