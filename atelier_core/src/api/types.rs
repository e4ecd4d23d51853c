//! Wire types for the Atelier management API.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Job lifecycle status values reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    NotStarted,
    Running,
    Done,
    Failed,
    Aborted,
}

impl JobState {
    /// Check if this is a terminal (final) status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Failed | JobState::Aborted)
    }

    /// Check if this is the success status.
    pub fn is_success(&self) -> bool {
        *self == JobState::Done
    }

    /// Parse a platform status string.
    ///
    /// Anything outside the known vocabulary parses to `Running`: an
    /// unrecognized state is by contract still in flight, never terminal.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "NOT_STARTED" | "QUEUED" | "PENDING" => JobState::NotStarted,
            "DONE" | "SUCCESS" | "SUCCEEDED" => JobState::Done,
            "FAILED" | "FAILURE" | "ERROR" => JobState::Failed,
            "ABORTED" | "CANCELLED" | "CANCELED" => JobState::Aborted,
            _ => JobState::Running,
        }
    }

    /// Convert to the canonical status string.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::NotStarted => "NOT_STARTED",
            JobState::Running => "RUNNING",
            JobState::Done => "DONE",
            JobState::Failed => "FAILED",
            JobState::Aborted => "ABORTED",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The `base_status` block of a job status payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobBaseStatus {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Status payload for one control-plane job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobStatusPayload {
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub base_status: JobBaseStatus,
    /// Per-activity progress, keyed by activity id. Passed through as-is.
    #[serde(default)]
    pub activities: HashMap<String, Value>,
}

impl JobStatusPayload {
    /// The parsed job state.
    pub fn state(&self) -> JobState {
        JobState::parse(&self.base_status.state)
    }
}

/// Response from a start-build / run-recipe call.
#[derive(Debug, Clone, Deserialize)]
pub struct JobStartedResponse {
    pub job_id: String,
}

/// Response from a scenario run trigger.
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioRunStartedResponse {
    pub run_id: String,
}

/// Outcome of one scenario step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioStepOutcome {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub outcome: String,
}

/// Status payload for one scenario run.
///
/// `outcome` is absent while the run is in flight; a populated value
/// (`SUCCESS`, `FAILED`, `ABORTED`) marks the run finished.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioRunInfo {
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub steps: Vec<ScenarioStepOutcome>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl ScenarioRunInfo {
    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn is_success(&self) -> bool {
        self.outcome.as_deref() == Some("SUCCESS")
    }
}

/// One column in a dataset schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type", default)]
    pub column_type: String,
}

/// A dataset schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetSchema {
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,
}

/// The set of column changes a recipe's output would undergo if
/// recomputed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaDelta {
    #[serde(default)]
    pub added: Vec<ColumnSpec>,
    #[serde(default)]
    pub removed: Vec<String>,
    #[serde(default)]
    pub changed: Vec<ColumnSpec>,
}

impl SchemaDelta {
    /// True when recomputation would leave the output schema untouched.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }

    /// Total number of column changes.
    pub fn change_count(&self) -> usize {
        self.added.len() + self.removed.len() + self.changed.len()
    }
}

/// A page of dataset rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetRows {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
}

/// One project in a listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectListItem {
    pub project_key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub owner: Option<String>,
}

/// Project metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectMetadata {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
}

/// One dataset in a project listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetListItem {
    pub name: String,
    #[serde(rename = "type", default)]
    pub dataset_type: String,
    #[serde(default)]
    pub connection: Option<String>,
}

/// One recipe in a project listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeListItem {
    pub name: String,
    #[serde(rename = "type", default)]
    pub recipe_type: String,
}

/// One scenario in a project listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioListItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// One connection in the instance-wide listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionListItem {
    pub name: String,
    #[serde(rename = "type", default)]
    pub connection_type: String,
    #[serde(default)]
    pub usable_by: Option<String>,
}

/// Row-count metric for a dataset, when the platform has one computed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordCountMetric {
    #[serde(default)]
    pub count: Option<i64>,
}
