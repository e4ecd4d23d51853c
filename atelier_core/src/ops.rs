//! Async-operation orchestration.
//!
//! The platform's build / scenario / recipe APIs are fire-and-forget: a
//! start call returns a job or run id and the caller is on its own. This
//! module converts them into synchronous, bounded, inspectable calls:
//!
//! - `start_*` issues the start request and returns an [`OperationHandle`]
//!   carrying the remote id, or fails immediately (`NotFound` /
//!   `Validation`) with no handle and no polling;
//! - [`wait`] polls the status endpoint until a terminal state or the
//!   deadline, and **returns** on timeout and remote failure instead of
//!   erroring, so calling code branches on [`OperationResult::success`];
//! - the `*_and_wait` combinators glue the two together.
//!
//! Nothing here retries or cancels: a timed-out remote job keeps running
//! on the platform, and a later [`wait`] on the same handle will observe
//! its eventual outcome. Retry policy belongs to the caller.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::api::types::JobState;
use crate::api::{AtelierClient, BuildMode};
use crate::errors::{CoreError, CoreResult};
use crate::polling::{WaitOptions, MAX_CONSECUTIVE_POLL_ERRORS};

/// What kind of remote work an operation handle tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    Build,
    ScenarioRun,
    RecipeRun,
    SchemaCompute,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Build => "BUILD",
            OperationKind::ScenarioRun => "SCENARIO_RUN",
            OperationKind::RecipeRun => "RECIPE_RUN",
            OperationKind::SchemaCompute => "SCHEMA_COMPUTE",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One in-flight remote operation.
///
/// Created only once the platform has accepted the start call and
/// assigned an id; for scenario runs `job_id` holds the run id.
#[derive(Debug, Clone)]
pub struct OperationHandle {
    pub kind: OperationKind,
    pub project_key: String,
    pub target: String,
    pub job_id: String,
    pub started: Instant,
}

/// Terminal classification of a finished (or given-up-on) operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    Done,
    Failed,
    Aborted,
    TimedOut,
}

/// The outcome of one orchestrated operation.
///
/// A remote failure or an elapsed deadline is data, not an error: `wait`
/// hands this struct back with `success: false` and the caller decides
/// whether to retry, keep waiting, or report.
#[derive(Debug, Clone, Serialize)]
pub struct OperationResult {
    pub success: bool,
    pub status: OperationStatus,
    /// The remote terminal status string, or `TIMED_OUT`.
    pub terminal_status: String,
    /// Seconds since the operation was started (not since this wait call).
    pub duration_secs: f64,
    /// Wall-clock time this result was produced.
    pub finished_at: chrono::DateTime<chrono::Utc>,
    /// Remote job/run id; absent for synchronous schema computes.
    pub job_id: Option<String>,
    pub kind: OperationKind,
    pub project_key: String,
    pub target: String,
    /// Kind-specific payload: job status for builds (plus row count when
    /// available), step outcomes for scenario runs, the column delta for
    /// schema computes, last observed status for timeouts.
    pub diagnostics: Value,
}

/// Start an asynchronous dataset build.
pub async fn start_build(
    client: &AtelierClient,
    project_key: &str,
    dataset_name: &str,
    mode: BuildMode,
) -> CoreResult<OperationHandle> {
    let job_id = client.datasets(project_key).build(dataset_name, mode).await?;
    debug!(project = project_key, dataset = dataset_name, job_id = %job_id, "build started");
    Ok(OperationHandle {
        kind: OperationKind::Build,
        project_key: project_key.to_string(),
        target: dataset_name.to_string(),
        job_id,
        started: Instant::now(),
    })
}

/// Start a scenario run.
pub async fn start_scenario(
    client: &AtelierClient,
    project_key: &str,
    scenario_id: &str,
) -> CoreResult<OperationHandle> {
    let run_id = client.scenarios(project_key).run(scenario_id).await?;
    debug!(project = project_key, scenario = scenario_id, run_id = %run_id, "scenario run started");
    Ok(OperationHandle {
        kind: OperationKind::ScenarioRun,
        project_key: project_key.to_string(),
        target: scenario_id.to_string(),
        job_id: run_id,
        started: Instant::now(),
    })
}

/// Start an asynchronous recipe run.
pub async fn start_recipe(
    client: &AtelierClient,
    project_key: &str,
    recipe_name: &str,
) -> CoreResult<OperationHandle> {
    let job_id = client.recipes(project_key).run(recipe_name).await?;
    debug!(project = project_key, recipe = recipe_name, job_id = %job_id, "recipe run started");
    Ok(OperationHandle {
        kind: OperationKind::RecipeRun,
        project_key: project_key.to_string(),
        target: recipe_name.to_string(),
        job_id,
        started: Instant::now(),
    })
}

enum Probe {
    Pending { status: String },
    Finished { terminal_status: String, success: bool, diagnostics: Value },
}

async fn probe(client: &AtelierClient, handle: &OperationHandle) -> CoreResult<Probe> {
    match handle.kind {
        OperationKind::Build | OperationKind::RecipeRun => {
            let payload = client
                .jobs(&handle.project_key)
                .status(&handle.job_id)
                .await?;
            let state = payload.state();
            if state.is_terminal() {
                Ok(Probe::Finished {
                    terminal_status: state.as_str().to_string(),
                    success: state.is_success(),
                    diagnostics: json!({ "job": serde_json::to_value(&payload)? }),
                })
            } else {
                let raw = payload.base_status.state;
                Ok(Probe::Pending {
                    status: if raw.is_empty() {
                        state.as_str().to_string()
                    } else {
                        raw
                    },
                })
            }
        }
        OperationKind::ScenarioRun => {
            let info = client
                .scenarios(&handle.project_key)
                .run_status(&handle.target, &handle.job_id)
                .await?;
            match info.outcome.clone() {
                Some(outcome) => Ok(Probe::Finished {
                    success: info.is_success(),
                    terminal_status: outcome,
                    diagnostics: json!({ "run": serde_json::to_value(&info)? }),
                }),
                None => Ok(Probe::Pending {
                    status: JobState::Running.as_str().to_string(),
                }),
            }
        }
        OperationKind::SchemaCompute => Err(CoreError::Internal(
            "schema computes are synchronous and cannot be polled".to_string(),
        )),
    }
}

/// Poll an operation until it reaches a terminal state or `opts.timeout`
/// elapses.
///
/// The first status check happens immediately, so an already-finished job
/// returns without a single sleep. The timeout budget belongs to this
/// call, not to the handle: waiting again on the same handle after a
/// `TIMED_OUT` result re-polls with a fresh budget.
pub async fn wait(
    client: &AtelierClient,
    handle: &OperationHandle,
    opts: &WaitOptions,
) -> CoreResult<OperationResult> {
    let wait_start = Instant::now();
    let mut checks: u32 = 0;
    let mut consecutive_errors: u32 = 0;
    let mut last_status = String::from("UNKNOWN");

    loop {
        match probe(client, handle).await {
            Ok(Probe::Finished {
                terminal_status,
                success,
                mut diagnostics,
            }) => {
                if handle.kind == OperationKind::Build && success {
                    enrich_build_diagnostics(client, handle, &mut diagnostics).await;
                }
                let matched = match terminal_status.as_str() {
                    "ABORTED" => OperationStatus::Aborted,
                    _ if success => OperationStatus::Done,
                    _ => OperationStatus::Failed,
                };
                debug!(
                    kind = %handle.kind,
                    target = %handle.target,
                    status = %terminal_status,
                    "operation finished"
                );
                return Ok(OperationResult {
                    success,
                    status: matched,
                    terminal_status,
                    duration_secs: handle.started.elapsed().as_secs_f64(),
                    finished_at: chrono::Utc::now(),
                    job_id: Some(handle.job_id.clone()),
                    kind: handle.kind,
                    project_key: handle.project_key.clone(),
                    target: handle.target.clone(),
                    diagnostics,
                });
            }
            Ok(Probe::Pending { status }) => {
                consecutive_errors = 0;
                last_status = status;
            }
            Err(e) => {
                consecutive_errors += 1;
                if consecutive_errors >= MAX_CONSECUTIVE_POLL_ERRORS {
                    return Err(CoreError::Internal(format!(
                        "too many consecutive errors polling {} '{}' ({}): {}",
                        handle.kind, handle.target, handle.job_id, e
                    )));
                }
                warn!(
                    kind = %handle.kind,
                    job_id = %handle.job_id,
                    consecutive_errors,
                    error = %e,
                    "status poll failed, will retry"
                );
            }
        }

        checks += 1;
        let elapsed = wait_start.elapsed();
        if elapsed >= opts.timeout {
            return Ok(OperationResult {
                success: false,
                status: OperationStatus::TimedOut,
                terminal_status: "TIMED_OUT".to_string(),
                duration_secs: handle.started.elapsed().as_secs_f64(),
                finished_at: chrono::Utc::now(),
                job_id: Some(handle.job_id.clone()),
                kind: handle.kind,
                project_key: handle.project_key.clone(),
                target: handle.target.clone(),
                diagnostics: json!({
                    "last_status": last_status,
                    "message": format!(
                        "{} '{}' did not reach a terminal state within {:.0} seconds; the remote job is still running",
                        handle.kind, handle.target, opts.timeout.as_secs_f64()
                    ),
                }),
            });
        }

        let delay = opts.next_delay(checks, opts.timeout - elapsed);
        tokio::time::sleep(delay).await;
    }
}

/// Best-effort row count for a freshly built dataset. Metric fetch
/// failures never fail the build result.
async fn enrich_build_diagnostics(
    client: &AtelierClient,
    handle: &OperationHandle,
    diagnostics: &mut Value,
) {
    let row_count = client
        .datasets(&handle.project_key)
        .record_count(&handle.target)
        .await
        .ok()
        .flatten();
    if let Value::Object(map) = diagnostics {
        map.insert("dataset".to_string(), json!(handle.target));
        map.insert("row_count".to_string(), json!(row_count));
    }
}

/// Build a dataset and wait for completion.
///
/// If the dataset's upstream recipe changed since its last build, run
/// [`compute_and_apply_schema`] to completion first: the platform cannot
/// detect the stale output schema for you and the build will fail with
/// missing-column errors.
pub async fn build_and_wait(
    client: &AtelierClient,
    project_key: &str,
    dataset_name: &str,
    mode: BuildMode,
    opts: &WaitOptions,
) -> CoreResult<OperationResult> {
    let handle = start_build(client, project_key, dataset_name, mode).await?;
    wait(client, &handle, opts).await
}

/// Run a scenario and wait for its outcome.
pub async fn run_scenario_and_wait(
    client: &AtelierClient,
    project_key: &str,
    scenario_id: &str,
    opts: &WaitOptions,
) -> CoreResult<OperationResult> {
    let handle = start_scenario(client, project_key, scenario_id).await?;
    wait(client, &handle, opts).await
}

/// Run a recipe and wait for its job to finish.
pub async fn run_recipe_and_wait(
    client: &AtelierClient,
    project_key: &str,
    recipe_name: &str,
    opts: &WaitOptions,
) -> CoreResult<OperationResult> {
    let handle = start_recipe(client, project_key, recipe_name).await?;
    wait(client, &handle, opts).await
}

/// Compute a recipe's pending output-schema delta and apply it when
/// non-empty.
///
/// Both platform calls are synchronous, so there is no handle and no
/// polling; the result reports the delta that was (or would have been)
/// applied. An empty delta is a successful no-op. Concurrent schema
/// application and builds on the same recipe are not serialized here;
/// callers sequence them.
pub async fn compute_and_apply_schema(
    client: &AtelierClient,
    project_key: &str,
    recipe_name: &str,
) -> CoreResult<OperationResult> {
    let started = Instant::now();
    let recipes = client.recipes(project_key);
    let delta = recipes.compute_schema_changes(recipe_name).await?;
    let applied = if delta.is_empty() {
        debug!(project = project_key, recipe = recipe_name, "schema delta empty, nothing to apply");
        false
    } else {
        recipes.apply_schema_changes(recipe_name).await?;
        debug!(
            project = project_key,
            recipe = recipe_name,
            changes = delta.change_count(),
            "schema delta applied"
        );
        true
    };
    Ok(OperationResult {
        success: true,
        status: OperationStatus::Done,
        terminal_status: "DONE".to_string(),
        duration_secs: started.elapsed().as_secs_f64(),
        finished_at: chrono::Utc::now(),
        job_id: None,
        kind: OperationKind::SchemaCompute,
        project_key: project_key.to_string(),
        target: recipe_name.to_string(),
        diagnostics: json!({
            "delta": serde_json::to_value(&delta)?,
            "change_count": delta.change_count(),
            "applied": applied,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::time::Duration;

    fn job_body(state: &str) -> serde_json::Value {
        json!({ "job_id": "job_1", "base_status": { "state": state } })
    }

    fn build_handle() -> OperationHandle {
        OperationHandle {
            kind: OperationKind::Build,
            project_key: "SALES".to_string(),
            target: "orders".to_string(),
            job_id: "job_1".to_string(),
            started: Instant::now(),
        }
    }

    #[tokio::test]
    async fn test_already_done_job_returns_on_first_check() {
        let server = MockServer::start();
        let status = server.mock(|when, then| {
            when.method(GET).path("/api/projects/SALES/jobs/job_1");
            then.status(200).json_body(job_body("DONE"));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/projects/SALES/datasets/orders/metrics/records");
            then.status(200).json_body(json!({"count": 42}));
        });

        let client = AtelierClient::new(&server.base_url(), "ak_test").unwrap();
        let handle = build_handle();
        let started = Instant::now();
        let result = wait(&client, &handle, &WaitOptions::from_secs(60, 5))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.status, OperationStatus::Done);
        assert_eq!(result.terminal_status, "DONE");
        assert_eq!(result.job_id.as_deref(), Some("job_1"));
        assert_eq!(result.diagnostics["row_count"], 42);
        // no sleep happened: well under one poll interval
        assert!(started.elapsed() < Duration::from_secs(1));
        status.assert_hits(1);
    }

    #[tokio::test]
    async fn test_timeout_returns_result_not_error_and_rewait_works() {
        let server = MockServer::start();
        let mut running = server.mock(|when, then| {
            when.method(GET).path("/api/projects/SALES/jobs/job_1");
            then.status(200).json_body(job_body("RUNNING"));
        });

        let client = AtelierClient::new(&server.base_url(), "ak_test").unwrap();
        let handle = build_handle();
        let opts = WaitOptions::from_secs(2, 1);

        let wait_start = Instant::now();
        let result = wait(&client, &handle, &opts).await.unwrap();
        let elapsed = wait_start.elapsed();

        assert!(!result.success);
        assert_eq!(result.status, OperationStatus::TimedOut);
        assert_eq!(result.terminal_status, "TIMED_OUT");
        assert_eq!(result.diagnostics["last_status"], "RUNNING");
        // elapsed in [timeout, timeout + one poll interval]
        assert!(elapsed >= Duration::from_secs(2));
        assert!(elapsed <= Duration::from_secs(4));

        // The remote job kept running; a second wait on the same handle
        // gets a fresh budget and observes the eventual outcome.
        running.delete();
        server.mock(|when, then| {
            when.method(GET).path("/api/projects/SALES/jobs/job_1");
            then.status(200).json_body(job_body("DONE"));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/projects/SALES/datasets/orders/metrics/records");
            then.status(404);
        });
        let result = wait(&client, &handle, &opts).await.unwrap();
        assert!(result.success);
        assert_eq!(result.terminal_status, "DONE");
    }

    #[tokio::test]
    async fn test_build_and_wait_running_twice_then_done() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/api/projects/SALES/datasets/orders/build");
            then.status(200).json_body(json!({"job_id": "job_1"}));
        });
        let mut running = server.mock(|when, then| {
            when.method(GET).path("/api/projects/SALES/jobs/job_1");
            then.status(200).json_body(job_body("RUNNING"));
        });

        let base = server.base_url();
        let task = tokio::spawn(async move {
            let client = AtelierClient::new(&base, "ak_test").unwrap();
            build_and_wait(
                &client,
                "SALES",
                "orders",
                BuildMode::default(),
                &WaitOptions::from_secs(60, 2),
            )
            .await
        });

        // Let the poller observe RUNNING twice, then flip the job to DONE.
        while running.hits() < 2 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        running.delete();
        server.mock(|when, then| {
            when.method(GET).path("/api/projects/SALES/jobs/job_1");
            then.status(200).json_body(job_body("DONE"));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/projects/SALES/datasets/orders/metrics/records");
            then.status(200).json_body(json!({"count": 1200}));
        });

        let result = task.await.unwrap().unwrap();
        assert!(result.success);
        assert_eq!(result.terminal_status, "DONE");
        assert_eq!(result.kind, OperationKind::Build);
        // two RUNNING polls at a 2s interval put completion near 4s
        assert!(result.duration_secs >= 3.5 && result.duration_secs <= 7.0);
        assert_eq!(result.diagnostics["row_count"], 1200);
    }

    #[tokio::test]
    async fn test_failed_job_is_success_false_not_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/projects/SALES/jobs/job_1");
            then.status(200).json_body(json!({
                "job_id": "job_1",
                "base_status": {"state": "FAILED", "error_message": "missing column web__ip"}
            }));
        });

        let client = AtelierClient::new(&server.base_url(), "ak_test").unwrap();
        let handle = build_handle();
        let result = wait(&client, &handle, &WaitOptions::from_secs(10, 1))
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.status, OperationStatus::Failed);
        assert_eq!(result.terminal_status, "FAILED");
        assert_eq!(
            result.diagnostics["job"]["base_status"]["error_message"],
            "missing column web__ip"
        );
    }

    #[tokio::test]
    async fn test_scenario_failure_carries_step_outcomes() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/api/projects/SALES/scenarios/nightly/run");
            then.status(200).json_body(json!({"run_id": "run_3"}));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/projects/SALES/scenarios/nightly/runs/run_3");
            then.status(200).json_body(json!({
                "run_id": "run_3",
                "outcome": "FAILED",
                "steps": [
                    {"name": "build_orders", "outcome": "SUCCESS"},
                    {"name": "check_rowcount", "outcome": "FAILED"}
                ]
            }));
        });

        let client = AtelierClient::new(&server.base_url(), "ak_test").unwrap();
        let result = run_scenario_and_wait(
            &client,
            "SALES",
            "nightly",
            &WaitOptions::from_secs(10, 1),
        )
        .await
        .unwrap();

        assert!(!result.success);
        assert_eq!(result.status, OperationStatus::Failed);
        assert_eq!(result.terminal_status, "FAILED");
        assert_eq!(result.diagnostics["run"]["steps"][1]["outcome"], "FAILED");
    }

    #[tokio::test]
    async fn test_start_failure_creates_no_handle_and_never_polls() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/api/projects/SALES/datasets/ghost/build");
            then.status(404);
        });
        let status = server.mock(|when, then| {
            when.method(GET).path_contains("/jobs/");
            then.status(200).json_body(job_body("DONE"));
        });

        let client = AtelierClient::new(&server.base_url(), "ak_test").unwrap();
        let err = build_and_wait(
            &client,
            "SALES",
            "ghost",
            BuildMode::default(),
            &WaitOptions::from_secs(10, 1),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, CoreError::NotFound { kind: "dataset", .. }));
        status.assert_hits(0);
    }

    #[tokio::test]
    async fn test_compute_and_apply_schema_empty_delta_skips_apply() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/projects/SALES/recipes/join_crm_web/schema-changes");
            then.status(200)
                .json_body(json!({"added": [], "removed": [], "changed": []}));
        });
        let apply = server.mock(|when, then| {
            when.method(POST)
                .path("/api/projects/SALES/recipes/join_crm_web/schema-changes/apply");
            then.status(200).json_body(json!({}));
        });

        let client = AtelierClient::new(&server.base_url(), "ak_test").unwrap();
        let result = compute_and_apply_schema(&client, "SALES", "join_crm_web")
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.kind, OperationKind::SchemaCompute);
        assert_eq!(result.job_id, None);
        assert_eq!(result.diagnostics["change_count"], 0);
        assert_eq!(result.diagnostics["applied"], false);
        apply.assert_hits(0);
    }

    #[tokio::test]
    async fn test_compute_and_apply_schema_applies_nonempty_delta() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/projects/SALES/recipes/join_crm_web/schema-changes");
            then.status(200).json_body(json!({
                "added": [{"name": "web__ip", "type": "string"}],
                "removed": ["legacy_id"],
                "changed": []
            }));
        });
        let apply = server.mock(|when, then| {
            when.method(POST)
                .path("/api/projects/SALES/recipes/join_crm_web/schema-changes/apply");
            then.status(200).json_body(json!({}));
        });

        let client = AtelierClient::new(&server.base_url(), "ak_test").unwrap();
        let result = compute_and_apply_schema(&client, "SALES", "join_crm_web")
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.diagnostics["change_count"], 2);
        assert_eq!(result.diagnostics["applied"], true);
        assert_eq!(result.diagnostics["delta"]["added"][0]["name"], "web__ip");
        apply.assert_hits(1);
    }
}
