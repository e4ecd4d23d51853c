//! # Atelier SDK
//!
//! Agent-facing SDK for the Atelier data platform: drive builds, recipe
//! runs, scenarios, and schema updates on one or more platform instances
//! from a long-lived process, with bounded synchronous waiting on top of
//! the platform's fire-and-forget job APIs.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use atelier::{BuildMode, WaitOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), atelier::CoreError> {
//!     // Load ~/.atelier/instances.toml (or ATELIER_URL/ATELIER_API_KEY)
//!     let hub = atelier::init(None)?;
//!
//!     for instance in atelier::list_instances()? {
//!         println!("{} -> {}", instance.name, instance.url);
//!     }
//!
//!     let client = hub.client()?;
//!     let result = atelier::build_and_wait(
//!         &client,
//!         "SALES",
//!         "orders",
//!         BuildMode::default(),
//!         &WaitOptions::from_secs(600, 2),
//!     )
//!     .await?;
//!
//!     println!("{} in {:.1}s", result.terminal_status, result.duration_secs);
//!     Ok(())
//! }
//! ```
//!
//! After creating or modifying a recipe, run
//! [`compute_and_apply_schema`] to completion before building its output
//! dataset; the platform cannot detect a stale output schema for you.

use std::path::Path;
use std::sync::Arc;

pub mod session;

pub use session::{CodeRunner, ExecScope, Execution, RunOutcome, Session, SessionNamespace};

// Re-export core for advanced usage
pub use atelier_core as core;

// Re-export commonly used core types
pub use atelier_core::{
    api::types::{JobState, ScenarioRunInfo, SchemaDelta},
    build_and_wait, compute_and_apply_schema,
    helpers::{export, inspection, search},
    run_recipe_and_wait, run_scenario_and_wait, start_build, start_recipe, start_scenario, wait,
    AtelierClient, BuildMode, CoreError, CoreResult, InstanceDescriptor, InstanceHub,
    InstanceRegistry, InstanceSummary, OperationHandle, OperationKind, OperationResult,
    OperationStatus, WaitOptions,
};

/// Initialize the process-default instance hub.
///
/// With `config_path` set, loads that TOML instances file; otherwise
/// resolves configuration the standard way (`ATELIER_INSTANCES_PATH`,
/// then `~/.atelier/instances.toml`, then `ATELIER_URL`/`ATELIER_API_KEY`).
/// Replaces any previously installed default hub.
pub fn init(config_path: Option<&Path>) -> CoreResult<Arc<InstanceHub>> {
    let hub = match config_path {
        Some(path) => InstanceHub::load(path)?,
        None => InstanceHub::discover()?,
    };
    Ok(atelier_core::install_default_hub(hub))
}

/// Switch the process-default hub to another instance and return its
/// client. Unknown names fail with `NotFound` and leave the active
/// instance untouched.
pub fn use_instance(name: &str) -> CoreResult<Arc<AtelierClient>> {
    atelier_core::default_hub()?.use_instance(name)
}

/// Redacted summaries of the configured instances, default first.
pub fn list_instances() -> CoreResult<Vec<InstanceSummary>> {
    Ok(atelier_core::default_hub()?.list())
}

/// Name of the currently active instance on the process-default hub.
pub fn current_instance() -> CoreResult<String> {
    Ok(atelier_core::default_hub()?.current_name())
}

/// Client for the currently active instance on the process-default hub.
pub fn current_client() -> CoreResult<Arc<AtelierClient>> {
    atelier_core::default_hub()?.client()
}
