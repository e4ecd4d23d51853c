//! Atelier core library.
//!
//! This crate provides the core functionality for driving an Atelier
//! data-platform control plane from a long-lived agent process:
//! - Typed API client for one platform instance
//! - Instance configuration, registry, and the multi-instance hub
//! - Async-operation orchestration (start / poll / bounded wait)
//! - Read-only inspection, search, and export helpers
//! - HTTP client utilities and the shared error taxonomy

pub mod api;
pub mod config;
pub mod errors;
pub mod helpers;
pub mod http;
pub mod ops;
pub mod polling;
pub mod registry;

// Re-export core types at crate root for convenience
pub use errors::{CoreError, CoreResult, HttpErrorInfo};

// Re-export API types for convenience
pub use api::{AtelierClient, BuildMode, JobState, SchemaDelta};

// Re-export configuration and registry types
pub use config::{InstanceDescriptor, InstanceSummary, InstancesConfig};
pub use registry::{default_hub, install_default_hub, InstanceHub, InstanceRegistry};

// Re-export orchestration types
pub use ops::{
    build_and_wait, compute_and_apply_schema, run_recipe_and_wait, run_scenario_and_wait,
    start_build, start_recipe, start_scenario, wait, OperationHandle, OperationKind,
    OperationResult, OperationStatus,
};
pub use polling::WaitOptions;
