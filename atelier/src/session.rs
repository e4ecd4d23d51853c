//! Execution sessions.
//!
//! A session gives an agent a persistent variable namespace across
//! sequential code executions, plus an always-fresh binding to the
//! currently active platform client. The actual evaluation of code is not
//! this crate's business (it belongs to whatever sandbox embeds the
//! session), so the session delegates to a [`CodeRunner`] and only owns
//! the state contract:
//!
//! - the namespace survives across `run` calls on the same session and
//!   dies with it; a fresh session never sees another session's bindings;
//! - the client handed to each execution is resolved through the hub's
//!   live active-instance pointer *at call time*, so a `use_instance`
//!   performed by the previous execution (or by another session sharing
//!   the hub) is visible to the next one;
//! - one execution runs at a time per session (`run` takes `&mut self`).

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use atelier_core::api::AtelierClient;
use atelier_core::errors::CoreResult;
use atelier_core::registry::InstanceHub;

/// Variable store owned by exactly one session.
#[derive(Debug, Default)]
pub struct SessionNamespace {
    vars: BTreeMap<String, Value>,
}

impl SessionNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind (or rebind) a variable.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    /// Look up a variable.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Remove a variable, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.vars.remove(name)
    }

    /// All bound names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.vars.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Drop every binding.
    pub fn clear(&mut self) {
        self.vars.clear();
    }
}

/// What one execution sees: the resolved client and read access to the
/// session's namespace.
pub struct ExecScope<'a> {
    /// Name of the instance the client points at.
    pub instance: String,
    /// Client for the currently active instance.
    pub client: Arc<AtelierClient>,
    /// The session's variables as of the start of this execution.
    pub namespace: &'a SessionNamespace,
}

/// What one execution produced: captured stdout plus the bindings to
/// merge back into the session namespace.
#[derive(Debug, Default)]
pub struct RunOutcome {
    pub stdout: String,
    pub bindings: BTreeMap<String, Value>,
}

/// The sandbox boundary. Implementations evaluate a code snippet against
/// a scope and report output and new bindings; they must not retain the
/// scope beyond the call.
pub trait CodeRunner: Send {
    fn run(&mut self, code: &str, scope: ExecScope<'_>) -> CoreResult<RunOutcome>;
}

/// Result of one [`Session::run`] call.
#[derive(Debug, Serialize)]
pub struct Execution {
    /// Captured stdout of the executed code.
    pub stdout: String,
    /// Names bound or rebound by this execution.
    pub bindings: Vec<String>,
}

/// One agent-facing execution session.
pub struct Session {
    id: String,
    hub: Arc<InstanceHub>,
    namespace: SessionNamespace,
    runner: Box<dyn CodeRunner>,
}

impl Session {
    /// Create a session bound to an instance hub.
    pub fn new(hub: Arc<InstanceHub>, runner: Box<dyn CodeRunner>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            hub,
            namespace: SessionNamespace::new(),
            runner,
        }
    }

    /// Unique id of this session.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The hub this session resolves clients through.
    pub fn hub(&self) -> &Arc<InstanceHub> {
        &self.hub
    }

    /// The session's current variables.
    pub fn namespace(&self) -> &SessionNamespace {
        &self.namespace
    }

    /// Execute one code snippet.
    ///
    /// Resolves the active client through the hub's live pointer, hands
    /// code and scope to the runner, then merges the returned bindings
    /// into the namespace for the next call.
    pub fn run(&mut self, code: &str) -> CoreResult<Execution> {
        let (instance, client) = self.hub.current()?;
        debug!(session = %self.id, instance = %instance, code_len = code.len(), "executing snippet");
        let outcome = self.runner.run(
            code,
            ExecScope {
                instance,
                client,
                namespace: &self.namespace,
            },
        )?;
        let bindings: Vec<String> = outcome.bindings.keys().cloned().collect();
        for (name, value) in outcome.bindings {
            self.namespace.insert(name, value);
        }
        Ok(Execution {
            stdout: outcome.stdout,
            bindings,
        })
    }

    /// Clear the session namespace.
    pub fn reset(&mut self) {
        debug!(session = %self.id, "resetting namespace");
        self.namespace.clear();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("variables", &self.namespace.len())
            .finish_non_exhaustive()
    }
}
