//! Instance registry and the process-wide instance hub.
//!
//! [`InstanceRegistry`] is the immutable view of the loaded configuration:
//! name → descriptor, plus which one is the default. [`InstanceHub`] adds
//! the mutable parts, a per-instance client cache (at most one live
//! handle per instance name) and the active-instance pointer, behind
//! mutexes so a switch-then-read never interleaves with a concurrent
//! switch.
//!
//! The hub is an explicit object: embedders that run several independent
//! agents in one process should construct one hub per agent. The
//! process-default hub at the bottom of this module serves the common
//! single-operator case, and a switch made through it is deliberately
//! visible to every session in the process.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::api::AtelierClient;
use crate::config::{InstanceDescriptor, InstanceSummary, InstancesConfig};
use crate::errors::{CoreError, CoreResult};

/// Immutable registry of configured instances.
#[derive(Debug, Clone)]
pub struct InstanceRegistry {
    descriptors: Vec<InstanceDescriptor>,
    default_name: String,
}

impl InstanceRegistry {
    /// Build a registry from a validated configuration document.
    pub fn from_config(config: InstancesConfig) -> Self {
        let default_name = config.default.clone();
        let mut descriptors: Vec<InstanceDescriptor> = config
            .instances
            .into_iter()
            .map(|(name, entry)| InstanceDescriptor {
                is_default: name == default_name,
                name,
                url: entry.url,
                api_key: entry.api_key,
                description: entry.description,
            })
            .collect();
        // Default first, the rest in name order.
        descriptors.sort_by_key(|d| !d.is_default);
        Self {
            descriptors,
            default_name,
        }
    }

    /// Load and validate a registry from a TOML file.
    pub fn load(path: &Path) -> CoreResult<Self> {
        Ok(Self::from_config(InstancesConfig::load(path)?))
    }

    /// Resolve a registry from the process environment (file or env vars).
    pub fn discover() -> CoreResult<Self> {
        Ok(Self::from_config(InstancesConfig::discover()?))
    }

    /// Look up one instance by name.
    pub fn get(&self, name: &str) -> CoreResult<&InstanceDescriptor> {
        self.descriptors
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| CoreError::not_found("instance", name))
    }

    /// Redacted summaries, default instance first.
    pub fn list(&self) -> Vec<InstanceSummary> {
        self.descriptors.iter().map(InstanceSummary::from).collect()
    }

    /// Name of the configured default instance.
    pub fn default_name(&self) -> &str {
        &self.default_name
    }
}

/// Registry plus the process-shared mutable state: cached clients and the
/// active-instance pointer.
pub struct InstanceHub {
    registry: InstanceRegistry,
    clients: Mutex<HashMap<String, Arc<AtelierClient>>>,
    active: Mutex<String>,
}

impl InstanceHub {
    /// Create a hub; the active pointer starts at the configured default.
    pub fn new(registry: InstanceRegistry) -> Self {
        let active = registry.default_name().to_string();
        Self {
            registry,
            clients: Mutex::new(HashMap::new()),
            active: Mutex::new(active),
        }
    }

    /// Load a hub from a TOML instances file.
    pub fn load(path: &Path) -> CoreResult<Self> {
        Ok(Self::new(InstanceRegistry::load(path)?))
    }

    /// Resolve a hub from the process environment.
    pub fn discover() -> CoreResult<Self> {
        Ok(Self::new(InstanceRegistry::discover()?))
    }

    /// The immutable registry view.
    pub fn registry(&self) -> &InstanceRegistry {
        &self.registry
    }

    /// Redacted summaries, default first.
    pub fn list(&self) -> Vec<InstanceSummary> {
        self.registry.list()
    }

    /// Name of the currently active instance.
    pub fn current_name(&self) -> String {
        self.active.lock().clone()
    }

    /// The client for the currently active instance, resolved through the
    /// live pointer, never a stale cached reference.
    pub fn client(&self) -> CoreResult<Arc<AtelierClient>> {
        let name = self.current_name();
        self.client_for(&name)
    }

    /// Name and client of the currently active instance.
    pub fn current(&self) -> CoreResult<(String, Arc<AtelierClient>)> {
        let name = self.current_name();
        let client = self.client_for(&name)?;
        Ok((name, client))
    }

    /// Switch the active instance and return its client.
    ///
    /// An unknown name fails with `NotFound` and leaves the pointer
    /// untouched. Switching to the already-active instance is a no-op
    /// that still returns a usable client.
    pub fn use_instance(&self, name: &str) -> CoreResult<Arc<AtelierClient>> {
        // Validate before touching the pointer.
        self.registry.get(name)?;
        let client = self.client_for(name)?;
        let mut active = self.active.lock();
        if *active != name {
            info!(from = %*active, to = name, "switching active instance");
            *active = name.to_string();
        }
        Ok(client)
    }

    /// Cached-or-built client for a named instance.
    ///
    /// At most one live handle exists per instance name; a construction
    /// failure names the instance and never falls back to another one.
    pub fn client_for(&self, name: &str) -> CoreResult<Arc<AtelierClient>> {
        let descriptor = self.registry.get(name)?;
        let mut clients = self.clients.lock();
        if let Some(client) = clients.get(name) {
            return Ok(Arc::clone(client));
        }
        debug!(instance = name, url = %descriptor.url, "building client handle");
        let client = Arc::new(AtelierClient::from_descriptor(descriptor)?);
        clients.insert(name.to_string(), Arc::clone(&client));
        Ok(client)
    }

    /// Drop a cached client handle so the next use re-authenticates.
    ///
    /// Call after an operation surfaced an authentication error for this
    /// instance (see [`CoreError::is_auth_error`]).
    pub fn invalidate(&self, name: &str) {
        if self.clients.lock().remove(name).is_some() {
            info!(instance = name, "invalidated cached client handle");
        }
    }
}

impl std::fmt::Debug for InstanceHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceHub")
            .field("default", &self.registry.default_name())
            .field("active", &self.current_name())
            .finish_non_exhaustive()
    }
}

static DEFAULT_HUB: Lazy<Mutex<Option<Arc<InstanceHub>>>> = Lazy::new(|| Mutex::new(None));

/// Install a hub as the process default, replacing any previous one.
pub fn install_default_hub(hub: InstanceHub) -> Arc<InstanceHub> {
    let hub = Arc::new(hub);
    *DEFAULT_HUB.lock() = Some(Arc::clone(&hub));
    hub
}

/// The process-default hub, resolving configuration on first use.
pub fn default_hub() -> CoreResult<Arc<InstanceHub>> {
    let mut guard = DEFAULT_HUB.lock();
    if let Some(hub) = guard.as_ref() {
        return Ok(Arc::clone(hub));
    }
    let hub = Arc::new(InstanceHub::discover()?);
    *guard = Some(Arc::clone(&hub));
    Ok(hub)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InstancesConfig;

    fn two_instance_hub() -> InstanceHub {
        let config = InstancesConfig::from_toml_str(
            r#"
            default = "A"

            [instances.A]
            url = "https://a.example.com"
            api_key = "ak_a_1234567890"
            description = "first"

            [instances.B]
            url = "https://b.example.com"
            api_key = "ak_b_1234567890"
            "#,
        )
        .unwrap();
        InstanceHub::new(InstanceRegistry::from_config(config))
    }

    #[test]
    fn test_default_descriptor_matches_default_name() {
        let hub = two_instance_hub();
        let registry = hub.registry();
        let default = registry.get(registry.default_name()).unwrap();
        assert!(default.is_default);
        assert_eq!(default.name, "A");
    }

    #[test]
    fn test_list_puts_default_first_and_redacts_keys() {
        let hub = two_instance_hub();
        let summaries = hub.list();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].name, "A");
        assert!(summaries[0].is_default);
        assert_eq!(summaries[1].name, "B");
        assert!(summaries[0].api_key.ends_with("..."));
        assert!(!summaries[0].api_key.contains("1234567890"));
    }

    #[test]
    fn test_switch_then_current() {
        let hub = two_instance_hub();
        assert_eq!(hub.current_name(), "A");

        hub.use_instance("B").unwrap();
        let (name, client) = hub.current().unwrap();
        assert_eq!(name, "B");
        assert_eq!(client.instance_name(), "B");
    }

    #[test]
    fn test_unknown_instance_never_mutates_pointer() {
        let hub = two_instance_hub();
        let err = hub.use_instance("prod-eu").unwrap_err();
        assert!(matches!(
            err,
            CoreError::NotFound { kind: "instance", .. }
        ));
        assert_eq!(hub.current_name(), "A");
    }

    #[test]
    fn test_use_instance_is_idempotent() {
        let hub = two_instance_hub();
        let first = hub.use_instance("A").unwrap();
        let second = hub.use_instance("A").unwrap();
        assert_eq!(hub.current_name(), "A");
        // same cached handle both times
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_invalidate_forces_new_handle() {
        let hub = two_instance_hub();
        let first = hub.client_for("A").unwrap();
        hub.invalidate("A");
        let second = hub.client_for("A").unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.instance_name(), "A");
    }

    #[test]
    fn test_switch_visible_across_shared_references() {
        let hub = Arc::new(two_instance_hub());
        let other = Arc::clone(&hub);
        hub.use_instance("B").unwrap();
        assert_eq!(other.current_name(), "B");
    }
}
