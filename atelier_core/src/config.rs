//! Instance configuration for the Atelier SDK.
//!
//! A process addresses one or more named platform instances, declared in a
//! TOML document:
//!
//! ```toml
//! default = "prod"
//!
//! [instances.prod]
//! url = "https://atelier.example.com"
//! api_key = "ak_live_..."
//! description = "Production"
//!
//! [instances.staging]
//! url = "https://staging.atelier.example.com"
//! api_key = "ak_test_..."
//! ```
//!
//! Configuration problems (missing file, missing default entry, an
//! instance without `url`/`api_key`) are reported at load time, before any
//! network call is made.

use crate::errors::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default config directory name.
pub const CONFIG_DIR: &str = ".atelier";

/// Default instances file name.
pub const INSTANCES_FILE: &str = "instances.toml";

/// Environment variable overriding the instances file path.
pub const ENV_INSTANCES_PATH: &str = "ATELIER_INSTANCES_PATH";

/// Environment variables for the single-instance fallback.
pub const ENV_URL: &str = "ATELIER_URL";
pub const ENV_API_KEY: &str = "ATELIER_API_KEY";

/// Name given to the instance built from the env-var fallback.
pub const ENV_INSTANCE_NAME: &str = "default";

/// One instance entry as written in the configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceEntry {
    pub url: String,
    pub api_key: String,
    #[serde(default)]
    pub description: String,
}

/// The parsed instances document.
#[derive(Debug, Clone, Deserialize)]
pub struct InstancesConfig {
    pub default: String,
    pub instances: BTreeMap<String, InstanceEntry>,
}

impl InstancesConfig {
    /// Parse and validate a TOML instances document.
    pub fn from_toml_str(content: &str) -> CoreResult<Self> {
        let config: InstancesConfig = toml::from_str(content)
            .map_err(|e| CoreError::Config(format!("failed to parse instances TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate the instances document at `path`.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!(
                "failed to read instances file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Build a single-instance config from `ATELIER_URL` / `ATELIER_API_KEY`.
    pub fn from_env() -> CoreResult<Self> {
        let url = env::var(ENV_URL)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| CoreError::Config(format!("{} not set", ENV_URL)))?;
        let api_key = env::var(ENV_API_KEY)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| CoreError::Config(format!("{} not set", ENV_API_KEY)))?;

        let mut instances = BTreeMap::new();
        instances.insert(
            ENV_INSTANCE_NAME.to_string(),
            InstanceEntry {
                url,
                api_key,
                description: format!("from {}/{}", ENV_URL, ENV_API_KEY),
            },
        );
        let config = InstancesConfig {
            default: ENV_INSTANCE_NAME.to_string(),
            instances,
        };
        config.validate()?;
        Ok(config)
    }

    /// Resolve configuration for this process.
    ///
    /// Resolution order:
    /// 1. `ATELIER_INSTANCES_PATH` if set (missing file is an error);
    /// 2. `~/.atelier/instances.toml` if present;
    /// 3. `ATELIER_URL` + `ATELIER_API_KEY` as a one-instance registry.
    pub fn discover() -> CoreResult<Self> {
        if let Ok(path) = env::var(ENV_INSTANCES_PATH) {
            return Self::load(Path::new(&path));
        }
        let default = default_instances_path();
        if default.exists() {
            return Self::load(&default);
        }
        Self::from_env().map_err(|_| {
            CoreError::Config(format!(
                "no instances configured: create {}, or set {}, or set {} and {}",
                default.display(),
                ENV_INSTANCES_PATH,
                ENV_URL,
                ENV_API_KEY
            ))
        })
    }

    fn validate(&self) -> CoreResult<()> {
        if self.instances.is_empty() {
            return Err(CoreError::Config(
                "instances document declares no instances".to_string(),
            ));
        }
        if !self.instances.contains_key(&self.default) {
            return Err(CoreError::Config(format!(
                "default instance '{}' is not declared under [instances]",
                self.default
            )));
        }
        for (name, entry) in &self.instances {
            if entry.url.trim().is_empty() {
                return Err(CoreError::Config(format!(
                    "instance '{}' is missing a url",
                    name
                )));
            }
            url::Url::parse(&entry.url).map_err(|e| {
                CoreError::Config(format!("instance '{}' has an invalid url: {}", name, e))
            })?;
            if entry.api_key.trim().is_empty() {
                return Err(CoreError::Config(format!(
                    "instance '{}' is missing an api_key",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// The default instances file path (`~/.atelier/instances.toml`).
pub fn default_instances_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
        .join(INSTANCES_FILE)
}

/// A fully-resolved instance descriptor. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct InstanceDescriptor {
    pub name: String,
    pub url: String,
    pub api_key: String,
    pub description: String,
    pub is_default: bool,
}

/// A redacted instance view, safe to print or hand to an agent.
#[derive(Debug, Clone, Serialize)]
pub struct InstanceSummary {
    pub name: String,
    pub url: String,
    pub description: String,
    pub is_default: bool,
    pub api_key: String,
}

impl From<&InstanceDescriptor> for InstanceSummary {
    fn from(d: &InstanceDescriptor) -> Self {
        InstanceSummary {
            name: d.name.clone(),
            url: d.url.clone(),
            description: d.description.clone(),
            is_default: d.is_default,
            api_key: mask_str(&d.api_key),
        }
    }
}

/// Mask a secret for display (shows first 8 chars + "...").
pub fn mask_str(s: &str) -> String {
    if s.len() <= 8 {
        "*".repeat(s.len())
    } else {
        format!("{}...", &s[..8])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: &str = r#"
        default = "prod"

        [instances.prod]
        url = "https://atelier.example.com"
        api_key = "ak_live_1234567890"
        description = "Production"

        [instances.staging]
        url = "https://staging.atelier.example.com"
        api_key = "ak_test_1234567890"
    "#;

    #[test]
    fn test_parse_valid_config() {
        let config = InstancesConfig::from_toml_str(GOOD).unwrap();
        assert_eq!(config.default, "prod");
        assert_eq!(config.instances.len(), 2);
        assert_eq!(config.instances["staging"].description, "");
    }

    #[test]
    fn test_default_must_be_declared() {
        let bad = r#"
            default = "prod"

            [instances.staging]
            url = "https://staging.atelier.example.com"
            api_key = "k"
        "#;
        let err = InstancesConfig::from_toml_str(bad).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
        assert!(format!("{}", err).contains("prod"));
    }

    #[test]
    fn test_missing_url_or_key_rejected() {
        let no_key = r#"
            default = "a"

            [instances.a]
            url = "https://a.example.com"
            api_key = ""
        "#;
        assert!(matches!(
            InstancesConfig::from_toml_str(no_key),
            Err(CoreError::Config(_))
        ));

        let bad_url = r#"
            default = "a"

            [instances.a]
            url = "not a url"
            api_key = "k"
        "#;
        assert!(matches!(
            InstancesConfig::from_toml_str(bad_url),
            Err(CoreError::Config(_))
        ));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        assert!(matches!(
            InstancesConfig::from_toml_str("default = "),
            Err(CoreError::Config(_))
        ));
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let err = InstancesConfig::load(Path::new("/nonexistent/instances.toml")).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn test_load_from_tempfile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("instances.toml");
        std::fs::write(&path, GOOD).unwrap();
        let config = InstancesConfig::load(&path).unwrap();
        assert_eq!(config.default, "prod");
    }

    #[test]
    fn test_mask_str() {
        assert_eq!(mask_str("short"), "*****");
        assert_eq!(mask_str("ak_live_1234567890"), "ak_live_...");
    }
}
