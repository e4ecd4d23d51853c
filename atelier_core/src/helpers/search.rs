//! Cross-project search and discovery helpers.
//!
//! Patterns are case-insensitive regexes. When searching across all
//! projects, a project that fails to enumerate (permissions, deletion
//! mid-scan) is skipped rather than failing the whole search.

use regex::{Regex, RegexBuilder};
use serde::Serialize;
use tracing::debug;

use crate::api::AtelierClient;
use crate::errors::{CoreError, CoreResult};

/// One dataset search hit.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetMatch {
    pub project_key: String,
    pub name: String,
    pub dataset_type: String,
    pub connection: Option<String>,
}

/// One recipe search hit.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeMatch {
    pub project_key: String,
    pub name: String,
    pub recipe_type: String,
}

/// One scenario search hit.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioMatch {
    pub project_key: String,
    pub id: String,
    pub name: String,
}

fn compile(pattern: &str) -> CoreResult<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| CoreError::validation(format!("invalid search pattern: {}", e)))
}

async fn scope_keys(
    client: &AtelierClient,
    project_key: Option<&str>,
) -> CoreResult<Vec<String>> {
    match project_key {
        Some(key) => Ok(vec![key.to_string()]),
        None => client.projects().keys().await,
    }
}

/// Find datasets whose name matches a pattern.
pub async fn find_datasets(
    client: &AtelierClient,
    pattern: &str,
    project_key: Option<&str>,
) -> CoreResult<Vec<DatasetMatch>> {
    let regex = compile(pattern)?;
    let mut results = Vec::new();
    for key in scope_keys(client, project_key).await? {
        let datasets = match client.datasets(&key).list().await {
            Ok(d) => d,
            Err(e) => {
                debug!(project = %key, error = %e, "skipping project during dataset search");
                continue;
            }
        };
        for d in datasets {
            if regex.is_match(&d.name) {
                results.push(DatasetMatch {
                    project_key: key.clone(),
                    name: d.name,
                    dataset_type: d.dataset_type,
                    connection: d.connection,
                });
            }
        }
    }
    Ok(results)
}

/// Find recipes whose name matches a pattern.
pub async fn find_recipes(
    client: &AtelierClient,
    pattern: &str,
    project_key: Option<&str>,
) -> CoreResult<Vec<RecipeMatch>> {
    let regex = compile(pattern)?;
    let mut results = Vec::new();
    for key in scope_keys(client, project_key).await? {
        let recipes = match client.recipes(&key).list().await {
            Ok(r) => r,
            Err(e) => {
                debug!(project = %key, error = %e, "skipping project during recipe search");
                continue;
            }
        };
        for r in recipes {
            if regex.is_match(&r.name) {
                results.push(RecipeMatch {
                    project_key: key.clone(),
                    name: r.name,
                    recipe_type: r.recipe_type,
                });
            }
        }
    }
    Ok(results)
}

/// Find scenarios whose id or name matches a pattern.
pub async fn find_scenarios(
    client: &AtelierClient,
    pattern: &str,
    project_key: Option<&str>,
) -> CoreResult<Vec<ScenarioMatch>> {
    let regex = compile(pattern)?;
    let mut results = Vec::new();
    for key in scope_keys(client, project_key).await? {
        let scenarios = match client.scenarios(&key).list().await {
            Ok(s) => s,
            Err(e) => {
                debug!(project = %key, error = %e, "skipping project during scenario search");
                continue;
            }
        };
        for s in scenarios {
            if regex.is_match(&s.name) || regex.is_match(&s.id) {
                results.push(ScenarioMatch {
                    project_key: key.clone(),
                    id: s.id,
                    name: s.name,
                });
            }
        }
    }
    Ok(results)
}

/// Find every dataset that reads or writes through a named connection.
pub async fn find_by_connection(
    client: &AtelierClient,
    connection_name: &str,
) -> CoreResult<Vec<DatasetMatch>> {
    let mut results = Vec::new();
    for key in client.projects().keys().await? {
        let datasets = match client.datasets(&key).list().await {
            Ok(d) => d,
            Err(e) => {
                debug!(project = %key, error = %e, "skipping project during connection search");
                continue;
            }
        };
        for d in datasets {
            if d.connection.as_deref() == Some(connection_name) {
                results.push(DatasetMatch {
                    project_key: key.clone(),
                    name: d.name,
                    dataset_type: d.dataset_type,
                    connection: d.connection,
                });
            }
        }
    }
    Ok(results)
}
