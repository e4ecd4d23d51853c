//! Data exploration and inspection helpers.
//!
//! These combine multiple API calls into single useful views.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::api::types::{DatasetListItem, RecipeListItem, ScenarioListItem};
use crate::api::AtelierClient;
use crate::errors::CoreResult;

/// Comprehensive view of one dataset.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetInfo {
    pub name: String,
    pub dataset_type: String,
    pub connection: Option<String>,
    /// (column name, column type) pairs.
    pub columns: Vec<(String, String)>,
    /// Last computed row count, when the platform has one.
    pub row_count: Option<i64>,
    /// Up to `sample_size` rows, as column-name → value records.
    pub sample: Vec<Value>,
}

/// Get comprehensive information about a dataset.
///
/// Row count and sample rows are best-effort: a dataset that was never
/// built has neither, and that is not an error.
pub async fn dataset_info(
    client: &AtelierClient,
    project_key: &str,
    dataset_name: &str,
    sample_size: usize,
) -> CoreResult<DatasetInfo> {
    let datasets = client.datasets(project_key);

    let schema = datasets.schema(dataset_name).await?;
    let columns: Vec<(String, String)> = schema
        .columns
        .iter()
        .map(|c| (c.name.clone(), c.column_type.clone()))
        .collect();

    let listing = datasets.list().await?;
    let entry = listing.iter().find(|d| d.name == dataset_name);
    let (dataset_type, connection) = match entry {
        Some(d) => (d.dataset_type.clone(), d.connection.clone()),
        None => (String::new(), None),
    };

    let row_count = datasets.record_count(dataset_name).await.unwrap_or(None);

    let sample = match datasets.rows(dataset_name, sample_size).await {
        Ok(page) => rows_to_records(&page.columns, &page.rows),
        Err(e) => {
            debug!(dataset = dataset_name, error = %e, "sample fetch failed, returning empty sample");
            Vec::new()
        }
    };

    Ok(DatasetInfo {
        name: dataset_name.to_string(),
        dataset_type,
        connection,
        columns,
        row_count,
        sample,
    })
}

/// Summary of one project's contents.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectSummary {
    pub key: String,
    pub name: String,
    pub description: String,
    pub datasets: Vec<DatasetListItem>,
    pub recipes: Vec<RecipeListItem>,
    pub scenarios: Vec<ScenarioListItem>,
    pub dataset_count: usize,
    pub recipe_count: usize,
    pub scenario_count: usize,
}

/// Get a summary of a project's contents.
pub async fn project_summary(
    client: &AtelierClient,
    project_key: &str,
) -> CoreResult<ProjectSummary> {
    let metadata = client.projects().metadata(project_key).await?;
    let datasets = client.datasets(project_key).list().await?;
    let recipes = client.recipes(project_key).list().await?;
    let scenarios = client.scenarios(project_key).list().await?;

    Ok(ProjectSummary {
        key: project_key.to_string(),
        name: if metadata.label.is_empty() {
            project_key.to_string()
        } else {
            metadata.label
        },
        description: metadata.description,
        dataset_count: datasets.len(),
        recipe_count: recipes.len(),
        scenario_count: scenarios.len(),
        datasets,
        recipes,
        scenarios,
    })
}

/// One row of the all-projects summary listing.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectListSummary {
    pub key: String,
    pub name: String,
    pub owner: Option<String>,
}

/// Get a one-line summary of every project.
pub async fn list_projects_summary(
    client: &AtelierClient,
) -> CoreResult<Vec<ProjectListSummary>> {
    let projects = client.projects().list().await?;
    Ok(projects
        .into_iter()
        .map(|p| ProjectListSummary {
            key: p.project_key,
            name: p.name,
            owner: p.owner,
        })
        .collect())
}

/// Zip a row page into column-name → value records.
pub(crate) fn rows_to_records(columns: &[String], rows: &[Vec<Value>]) -> Vec<Value> {
    rows.iter()
        .map(|row| {
            let map: serde_json::Map<String, Value> = columns
                .iter()
                .cloned()
                .zip(row.iter().cloned())
                .collect();
            Value::Object(map)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_dataset_info_tolerates_missing_metrics_and_rows() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/projects/SALES/datasets/orders/schema");
            then.status(200).json_body(json!({
                "columns": [
                    {"name": "id", "type": "bigint"},
                    {"name": "amount", "type": "double"}
                ]
            }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/api/projects/SALES/datasets");
            then.status(200).json_body(json!([
                {"name": "orders", "type": "PostgreSQL", "connection": "warehouse"}
            ]));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/projects/SALES/datasets/orders/metrics/records");
            then.status(404);
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/projects/SALES/datasets/orders/rows");
            then.status(500);
        });

        let client = AtelierClient::new(&server.base_url(), "ak_test").unwrap();
        let info = dataset_info(&client, "SALES", "orders", 5).await.unwrap();
        assert_eq!(info.dataset_type, "PostgreSQL");
        assert_eq!(info.connection.as_deref(), Some("warehouse"));
        assert_eq!(info.columns.len(), 2);
        assert_eq!(info.row_count, None);
        assert!(info.sample.is_empty());
    }

    #[test]
    fn test_rows_to_records() {
        let columns = vec!["id".to_string(), "amount".to_string()];
        let rows = vec![vec![json!(1), json!(100.0)], vec![json!(2), json!(200.0)]];
        let records = rows_to_records(&columns, &rows);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["id"], 1);
        assert_eq!(records[1]["amount"], 200.0);
    }
}
