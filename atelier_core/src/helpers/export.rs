//! Data extraction helpers.

use serde_json::Value;

use crate::api::AtelierClient;
use crate::errors::CoreResult;

use super::inspection::rows_to_records;

/// Read up to `limit` rows as column-name → value records.
pub async fn to_records(
    client: &AtelierClient,
    project_key: &str,
    dataset_name: &str,
    limit: usize,
) -> CoreResult<Vec<Value>> {
    let page = client.datasets(project_key).rows(dataset_name, limit).await?;
    Ok(rows_to_records(&page.columns, &page.rows))
}

/// First `n` rows of a dataset.
pub async fn head(
    client: &AtelierClient,
    project_key: &str,
    dataset_name: &str,
    n: usize,
) -> CoreResult<Vec<Value>> {
    to_records(client, project_key, dataset_name, n).await
}

/// Column names of a dataset, in schema order.
pub async fn get_column_names(
    client: &AtelierClient,
    project_key: &str,
    dataset_name: &str,
) -> CoreResult<Vec<String>> {
    let schema = client.datasets(project_key).schema(dataset_name).await?;
    Ok(schema.columns.into_iter().map(|c| c.name).collect())
}

/// Last computed row count, when the platform has one.
pub async fn count_rows(
    client: &AtelierClient,
    project_key: &str,
    dataset_name: &str,
) -> CoreResult<Option<i64>> {
    client.datasets(project_key).record_count(dataset_name).await
}

/// Render up to `limit` rows as a CSV string with a header line.
pub async fn to_csv_string(
    client: &AtelierClient,
    project_key: &str,
    dataset_name: &str,
    limit: usize,
) -> CoreResult<String> {
    let page = client.datasets(project_key).rows(dataset_name, limit).await?;
    let mut out = String::new();
    out.push_str(&csv_line(&page.columns));
    for row in &page.rows {
        let cells: Vec<String> = row.iter().map(cell_str).collect();
        out.push_str(&csv_line(&cells));
    }
    Ok(out)
}

fn cell_str(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn csv_line(fields: &[String]) -> String {
    let quoted: Vec<String> = fields
        .iter()
        .map(|f| {
            if f.contains(',') || f.contains('"') || f.contains('\n') {
                format!("\"{}\"", f.replace('"', "\"\""))
            } else {
                f.clone()
            }
        })
        .collect();
    format!("{}\n", quoted.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_to_records() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/projects/SALES/datasets/orders/rows")
                .query_param("limit", "2");
            then.status(200).json_body(json!({
                "columns": ["id", "amount"],
                "rows": [[1, 100.0], [2, 200.0]]
            }));
        });

        let client = AtelierClient::new(&server.base_url(), "ak_test").unwrap();
        let records = to_records(&client, "SALES", "orders", 2).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["id"], 1);
    }

    #[test]
    fn test_csv_quoting() {
        let fields = vec![
            "plain".to_string(),
            "has,comma".to_string(),
            "has\"quote".to_string(),
        ];
        assert_eq!(csv_line(&fields), "plain,\"has,comma\",\"has\"\"quote\"\n");
    }
}
