//! Build a dataset and wait for completion.
//!
//! Usage:
//!     cargo run --example build_and_wait -- PROJECT_KEY DATASET_NAME

use atelier::{BuildMode, WaitOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "atelier=debug,atelier_core=debug".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let project_key = args.next().unwrap_or_else(|| "SALES".to_string());
    let dataset_name = args.next().unwrap_or_else(|| "orders".to_string());

    let hub = atelier::init(None)?;
    for instance in hub.list() {
        let marker = if instance.is_default { "*" } else { " " };
        println!("{} {} {} ({})", marker, instance.name, instance.url, instance.api_key);
    }

    let client = hub.client()?;
    let result = atelier::build_and_wait(
        &client,
        &project_key,
        &dataset_name,
        BuildMode::default(),
        &WaitOptions::from_secs(600, 2),
    )
    .await?;

    println!(
        "{} {} in {:.1}s (success={})",
        result.target, result.terminal_status, result.duration_secs, result.success
    );
    println!("{}", serde_json::to_string_pretty(&result.diagnostics)?);
    Ok(())
}
