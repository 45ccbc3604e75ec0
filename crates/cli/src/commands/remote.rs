//! Commands against a running insights server

use anyhow::Result;
use colored::Colorize;
use std::path::Path;

use super::load_data_dir;
use crate::client::{ApiClient, InsightsResponse, ServiceHealth};
use crate::output::{color_status, print_error, print_insights, print_warning, OutputFormat};

/// Fetch insights; posts local collections when a data directory is given
pub async fn run_remote(
    client: &ApiClient,
    data_dir: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let response: InsightsResponse = match data_dir {
        Some(dir) => {
            let raw = load_data_dir(dir).await?;
            client.submit_insights(&raw).await?
        }
        None => client.stored_insights().await?,
    };

    print_insights(&response.insights, format);

    if response.failed {
        print_error("Server reported a failure");
        anyhow::bail!("server reported a failure");
    }
    Ok(())
}

/// Show server health
pub async fn run_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health: ServiceHealth = client.get("health").await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&health)?),
        OutputFormat::Table => {
            println!("{}", "Service Health".bold());
            println!("{}", "=".repeat(40));
            println!("Status:        {}", color_status(&health.status));
            println!(
                "Model:         {}",
                health.model_version.as_deref().unwrap_or("none")
            );
            println!("Endpoints:     {}", health.endpoints.join(", "));
            if !health.model_loaded {
                print_warning("No model loaded, the server returns fixed insights");
            }
        }
    }
    Ok(())
}
