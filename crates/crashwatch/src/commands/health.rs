//! Server health check.

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use tracing::instrument;

use crashwatch_core::{ActionClient, DashboardSettings};

use crate::output::{OutputFormat, create_table, or_dash};

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[instrument(level = "info", name = "cmd::health", skip_all)]
pub async fn execute(args: &Args, settings: &DashboardSettings) -> Result<()> {
    let client = ActionClient::new(&settings.server_url)?;
    let health = client.health().await.context("Health check failed")?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&health)?),
        OutputFormat::Table => {
            let mut table = create_table();
            table.set_header(vec!["Property", "Value"]);
            table.add_row(vec!["Server".to_string(), client.base_url().to_string()]);
            table.add_row(vec!["Status".to_string(), health.status.clone()]);
            table.add_row(vec!["Version".to_string(), or_dash(health.version.as_deref())]);
            table.add_row(vec!["Connections".to_string(), or_dash(health.connections)]);
            table.add_row(vec!["Features".to_string(), health.features.join(", ")]);
            table.add_row(vec!["Server time".to_string(), or_dash(health.timestamp.as_deref())]);
            println!("{table}");
        }
    }
    Ok(())
}
