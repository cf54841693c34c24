//! Clear the server's alert history.

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use tracing::instrument;

use crashwatch_core::{ActionClient, DashboardSettings};

#[derive(ClapArgs, Clone)]
pub struct Args {}

#[instrument(level = "info", name = "cmd::clear", skip_all)]
pub async fn execute(_args: &Args, settings: &DashboardSettings) -> Result<()> {
    let client = ActionClient::new(&settings.server_url)?;
    client
        .clear_history()
        .await
        .context("Failed to clear alert history")?;
    println!("Alert history cleared");
    Ok(())
}
