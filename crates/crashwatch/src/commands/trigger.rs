//! Ask the server to broadcast a simulated accident alert.

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use tracing::instrument;

use crashwatch_core::{ActionClient, DashboardSettings, Severity};

use super::SeverityArg;

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Severity of the simulated accident
    #[arg(value_enum)]
    pub severity: SeverityArg,
}

#[instrument(level = "info", name = "cmd::trigger", skip_all)]
pub async fn execute(args: &Args, settings: &DashboardSettings) -> Result<()> {
    let severity = Severity::from(args.severity);
    let client = ActionClient::new(&settings.server_url)?;
    let response = client
        .trigger_alert(severity)
        .await
        .with_context(|| format!("Failed to simulate {severity} alert"))?;

    println!(
        "{}",
        response
            .message
            .unwrap_or_else(|| format!("{severity} accident simulated"))
    );
    Ok(())
}
