//! Recent alerts from the server's history.

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use comfy_table::Cell;
use tracing::instrument;

use crashwatch_core::{ActionClient, DashboardSettings, Severity};

use super::SeverityArg;
use crate::output::{OutputFormat, create_table, or_dash, severity_cell};

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Maximum number of alerts to show
    #[arg(short, long, default_value = "10")]
    pub limit: u32,

    /// Only show alerts of this severity
    #[arg(short, long, value_enum)]
    pub severity: Option<SeverityArg>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[instrument(level = "info", name = "cmd::alerts", skip_all)]
pub async fn execute(args: &Args, settings: &DashboardSettings) -> Result<()> {
    let client = ActionClient::new(&settings.server_url)?;
    let history = client
        .alerts(args.limit, args.severity.map(Severity::from))
        .await
        .context("Failed to fetch alerts")?;

    if args.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }

    if history.alerts.is_empty() {
        println!("No alerts");
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec!["Time", "Severity", "Confidence", "Vehicles", "Location"]);
    // Newest first, like the dashboard timeline.
    for alert in history.alerts.iter().rev() {
        let entry = alert.to_timeline_entry();
        table.add_row(vec![
            Cell::new(entry.timestamp.format("%Y-%m-%d %H:%M:%S")),
            severity_cell(entry.severity, &entry.severity_label),
            Cell::new(format!("{:.1}%", entry.confidence_pct)),
            Cell::new(or_dash(alert.vehicle_count)),
            Cell::new(or_dash(alert.location.as_deref())),
        ]);
    }
    println!("{table}");
    if let Some(total) = history.total {
        println!("Showing {} of {total} alerts", history.alerts.len());
    }
    Ok(())
}
