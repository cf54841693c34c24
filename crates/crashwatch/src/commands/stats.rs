//! Aggregate counters from the server.

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use comfy_table::Cell;
use tracing::instrument;

use crashwatch_core::{ActionClient, AggregateStats, DashboardSettings, Severity};

use crate::output::{OutputFormat, create_table, or_dash, severity_cell};

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[instrument(level = "info", name = "cmd::stats", skip_all)]
pub async fn execute(args: &Args, settings: &DashboardSettings) -> Result<()> {
    let client = ActionClient::new(&settings.server_url)?;
    let payload = client.stats().await.context("Failed to fetch statistics")?;

    let mut stats = AggregateStats::default();
    payload.merge_into(&mut stats);

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Table => print_stats_table(&stats),
    }
    Ok(())
}

fn print_stats_table(stats: &AggregateStats) {
    let mut table = create_table();
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec![Cell::new("Accidents detected"), Cell::new(stats.accidents_detected)]);
    for severity in Severity::ALERT_LEVELS {
        table.add_row(vec![
            severity_cell(severity, severity.wire_name()),
            Cell::new(stats.severity_counts.get(severity)),
        ]);
    }
    let rows = [
        ("Total detections", or_dash(stats.total_detections)),
        ("Alerts sent", or_dash(stats.alerts_sent)),
        ("Active cameras", or_dash(stats.active_cameras)),
        ("Connected clients", or_dash(stats.connected_clients)),
        ("Uptime", or_dash(stats.uptime.as_deref())),
        ("Detection accuracy", or_dash(stats.detection_accuracy.map(|v| format!("{v:.1}%")))),
        ("Average confidence", or_dash(stats.avg_confidence.map(|v| format!("{v:.1}%")))),
    ];
    for (name, value) in rows {
        table.add_row(vec![Cell::new(name), Cell::new(value)]);
    }
    println!("{table}");
}
