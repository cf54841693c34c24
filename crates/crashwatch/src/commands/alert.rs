//! Single alert lookup.

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use comfy_table::Cell;
use tracing::instrument;

use crashwatch_core::{ActionClient, DashboardSettings};

use crate::output::{OutputFormat, create_table, or_dash, severity_cell};

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Alert or detection id
    pub id: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[instrument(level = "info", name = "cmd::alert", skip_all, fields(id = %args.id))]
pub async fn execute(args: &Args, settings: &DashboardSettings) -> Result<()> {
    let client = ActionClient::new(&settings.server_url)?;
    let alert = client
        .alert(&args.id)
        .await
        .with_context(|| format!("Failed to fetch alert '{}'", args.id))?;

    if args.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&alert)?);
        return Ok(());
    }

    let snapshot = alert.to_snapshot(true);
    let factors = snapshot.severity_factors;
    let mut table = create_table();
    table.set_header(vec!["Property", "Value"]);
    table.add_row(vec![Cell::new("ID"), Cell::new(or_dash(snapshot.detection_id.as_deref()))]);
    table.add_row(vec![
        Cell::new("Severity"),
        severity_cell(snapshot.severity, &snapshot.severity_label),
    ]);
    table.add_row(vec![
        Cell::new("Confidence"),
        Cell::new(format!("{:.1}%", snapshot.severity_confidence_pct)),
    ]);
    table.add_row(vec![Cell::new("Vehicles"), Cell::new(snapshot.vehicle_count)]);
    table.add_row(vec![Cell::new("Location"), Cell::new(or_dash(snapshot.location.as_deref()))]);
    table.add_row(vec![
        Cell::new("Time"),
        Cell::new(or_dash(snapshot.timestamp.map(|t| t.format("%Y-%m-%d %H:%M:%S")))),
    ]);
    table.add_row(vec![
        Cell::new("Factors"),
        Cell::new(format!(
            "overlap {:.0}%, motion {:.0}%, debris {:.0}%",
            factors.overlap, factors.motion, factors.debris
        )),
    ]);
    println!("{table}");
    Ok(())
}
