//! Camera roster and status.

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use comfy_table::{Cell, Color};
use tracing::instrument;

use crashwatch_core::{ActionClient, DashboardSettings};

use crate::output::{OutputFormat, create_table, or_dash};

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[instrument(level = "info", name = "cmd::camera", skip_all)]
pub async fn execute(args: &Args, settings: &DashboardSettings) -> Result<()> {
    let client = ActionClient::new(&settings.server_url)?;
    let cameras = client.cameras().await.context("Failed to fetch camera status")?;

    if args.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&cameras)?);
        return Ok(());
    }

    if cameras.is_empty() {
        println!("No cameras");
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec!["ID", "Name", "Type", "Status"]);
    for camera in &cameras {
        let color = match camera.status.as_str() {
            "active" => Color::Green,
            "maintenance" => Color::Yellow,
            _ => Color::DarkGrey,
        };
        table.add_row(vec![
            Cell::new(camera.id),
            Cell::new(&camera.name),
            Cell::new(or_dash(camera.kind.as_deref())),
            Cell::new(&camera.status).fg(color),
        ]);
    }
    println!("{table}");

    let active = cameras.iter().filter(|c| c.status == "active").count();
    println!("{active} of {} cameras active", cameras.len());
    Ok(())
}
