//! Export the server's alert history as JSON or CSV.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, ValueEnum};
use tracing::instrument;

use crashwatch_core::{ActionClient, DashboardSettings, ExportFormat};

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Export format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: FormatArg,

    /// Write to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum FormatArg {
    Json,
    Csv,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => ExportFormat::Json,
            FormatArg::Csv => ExportFormat::Csv,
        }
    }
}

#[instrument(level = "info", name = "cmd::export", skip_all)]
pub async fn execute(args: &Args, settings: &DashboardSettings) -> Result<()> {
    let client = ActionClient::new(&settings.server_url)?;
    let body = client
        .export_alerts(args.format.into())
        .await
        .context("Failed to export alerts")?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, &body)
                .with_context(|| format!("Failed to write export: {}", path.display()))?;
            eprintln!("Wrote {} bytes to {}", body.len(), path.display());
        }
        None => println!("{body}"),
    }
    Ok(())
}
