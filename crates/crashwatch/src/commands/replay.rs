//! Offline replay of a recorded event log.
//!
//! Each line of the log is one `{"event": <name>, "data": <payload>}`
//! record. The records are fed through the same dispatcher as the live
//! stream and the final dashboard frame is printed.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use serde::Serialize;
use tracing::instrument;

use crashwatch_core::{DashboardContext, DashboardSettings, ReplaySummary, ViewState};

use crate::output::OutputFormat;
use crate::surface::{Frame, SurfaceMode, TerminalSurface, render_frame};

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Event log to replay (`-` for stdin)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Write the aggregate charts as SVG files into this directory
    #[arg(long, value_name = "DIR")]
    pub charts_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Serialize)]
struct ReplayReport<'a> {
    summary: ReplaySummary,
    state: &'a ViewState,
    frame: &'a Frame,
}

#[instrument(level = "info", name = "cmd::replay", skip_all)]
pub fn execute(args: &Args, settings: DashboardSettings) -> Result<()> {
    let surface = TerminalSurface::new(io::sink(), SurfaceMode::Buffered);
    let mut ctx = DashboardContext::new(settings, surface, None)?;

    let summary = if args.file.as_os_str() == "-" {
        ctx.replay(io::stdin().lock())?
    } else {
        let file = File::open(&args.file)
            .with_context(|| format!("Failed to open event log: {}", args.file.display()))?;
        ctx.replay(BufReader::new(file))?
    };

    match args.format {
        OutputFormat::Json => {
            let report = ReplayReport {
                summary,
                state: ctx.state(),
                frame: ctx.surface().frame(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Table => {
            print!("{}", render_frame(ctx.surface().frame()));
            println!("Replayed {} events ({} skipped)", summary.applied, summary.skipped);
        }
    }
    Ok(())
}
