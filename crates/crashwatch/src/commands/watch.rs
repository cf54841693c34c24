//! Live dashboard.
//!
//! Connects to the detection server, keeps the terminal view in sync with
//! the event stream and reads simple commands from stdin:
//!
//! ```text
//! minor | major | critical   simulate an alert
//! clear                      clear the alert history
//! main | history | ...       switch view
//! dismiss                    hide the newest toast
//! quit                       leave
//! ```

use std::io::{self, BufRead, IsTerminal};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use tokio::sync::{mpsc, watch};
use tracing::instrument;

use crashwatch_core::{DashboardContext, DashboardSettings, SoundPlayer, UserCommand};

use crate::sound::TerminalBell;
use crate::surface::{SurfaceMode, TerminalSurface};

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Do not ring the terminal bell on alerts
    #[arg(long)]
    pub no_sound: bool,

    /// Also write the aggregate charts as SVG files into this directory
    #[arg(long, value_name = "DIR")]
    pub charts_dir: Option<PathBuf>,

    /// Ignore stdin (no interactive commands)
    #[arg(long)]
    pub no_input: bool,
}

#[instrument(level = "info", name = "cmd::watch", skip_all)]
pub async fn execute(args: &Args, settings: DashboardSettings) -> Result<()> {
    let stdout = io::stdout();
    let mode = if stdout.is_terminal() {
        SurfaceMode::Interactive
    } else {
        SurfaceMode::Append
    };
    tracing::info!(server = %settings.server_url, ?mode, "starting dashboard");

    let sound: Box<dyn SoundPlayer> = Box::new(TerminalBell);
    let mut ctx = DashboardContext::new(settings, TerminalSurface::new(stdout, mode), Some(sound))?;

    let (stop_tx, stop_rx) = watch::channel(false);
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(true);
    })
    .context("Failed to set signal handler")?;

    let (command_tx, command_rx) = mpsc::unbounded_channel();
    if !args.no_input {
        spawn_stdin_reader(command_tx);
    }

    ctx.run(command_rx, stop_rx).await?;
    tracing::info!(
        dispatched = ctx.dispatcher().dispatched(),
        dropped = ctx.dispatcher().dropped(),
        frames = ctx.surface().frames_written(),
        "dashboard closed"
    );
    Ok(())
}

/// Stdin is read on a plain thread; a blocked read must not hold up
/// runtime shutdown.
fn spawn_stdin_reader(tx: mpsc::UnboundedSender<UserCommand>) {
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match UserCommand::parse(&line) {
                Some(command) => {
                    if tx.send(command).is_err() {
                        break;
                    }
                }
                None => tracing::warn!(input = %line.trim(), "unknown command"),
            }
        }
    });
}
