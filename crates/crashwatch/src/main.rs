#![deny(unsafe_code)]

// Use mimalloc for reduced allocation latency (enabled by default).
// Disable with `--no-default-features` if debugging allocator issues.
#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod commands;
mod config;
mod exit_code;
mod output;
mod sound;
mod surface;

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use clap::{ColorChoice, Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crashwatch_core::{ActionError, ConfigError, TransportError};

use crate::commands::{alert, alerts, camera, clear, completions, export, health, replay, stats, trigger, watch};
use crate::config::{Config, Overrides};

/// Keeps the log file writer alive until exit.
static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Terminal dashboard for a real-time accident-detection server
#[derive(Parser)]
#[command(name = "crashwatch")]
#[command(author, version)]
#[command(propagate_version = true)]
#[command(after_help = "EXAMPLES:
    # Live dashboard against a local detector
    crashwatch watch

    # Another server, no bell
    crashwatch --server http://detector.local:5000 watch --no-sound

    # Simulate a critical accident
    crashwatch trigger critical

    # Replay a recorded session and write the charts
    crashwatch replay session.jsonl --charts-dir ./charts
")]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// When to use colored output
    #[arg(long, value_enum, default_value = "auto", global = true)]
    color: ColorChoice,

    /// Detection server base URL (overrides the config file)
    #[arg(long, env = "CRASHWATCH_SERVER", global = true)]
    server: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "FILE", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    // ============ Live dashboard ============
    /// Show the live dashboard
    Watch(watch::Args),

    // ============ Server actions ============
    /// Simulate an accident alert
    Trigger(trigger::Args),
    /// Clear the alert history
    Clear(clear::Args),
    /// Check server health
    Health(health::Args),
    /// Show aggregate statistics
    Stats(stats::Args),
    /// List recent alerts
    Alerts(alerts::Args),
    /// Show one alert by id
    Alert(alert::Args),
    /// Show camera status
    Camera(camera::Args),
    /// Export the alert history
    Export(export::Args),

    // ============ Offline ============
    /// Replay a recorded event log
    Replay(replay::Args),
    /// Generate shell completions
    Completions(completions::Args),
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::from(exit_code::SUCCESS),
        Err(e) => {
            let code = categorize_error(&e);

            // Only print error if not quiet mode (quiet is parsed separately for this)
            let args: Vec<String> = std::env::args().collect();
            let is_quiet = args.iter().any(|a| a == "-q" || a == "--quiet");
            if !is_quiet {
                eprintln!("Error: {e:#}");
            }

            ExitCode::from(code)
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    output::set_color_choice(cli.color);

    let config = Config::load()?;

    if !cli.quiet {
        let verbose = if cli.verbose > 0 {
            cli.verbose
        } else {
            config.defaults.verbosity.unwrap_or(0)
        };
        setup_tracing(verbose, cli.log_file.as_deref())?;
    }

    let settings = config.settings(&overrides(&cli));

    match cli.command {
        Commands::Watch(args) => block_on(watch::execute(&args, settings)),
        Commands::Trigger(args) => block_on(trigger::execute(&args, &settings)),
        Commands::Clear(args) => block_on(clear::execute(&args, &settings)),
        Commands::Health(args) => block_on(health::execute(&args, &settings)),
        Commands::Stats(args) => block_on(stats::execute(&args, &settings)),
        Commands::Alerts(args) => block_on(alerts::execute(&args, &settings)),
        Commands::Alert(args) => block_on(alert::execute(&args, &settings)),
        Commands::Camera(args) => block_on(camera::execute(&args, &settings)),
        Commands::Export(args) => block_on(export::execute(&args, &settings)),
        Commands::Replay(args) => replay::execute(&args, settings),
        Commands::Completions(args) => completions::execute(&args),
    }
}

/// Command-line values that take precedence over the config file.
fn overrides(cli: &Cli) -> Overrides {
    let mut overrides = Overrides {
        server: cli.server.clone(),
        ..Overrides::default()
    };
    match &cli.command {
        Commands::Watch(args) => {
            overrides.no_sound = args.no_sound;
            overrides.charts_dir.clone_from(&args.charts_dir);
        }
        Commands::Replay(args) => {
            overrides.no_sound = true;
            overrides.charts_dir.clone_from(&args.charts_dir);
        }
        _ => {}
    }
    overrides
}

/// Run a future to completion on a single-threaded runtime. The dashboard
/// handles every input on one task, so one worker thread is enough.
fn block_on<F: Future<Output = Result<()>>>(future: F) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(future)
}

fn setup_tracing(verbose: u8, log_file: Option<&Path>) -> Result<()> {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if let Some(path) = log_file {
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        let name = path
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("Log file path has no file name: {}", path.display()))?;
        let appender = tracing_appender::rolling::never(dir, name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = LOG_GUARD.set(guard);

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(writer)
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(io::stderr)
            .init();
    }
    Ok(())
}

/// Map an error to an exit code based on its type
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if let Some(core_err) = cause.downcast_ref::<crashwatch_core::Error>() {
            match core_err {
                crashwatch_core::Error::Transport(_) => return exit_code::CONNECTION_FAILED,
                crashwatch_core::Error::Action(action_err) => return action_exit_code(action_err),
                crashwatch_core::Error::Config(_) => return exit_code::USAGE_ERROR,
                _ => {}
            }
        }

        if cause.downcast_ref::<TransportError>().is_some() {
            return exit_code::CONNECTION_FAILED;
        }

        if let Some(action_err) = cause.downcast_ref::<ActionError>() {
            return action_exit_code(action_err);
        }

        if cause.downcast_ref::<ConfigError>().is_some() {
            return exit_code::USAGE_ERROR;
        }
    }

    exit_code::GENERAL_ERROR
}

fn action_exit_code(e: &ActionError) -> u8 {
    match e {
        ActionError::Http(http) if http.is_connect() || http.is_timeout() => exit_code::CONNECTION_FAILED,
        ActionError::Url(_) => exit_code::USAGE_ERROR,
        _ => exit_code::REQUEST_FAILED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_config_error_maps_to_usage() {
        let err = anyhow::Error::new(ConfigError::Invalid {
            key: "chart_width",
            reason: "must be positive".to_string(),
        });
        assert_eq!(categorize_error(&err), exit_code::USAGE_ERROR);
    }

    #[test]
    fn test_wrapped_transport_error_maps_to_connection_failed() {
        let err = anyhow::Error::new(crashwatch_core::Error::from(TransportError::RetriesExhausted(3)))
            .context("Dashboard stopped");
        assert_eq!(categorize_error(&err), exit_code::CONNECTION_FAILED);
    }

    #[test]
    fn test_rejected_action_maps_to_request_failed() {
        let err = anyhow::Error::new(ActionError::Rejected("no".to_string())).context("Failed to clear alert history");
        assert_eq!(categorize_error(&err), exit_code::REQUEST_FAILED);
    }

    #[test]
    fn test_other_errors_are_general() {
        assert_eq!(categorize_error(&anyhow::anyhow!("boom")), exit_code::GENERAL_ERROR);
    }

    #[test]
    fn test_alert_takes_positional_id() {
        let cli = Cli::parse_from(["crashwatch", "alert", "det_42", "--format", "json"]);
        let Commands::Alert(args) = cli.command else {
            panic!("expected alert subcommand");
        };
        assert_eq!(args.id, "det_42");
        assert_eq!(args.format, crate::output::OutputFormat::Json);
    }

    #[test]
    fn test_replay_forces_sound_off() {
        let cli = Cli::parse_from(["crashwatch", "--server", "http://x:1", "replay", "log.jsonl"]);
        let overrides = overrides(&cli);
        assert!(overrides.no_sound);
        assert_eq!(overrides.server.as_deref(), Some("http://x:1"));
    }
}
