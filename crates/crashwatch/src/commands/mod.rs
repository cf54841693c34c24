pub mod alert;
pub mod alerts;
pub mod camera;
pub mod clear;
pub mod completions;
pub mod export;
pub mod health;
pub mod replay;
pub mod stats;
pub mod trigger;
pub mod watch;

use crashwatch_core::Severity;

/// Severity accepted on the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum SeverityArg {
    Minor,
    Major,
    Critical,
}

impl From<SeverityArg> for Severity {
    fn from(arg: SeverityArg) -> Self {
        match arg {
            SeverityArg::Minor => Severity::Minor,
            SeverityArg::Major => Severity::Major,
            SeverityArg::Critical => Severity::Critical,
        }
    }
}
