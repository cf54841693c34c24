//! Shell completion scripts.
//!
//! ```bash
//! eval "$(crashwatch completions bash)"                            # ~/.bashrc
//! eval "$(crashwatch completions zsh)"                             # ~/.zshrc
//! crashwatch completions fish > ~/.config/fish/completions/crashwatch.fish
//! crashwatch completions powershell >> $PROFILE
//! ```

use std::io;

use anyhow::Result;
use clap::{Args as ClapArgs, CommandFactory, ValueEnum};
use clap_complete::{Shell, generate};

use crate::Cli;

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: ShellType,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ShellType {
    Bash,
    Zsh,
    Fish,
    Powershell,
    Elvish,
}

impl From<ShellType> for Shell {
    fn from(shell: ShellType) -> Self {
        match shell {
            ShellType::Bash => Shell::Bash,
            ShellType::Zsh => Shell::Zsh,
            ShellType::Fish => Shell::Fish,
            ShellType::Powershell => Shell::PowerShell,
            ShellType::Elvish => Shell::Elvish,
        }
    }
}

pub fn execute(args: &Args) -> Result<()> {
    let mut cmd = Cli::command();
    generate(Shell::from(args.shell), &mut cmd, "crashwatch", &mut io::stdout());
    Ok(())
}
