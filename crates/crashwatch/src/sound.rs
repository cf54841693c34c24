//! Terminal bell as the sound output.

use std::io::{self, IsTerminal, Write};

use crashwatch_core::{Severity, SoundCue, SoundError, SoundPlayer};

/// Rings the terminal bell on stderr, more often for worse alerts.
#[derive(Debug, Default)]
pub struct TerminalBell;

impl TerminalBell {
    fn rings(cue: SoundCue) -> usize {
        match cue {
            SoundCue::Alert(Severity::Critical) => 3,
            SoundCue::Alert(Severity::Major) | SoundCue::Error => 2,
            SoundCue::Alert(_) | SoundCue::Disconnected => 1,
            SoundCue::Connected | SoundCue::Success => 0,
        }
    }
}

impl SoundPlayer for TerminalBell {
    fn play(&mut self, cue: SoundCue) -> Result<(), SoundError> {
        let rings = Self::rings(cue);
        if rings == 0 {
            return Ok(());
        }
        let mut stderr = io::stderr().lock();
        if !stderr.is_terminal() {
            return Err(SoundError::Blocked("stderr is not a terminal".to_string()));
        }
        stderr.write_all("\x07".repeat(rings).as_bytes())?;
        stderr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rings_scale_with_severity() {
        assert_eq!(TerminalBell::rings(SoundCue::Alert(Severity::Critical)), 3);
        assert_eq!(TerminalBell::rings(SoundCue::Alert(Severity::Minor)), 1);
        assert_eq!(TerminalBell::rings(SoundCue::Alert(Severity::Unknown)), 1);
        assert_eq!(TerminalBell::rings(SoundCue::Success), 0);
    }

    #[test]
    fn test_silent_cue_never_fails() {
        assert!(TerminalBell.play(SoundCue::Connected).is_ok());
    }
}
