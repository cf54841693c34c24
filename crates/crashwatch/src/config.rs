//! Configuration file support for the crashwatch CLI.
//!
//! Configuration is stored at `~/.config/crashwatch/config.toml` (XDG standard)
//! or `~/Library/Application Support/com.crashwatch.crashwatch/config.toml` on macOS.
//! Set `CRASHWATCH_CONFIG_DIR` to use another directory.
//!
//! # Example configuration
//!
//! ```toml
//! [defaults]
//! verbosity = 1
//!
//! [dashboard]
//! server_url = "http://detector.local:5000"
//! reconnect_delay_ms = 5000
//! max_reconnect_attempts = 20
//! connect_timeout_ms = 5000
//! sound = false
//! charts_dir = "/tmp/crashwatch-charts"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crashwatch_core::DashboardSettings;

/// Environment variable overriding the configuration directory.
pub const CONFIG_DIR_ENV: &str = "CRASHWATCH_CONFIG_DIR";

/// Main configuration structure
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// CLI defaults
    #[serde(default)]
    pub defaults: Defaults,

    /// Dashboard session settings
    #[serde(default)]
    pub dashboard: DashboardSettings,
}

/// Default settings
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Defaults {
    /// Default verbosity level (0-3), used when no `-v` is given
    pub verbosity: Option<u8>,
}

/// Flags that override file values.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub server: Option<String>,
    pub no_sound: bool,
    pub charts_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default path, or return empty config if not found.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    /// Load configuration from `path`; a missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Dashboard settings with command-line overrides applied.
    pub fn settings(&self, overrides: &Overrides) -> DashboardSettings {
        let mut settings = self.dashboard.clone();
        if let Some(server) = &overrides.server {
            settings.server_url.clone_from(server);
        }
        if overrides.no_sound {
            settings.sound = false;
        }
        if let Some(dir) = &overrides.charts_dir {
            settings.charts_dir = Some(dir.clone());
        }
        settings
    }
}

/// Get the path to the configuration file.
///
/// Uses `CRASHWATCH_CONFIG_DIR` when set, otherwise the XDG config directory
/// on Linux and Application Support on macOS.
pub fn config_path() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
        return Ok(PathBuf::from(dir).join("config.toml"));
    }

    let base_dirs = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;

    #[cfg(target_os = "macos")]
    {
        let config_dir = base_dirs
            .home_dir()
            .join("Library/Application Support/com.crashwatch.crashwatch");
        Ok(config_dir.join("config.toml"))
    }

    #[cfg(not(target_os = "macos"))]
    {
        let config_dir = base_dirs.config_dir().join("crashwatch");
        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.dashboard, DashboardSettings::default());
        assert_eq!(config.defaults.verbosity, None);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[defaults]\nverbosity = 2\n\n[dashboard]\nserver_url = \"http://detector:8080\"\nsound = false\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.defaults.verbosity, Some(2));
        assert_eq!(config.dashboard.server_url, "http://detector:8080");
        assert!(!config.dashboard.sound);
        assert_eq!(config.dashboard.reconnect_delay_ms, 2000);
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[dashboard\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("config.toml"));
    }

    #[test]
    fn test_flags_override_file() {
        let config = Config::default();
        let settings = config.settings(&Overrides {
            server: Some("https://example.com".to_string()),
            no_sound: true,
            charts_dir: Some(PathBuf::from("/tmp/charts")),
        });
        assert_eq!(settings.server_url, "https://example.com");
        assert!(!settings.sound);
        assert_eq!(settings.charts_dir, Some(PathBuf::from("/tmp/charts")));
    }
}
