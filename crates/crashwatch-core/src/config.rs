//! Runtime settings for a dashboard session.
//!
//! The binary fills these from `config.toml` and command-line flags; the
//! core only validates and consumes them.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;

/// Default detection server.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";

/// Toasts disappear on their own after this long.
pub const DEFAULT_TOAST_TTL: Duration = Duration::from_secs(5);

/// Settings for one dashboard session.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DashboardSettings {
    /// Base URL of the detection server (`http://host:port`).
    pub server_url: String,

    /// Pause between reconnect attempts, in milliseconds.
    pub reconnect_delay_ms: u64,

    /// Give up after this many failed attempts in a row (`None` = never).
    pub max_reconnect_attempts: Option<u32>,

    /// How long the server may take to accept the stream, in milliseconds.
    pub connect_timeout_ms: u64,

    /// Toast lifetime, in milliseconds.
    pub toast_ttl_ms: u64,

    /// Play alert sounds.
    pub sound: bool,

    /// Where to write rendered chart SVGs (not written when unset).
    pub charts_dir: Option<PathBuf>,

    /// Chart width in pixels.
    pub chart_width: u32,

    /// Chart height in pixels.
    pub chart_height: u32,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            reconnect_delay_ms: 2000,
            max_reconnect_attempts: None,
            connect_timeout_ms: 10_000,
            toast_ttl_ms: u64::try_from(DEFAULT_TOAST_TTL.as_millis()).unwrap_or(5000),
            sound: true,
            charts_dir: None,
            chart_width: 480,
            chart_height: 260,
        }
    }
}

impl DashboardSettings {
    /// Check values that would otherwise fail later and less clearly.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.server_url).map_err(|e| ConfigError::Invalid {
            key: "server_url",
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                key: "server_url",
                reason: format!("unsupported scheme '{}', expected http or https", url.scheme()),
            });
        }
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "connect_timeout_ms",
                reason: "must be non-zero".to_string(),
            });
        }
        if self.chart_width == 0 || self.chart_height == 0 {
            return Err(ConfigError::Invalid {
                key: "chart_width/chart_height",
                reason: "chart dimensions must be non-zero".to_string(),
            });
        }
        Ok(())
    }

    /// Reconnect pause.
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Upper bound on the stream handshake.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Toast lifetime.
    pub fn toast_ttl(&self) -> Duration {
        Duration::from_millis(self.toast_ttl_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = DashboardSettings::default();
        settings.validate().unwrap();
        assert_eq!(settings.toast_ttl(), Duration::from_secs(5));
        assert_eq!(settings.reconnect_delay(), Duration::from_secs(2));
        assert_eq!(settings.connect_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_rejects_zero_connect_timeout() {
        let settings = DashboardSettings {
            connect_timeout_ms: 0,
            ..DashboardSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::Invalid { key: "connect_timeout_ms", .. })
        ));
    }

    #[test]
    fn test_rejects_non_http_url() {
        let settings = DashboardSettings {
            server_url: "ftp://example.com".to_string(),
            ..DashboardSettings::default()
        };
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid { key: "server_url", .. })));
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let settings: DashboardSettings =
            serde_json::from_str(r#"{"server_url":"http://10.0.0.2:5000","sound":false}"#).unwrap();
        assert_eq!(settings.server_url, "http://10.0.0.2:5000");
        assert!(!settings.sound);
        assert_eq!(settings.chart_width, 480);
    }
}
