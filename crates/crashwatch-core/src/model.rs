//! Displayed state: severities, detection snapshots, aggregate counters and
//! the alert timeline.
//!
//! These types carry no behavior beyond construction and bounded
//! insertion. Wire decoding lives in [`crate::event`]; writes go through
//! [`crate::store::ViewStateStore`].

use std::collections::VecDeque;
use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

/// Maximum number of entries kept in the alert timeline.
pub const TIMELINE_CAPACITY: usize = 10;

/// Categorical accident-impact level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Fender-bender class incident.
    Minor,
    /// Significant damage, likely injuries.
    Major,
    /// Life-threatening incident.
    Critical,
    /// No accident in frame.
    #[default]
    None,
    /// Severity string the dashboard does not recognize.
    Unknown,
}

impl Severity {
    /// The three severities an alert can legitimately carry, mildest first.
    pub const ALERT_LEVELS: [Severity; 3] = [Severity::Minor, Severity::Major, Severity::Critical];

    /// Parse a wire label. Matching is case-insensitive; a missing, empty
    /// or `NONE` label is [`Severity::None`], anything else unrecognized is
    /// [`Severity::Unknown`].
    pub fn from_label(label: Option<&str>) -> Self {
        let Some(label) = label.map(str::trim).filter(|l| !l.is_empty()) else {
            return Severity::None;
        };
        if label.eq_ignore_ascii_case("minor") {
            Severity::Minor
        } else if label.eq_ignore_ascii_case("major") {
            Severity::Major
        } else if label.eq_ignore_ascii_case("critical") {
            Severity::Critical
        } else if label.eq_ignore_ascii_case("none") {
            Severity::None
        } else {
            Severity::Unknown
        }
    }

    /// Upper-case wire form, as used in request paths.
    pub fn wire_name(self) -> &'static str {
        match self {
            Severity::Minor => "MINOR",
            Severity::Major => "MAJOR",
            Severity::Critical => "CRITICAL",
            Severity::None => "NONE",
            Severity::Unknown => "UNKNOWN",
        }
    }

    /// Marker identifier used by the severity indicator.
    pub fn marker_id(self) -> Option<&'static str> {
        match self {
            Severity::Minor => Some("minor"),
            Severity::Major => Some("major"),
            Severity::Critical => Some("critical"),
            Severity::None | Severity::Unknown => None,
        }
    }

    /// Short glyph shown next to alerts. Unknown severities get the default.
    pub fn icon(self) -> &'static str {
        match self {
            Severity::Minor => "⚠",
            Severity::Major => "🚑",
            Severity::Critical => "🚨",
            Severity::None => "✓",
            Severity::Unknown => "•",
        }
    }

    /// True for the three alert levels.
    pub fn is_alert_level(self) -> bool {
        matches!(self, Severity::Minor | Severity::Major | Severity::Critical)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Live-stream connectivity as shown in the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No live connection; displayed values may be stale.
    #[default]
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Receiving events.
    Connected,
}

impl ConnectionState {
    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
        }
    }
}

/// Top-level dashboard views a user can navigate between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    /// Live detection panel.
    #[default]
    Main,
    /// Alert timeline.
    History,
    /// Aggregate charts.
    Analytics,
}

impl View {
    /// Parse a view name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "main" | "dashboard" => Some(View::Main),
            "history" | "alerts" => Some(View::History),
            "analytics" | "stats" => Some(View::Analytics),
            _ => None,
        }
    }
}

/// The three contributing factors behind a severity call, each 0-100.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SeverityFactors {
    /// Bounding-box overlap between vehicles.
    pub overlap: f64,
    /// Sudden motion change.
    pub motion: f64,
    /// Debris detected around the vehicles.
    pub debris: f64,
}

/// Most recent detection state. Replaced wholesale on every detection event.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DetectionSnapshot {
    /// Whether the last frame showed an accident.
    pub accident_detected: bool,
    /// Parsed severity.
    pub severity: Severity,
    /// Severity exactly as received (kept so unknown values are still shown).
    pub severity_label: String,
    /// Confidence on the 0-100 scale.
    pub severity_confidence_pct: f64,
    /// Vehicles involved.
    pub vehicle_count: u32,
    /// Contributing factors. All zero when the payload had none.
    pub severity_factors: SeverityFactors,
    /// Camera or location label, when the server sent one.
    pub location: Option<String>,
    /// Server-side detection identifier.
    pub detection_id: Option<String>,
    /// Server timestamp, when present.
    pub timestamp: Option<NaiveDateTime>,
}

/// Per-severity accident counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SeverityCounts {
    /// MINOR count.
    pub minor: u64,
    /// MAJOR count.
    pub major: u64,
    /// CRITICAL count.
    pub critical: u64,
}

impl SeverityCounts {
    /// Counts shown before the first `stats_update` arrives.
    pub const PLACEHOLDER: SeverityCounts = SeverityCounts { minor: 12, major: 8, critical: 4 };

    /// Count for one alert level; zero for `None`/`Unknown`.
    pub fn get(&self, severity: Severity) -> u64 {
        match severity {
            Severity::Minor => self.minor,
            Severity::Major => self.major,
            Severity::Critical => self.critical,
            Severity::None | Severity::Unknown => 0,
        }
    }

    /// Sum across the three levels.
    pub fn total(&self) -> u64 {
        self.minor + self.major + self.critical
    }
}

/// Cumulative counters broadcast by the server. Merged field by field.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AggregateStats {
    /// Total accidents detected since server start.
    pub accidents_detected: u64,
    /// Accidents by severity.
    pub severity_counts: SeverityCounts,
    /// Frames processed.
    pub total_detections: Option<u64>,
    /// Alerts pushed to clients.
    pub alerts_sent: Option<u64>,
    /// Cameras currently streaming.
    pub active_cameras: Option<u64>,
    /// Dashboards connected to the server.
    pub connected_clients: Option<u64>,
    /// Server uptime as `HH:MM:SS`.
    pub uptime: Option<String>,
    /// Detector accuracy percentage.
    pub detection_accuracy: Option<f64>,
    /// Mean confidence percentage.
    pub avg_confidence: Option<f64>,
    /// Set once any `stats_update` has been merged.
    pub received: bool,
}

impl AggregateStats {
    /// Total shown before the first `stats_update` arrives.
    pub const PLACEHOLDER_TOTAL: u64 = 24;
}

/// One alert in the timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEntry {
    /// Parsed severity.
    pub severity: Severity,
    /// Severity as received.
    pub severity_label: String,
    /// Confidence on the 0-100 scale.
    pub confidence_pct: f64,
    /// When the alert happened (server time when available).
    pub timestamp: NaiveDateTime,
}

/// Newest-first alert list holding at most [`TIMELINE_CAPACITY`] entries.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Timeline {
    entries: VecDeque<TimelineEntry>,
}

impl Timeline {
    /// Create an empty timeline.
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(TIMELINE_CAPACITY),
        }
    }

    /// Prepend an entry, evicting the oldest one when full.
    pub fn push_front(&mut self, entry: TimelineEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(TIMELINE_CAPACITY);
    }

    /// Drop all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &TimelineEntry> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(n: u32) -> TimelineEntry {
        TimelineEntry {
            severity: Severity::Major,
            severity_label: "MAJOR".to_string(),
            confidence_pct: f64::from(n),
            timestamp: NaiveDateTime::default(),
        }
    }

    #[test]
    fn test_severity_from_label_case_insensitive() {
        assert_eq!(Severity::from_label(Some("critical")), Severity::Critical);
        assert_eq!(Severity::from_label(Some("Major")), Severity::Major);
        assert_eq!(Severity::from_label(Some("MINOR")), Severity::Minor);
    }

    #[test]
    fn test_severity_from_label_fallbacks() {
        assert_eq!(Severity::from_label(None), Severity::None);
        assert_eq!(Severity::from_label(Some("")), Severity::None);
        assert_eq!(Severity::from_label(Some("NONE")), Severity::None);
        assert_eq!(Severity::from_label(Some("catastrophic")), Severity::Unknown);
        assert_eq!(Severity::Unknown.icon(), "•");
        assert_eq!(Severity::Unknown.marker_id(), None);
    }

    #[test]
    fn test_timeline_evicts_oldest() {
        let mut timeline = Timeline::new();
        for n in 0..12 {
            timeline.push_front(entry(n));
        }
        assert_eq!(timeline.len(), TIMELINE_CAPACITY);
        let kept: Vec<f64> = timeline.iter().map(|e| e.confidence_pct).collect();
        let expected: Vec<f64> = (2..12).rev().map(f64::from).collect();
        assert_eq!(kept, expected);
    }

    #[test]
    fn test_view_from_name() {
        assert_eq!(View::from_name("MAIN"), Some(View::Main));
        assert_eq!(View::from_name("history"), Some(View::History));
        assert_eq!(View::from_name("analytics"), Some(View::Analytics));
        assert_eq!(View::from_name("settings"), None);
    }

    #[test]
    fn test_placeholder_counts() {
        assert_eq!(SeverityCounts::PLACEHOLDER.total(), AggregateStats::PLACEHOLDER_TOTAL);
    }
}
