//! Recent-alerts list.

use serde::Serialize;

use crate::model::Severity;
use crate::store::ViewState;

/// One rendered alert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineRow {
    /// Severity glyph.
    pub icon: &'static str,
    /// Severity as received.
    pub severity: String,
    /// Parsed severity, for coloring.
    pub level: Severity,
    /// Confidence with one decimal.
    pub confidence: String,
    /// `HH:MM:SS`.
    pub time: String,
}

/// Alerts, newest first.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TimelineView {
    /// Rows.
    pub rows: Vec<TimelineRow>,
}

/// Build the timeline list.
pub fn timeline_view(state: &ViewState) -> TimelineView {
    let rows = state
        .timeline
        .iter()
        .map(|entry| TimelineRow {
            icon: entry.severity.icon(),
            severity: entry.severity_label.to_uppercase(),
            level: entry.severity,
            confidence: format!("{:.1}%", entry.confidence_pct),
            time: entry.timestamp.format("%H:%M:%S").to_string(),
        })
        .collect();
    TimelineView { rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TimelineEntry;
    use crate::store::ViewStateStore;
    use chrono::NaiveDate;

    #[test]
    fn test_rows_newest_first() {
        let mut store = ViewStateStore::new();
        for (minute, label) in [(1, "minor"), (2, "CRITICAL")] {
            store.push_timeline(TimelineEntry {
                severity: Severity::from_label(Some(label)),
                severity_label: label.to_string(),
                confidence_pct: 91.04,
                timestamp: NaiveDate::from_ymd_opt(2026, 3, 1)
                    .unwrap()
                    .and_hms_opt(8, minute, 5)
                    .unwrap(),
            });
        }

        let view = timeline_view(store.state());
        assert_eq!(view.rows.len(), 2);
        assert_eq!(view.rows[0].severity, "CRITICAL");
        assert_eq!(view.rows[0].time, "08:02:05");
        assert_eq!(view.rows[1].severity, "MINOR");
        assert_eq!(view.rows[1].confidence, "91.0%");
    }
}
