//! Status banner, severity markers and connection line.

use serde::Serialize;

use crate::model::{ConnectionState, Severity};
use crate::store::ViewState;

/// Binary accident banner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BannerView {
    /// Accident in the latest snapshot.
    pub accident: bool,
    /// "ACCIDENT DETECTED" or "Normal".
    pub headline: &'static str,
    /// Indicator bar width: 0 or 100, nothing in between.
    pub progress_pct: u8,
    /// Vehicles involved.
    pub vehicle_count: u32,
    /// Camera label, when known.
    pub location: Option<String>,
}

/// Build the status banner.
pub fn status_banner(state: &ViewState) -> BannerView {
    let snapshot = &state.snapshot;
    let accident = snapshot.accident_detected;
    BannerView {
        accident,
        headline: if accident { "ACCIDENT DETECTED" } else { "Normal" },
        progress_pct: if accident { 100 } else { 0 },
        vehicle_count: snapshot.vehicle_count,
        location: snapshot.location.clone(),
    }
}

/// One severity marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeverityMarker {
    /// Marker identifier (`minor`, `major`, `critical`).
    pub id: &'static str,
    /// Highlighted.
    pub active: bool,
}

/// Severity dots with at most one highlighted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeverityIndicatorView {
    /// Markers, mildest first.
    pub markers: [SeverityMarker; 3],
    /// Severity label as received.
    pub label: String,
    /// Glyph; the default one for unrecognized severities.
    pub icon: &'static str,
}

const MARKER_IDS: [&str; 3] = ["minor", "major", "critical"];

/// Build the severity indicator. The received label is matched
/// case-insensitively against the marker identifiers.
pub fn severity_indicator(state: &ViewState) -> SeverityIndicatorView {
    let label = state.snapshot.severity_label.trim();
    let markers = MARKER_IDS.map(|id| SeverityMarker {
        id,
        active: id.eq_ignore_ascii_case(label),
    });
    SeverityIndicatorView {
        markers,
        label: state.snapshot.severity_label.clone(),
        icon: state.snapshot.severity.icon(),
    }
}

/// Connection line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionView {
    /// Current state.
    pub state: ConnectionState,
    /// Displayed values predate the last disconnect.
    pub stale: bool,
    /// Connected dashboards, when the server reported it.
    pub client_count: Option<u64>,
    /// Severity of the displayed snapshot.
    pub severity: Severity,
}

/// Build the connection line.
pub fn connection_view(state: &ViewState) -> ConnectionView {
    ConnectionView {
        state: state.connection,
        stale: state.is_stale(),
        client_count: state.client_count,
        severity: state.snapshot.severity,
    }
}
