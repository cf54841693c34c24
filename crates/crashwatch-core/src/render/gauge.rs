//! Confidence gauge.

use std::f64::consts::PI;

use serde::Serialize;

use crate::store::ViewState;

/// Gauge arc radius.
pub const GAUGE_RADIUS: f64 = 54.0;

/// Full arc length.
pub const GAUGE_CIRCUMFERENCE: f64 = 2.0 * PI * GAUGE_RADIUS;

/// Color band for a confidence value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GaugeBand {
    /// 85 and above.
    Good,
    /// 65 up to (not including) 85.
    Warn,
    /// Below 65.
    Bad,
}

impl GaugeBand {
    /// Band for a 0-100 confidence. Lower bounds are inclusive.
    pub fn for_confidence(pct: f64) -> Self {
        if pct >= 85.0 {
            GaugeBand::Good
        } else if pct >= 65.0 {
            GaugeBand::Warn
        } else {
            GaugeBand::Bad
        }
    }

    /// CSS-style class name.
    pub fn class(self) -> &'static str {
        match self {
            GaugeBand::Good => "good",
            GaugeBand::Warn => "warn",
            GaugeBand::Bad => "bad",
        }
    }
}

/// Confidence gauge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GaugeView {
    /// Confidence as stored.
    pub value_pct: f64,
    /// Label with one decimal, e.g. `87.0%`.
    pub label: String,
    /// Arc length.
    pub circumference: f64,
    /// `circumference × (1 − confidence/100)`, with confidence clamped to 0-100.
    pub dash_offset: f64,
    /// Color band.
    pub band: GaugeBand,
}

impl GaugeView {
    /// Fraction of the arc drawn, 0.0-1.0.
    pub fn filled_fraction(&self) -> f64 {
        1.0 - self.dash_offset / self.circumference
    }
}

/// Build the gauge.
pub fn confidence_gauge(state: &ViewState) -> GaugeView {
    let value = state.snapshot.severity_confidence_pct;
    let clamped = if value.is_finite() { value.clamp(0.0, 100.0) } else { 0.0 };
    GaugeView {
        value_pct: value,
        label: format!("{value:.1}%"),
        circumference: GAUGE_CIRCUMFERENCE,
        dash_offset: GAUGE_CIRCUMFERENCE * (1.0 - clamped / 100.0),
        band: GaugeBand::for_confidence(value),
    }
}
