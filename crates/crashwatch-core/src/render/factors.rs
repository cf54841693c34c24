//! Severity-factor bars.

use serde::Serialize;

use crate::store::ViewState;

/// One factor bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorBar {
    /// Factor name.
    pub name: &'static str,
    /// Value as received.
    pub value: f64,
    /// Value with no decimals.
    pub label: String,
    /// Bar width, clamped to 0-100.
    pub width_pct: f64,
}

impl FactorBar {
    fn new(name: &'static str, value: f64) -> Self {
        let value = if value.is_finite() { value } else { 0.0 };
        Self {
            name,
            value,
            label: format!("{value:.0}"),
            width_pct: value.clamp(0.0, 100.0),
        }
    }
}

/// Overlap, motion and debris, always all three.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorBarsView {
    /// Bars in display order.
    pub bars: [FactorBar; 3],
}

/// Build the factor bars. A snapshot without factors renders three zeros.
pub fn factor_bars(state: &ViewState) -> FactorBarsView {
    let f = state.snapshot.severity_factors;
    FactorBarsView {
        bars: [
            FactorBar::new("overlap", f.overlap),
            FactorBar::new("motion", f.motion),
            FactorBar::new("debris", f.debris),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ServerEvent, kind};
    use crate::store::ViewStateStore;
    use serde_json::json;

    fn render(payload: serde_json::Value) -> Vec<String> {
        let ServerEvent::NewDetection(payload) = ServerEvent::from_wire(kind::NEW_DETECTION, payload).unwrap() else {
            panic!("expected detection");
        };
        let mut store = ViewStateStore::new();
        store.replace_snapshot(payload.to_snapshot(false));
        factor_bars(store.state()).bars.iter().map(|b| b.label.clone()).collect()
    }

    #[test]
    fn test_missing_factor_keys_render_zero() {
        assert_eq!(render(json!({"severity_factors": {"overlap": 73.4}})), vec!["73", "0", "0"]);
    }

    #[test]
    fn test_missing_factor_object_renders_zero() {
        assert_eq!(render(json!({})), vec!["0", "0", "0"]);
    }

    #[test]
    fn test_bar_width_is_clamped() {
        let bar = FactorBar::new("overlap", 130.0);
        assert_eq!(bar.label, "130");
        assert!((bar.width_pct - 100.0).abs() < f64::EPSILON);
    }
}
