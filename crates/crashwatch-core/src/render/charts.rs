//! Aggregate charts and the chart-instance registry.
//!
//! Charts are rendered to SVG strings with plotters and kept in a
//! [`ChartRegistry`] owned by the dashboard context. Every stats change
//! redraws both charts from scratch; nothing is patched incrementally.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use plotters::prelude::*;
use serde::Serialize;

use crate::error::RenderError;
use crate::model::{AggregateStats, Severity, SeverityCounts};
use crate::store::ViewState;

/// Data behind the aggregate charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartsView {
    /// Per-severity counts (placeholder split before the first update).
    pub counts: SeverityCounts,
    /// Accidents detected (placeholder total before the first update).
    pub total: u64,
    /// True while showing placeholder values.
    pub placeholder: bool,
    /// Frames processed.
    pub total_detections: Option<u64>,
    /// Alerts pushed.
    pub alerts_sent: Option<u64>,
    /// Cameras streaming.
    pub active_cameras: Option<u64>,
    /// Server uptime.
    pub uptime: Option<String>,
    /// Detector accuracy percentage.
    pub detection_accuracy: Option<f64>,
    /// Mean confidence percentage.
    pub avg_confidence: Option<f64>,
}

/// Build the charts view. Placeholder values are used only until the
/// first `stats_update` has been merged.
pub fn charts_view(state: &ViewState) -> ChartsView {
    let stats = &state.stats;
    let (counts, total) = if stats.received {
        (stats.severity_counts, stats.accidents_detected)
    } else {
        (SeverityCounts::PLACEHOLDER, AggregateStats::PLACEHOLDER_TOTAL)
    };
    ChartsView {
        counts,
        total,
        placeholder: !stats.received,
        total_detections: stats.total_detections,
        alerts_sent: stats.alerts_sent,
        active_cameras: stats.active_cameras,
        uptime: stats.uptime.clone(),
        detection_accuracy: stats.detection_accuracy,
        avg_confidence: stats.avg_confidence,
    }
}

/// Charts kept by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    /// Bar chart of accidents per severity.
    SeverityDistribution,
    /// Stacked share bar with the accident total.
    AccidentShare,
}

impl ChartKind {
    /// Stable identifier, also the SVG file stem.
    pub fn name(self) -> &'static str {
        match self {
            ChartKind::SeverityDistribution => "severity_distribution",
            ChartKind::AccidentShare => "accident_share",
        }
    }
}

/// Chart-instance registry: latest SVG per chart, optionally mirrored to disk.
#[derive(Debug)]
pub struct ChartRegistry {
    out_dir: Option<PathBuf>,
    width: u32,
    height: u32,
    charts: BTreeMap<ChartKind, String>,
    redraws: u64,
}

impl ChartRegistry {
    /// Create an empty registry. With `out_dir`, each redraw also writes
    /// `<chart>.svg` there.
    pub fn new(out_dir: Option<PathBuf>, width: u32, height: u32) -> Self {
        Self {
            out_dir,
            width,
            height,
            charts: BTreeMap::new(),
            redraws: 0,
        }
    }

    /// Redraw every chart from `view`.
    pub fn redraw(&mut self, view: &ChartsView) -> Result<(), RenderError> {
        let distribution = render_distribution_chart(view, self.width, self.height)?;
        let share = render_share_chart(view, self.width, self.height / 2)?;
        self.charts.insert(ChartKind::SeverityDistribution, distribution);
        self.charts.insert(ChartKind::AccidentShare, share);
        self.redraws += 1;

        if let Some(dir) = &self.out_dir {
            write_charts(dir, &self.charts)?;
        }
        tracing::trace!(redraws = self.redraws, "charts redrawn");
        Ok(())
    }

    /// Latest SVG for a chart.
    pub fn svg(&self, kind: ChartKind) -> Option<&str> {
        self.charts.get(&kind).map(String::as_str)
    }

    /// Number of full redraws so far.
    pub fn redraw_count(&self) -> u64 {
        self.redraws
    }

    /// Where charts are written, if anywhere.
    pub fn out_dir(&self) -> Option<&Path> {
        self.out_dir.as_deref()
    }

    /// Drop all chart instances.
    pub fn release(&mut self) {
        self.charts.clear();
    }
}

fn write_charts(dir: &Path, charts: &BTreeMap<ChartKind, String>) -> Result<(), RenderError> {
    fs::create_dir_all(dir)?;
    for (kind, svg) in charts {
        fs::write(dir.join(format!("{}.svg", kind.name())), svg)?;
    }
    Ok(())
}

/// Severity palette
fn severity_color(severity: Severity) -> RGBColor {
    let hex = match severity {
        Severity::Minor => "#f59e0b",    // amber-500
        Severity::Major => "#6366f1",    // indigo-500
        Severity::Critical => "#ef4444", // red-500
        Severity::None | Severity::Unknown => "#6b7280",
    };
    let (r, g, b) = parse_hex_color(hex);
    RGBColor(r, g, b)
}

/// Parse a `#rrggbb` string.
fn parse_hex_color(hex: &str) -> (u8, u8, u8) {
    let hex = hex.trim_start_matches('#');
    let channel = |range: std::ops::Range<usize>| {
        hex.get(range)
            .and_then(|s| u8::from_str_radix(s, 16).ok())
            .unwrap_or(0)
    };
    (channel(0..2), channel(2..4), channel(4..6))
}

fn chart_error<E: std::fmt::Display>(kind: ChartKind) -> impl Fn(E) -> RenderError {
    move |e| RenderError::Chart {
        chart: kind.name(),
        reason: e.to_string(),
    }
}

/// Bar chart with one bar per severity.
fn render_distribution_chart(view: &ChartsView, width: u32, height: u32) -> Result<String, RenderError> {
    let err = chart_error(ChartKind::SeverityDistribution);
    let text = RGBColor(107, 114, 128); // gray-500

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(&err)?;

        let max = Severity::ALERT_LEVELS
            .iter()
            .map(|s| view.counts.get(*s))
            .max()
            .unwrap_or(0)
            .max(1);
        let y_max = max as f64 * 1.2;

        let caption = if view.placeholder {
            "Accidents by severity (waiting for data)".to_string()
        } else {
            "Accidents by severity".to_string()
        };

        let mut chart = ChartBuilder::on(&root)
            .margin(8)
            .caption(caption, ("sans-serif", 14, &text))
            .x_label_area_size(22)
            .y_label_area_size(36)
            .build_cartesian_2d((0u32..3u32).into_segmented(), 0.0..y_max)
            .map_err(&err)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .y_labels(4)
            .axis_style(text)
            .label_style(("sans-serif", 12, &text))
            .x_label_formatter(&|v| match v {
                SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => usize::try_from(*i)
                    .ok()
                    .and_then(|i| Severity::ALERT_LEVELS.get(i))
                    .map(|s| s.wire_name().to_string())
                    .unwrap_or_default(),
                SegmentValue::Last => String::new(),
            })
            .y_label_formatter(&|y| format!("{y:.0}"))
            .draw()
            .map_err(&err)?;

        chart
            .draw_series((0u32..).zip(Severity::ALERT_LEVELS.iter()).map(|(i, severity)| {
                let value = view.counts.get(*severity) as f64;
                let mut bar = Rectangle::new(
                    [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), value)],
                    severity_color(*severity).filled(),
                );
                bar.set_margin(0, 0, 8, 8);
                bar
            }))
            .map_err(&err)?;

        root.present().map_err(&err)?;
    }
    Ok(svg)
}

/// Horizontal stacked bar showing each severity's share, captioned with the total.
fn render_share_chart(view: &ChartsView, width: u32, height: u32) -> Result<String, RenderError> {
    let err = chart_error(ChartKind::AccidentShare);
    let text = RGBColor(107, 114, 128);

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (width, height.max(60))).into_drawing_area();
        root.fill(&WHITE).map_err(&err)?;

        let mut chart = ChartBuilder::on(&root)
            .margin(8)
            .caption(format!("Total accidents: {}", view.total), ("sans-serif", 14, &text))
            .build_cartesian_2d(0.0..100.0_f64, 0.0..1.0_f64)
            .map_err(&err)?;

        let sum = view.counts.total();
        if sum > 0 {
            let mut start = 0.0;
            let segments: Vec<_> = Severity::ALERT_LEVELS
                .iter()
                .map(|severity| {
                    let share = view.counts.get(*severity) as f64 / sum as f64 * 100.0;
                    let segment = Rectangle::new([(start, 0.1), (start + share, 0.9)], severity_color(*severity).filled());
                    start += share;
                    segment
                })
                .collect();
            chart.draw_series(segments).map_err(&err)?;
        }

        root.present().map_err(&err)?;
    }
    Ok(svg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AggregateStats;

    #[test]
    fn test_placeholder_before_first_update() {
        let view = charts_view(&ViewState::default());
        assert!(view.placeholder);
        assert_eq!(view.counts, SeverityCounts { minor: 12, major: 8, critical: 4 });
        assert_eq!(view.total, 24);
    }

    #[test]
    fn test_real_values_after_update() {
        let state = ViewState {
            stats: AggregateStats {
                accidents_detected: 3,
                severity_counts: SeverityCounts { minor: 0, major: 2, critical: 1 },
                received: true,
                ..AggregateStats::default()
            },
            ..ViewState::default()
        };
        let view = charts_view(&state);
        assert!(!view.placeholder);
        assert_eq!(view.total, 3);
        assert_eq!(view.counts.minor, 0);
    }

    #[test]
    fn test_redraw_produces_svg() {
        let mut registry = ChartRegistry::new(None, 320, 200);
        registry.redraw(&charts_view(&ViewState::default())).unwrap();
        let svg = registry.svg(ChartKind::SeverityDistribution).unwrap();
        assert!(svg.contains("<svg"));
        assert!(registry.svg(ChartKind::AccidentShare).unwrap().contains("<svg"));
        assert_eq!(registry.redraw_count(), 1);

        registry.release();
        assert!(registry.svg(ChartKind::SeverityDistribution).is_none());
    }

    #[test]
    fn test_distribution_chart_labels_every_severity() {
        let mut registry = ChartRegistry::new(None, 320, 200);
        registry.redraw(&charts_view(&ViewState::default())).unwrap();
        let svg = registry.svg(ChartKind::SeverityDistribution).unwrap();
        for label in ["MINOR", "MAJOR", "CRITICAL"] {
            assert!(svg.contains(label), "missing axis label {label}");
        }
        assert!(svg.matches("<rect").count() >= 4);
    }

    #[test]
    fn test_redraw_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = ChartRegistry::new(Some(dir.path().join("charts")), 320, 200);
        registry.redraw(&charts_view(&ViewState::default())).unwrap();
        assert!(dir.path().join("charts/severity_distribution.svg").exists());
        assert!(dir.path().join("charts/accident_share.svg").exists());
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#ef4444"), (0xef, 0x44, 0x44));
        assert_eq!(parse_hex_color("zz"), (0, 0, 0));
    }
}
