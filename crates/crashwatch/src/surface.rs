//! Terminal render surface.
//!
//! Widgets hand their views to [`TerminalSurface`], which keeps the latest
//! of each in a [`Frame`] and writes the whole frame on `flush` when
//! something visible changed.

use std::io::Write;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use comfy_table::Cell;
use serde::Serialize;

use crashwatch_core::notify::{CelebrationReason, Toast, ToastLevel};
use crashwatch_core::render::{
    BannerView, ChartRegistry, ChartsView, ConnectionView, FactorBarsView, GaugeView, SeverityIndicatorView,
    TimelineView,
};
use crashwatch_core::{ChartKind, ConnectionState, RenderError, RenderSurface, Severity};

use crate::output::{bar, create_table, or_dash, severity_cell};

/// How frames reach the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceMode {
    /// Clear the screen and redraw, clock included.
    Interactive,
    /// Append each changed frame (stdout is not a terminal).
    Append,
    /// Keep the frame; the caller prints it.
    Buffered,
}

/// Latest view of every widget.
#[derive(Debug, Default, Clone, Serialize)]
pub struct Frame {
    pub clock: Option<String>,
    pub connection: Option<ConnectionView>,
    pub banner: Option<BannerView>,
    pub indicator: Option<SeverityIndicatorView>,
    pub gauge: Option<GaugeView>,
    pub factors: Option<FactorBarsView>,
    pub timeline: Option<TimelineView>,
    pub charts: Option<ChartsView>,
    pub chart_files: Vec<PathBuf>,
    pub toasts: Vec<Toast>,
    pub celebrations: u64,
}

pub struct TerminalSurface<W: Write> {
    out: W,
    mode: SurfaceMode,
    frame: Frame,
    dirty: bool,
    frames_written: u64,
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W, mode: SurfaceMode) -> Self {
        Self {
            out,
            mode,
            frame: Frame::default(),
            dirty: false,
            frames_written: 0,
        }
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RenderSurface for TerminalSurface<W> {
    fn connection(&mut self, view: &ConnectionView) {
        self.frame.connection = Some(view.clone());
        self.dirty = true;
    }

    fn status_banner(&mut self, view: &BannerView) {
        self.frame.banner = Some(view.clone());
        self.dirty = true;
    }

    fn severity_indicator(&mut self, view: &SeverityIndicatorView) {
        self.frame.indicator = Some(view.clone());
        self.dirty = true;
    }

    fn confidence_gauge(&mut self, view: &GaugeView) {
        self.frame.gauge = Some(view.clone());
        self.dirty = true;
    }

    fn factor_bars(&mut self, view: &FactorBarsView) {
        self.frame.factors = Some(view.clone());
        self.dirty = true;
    }

    fn timeline(&mut self, view: &TimelineView) {
        self.frame.timeline = Some(view.clone());
        self.dirty = true;
    }

    fn aggregate_charts(&mut self, view: &ChartsView, registry: &ChartRegistry) {
        self.frame.charts = Some(view.clone());
        self.frame.chart_files = registry
            .out_dir()
            .map(|dir| {
                [ChartKind::SeverityDistribution, ChartKind::AccidentShare]
                    .iter()
                    .filter(|kind| registry.svg(**kind).is_some())
                    .map(|kind| dir.join(format!("{}.svg", kind.name())))
                    .collect()
            })
            .unwrap_or_default();
        self.dirty = true;
    }

    fn toasts(&mut self, toasts: &[Toast]) {
        let same = toasts.len() == self.frame.toasts.len()
            && toasts.iter().zip(&self.frame.toasts).all(|(a, b)| a.id == b.id);
        if !same {
            self.frame.toasts = toasts.to_vec();
            self.dirty = true;
        }
    }

    fn celebrate(&mut self, _reason: CelebrationReason) {
        self.frame.celebrations += 1;
        self.dirty = true;
    }

    fn clock(&mut self, now: NaiveDateTime) {
        self.frame.clock = Some(now.format("%H:%M:%S").to_string());
        if self.mode == SurfaceMode::Interactive {
            self.dirty = true;
        }
    }

    fn flush(&mut self) -> Result<(), RenderError> {
        if !self.dirty || self.mode == SurfaceMode::Buffered {
            return Ok(());
        }
        self.dirty = false;

        if self.mode == SurfaceMode::Interactive {
            write!(self.out, "\x1b[2J\x1b[H")?;
        }
        write!(self.out, "{}", render_frame(&self.frame))?;
        self.out.flush()?;
        self.frames_written += 1;
        Ok(())
    }
}

/// Plain-text rendering of a frame.
pub fn render_frame(frame: &Frame) -> String {
    let mut text = String::new();
    let line = |text: &mut String, s: String| {
        text.push_str(&s);
        text.push('\n');
    };

    if let Some(conn) = &frame.connection {
        let dot = match conn.state {
            ConnectionState::Connected => "●",
            ConnectionState::Connecting => "◌",
            ConnectionState::Disconnected => "○",
        };
        let mut status = format!("{dot} {}", conn.state.label());
        if let Some(n) = conn.client_count {
            status.push_str(&format!(" ({n} clients)"));
        }
        if conn.stale {
            status.push_str(" [stale]");
        }
        if let Some(clock) = &frame.clock {
            status.push_str(&format!("   {clock}"));
        }
        line(&mut text, status);
    }

    if let Some(banner) = &frame.banner {
        let mut s = format!(
            "{:<18} {} {}%   vehicles: {}",
            banner.headline,
            bar(f64::from(banner.progress_pct), 10),
            banner.progress_pct,
            banner.vehicle_count
        );
        if let Some(location) = &banner.location {
            s.push_str(&format!("   at {location}"));
        }
        line(&mut text, s);
    }

    if let Some(indicator) = &frame.indicator {
        let markers: Vec<String> = indicator
            .markers
            .iter()
            .map(|m| format!("({}) {}", if m.active { "●" } else { " " }, m.id))
            .collect();
        line(&mut text, format!("Severity: {}   {} {}", markers.join("  "), indicator.icon, indicator.label));
    }

    if let Some(gauge) = &frame.gauge {
        line(
            &mut text,
            format!(
                "Confidence: {} {} [{}]",
                bar(gauge.filled_fraction() * 100.0, 20),
                gauge.label,
                gauge.band.class()
            ),
        );
    }

    if let Some(factors) = &frame.factors {
        let parts: Vec<String> = factors
            .bars
            .iter()
            .map(|b| format!("{} {} {}", b.name, bar(b.width_pct, 10), b.label))
            .collect();
        line(&mut text, format!("Factors: {}", parts.join(" | ")));
    }

    if let Some(timeline) = &frame.timeline {
        if timeline.rows.is_empty() {
            line(&mut text, "Recent alerts: none".to_string());
        } else {
            let mut table = create_table();
            table.set_header(vec!["Severity", "Confidence", "Time"]);
            for row in &timeline.rows {
                table.add_row(vec![
                    severity_cell(row.level, &row.severity),
                    Cell::new(&row.confidence),
                    Cell::new(&row.time),
                ]);
            }
            line(&mut text, format!("Recent alerts:\n{table}"));
        }
    }

    if let Some(charts) = &frame.charts {
        let mut table = create_table();
        table.set_header(vec!["Severity", "Accidents"]);
        for severity in Severity::ALERT_LEVELS {
            table.add_row(vec![
                severity_cell(severity, severity.wire_name()),
                Cell::new(charts.counts.get(severity)),
            ]);
        }
        table.add_row(vec![Cell::new("Total"), Cell::new(charts.total)]);
        let note = if charts.placeholder { " (waiting for data)" } else { "" };
        line(&mut text, format!("Accidents by severity{note}:\n{table}"));

        let extras = [
            ("detections", or_dash(charts.total_detections)),
            ("alerts sent", or_dash(charts.alerts_sent)),
            ("cameras", or_dash(charts.active_cameras)),
            ("uptime", or_dash(charts.uptime.as_deref())),
        ];
        let extras: Vec<String> = extras.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        line(&mut text, extras.join("   "));
        for path in &frame.chart_files {
            line(&mut text, format!("chart: {}", path.display()));
        }
    }

    for toast in &frame.toasts {
        let tag = match toast.level {
            ToastLevel::Info => "INFO",
            ToastLevel::Success => " OK ",
            ToastLevel::Warning => "WARN",
            ToastLevel::Error => "FAIL",
        };
        line(&mut text, format!("[{tag}] {}: {}", toast.title, toast.message));
    }

    if frame.celebrations > 0 {
        line(&mut text, "🎉 ✨ 🎉 ✨ 🎉".to_string());
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crashwatch_core::{DashboardContext, DashboardSettings};

    fn replay(log: &str, mode: SurfaceMode) -> TerminalSurface<Vec<u8>> {
        let surface = TerminalSurface::new(Vec::new(), mode);
        let mut ctx = DashboardContext::new(DashboardSettings::default(), surface, None).unwrap();
        ctx.replay(log.as_bytes()).unwrap();
        ctx.into_surface()
    }

    #[test]
    fn test_buffered_mode_writes_nothing() {
        let surface = replay(r#"{"event": "new_detection", "data": {"confidence": 0.5}}"#, SurfaceMode::Buffered);
        assert_eq!(surface.frames_written(), 0);
        assert!(surface.frame().gauge.is_some());
        assert!(surface.into_inner().is_empty());
    }

    #[test]
    fn test_append_mode_writes_each_change() {
        let surface = replay(
            r#"{"event": "accident_alert", "data": {"severity": "MAJOR", "confidence": 0.87, "location": "Camera-3"}}"#,
            SurfaceMode::Append,
        );
        assert_eq!(surface.frames_written(), 2);
        let out = String::from_utf8(surface.into_inner()).unwrap();
        assert!(out.contains("ACCIDENT DETECTED"));
        assert!(out.contains("87.0%"));
        assert!(out.contains("at Camera-3"));
        assert!(!out.contains("\x1b[2J"));
    }

    #[test]
    fn test_frame_text_marks_placeholder_and_stale() {
        let surface = replay("", SurfaceMode::Buffered);
        let text = render_frame(surface.frame());
        assert!(text.contains("(waiting for data)"));
        assert!(text.contains("[stale]"));
        assert!(text.contains("Normal"));
        assert!(text.contains("Recent alerts: none"));
    }

    #[test]
    fn test_clock_only_redraws_interactive() {
        let mut surface = TerminalSurface::new(Vec::new(), SurfaceMode::Append);
        let now = NaiveDateTime::parse_from_str("2026-01-01 10:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        surface.clock(now);
        surface.flush().unwrap();
        assert_eq!(surface.frames_written(), 0);

        let mut surface = TerminalSurface::new(Vec::new(), SurfaceMode::Interactive);
        surface.clock(now);
        surface.flush().unwrap();
        assert_eq!(surface.frames_written(), 1);
    }
}
