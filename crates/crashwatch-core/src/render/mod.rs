//! Widget renderers.
//!
//! Each widget is a pure function from [`ViewState`] to a small view
//! struct: same state in, same view out. The views are handed to a
//! [`RenderSurface`], the capability interface a front end implements.
//! A surface that has nowhere to show a widget simply keeps the default
//! no-op method; the core never checks.

mod charts;
mod factors;
mod gauge;
mod status;
mod timeline;

pub use charts::{ChartKind, ChartRegistry, ChartsView, charts_view};
pub use factors::{FactorBar, FactorBarsView, factor_bars};
pub use gauge::{GAUGE_CIRCUMFERENCE, GAUGE_RADIUS, GaugeBand, GaugeView, confidence_gauge};
pub use status::{
    BannerView, ConnectionView, SeverityIndicatorView, SeverityMarker, connection_view, severity_indicator,
    status_banner,
};
pub use timeline::{TimelineRow, TimelineView, timeline_view};

use crate::error::RenderError;
use crate::notify::{CelebrationReason, Toast};
use crate::store::{StoreChanges, ViewState};

/// Something that can display dashboard widgets.
///
/// Every method defaults to doing nothing, so a surface only implements
/// the widgets it has room for.
pub trait RenderSurface {
    /// Connection line (with stale marker).
    fn connection(&mut self, _view: &ConnectionView) {}

    /// ACCIDENT DETECTED / Normal banner.
    fn status_banner(&mut self, _view: &BannerView) {}

    /// Minor / major / critical markers.
    fn severity_indicator(&mut self, _view: &SeverityIndicatorView) {}

    /// Confidence arc and label.
    fn confidence_gauge(&mut self, _view: &GaugeView) {}

    /// Overlap / motion / debris bars.
    fn factor_bars(&mut self, _view: &FactorBarsView) {}

    /// Recent alerts.
    fn timeline(&mut self, _view: &TimelineView) {}

    /// Aggregate charts, redrawn in full.
    fn aggregate_charts(&mut self, _view: &ChartsView, _registry: &ChartRegistry) {}

    /// Visible toasts.
    fn toasts(&mut self, _toasts: &[Toast]) {}

    /// Particle effect.
    fn celebrate(&mut self, _reason: CelebrationReason) {}

    /// Wall clock, once per tick.
    fn clock(&mut self, _now: chrono::NaiveDateTime) {}

    /// Called once after all widgets of a frame were handed over.
    fn flush(&mut self) -> Result<(), RenderError> {
        Ok(())
    }
}

/// Extra per-frame inputs that do not live in the store.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameExtras<'a> {
    /// Visible toasts.
    pub toasts: &'a [Toast],
    /// Particle effect to play this frame.
    pub celebration: Option<CelebrationReason>,
}

/// Render every widget from `state`.
pub fn render_all<S: RenderSurface + ?Sized>(
    state: &ViewState,
    registry: &ChartRegistry,
    extras: FrameExtras<'_>,
    surface: &mut S,
) -> Result<(), RenderError> {
    surface.connection(&connection_view(state));
    surface.status_banner(&status_banner(state));
    surface.severity_indicator(&severity_indicator(state));
    surface.confidence_gauge(&confidence_gauge(state));
    surface.factor_bars(&factor_bars(state));
    surface.timeline(&timeline_view(state));
    surface.aggregate_charts(&charts_view(state), registry);
    surface.toasts(extras.toasts);
    if let Some(reason) = extras.celebration {
        surface.celebrate(reason);
    }
    surface.flush()
}

/// Render only the widgets whose inputs changed. Toasts and the particle
/// effect are always passed through.
pub fn render_changed<S: RenderSurface + ?Sized>(
    state: &ViewState,
    changes: StoreChanges,
    registry: &ChartRegistry,
    extras: FrameExtras<'_>,
    surface: &mut S,
) -> Result<(), RenderError> {
    if changes.connection || changes.chrome {
        surface.connection(&connection_view(state));
    }
    if changes.snapshot {
        surface.status_banner(&status_banner(state));
        surface.severity_indicator(&severity_indicator(state));
        surface.confidence_gauge(&confidence_gauge(state));
        surface.factor_bars(&factor_bars(state));
    }
    if changes.timeline {
        surface.timeline(&timeline_view(state));
    }
    if changes.stats {
        surface.aggregate_charts(&charts_view(state), registry);
    }
    surface.toasts(extras.toasts);
    if let Some(reason) = extras.celebration {
        surface.celebrate(reason);
    }
    surface.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ConnectionState;

    #[derive(Default)]
    struct CountingSurface {
        banners: usize,
        charts: usize,
        flushes: usize,
    }

    impl RenderSurface for CountingSurface {
        fn status_banner(&mut self, _view: &BannerView) {
            self.banners += 1;
        }

        fn aggregate_charts(&mut self, _view: &ChartsView, _registry: &ChartRegistry) {
            self.charts += 1;
        }

        fn flush(&mut self) -> Result<(), RenderError> {
            self.flushes += 1;
            Ok(())
        }
    }

    #[test]
    fn test_render_all_touches_every_widget() {
        let state = ViewState::default();
        let registry = ChartRegistry::new(None, 320, 200);
        let mut surface = CountingSurface::default();
        render_all(&state, &registry, FrameExtras::default(), &mut surface).unwrap();
        assert_eq!((surface.banners, surface.charts, surface.flushes), (1, 1, 1));
    }

    #[test]
    fn test_render_changed_skips_untouched_widgets() {
        let state = ViewState {
            connection: ConnectionState::Connected,
            ..ViewState::default()
        };
        let registry = ChartRegistry::new(None, 320, 200);
        let mut surface = CountingSurface::default();
        let changes = StoreChanges {
            stats: true,
            ..StoreChanges::default()
        };
        render_changed(&state, changes, &registry, FrameExtras::default(), &mut surface).unwrap();
        assert_eq!((surface.banners, surface.charts, surface.flushes), (0, 1, 1));
    }
}
