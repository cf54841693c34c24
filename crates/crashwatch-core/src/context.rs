//! The explicitly constructed dashboard context.
//!
//! [`DashboardContext`] owns every component (store via the dispatcher,
//! notifier, chart registry, action client, connection manager) and the
//! render surface. [`DashboardContext::run`] is the event loop: one task,
//! inputs handled strictly in arrival order, a pull-render after each one.
//! [`DashboardContext::teardown`] closes the connection and releases the
//! chart instances.

use std::io::BufRead;
use std::time::{Duration, Instant};

use chrono::Local;
use tokio::sync::{mpsc, watch};

use crate::actions::{ActionClient, ActionOutcome};
use crate::config::DashboardSettings;
use crate::connection::ConnectionManager;
use crate::dispatch::{Dispatcher, Input};
use crate::error::Result;
use crate::event::RecordedEvent;
use crate::model::{Severity, View};
use crate::notify::{NotificationSink, Notifier, SoundPlayer, ToastLevel};
use crate::render::{self, ChartRegistry, FrameExtras, RenderSurface, charts_view};
use crate::store::{StoreChanges, ViewState};
use crate::transport::{RetryPolicy, StreamMessage};

const TICK: Duration = Duration::from_secs(1);

/// Something the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCommand {
    /// Ask the server to simulate an alert.
    Trigger(Severity),
    /// Ask the server to clear its history.
    Clear,
    /// Switch view.
    Navigate(View),
    /// Dismiss the newest toast.
    Dismiss,
    /// Leave the event loop.
    Quit,
}

impl UserCommand {
    /// Parse a typed command (`minor`, `clear`, `history`, `quit`, ...).
    pub fn parse(line: &str) -> Option<Self> {
        let word = line.trim().to_ascii_lowercase();
        match word.as_str() {
            "minor" => Some(Self::Trigger(Severity::Minor)),
            "major" => Some(Self::Trigger(Severity::Major)),
            "critical" => Some(Self::Trigger(Severity::Critical)),
            "clear" => Some(Self::Clear),
            "dismiss" | "x" => Some(Self::Dismiss),
            "quit" | "exit" | "q" => Some(Self::Quit),
            other => View::from_name(other).map(Self::Navigate),
        }
    }
}

/// Result of an offline replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct ReplaySummary {
    /// Lines fed to the dispatcher.
    pub applied: u64,
    /// Lines that were not valid `{"event", "data"}` records.
    pub skipped: u64,
}

/// Every dashboard component, wired together.
pub struct DashboardContext<S: RenderSurface> {
    settings: DashboardSettings,
    dispatcher: Dispatcher,
    notifier: Notifier,
    charts: ChartRegistry,
    actions: ActionClient,
    connection: ConnectionManager,
    surface: S,
}

impl<S: RenderSurface> std::fmt::Debug for DashboardContext<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardContext")
            .field("server_url", &self.settings.server_url)
            .field("dispatcher", &self.dispatcher)
            .field("notifier", &self.notifier)
            .field("connection", &self.connection)
            .finish_non_exhaustive()
    }
}

impl<S: RenderSurface> DashboardContext<S> {
    /// Build the context. `sound` is ignored when sound is disabled in
    /// `settings`.
    pub fn new(settings: DashboardSettings, surface: S, sound: Option<Box<dyn SoundPlayer>>) -> Result<Self> {
        settings.validate()?;
        let actions = ActionClient::new(&settings.server_url)?;
        let notifier = Notifier::new(settings.toast_ttl(), sound.filter(|_| settings.sound));
        let charts = ChartRegistry::new(settings.charts_dir.clone(), settings.chart_width, settings.chart_height);
        let connection = ConnectionManager::new(RetryPolicy {
            delay: settings.reconnect_delay(),
            max_attempts: settings.max_reconnect_attempts,
            connect_timeout: settings.connect_timeout(),
        });

        Ok(Self {
            settings,
            dispatcher: Dispatcher::new(),
            notifier,
            charts,
            actions,
            connection,
            surface,
        })
    }

    /// Current state.
    pub fn state(&self) -> &ViewState {
        self.dispatcher.state()
    }

    /// The dispatcher (for counters).
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// The notifier.
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// The chart registry.
    pub fn charts(&self) -> &ChartRegistry {
        &self.charts
    }

    /// The render surface.
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Mutable render surface.
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Give back the render surface.
    pub fn into_surface(self) -> S {
        self.surface
    }

    /// Draw every widget, including placeholder charts.
    pub fn render_initial(&mut self) {
        self.redraw_charts();
        let celebration = self.notifier.take_celebration();
        let extras = FrameExtras {
            toasts: self.notifier.toasts(),
            celebration,
        };
        if let Err(e) = render::render_all(self.dispatcher.state(), &self.charts, extras, &mut self.surface) {
            self.report_render_error(&e);
        }
    }

    /// Apply one input and re-render what it changed.
    pub fn apply(&mut self, input: Input) -> StoreChanges {
        let changes = self.dispatcher.dispatch(input, &mut self.notifier);
        self.render(changes);
        changes
    }

    /// Feed a recorded event log through the dispatcher without a
    /// connection. Blank lines are ignored; lines that are not UTF-8 or
    /// not a valid record are skipped. Only read failures abort the replay.
    pub fn replay<R: BufRead>(&mut self, mut reader: R) -> Result<ReplaySummary> {
        let mut summary = ReplaySummary::default();
        self.render_initial();

        let mut buf = Vec::new();
        let mut number = 0usize;
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            number += 1;

            let line = match std::str::from_utf8(&buf) {
                Ok(line) => line.trim(),
                Err(e) => {
                    summary.skipped += 1;
                    tracing::warn!(line = number, error = %e, "skipping non-UTF-8 record");
                    continue;
                }
            };
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<RecordedEvent>(line) {
                Ok(record) => {
                    self.apply(Input::Raw {
                        name: record.event,
                        payload: record.data,
                    });
                    summary.applied += 1;
                }
                Err(e) => {
                    summary.skipped += 1;
                    tracing::warn!(line = number, error = %e, "skipping invalid record");
                }
            }
        }

        tracing::info!(applied = summary.applied, skipped = summary.skipped, "replay finished");
        Ok(summary)
    }

    /// Connect and process inputs until `commands` yields
    /// [`UserCommand::Quit`] or `shutdown` flips to true, then tear down.
    pub async fn run(
        &mut self,
        mut commands: mpsc::UnboundedReceiver<UserCommand>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let (stream_tx, mut stream_rx) = mpsc::unbounded_channel();
        let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel::<ActionOutcome>();
        let server_url = self.settings.server_url.clone();
        self.connection.connect(&server_url, stream_tx).await?;
        self.render_initial();

        let mut tick = tokio::time::interval(TICK);
        let mut stream_open = true;
        let mut commands_open = true;

        loop {
            tokio::select! {
                message = stream_rx.recv(), if stream_open => match message {
                    Some(StreamMessage::State(state)) => {
                        if let Some(state) = self.connection.observe(state) {
                            self.apply(Input::Connection(state));
                        }
                    }
                    Some(StreamMessage::Event { name, payload }) => {
                        self.apply(Input::Raw { name, payload });
                    }
                    None => {
                        stream_open = false;
                        self.notifier.toast(
                            ToastLevel::Error,
                            "Connection lost",
                            "Gave up reconnecting; showing last known values",
                        );
                        self.render(StoreChanges::default());
                    }
                },
                Some(outcome) = outcome_rx.recv() => {
                    self.apply(Input::Action(outcome));
                }
                command = commands.recv(), if commands_open => match command {
                    Some(UserCommand::Quit) => break,
                    Some(command) => self.handle_command(command, &outcome_tx),
                    None => commands_open = false,
                },
                _ = tick.tick() => self.on_tick(),
                _ = shutdown.changed() => break,
            }
        }

        self.teardown().await;
        Ok(())
    }

    /// Close the connection and release chart instances. In-flight
    /// requests are left to finish on their own.
    pub async fn teardown(&mut self) {
        if let Err(e) = self.connection.shutdown().await {
            tracing::debug!(error = %e, "transport ended with an error");
        }
        self.charts.release();
        tracing::info!(dispatched = self.dispatcher.dispatched(), "dashboard torn down");
    }

    fn handle_command(&mut self, command: UserCommand, outcomes: &mpsc::UnboundedSender<ActionOutcome>) {
        tracing::debug!(?command, "user command");
        match command {
            UserCommand::Trigger(severity) => {
                let client = self.actions.clone();
                let tx = outcomes.clone();
                tokio::spawn(async move {
                    let _ = tx.send(client.trigger_alert_outcome(severity).await);
                });
            }
            UserCommand::Clear => {
                let client = self.actions.clone();
                let tx = outcomes.clone();
                tokio::spawn(async move {
                    let _ = tx.send(client.clear_history_outcome().await);
                });
            }
            UserCommand::Navigate(view) => {
                self.apply(Input::Navigate(view));
            }
            UserCommand::Dismiss => {
                self.notifier.toast_queue().dismiss_latest();
                self.render(StoreChanges::default());
            }
            UserCommand::Quit => {}
        }
    }

    fn on_tick(&mut self) {
        self.notifier.toast_queue().expire(Instant::now());
        self.surface.clock(Local::now().naive_local());
        self.render(StoreChanges::default());
    }

    fn redraw_charts(&mut self) {
        let view = charts_view(self.dispatcher.state());
        if let Err(e) = self.charts.redraw(&view) {
            self.report_render_error(&e);
        }
    }

    fn render(&mut self, changes: StoreChanges) {
        if changes.stats {
            self.redraw_charts();
        }
        let celebration = self.notifier.take_celebration();
        let extras = FrameExtras {
            toasts: self.notifier.toasts(),
            celebration,
        };
        if let Err(e) = render::render_changed(self.dispatcher.state(), changes, &self.charts, extras, &mut self.surface) {
            self.report_render_error(&e);
        }
    }

    fn report_render_error(&mut self, error: &crate::error::RenderError) {
        tracing::warn!(error = %error, "render failed");
        self.notifier
            .toast(ToastLevel::Error, "Something went wrong", "The display could not be updated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{BannerView, ChartsView, TimelineView};
    use crate::notify::{CelebrationReason, Toast};

    #[derive(Debug, Default)]
    struct Recorder {
        banners: Vec<String>,
        timelines: Vec<usize>,
        chart_frames: Vec<ChartsView>,
        celebrations: Vec<CelebrationReason>,
        last_toasts: usize,
        flushes: usize,
    }

    impl RenderSurface for Recorder {
        fn status_banner(&mut self, view: &BannerView) {
            self.banners.push(view.headline.to_string());
        }

        fn timeline(&mut self, view: &TimelineView) {
            self.timelines.push(view.rows.len());
        }

        fn aggregate_charts(&mut self, view: &ChartsView, _registry: &ChartRegistry) {
            self.chart_frames.push(view.clone());
        }

        fn toasts(&mut self, toasts: &[Toast]) {
            self.last_toasts = toasts.len();
        }

        fn celebrate(&mut self, reason: CelebrationReason) {
            self.celebrations.push(reason);
        }

        fn flush(&mut self) -> std::result::Result<(), crate::error::RenderError> {
            self.flushes += 1;
            Ok(())
        }
    }

    fn context() -> DashboardContext<Recorder> {
        DashboardContext::new(DashboardSettings::default(), Recorder::default(), None).unwrap()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(UserCommand::parse(" Critical\n"), Some(UserCommand::Trigger(Severity::Critical)));
        assert_eq!(UserCommand::parse("history"), Some(UserCommand::Navigate(View::History)));
        assert_eq!(UserCommand::parse("q"), Some(UserCommand::Quit));
        assert_eq!(UserCommand::parse("launch"), None);
    }

    #[test]
    fn test_new_rejects_invalid_settings() {
        let settings = DashboardSettings {
            server_url: "ftp://example.com".to_string(),
            ..DashboardSettings::default()
        };
        assert!(DashboardContext::new(settings, Recorder::default(), None).is_err());
    }

    #[test]
    fn test_replay_drives_widgets() {
        let log = r#"
{"event": "new_detection", "data": {"severity": "NONE", "confidence": 0.2}}
{"event": "accident_alert", "data": {"severity": "CRITICAL", "confidence": 0.95, "vehicle_count": 2}}
not json
{"event": "stats_update", "data": {"accidents_detected": 1, "severity_counts": {"CRITICAL": 1}}}
{"event": "mystery"}
"#;
        let mut ctx = context();
        let summary = ctx.replay(log.as_bytes()).unwrap();
        assert_eq!(summary, ReplaySummary { applied: 4, skipped: 1 });

        let state = ctx.state();
        assert!(state.snapshot.accident_detected);
        assert_eq!(state.timeline.len(), 1);
        assert_eq!(state.stats.severity_counts.critical, 1);
        assert!(state.is_stale());

        let surface = ctx.surface();
        assert_eq!(surface.banners.last().map(String::as_str), Some("ACCIDENT DETECTED"));
        assert_eq!(surface.celebrations, vec![CelebrationReason::CriticalAlert]);
        // initial placeholder frame, then the real one
        assert_eq!(surface.chart_frames.len(), 2);
        assert!(surface.chart_frames[0].placeholder);
        assert!(!surface.chart_frames[1].placeholder);
        assert_eq!(ctx.charts().redraw_count(), 2);
        assert_eq!(surface.last_toasts, 1);
    }

    #[test]
    fn test_replay_skips_non_utf8_line() {
        let mut log = Vec::new();
        log.extend_from_slice(br#"{"event": "accident_alert", "data": {"severity": "MINOR", "confidence": 0.6}}"#);
        log.extend_from_slice(b"\n\xff\xfe garbage\n");
        log.extend_from_slice(br#"{"event": "stats_update", "data": {"accidents_detected": 7}}"#);
        log.push(b'\n');

        let mut ctx = context();
        let summary = ctx.replay(log.as_slice()).unwrap();
        assert_eq!(summary, ReplaySummary { applied: 2, skipped: 1 });
        assert_eq!(ctx.state().timeline.len(), 1);
        assert_eq!(ctx.state().stats.accidents_detected, 7);
    }

    #[test]
    fn test_celebration_rendered_once() {
        let mut ctx = context();
        ctx.render_initial();
        ctx.apply(Input::Navigate(View::History));
        ctx.apply(Input::Navigate(View::Main));
        ctx.apply(Input::Navigate(View::History));
        assert_eq!(ctx.surface().celebrations, vec![CelebrationReason::Navigation]);
    }

    #[tokio::test]
    async fn test_run_stops_on_quit_and_releases_charts() {
        let settings = DashboardSettings {
            // Nothing listens here; the transport keeps retrying until torn down.
            server_url: "http://127.0.0.1:9".to_string(),
            reconnect_delay_ms: 10,
            ..DashboardSettings::default()
        };
        let mut ctx = DashboardContext::new(settings, Recorder::default(), None).unwrap();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (_stop_tx, stop_rx) = watch::channel(false);

        commands_tx.send(UserCommand::Navigate(View::Analytics)).unwrap();
        commands_tx.send(UserCommand::Quit).unwrap();
        tokio::time::timeout(Duration::from_secs(5), ctx.run(commands_rx, stop_rx))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(ctx.state().view, View::Analytics);
        assert!(ctx.charts().svg(render::ChartKind::SeverityDistribution).is_none());
        assert!(ctx.surface().flushes >= 2);
    }
}
