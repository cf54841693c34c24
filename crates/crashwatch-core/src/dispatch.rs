//! Event dispatcher: the only writer of the view state store.
//!
//! Every input (a connectivity transition, a server event, the completion
//! of an outbound request, a navigation) goes through
//! [`Dispatcher::dispatch`], which applies it to the store, reports to the
//! notification sink, and hands back the set of field groups it touched.
//! Inputs are applied in the order they are given; nothing is reordered or
//! coalesced.

use serde_json::Value;

use crate::actions::ActionOutcome;
use crate::error::EventError;
use crate::event::{DetectionPayload, ServerEvent};
use crate::model::{ConnectionState, Severity, TIMELINE_CAPACITY, View};
use crate::notify::{CelebrationReason, NotificationSink, SoundCue, ToastLevel, alert_toast_text};
use crate::store::{StoreChanges, ViewState, ViewStateStore};

/// Title and body of the toast shown when a handler fails.
const GENERIC_ERROR: (&str, &str) = ("Something went wrong", "An update could not be applied");

/// One unit of work for the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// Connectivity changed (already de-duplicated).
    Connection(ConnectionState),
    /// Decoded server event.
    Server(ServerEvent),
    /// Server event still in wire form.
    Raw {
        /// Event name.
        name: String,
        /// Payload.
        payload: Value,
    },
    /// An outbound request finished.
    Action(ActionOutcome),
    /// The user switched views.
    Navigate(View),
}

/// Routes inputs to handlers and owns the store.
#[derive(Debug, Default)]
pub struct Dispatcher {
    store: ViewStateStore,
    dispatched: u64,
    dropped: u64,
}

impl Dispatcher {
    /// Dispatcher over an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state for rendering.
    pub fn state(&self) -> &ViewState {
        self.store.state()
    }

    /// Inputs handled so far.
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    /// Inputs dropped (unknown kinds and malformed payloads).
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Apply one input and return what changed.
    pub fn dispatch(&mut self, input: Input, sink: &mut dyn NotificationSink) -> StoreChanges {
        self.dispatched += 1;
        match input {
            Input::Connection(state) => self.on_connection(state, sink),
            Input::Server(event) => self.on_event(event, sink),
            Input::Raw { name, payload } => match ServerEvent::from_wire(&name, payload) {
                Ok(event) => self.on_event(event, sink),
                Err(EventError::UnknownKind(kind)) => {
                    self.dropped += 1;
                    tracing::warn!(kind = %kind, "ignoring unknown event");
                }
                Err(e) => {
                    self.dropped += 1;
                    tracing::warn!(kind = %name, error = %e, "could not apply event");
                    sink.toast(ToastLevel::Error, GENERIC_ERROR.0, GENERIC_ERROR.1);
                }
            },
            Input::Action(outcome) => self.on_action(outcome, sink),
            Input::Navigate(view) => {
                self.store.set_view(view);
                if view == View::Main {
                    sink.celebrate(CelebrationReason::Navigation);
                }
            }
        }
        let changes = self.store.take_changes();
        if !changes.any() {
            tracing::trace!("input left the store unchanged");
        }
        changes
    }

    fn on_connection(&mut self, state: ConnectionState, sink: &mut dyn NotificationSink) {
        let previous = self.store.state().connection;
        self.store.set_connection(state);
        match state {
            ConnectionState::Connected if previous != ConnectionState::Connected => {
                sink.toast(ToastLevel::Success, "Connected", "Receiving live updates");
                sink.sound(SoundCue::Connected);
            }
            // Failed attempts go Connecting -> Disconnected; only a lost
            // live connection is worth a toast.
            ConnectionState::Disconnected if previous == ConnectionState::Connected => {
                sink.toast(ToastLevel::Warning, "Disconnected", "Showing last known values");
                sink.sound(SoundCue::Disconnected);
            }
            _ => {}
        }
    }

    fn on_event(&mut self, event: ServerEvent, sink: &mut dyn NotificationSink) {
        tracing::trace!(kind = event.name(), "dispatching event");
        match event {
            ServerEvent::AccidentAlert(payload) => self.on_alert(&payload, sink),
            ServerEvent::NewDetection(payload) => {
                let inferred = payload.severity().is_alert_level();
                self.store.replace_snapshot(payload.to_snapshot(inferred));
            }
            ServerEvent::StatsUpdate(stats) => self.store.update_stats(|s| stats.merge_into(s)),
            ServerEvent::AlertsUpdate(history) => {
                // Server order is oldest first.
                let newest_first = history
                    .alerts
                    .iter()
                    .rev()
                    .take(TIMELINE_CAPACITY)
                    .map(DetectionPayload::to_timeline_entry);
                self.store.replace_timeline(newest_first);
            }
            ServerEvent::AlertsCleared => {
                self.store.clear_timeline();
                sink.toast(ToastLevel::Info, "History cleared", "The server cleared all alerts");
            }
            ServerEvent::Celebration => sink.celebrate(CelebrationReason::ServerRequest),
            ServerEvent::ClientCount { count } => self.store.set_client_count(count),
            ServerEvent::Welcome { message, client_id } => {
                tracing::info!(
                    message = message.as_deref().unwrap_or(""),
                    client_id = client_id.as_deref().unwrap_or(""),
                    "server greeting"
                );
            }
            ServerEvent::Pong => {}
        }
    }

    fn on_alert(&mut self, payload: &DetectionPayload, sink: &mut dyn NotificationSink) {
        let snapshot = payload.to_snapshot(true);
        let severity = snapshot.severity;
        let (title, message) = alert_toast_text(
            severity,
            &snapshot.severity_label,
            snapshot.severity_confidence_pct,
            snapshot.location.as_deref(),
        );

        self.store.replace_snapshot(snapshot);
        self.store.push_timeline(payload.to_timeline_entry());

        let level = match severity {
            Severity::Critical => ToastLevel::Error,
            Severity::Major | Severity::Unknown => ToastLevel::Warning,
            Severity::Minor | Severity::None => ToastLevel::Info,
        };
        sink.toast(level, &title, &message);
        sink.sound(SoundCue::Alert(severity));
        if severity == Severity::Critical {
            sink.celebrate(CelebrationReason::CriticalAlert);
        }
    }

    fn on_action(&mut self, outcome: ActionOutcome, sink: &mut dyn NotificationSink) {
        match outcome {
            ActionOutcome::AlertTriggered { severity, result } => match result {
                Ok(message) => {
                    sink.toast(ToastLevel::Success, "Alert simulated", &message);
                    sink.sound(SoundCue::Success);
                }
                Err(e) => {
                    tracing::warn!(%severity, error = %e, "simulated alert failed");
                    sink.toast(ToastLevel::Error, "Simulation failed", &e);
                    sink.sound(SoundCue::Error);
                }
            },
            ActionOutcome::HistoryCleared { result } => match result {
                Ok(()) => {
                    self.store.clear_timeline();
                    sink.toast(ToastLevel::Success, "History cleared", "Alert history was cleared");
                    sink.sound(SoundCue::Success);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "clearing history failed");
                    sink.toast(ToastLevel::Error, "Clear failed", &e);
                    sink.sound(SoundCue::Error);
                }
            },
        }
    }
}
