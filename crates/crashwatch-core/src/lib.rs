//! Event-to-view synchronization core for the crashwatch accident-detection
//! dashboard.
//!
//! A detection server pushes events (accident alerts, raw detections,
//! aggregate counters) over Socket.IO. This crate consumes that stream and
//! keeps a set of dashboard widgets consistent with the latest known
//! server state.
//!
//! # Components
//!
//! ## Stream
//!
//! - [`socketio`] - Engine.IO v4 / Socket.IO v5 text frame codec
//! - [`transport`] - WebSocket session loop with its own retry policy
//! - [`ConnectionManager`] - Owns the single live connection and reports
//!   connectivity transitions
//!
//! ## State
//!
//! - [`ServerEvent`] - Tagged variant of every event kind, decoded leniently
//! - [`Dispatcher`] - Routes each input to one handler; the only writer
//! - [`ViewStateStore`] - Last known values, with a per-write change record
//!
//! ## Output
//!
//! - [`render`] - Pure view builders per widget and the [`RenderSurface`]
//!   capability trait a front end implements
//! - [`ChartRegistry`] - Latest SVG per aggregate chart
//! - [`Notifier`] - Toasts, best-effort sounds and the particle effect
//! - [`ActionClient`] - Outbound requests (simulate an alert, clear history)
//!
//! [`DashboardContext`] wires all of the above together and runs the event
//! loop on a single task.
//!
//! # Ordering
//!
//! Inputs are applied in arrival order. Snapshots are replaced wholesale
//! (last write wins); aggregate stats are merged field by field. A lost
//! connection never resets what is displayed; the values are marked stale
//! until the stream comes back.
//!
//! # Example
//!
//! ```
//! use crashwatch_core::{DashboardContext, DashboardSettings, RenderSurface};
//!
//! struct Headless;
//! impl RenderSurface for Headless {}
//!
//! let log = r#"{"event": "accident_alert", "data": {"severity": "MAJOR", "confidence": 0.87}}"#;
//! let mut ctx = DashboardContext::new(DashboardSettings::default(), Headless, None)?;
//! ctx.replay(log.as_bytes())?;
//! assert_eq!(ctx.state().timeline.len(), 1);
//! # Ok::<(), crashwatch_core::Error>(())
//! ```

#![warn(missing_docs)]

pub mod actions;
pub mod config;
pub mod connection;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod model;
pub mod notify;
pub mod render;
pub mod socketio;
pub mod store;
pub mod transport;

pub use actions::{ActionClient, ActionOutcome, CameraStatus, ExportFormat, HealthResponse, SimulateResponse};
pub use config::{DEFAULT_SERVER_URL, DashboardSettings};
pub use connection::ConnectionManager;
pub use context::{DashboardContext, ReplaySummary, UserCommand};
pub use dispatch::{Dispatcher, Input};
pub use error::{ActionError, ConfigError, Error, EventError, RenderError, Result, SoundError, TransportError};
pub use event::{AlertsPayload, DetectionPayload, RecordedEvent, ServerEvent, StatsPayload};
pub use model::{
    AggregateStats, ConnectionState, DetectionSnapshot, Severity, SeverityCounts, SeverityFactors, TIMELINE_CAPACITY,
    Timeline, TimelineEntry, View,
};
pub use notify::{
    CelebrationReason, NotificationSink, Notifier, SoundCue, SoundPlayer, Toast, ToastLevel, ToastQueue,
};
pub use render::{ChartKind, ChartRegistry, RenderSurface};
pub use store::{StoreChanges, ViewState, ViewStateStore};
pub use transport::{RetryPolicy, StreamMessage};
