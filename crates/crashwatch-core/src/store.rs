//! The single writable copy of everything the dashboard displays.
//!
//! [`ViewStateStore`] owns a [`ViewState`] and records which field groups
//! each write touched. The dispatcher is the only writer; renderers get a
//! shared borrow of the state after every dispatch and decide what to
//! redraw from the drained [`StoreChanges`].

use serde::Serialize;

use crate::model::{AggregateStats, ConnectionState, DetectionSnapshot, Timeline, TimelineEntry, View};

/// Everything the widgets read.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ViewState {
    /// Stream connectivity. Values below are stale while not connected.
    pub connection: ConnectionState,
    /// Latest detection.
    pub snapshot: DetectionSnapshot,
    /// Aggregate counters.
    pub stats: AggregateStats,
    /// Recent alerts, newest first.
    pub timeline: Timeline,
    /// Dashboards connected to the server, from `client_count`.
    pub client_count: Option<u64>,
    /// View the user is looking at.
    pub view: View,
}

impl ViewState {
    /// Displayed values are from before the last disconnect.
    pub fn is_stale(&self) -> bool {
        self.connection != ConnectionState::Connected
    }
}

/// Field groups written since the last drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct StoreChanges {
    /// Connection state changed.
    pub connection: bool,
    /// Snapshot replaced.
    pub snapshot: bool,
    /// Aggregate stats merged.
    pub stats: bool,
    /// Timeline appended or cleared.
    pub timeline: bool,
    /// Client count or active view changed.
    pub chrome: bool,
}

impl StoreChanges {
    /// True if anything changed.
    pub fn any(&self) -> bool {
        self.connection || self.snapshot || self.stats || self.timeline || self.chrome
    }
}

/// Owner of [`ViewState`].
#[derive(Debug, Default)]
pub struct ViewStateStore {
    state: ViewState,
    changes: StoreChanges,
}

impl ViewStateStore {
    /// Store with initial (pre-connection) values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only view of the current state.
    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Changes since the last call, resetting the record.
    pub fn take_changes(&mut self) -> StoreChanges {
        std::mem::take(&mut self.changes)
    }

    /// Record a connection transition. Other fields are left as they are.
    pub fn set_connection(&mut self, connection: ConnectionState) {
        if self.state.connection != connection {
            self.state.connection = connection;
            self.changes.connection = true;
        }
    }

    /// Replace the snapshot wholesale.
    pub fn replace_snapshot(&mut self, snapshot: DetectionSnapshot) {
        self.state.snapshot = snapshot;
        self.changes.snapshot = true;
    }

    /// Mutate aggregate stats in place (used for field-wise merges).
    pub fn update_stats(&mut self, f: impl FnOnce(&mut AggregateStats)) {
        f(&mut self.state.stats);
        self.changes.stats = true;
    }

    /// Prepend to the timeline.
    pub fn push_timeline(&mut self, entry: TimelineEntry) {
        self.state.timeline.push_front(entry);
        self.changes.timeline = true;
    }

    /// Replace the timeline with `entries` given newest first.
    pub fn replace_timeline(&mut self, entries: impl IntoIterator<Item = TimelineEntry>) {
        let mut timeline = Timeline::new();
        let mut entries: Vec<_> = entries.into_iter().collect();
        // push_front reverses, so feed oldest first
        while let Some(entry) = entries.pop() {
            timeline.push_front(entry);
        }
        self.state.timeline = timeline;
        self.changes.timeline = true;
    }

    /// Empty the timeline.
    pub fn clear_timeline(&mut self) {
        self.state.timeline.clear();
        self.changes.timeline = true;
    }

    /// Record the connected-client count.
    pub fn set_client_count(&mut self, count: u64) {
        self.state.client_count = Some(count);
        self.changes.chrome = true;
    }

    /// Switch view.
    pub fn set_view(&mut self, view: View) {
        if self.state.view != view {
            self.state.view = view;
            self.changes.chrome = true;
        }
    }
}
