//! Owner of the single live event-stream connection.

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use url::Url;

use crate::error::TransportError;
use crate::model::ConnectionState;
use crate::transport::{self, RetryPolicy, StreamMessage};

struct LiveSession {
    endpoint: Url,
    stop: watch::Sender<bool>,
    task: JoinHandle<Result<(), TransportError>>,
}

/// Holds the transport task and the last reported [`ConnectionState`].
///
/// Retrying is the transport's job. The manager only starts and stops it,
/// and filters the state reports it relays so each transition is seen once.
pub struct ConnectionManager {
    policy: RetryPolicy,
    state: ConnectionState,
    live: Option<LiveSession>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("policy", &self.policy)
            .field("state", &self.state)
            .field("endpoint", &self.live.as_ref().map(|l| l.endpoint.as_str()))
            .finish()
    }
}

impl ConnectionManager {
    /// Manager with no connection yet.
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            state: ConnectionState::Disconnected,
            live: None,
        }
    }

    /// Last state passed through [`observe`](Self::observe).
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// WebSocket endpoint of the live session.
    pub fn endpoint(&self) -> Option<&Url> {
        self.live.as_ref().map(|l| &l.endpoint)
    }

    /// Whether a transport task is running.
    pub fn is_live(&self) -> bool {
        self.live.as_ref().is_some_and(|l| !l.task.is_finished())
    }

    /// Open the stream to `server_url`, forwarding everything to `tx`.
    ///
    /// An existing session is closed first, so at most one is ever live.
    pub async fn connect(
        &mut self,
        server_url: &str,
        tx: mpsc::UnboundedSender<StreamMessage>,
    ) -> Result<(), TransportError> {
        let endpoint = transport::socketio_endpoint(server_url)?;
        if self.live.is_some()
            && let Err(e) = self.shutdown().await
        {
            tracing::debug!(error = %e, "previous session ended with an error");
        }

        let (stop, stop_rx) = watch::channel(false);
        let policy = self.policy;
        let task_endpoint = endpoint.clone();
        let task = tokio::spawn(async move {
            let result = transport::run(task_endpoint, policy, tx, stop_rx).await;
            if let Err(e) = &result {
                tracing::error!(error = %e, "event stream stopped");
            }
            result
        });

        tracing::info!(%endpoint, "event stream started");
        self.live = Some(LiveSession { endpoint, stop, task });
        Ok(())
    }

    /// Record a state report. Returns the new state only if it differs
    /// from the previous one.
    pub fn observe(&mut self, state: ConnectionState) -> Option<ConnectionState> {
        if self.state == state {
            return None;
        }
        tracing::debug!(from = self.state.label(), to = state.label(), "connection transition");
        self.state = state;
        Some(state)
    }

    /// Close the live connection and wait for the transport to stop.
    /// Returns the transport's own result.
    pub async fn shutdown(&mut self) -> Result<(), TransportError> {
        let Some(live) = self.live.take() else {
            return Ok(());
        };
        // The transport may already have exited on its own.
        let _ = live.stop.send(true);
        self.state = ConnectionState::Disconnected;

        match live.task.await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "transport task did not finish cleanly");
                Ok(())
            }
        }
    }
}
