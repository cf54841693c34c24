//! Error types for the dashboard core
//!
//! Each concern has its own error enum so callers can tell a dropped
//! connection apart from a failed request or a broken render target.
//! [`Error`] aggregates them for code that only needs to propagate.

use thiserror::Error;

/// Errors from the live event stream (URL, WebSocket, framing).
#[derive(Debug, Error)]
pub enum TransportError {
    /// The configured server address could not be turned into a stream endpoint.
    #[error("Invalid server endpoint '{endpoint}': {reason}")]
    InvalidEndpoint {
        /// Endpoint as given by the caller.
        endpoint: String,
        /// Why it was rejected.
        reason: String,
    },

    /// WebSocket handshake or I/O failure (boxed to keep the enum small).
    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),

    /// The server refused the namespace connection.
    #[error("Server rejected connection: {0}")]
    Rejected(String),

    /// The server closed the stream.
    #[error("Connection closed by server")]
    Closed,

    /// The handshake or the heartbeat did not arrive in time.
    #[error("No response from server within {0:?}")]
    Timeout(std::time::Duration),

    /// The retry budget was exhausted.
    #[error("Gave up after {0} connection attempts")]
    RetriesExhausted(u32),
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        TransportError::WebSocket(Box::new(e))
    }
}

/// Errors decoding a single inbound frame or event.
#[derive(Debug, Error)]
pub enum EventError {
    /// Event name with no handler.
    #[error("Unknown event kind: {0}")]
    UnknownKind(String),

    /// Frame did not follow the Engine.IO / Socket.IO text framing.
    #[error("Malformed frame: {0}")]
    Malformed(String),

    /// Payload JSON did not match the expected shape.
    #[error("Invalid payload for '{kind}': {source}")]
    Payload {
        /// Event kind being decoded.
        kind: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Errors from outbound request actions.
#[derive(Debug, Error)]
pub enum ActionError {
    /// Request could not be sent or the body could not be read.
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status.
    #[error("Server returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body (may be empty).
        body: String,
    },

    /// Server answered 2xx but reported `success: false`.
    #[error("Server reported failure: {0}")]
    Rejected(String),

    /// Base URL could not be joined with the action path.
    #[error("Invalid server URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Errors raised by render surfaces and the chart registry.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Writing to the render target failed.
    #[error("Render target I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Chart drawing failed.
    #[error("Chart '{chart}' failed to draw: {reason}")]
    Chart {
        /// Chart identifier.
        chart: &'static str,
        /// Backend error text.
        reason: String,
    },
}

/// Errors from sound playback. Always swallowed by the notifier.
#[derive(Debug, Error)]
pub enum SoundError {
    /// The output device refused to play (muted, no device, autoplay blocked).
    #[error("Playback blocked: {0}")]
    Blocked(String),

    /// I/O while writing the cue.
    #[error("Playback I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors loading dashboard settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A setting has a value the dashboard cannot use.
    #[error("Invalid setting '{key}': {reason}")]
    Invalid {
        /// Setting name.
        key: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

/// Aggregate error for the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Live stream failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Event decoding failure.
    #[error(transparent)]
    Event(#[from] EventError),

    /// Outbound request failure.
    #[error(transparent)]
    Action(#[from] ActionError),

    /// Render failure.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Settings failure.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Reading a recorded event log failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for dashboard operations.
pub type Result<T> = std::result::Result<T, Error>;
