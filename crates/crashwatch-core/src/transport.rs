//! Socket.IO client over WebSocket.
//!
//! The transport owns retries: it keeps reconnecting with a fixed delay
//! until shut down or until the attempt budget runs out. Everything it
//! learns (connectivity transitions and server events) is forwarded as
//! [`StreamMessage`]s; it never touches dashboard state itself.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use crate::error::TransportError;
use crate::model::ConnectionState;
use crate::socketio::{self, Packet};

/// Events requested right after the namespace handshake to seed the store.
const SEED_REQUESTS: [&str; 2] = ["request_stats", "request_alerts"];

/// What the transport reports upstream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
    /// Connectivity changed.
    State(ConnectionState),
    /// Server event for the default namespace.
    Event {
        /// Event name.
        name: String,
        /// First argument.
        payload: Value,
    },
}

/// Reconnect behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Pause between attempts.
    pub delay: Duration,
    /// Consecutive failures tolerated before giving up (`None` = forever).
    pub max_attempts: Option<u32>,
    /// Longest wait for the WebSocket upgrade and the Engine.IO open frame.
    pub connect_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(2),
            max_attempts: None,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Turn `http(s)://host:port[/prefix]` into the Socket.IO WebSocket URL.
pub fn socketio_endpoint(server_url: &str) -> Result<Url, TransportError> {
    let invalid = |reason: String| TransportError::InvalidEndpoint {
        endpoint: server_url.to_string(),
        reason,
    };
    let mut url = Url::parse(server_url).map_err(|e| invalid(e.to_string()))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(invalid(format!("unsupported scheme '{other}'"))),
    };
    url.set_scheme(scheme)
        .map_err(|()| invalid("cannot switch to a WebSocket scheme".to_string()))?;

    let prefix = url.path().trim_end_matches('/').to_string();
    url.set_path(&format!("{prefix}/socket.io/"));
    url.set_query(Some("EIO=4&transport=websocket"));
    Ok(url)
}

/// How a session ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    /// Shutdown was requested or nobody is listening anymore.
    Stopped,
}

/// Keep a live connection to `endpoint` until `shutdown` flips to true.
///
/// Returns `Ok(())` after a requested shutdown and
/// [`TransportError::RetriesExhausted`] when the attempt budget is spent.
pub async fn run(
    endpoint: Url,
    policy: RetryPolicy,
    tx: mpsc::UnboundedSender<StreamMessage>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), TransportError> {
    let mut failures: u32 = 0;

    loop {
        if *shutdown.borrow() {
            return Ok(());
        }
        if tx.send(StreamMessage::State(ConnectionState::Connecting)).is_err() {
            return Ok(());
        }

        let mut reached_connected = false;
        let outcome = session(&endpoint, &policy, &tx, &mut shutdown, &mut reached_connected).await;
        // Ignore send failures here; the loop exits on the next send or shutdown check.
        let _ = tx.send(StreamMessage::State(ConnectionState::Disconnected));

        match outcome {
            Ok(SessionEnd::Stopped) => return Ok(()),
            Err(e) => {
                if reached_connected {
                    failures = 0;
                    tracing::info!(error = %e, "event stream lost, reconnecting");
                } else {
                    failures += 1;
                    tracing::warn!(error = %e, attempt = failures, "event stream connection failed");
                }
            }
        }

        if let Some(max) = policy.max_attempts
            && failures >= max
        {
            return Err(TransportError::RetriesExhausted(failures));
        }

        tokio::select! {
            () = tokio::time::sleep(policy.delay) => {}
            _ = shutdown.changed() => return Ok(()),
        }
    }
}

/// One WebSocket session.
///
/// Until the Engine.IO open frame arrives the server gets
/// `connect_timeout` to answer; afterwards it must send something (a ping
/// at the latest) within `pingInterval + pingTimeout`. Shutdown is honored
/// at every await point, the upgrade included.
async fn session(
    endpoint: &Url,
    policy: &RetryPolicy,
    tx: &mpsc::UnboundedSender<StreamMessage>,
    shutdown: &mut watch::Receiver<bool>,
    reached_connected: &mut bool,
) -> Result<SessionEnd, TransportError> {
    tracing::debug!(%endpoint, "opening event stream");
    let (ws, _) = tokio::select! {
        _ = shutdown.changed() => return Ok(SessionEnd::Stopped),
        result = tokio::time::timeout(policy.connect_timeout, connect_async(endpoint.as_str())) => {
            result.map_err(|_| TransportError::Timeout(policy.connect_timeout))??
        }
    };
    let (mut write, mut read) = ws.split();

    let mut idle_limit = policy.connect_timeout;
    let mut last_frame = Instant::now();

    loop {
        let frame = tokio::select! {
            _ = shutdown.changed() => {
                let _ = write.send(Message::Text(socketio::encode_disconnect().into())).await;
                let _ = write.close().await;
                return Ok(SessionEnd::Stopped);
            }
            () = tokio::time::sleep_until(last_frame + idle_limit) => {
                tracing::warn!(idle = ?idle_limit, "server went silent");
                return Err(TransportError::Timeout(idle_limit));
            }
            frame = read.next() => frame,
        };
        last_frame = Instant::now();

        let Some(frame) = frame else {
            return Err(TransportError::Closed);
        };

        let text = match frame? {
            Message::Text(text) => text,
            Message::Close(_) => return Err(TransportError::Closed),
            _ => continue,
        };

        let packet = match socketio::decode(text.as_str()) {
            Ok(packet) => packet,
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed frame");
                continue;
            }
        };

        match packet {
            Packet::Open(info) => {
                tracing::debug!(sid = %info.sid, ping_interval = info.ping_interval, "engine open");
                if info.ping_interval > 0 {
                    idle_limit = Duration::from_millis(info.ping_interval.saturating_add(info.ping_timeout));
                }
                write.send(Message::Text(socketio::encode_connect().into())).await?;
            }
            Packet::Ping => {
                write.send(Message::Text(socketio::encode_pong().into())).await?;
            }
            Packet::Connect { namespace } if namespace == "/" => {
                *reached_connected = true;
                if tx.send(StreamMessage::State(ConnectionState::Connected)).is_err() {
                    return Ok(SessionEnd::Stopped);
                }
                for name in SEED_REQUESTS {
                    write
                        .send(Message::Text(socketio::encode_event(name, None).into()))
                        .await?;
                }
            }
            Packet::Event { namespace, name, payload } if namespace == "/" => {
                tracing::trace!(kind = %name, "event received");
                if tx.send(StreamMessage::Event { name, payload }).is_err() {
                    return Ok(SessionEnd::Stopped);
                }
            }
            Packet::ConnectError { message, .. } => return Err(TransportError::Rejected(message)),
            Packet::Disconnect { namespace } if namespace == "/" => return Err(TransportError::Closed),
            Packet::Close => return Err(TransportError::Closed),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    #[test]
    fn test_endpoint_from_http() {
        let url = socketio_endpoint("http://localhost:5000").unwrap();
        assert_eq!(url.as_str(), "ws://localhost:5000/socket.io/?EIO=4&transport=websocket");
    }

    #[test]
    fn test_endpoint_keeps_prefix_and_tls() {
        let url = socketio_endpoint("https://example.com/detect/").unwrap();
        assert_eq!(url.as_str(), "wss://example.com/detect/socket.io/?EIO=4&transport=websocket");
    }

    #[test]
    fn test_endpoint_rejects_other_schemes() {
        assert!(matches!(
            socketio_endpoint("ftp://example.com"),
            Err(TransportError::InvalidEndpoint { .. })
        ));
    }

    /// Minimal Socket.IO server: handshake, one event, one ping, then close.
    async fn fake_server(listener: TcpListener) -> Vec<String> {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        let mut received = Vec::new();

        ws.send(Message::Text(r#"0{"sid":"s1","upgrades":[],"pingInterval":25000,"pingTimeout":60000}"#.into()))
            .await
            .unwrap();
        // "40"
        if let Some(Ok(Message::Text(t))) = ws.next().await {
            received.push(t.as_str().to_string());
        }
        ws.send(Message::Text(r#"40{"sid":"n1"}"#.into())).await.unwrap();
        // seed requests
        for _ in 0..2 {
            if let Some(Ok(Message::Text(t))) = ws.next().await {
                received.push(t.as_str().to_string());
            }
        }
        ws.send(Message::Text(r#"42["accident_alert",{"severity":"MAJOR","confidence":0.9}]"#.into()))
            .await
            .unwrap();
        ws.send(Message::Text("2".into())).await.unwrap();
        if let Some(Ok(Message::Text(t))) = ws.next().await {
            received.push(t.as_str().to_string());
        }
        ws.close(None).await.ok();
        received
    }

    #[tokio::test]
    async fn test_session_relays_events_and_answers_pings() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(fake_server(listener));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = watch::channel(false);
        let endpoint = socketio_endpoint(&format!("http://{addr}")).unwrap();
        let policy = RetryPolicy {
            delay: Duration::from_millis(50),
            ..RetryPolicy::default()
        };
        let client = tokio::spawn(run(endpoint, policy, tx, stop_rx));

        let mut seen = Vec::new();
        while let Some(msg) = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap() {
            let done = msg == StreamMessage::State(ConnectionState::Disconnected);
            seen.push(msg);
            if done {
                break;
            }
        }
        stop_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), client)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        assert_eq!(
            seen,
            vec![
                StreamMessage::State(ConnectionState::Connecting),
                StreamMessage::State(ConnectionState::Connected),
                StreamMessage::Event {
                    name: "accident_alert".to_string(),
                    payload: json!({"severity": "MAJOR", "confidence": 0.9}),
                },
                StreamMessage::State(ConnectionState::Disconnected),
            ]
        );
        assert_eq!(
            server.await.unwrap(),
            vec!["40", r#"42["request_stats"]"#, r#"42["request_alerts"]"#, "3"]
        );
    }

    type ServerWs = tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

    const OPEN_FAST_PING: &str = r#"0{"sid":"s1","upgrades":[],"pingInterval":100,"pingTimeout":100}"#;

    /// Accept one client and complete the engine and namespace handshake.
    async fn accept_session(listener: &TcpListener) -> ServerWs {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.send(Message::Text(OPEN_FAST_PING.into())).await.unwrap();
        ws.next().await; // "40"
        ws.send(Message::Text(r#"40{"sid":"n1"}"#.into())).await.unwrap();
        for _ in 0..SEED_REQUESTS.len() {
            ws.next().await;
        }
        ws
    }

    async fn collect_states(rx: &mut mpsc::UnboundedReceiver<StreamMessage>, count: usize) -> Vec<ConnectionState> {
        let mut states = Vec::new();
        while states.len() < count {
            match tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap() {
                Some(StreamMessage::State(state)) => states.push(state),
                Some(StreamMessage::Event { .. }) => {}
                None => break,
            }
        }
        states
    }

    fn quick_policy(max_attempts: Option<u32>) -> RetryPolicy {
        RetryPolicy {
            delay: Duration::from_millis(10),
            max_attempts,
            ..RetryPolicy::default()
        }
    }

    #[tokio::test]
    async fn test_silent_server_is_dropped_after_heartbeat_window() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let _ws = accept_session(&listener).await;
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let (tx, mut rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = watch::channel(false);
        let endpoint = socketio_endpoint(&format!("http://{addr}")).unwrap();
        let client = tokio::spawn(run(endpoint, quick_policy(Some(1)), tx, stop_rx));

        assert_eq!(
            collect_states(&mut rx, 3).await,
            vec![ConnectionState::Connecting, ConnectionState::Connected, ConnectionState::Disconnected]
        );

        stop_tx.send(true).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), client).await.unwrap().unwrap();
        assert!(result.is_ok());
        server.abort();
    }

    #[tokio::test]
    async fn test_reconnects_after_server_disconnect_without_spending_budget() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let mut first = accept_session(&listener).await;
            first.send(Message::Text("41".into())).await.unwrap();
            first.close(None).await.ok();
            let _second = accept_session(&listener).await;
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let (tx, mut rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = watch::channel(false);
        let endpoint = socketio_endpoint(&format!("http://{addr}")).unwrap();
        // A budget of one: a lost live session must not count against it.
        let client = tokio::spawn(run(endpoint, quick_policy(Some(1)), tx, stop_rx));

        assert_eq!(
            collect_states(&mut rx, 5).await,
            vec![
                ConnectionState::Connecting,
                ConnectionState::Connected,
                ConnectionState::Disconnected,
                ConnectionState::Connecting,
                ConnectionState::Connected,
            ]
        );
        assert!(!client.is_finished());

        stop_tx.send(true).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), client).await.unwrap().unwrap();
        assert!(result.is_ok());
        server.abort();
    }

    #[tokio::test]
    async fn test_connect_error_counts_as_failed_attempt() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            ws.send(Message::Text(OPEN_FAST_PING.into())).await.unwrap();
            ws.next().await;
            ws.send(Message::Text(r#"44{"message":"unauthorized"}"#.into())).await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let (tx, mut rx) = mpsc::unbounded_channel();
        let (_stop_tx, stop_rx) = watch::channel(false);
        let endpoint = socketio_endpoint(&format!("http://{addr}")).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), run(endpoint, quick_policy(Some(1)), tx, stop_rx))
            .await
            .unwrap();

        assert!(matches!(result, Err(TransportError::RetriesExhausted(1))));
        assert_eq!(
            collect_states(&mut rx, 2).await,
            vec![ConnectionState::Connecting, ConnectionState::Disconnected]
        );
        server.abort();
    }

    #[tokio::test]
    async fn test_unanswered_upgrade_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        let (tx, _rx) = mpsc::unbounded_channel();
        let (_stop_tx, stop_rx) = watch::channel(false);
        let policy = RetryPolicy {
            connect_timeout: Duration::from_millis(200),
            ..quick_policy(Some(1))
        };
        let endpoint = socketio_endpoint(&format!("http://{addr}")).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(3), run(endpoint, policy, tx, stop_rx))
            .await
            .unwrap();
        assert!(matches!(result, Err(TransportError::RetriesExhausted(1))));
        server.abort();
    }

    #[tokio::test]
    async fn test_gives_up_after_retry_budget() {
        // Bind then drop to get a port nobody listens on.
        let addr = TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let (_stop_tx, stop_rx) = watch::channel(false);
        let policy = RetryPolicy {
            delay: Duration::from_millis(10),
            max_attempts: Some(2),
            ..RetryPolicy::default()
        };
        let endpoint = socketio_endpoint(&format!("http://{addr}")).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), run(endpoint, policy, tx, stop_rx))
            .await
            .unwrap();
        assert!(matches!(result, Err(TransportError::RetriesExhausted(2))));
    }
}
