//! Engine.IO v4 / Socket.IO v5 text framing.
//!
//! Only the subset a listening dashboard needs: the open handshake,
//! heartbeats, default-namespace connect/disconnect and event frames.
//! Binary attachments are not supported.
//!
//! ```text
//! 0{"sid":"..","pingInterval":25000,"pingTimeout":60000}   engine open
//! 2 / 3                                                      ping / pong
//! 40{"sid":".."}                                             namespace connected
//! 42["accident_alert",{"severity":"MAJOR"}]                  event
//! 42/admin,17["name",{}]                                     namespaced event with ack id
//! 44{"message":"unauthorized"}                               connect error
//! ```

use serde::Deserialize;
use serde_json::Value;

use crate::error::EventError;

/// Engine.IO open handshake parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenInfo {
    /// Engine session id.
    pub sid: String,
    /// Server ping interval in milliseconds.
    #[serde(default)]
    pub ping_interval: u64,
    /// Server ping timeout in milliseconds.
    #[serde(default)]
    pub ping_timeout: u64,
}

/// One decoded text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// Engine.IO open.
    Open(OpenInfo),
    /// Engine.IO close.
    Close,
    /// Server heartbeat; must be answered with [`Packet::Pong`].
    Ping,
    /// Heartbeat reply.
    Pong,
    /// Namespace connected.
    Connect {
        /// Namespace (`/` for the default one).
        namespace: String,
    },
    /// Namespace disconnected by the server.
    Disconnect {
        /// Namespace.
        namespace: String,
    },
    /// Named event with its first argument.
    Event {
        /// Namespace.
        namespace: String,
        /// Event name.
        name: String,
        /// First argument, `Null` when the event carried none.
        payload: Value,
    },
    /// Namespace connection refused.
    ConnectError {
        /// Namespace.
        namespace: String,
        /// Server-provided reason.
        message: String,
    },
    /// Frame types a listener ignores (acks, upgrades, noop).
    Ignored,
}

/// Decode one text frame.
pub fn decode(frame: &str) -> Result<Packet, EventError> {
    let mut chars = frame.chars();
    let engine_type = chars
        .next()
        .ok_or_else(|| EventError::Malformed("empty frame".to_string()))?;
    let rest = chars.as_str();

    match engine_type {
        '0' => serde_json::from_str(rest)
            .map(Packet::Open)
            .map_err(|e| EventError::Malformed(format!("bad open packet: {e}"))),
        '1' => Ok(Packet::Close),
        '2' => Ok(Packet::Ping),
        '3' => Ok(Packet::Pong),
        '4' => decode_socket(rest),
        '5' | '6' => Ok(Packet::Ignored),
        other => Err(EventError::Malformed(format!("unknown engine packet type '{other}'"))),
    }
}

fn decode_socket(body: &str) -> Result<Packet, EventError> {
    let mut chars = body.chars();
    let socket_type = chars
        .next()
        .ok_or_else(|| EventError::Malformed("missing socket packet type".to_string()))?;
    let (namespace, rest) = split_namespace(chars.as_str());

    match socket_type {
        '0' => Ok(Packet::Connect { namespace }),
        '1' => Ok(Packet::Disconnect { namespace }),
        '2' => {
            let args = rest.trim_start_matches(|c: char| c.is_ascii_digit());
            let mut values: Vec<Value> = serde_json::from_str(args)
                .map_err(|e| EventError::Malformed(format!("bad event arguments: {e}")))?;
            if values.is_empty() {
                return Err(EventError::Malformed("event without a name".to_string()));
            }
            let name = match values.remove(0) {
                Value::String(name) => name,
                other => {
                    return Err(EventError::Malformed(format!("event name is not a string: {other}")));
                }
            };
            let payload = if values.is_empty() {
                Value::Null
            } else {
                values.swap_remove(0)
            };
            Ok(Packet::Event { namespace, name, payload })
        }
        '4' => {
            let message = serde_json::from_str::<Value>(rest)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| rest.to_string());
            Ok(Packet::ConnectError { namespace, message })
        }
        '3' | '5' | '6' => Ok(Packet::Ignored),
        other => Err(EventError::Malformed(format!("unknown socket packet type '{other}'"))),
    }
}

/// Split an optional `/namespace,` prefix off a socket packet body.
fn split_namespace(body: &str) -> (String, &str) {
    if body.starts_with('/') {
        match body.split_once(',') {
            Some((ns, rest)) => (ns.to_string(), rest),
            None => (body.to_string(), ""),
        }
    } else {
        ("/".to_string(), body)
    }
}

/// Heartbeat reply frame.
pub fn encode_pong() -> String {
    "3".to_string()
}

/// Default-namespace connect request.
pub fn encode_connect() -> String {
    "40".to_string()
}

/// Default-namespace disconnect notice.
pub fn encode_disconnect() -> String {
    "41".to_string()
}

/// Event frame for the default namespace.
pub fn encode_event(name: &str, payload: Option<&Value>) -> String {
    let args = match payload {
        Some(p) => Value::Array(vec![Value::String(name.to_string()), p.clone()]),
        None => Value::Array(vec![Value::String(name.to_string())]),
    };
    format!("42{args}")
}
