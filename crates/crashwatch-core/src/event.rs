//! Typed server events.
//!
//! The server pushes `(event name, JSON payload)` pairs. [`ServerEvent::from_wire`]
//! turns each pair into one variant of a closed enum so the dispatcher can
//! match exhaustively. Payload fields are all optional and numeric fields
//! tolerate `null`, strings and floats, since partial payloads must be
//! displayed with fallbacks instead of being rejected.

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EventError;
use crate::model::{AggregateStats, DetectionSnapshot, Severity, SeverityFactors, TimelineEntry};

/// Event names as they appear on the wire.
pub mod kind {
    /// Accident alert with severity.
    pub const ACCIDENT_ALERT: &str = "accident_alert";
    /// Raw detection result, no alert side effects.
    pub const NEW_DETECTION: &str = "new_detection";
    /// Partial aggregate counters.
    pub const STATS_UPDATE: &str = "stats_update";
    /// Server cleared its alert history.
    pub const ALERTS_CLEARED: &str = "alerts_cleared";
    /// Server asked for the particle effect.
    pub const CELEBRATION: &str = "celebration";
    /// Number of connected dashboards.
    pub const CLIENT_COUNT: &str = "client_count";
    /// Greeting sent after the namespace handshake.
    pub const CONNECTED: &str = "connected";
    /// Alert history snapshot.
    pub const ALERTS_UPDATE: &str = "alerts_update";
    /// Reply to a client `ping`.
    pub const PONG: &str = "pong";
}

/// Payload shared by `accident_alert` and `new_detection`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DetectionPayload {
    /// Explicit detection flag (alerts usually omit it).
    #[serde(default, deserialize_with = "lenient::bool")]
    pub accident_detected: Option<bool>,
    /// Severity label.
    #[serde(default, deserialize_with = "lenient::string")]
    pub severity: Option<String>,
    /// Model confidence on the 0-1 scale.
    #[serde(default, deserialize_with = "lenient::f64")]
    pub confidence: Option<f64>,
    /// Severity confidence already on the 0-100 scale.
    #[serde(default, deserialize_with = "lenient::f64")]
    pub severity_confidence: Option<f64>,
    /// Vehicles involved.
    #[serde(default, deserialize_with = "lenient::u64")]
    pub vehicle_count: Option<u64>,
    /// Contributing factors.
    #[serde(default)]
    pub severity_factors: Option<FactorsPayload>,
    /// Camera label.
    #[serde(default, deserialize_with = "lenient::string")]
    pub location: Option<String>,
    /// Alert identifier (`accident_alert`).
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: Option<String>,
    /// Detection identifier (`new_detection`).
    #[serde(default, deserialize_with = "lenient::string")]
    pub detection_id: Option<String>,
    /// Server timestamp, ISO-8601 without offset.
    #[serde(default, deserialize_with = "lenient::string")]
    pub timestamp: Option<String>,
}

/// Wire form of [`SeverityFactors`]; any key may be missing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct FactorsPayload {
    /// Overlap percentage.
    #[serde(default, deserialize_with = "lenient::f64")]
    pub overlap: Option<f64>,
    /// Motion percentage.
    #[serde(default, deserialize_with = "lenient::f64")]
    pub motion: Option<f64>,
    /// Debris percentage.
    #[serde(default, deserialize_with = "lenient::f64")]
    pub debris: Option<f64>,
}

impl DetectionPayload {
    /// Confidence on the 0-100 scale.
    ///
    /// `severity_confidence` is already a percentage and wins. Otherwise
    /// `confidence` is a 0-1 fraction and is scaled by 100. With neither,
    /// the confidence is 0.
    pub fn confidence_pct(&self) -> f64 {
        if let Some(pct) = self.severity_confidence {
            pct
        } else if let Some(fraction) = self.confidence {
            fraction * 100.0
        } else {
            0.0
        }
    }

    /// Parsed severity.
    pub fn severity(&self) -> Severity {
        Severity::from_label(self.severity.as_deref())
    }

    /// Factors with missing values as zero.
    pub fn factors(&self) -> SeverityFactors {
        let f = self.severity_factors.clone().unwrap_or_default();
        SeverityFactors {
            overlap: f.overlap.unwrap_or(0.0),
            motion: f.motion.unwrap_or(0.0),
            debris: f.debris.unwrap_or(0.0),
        }
    }

    /// Server timestamp, if present and parseable.
    pub fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        let raw = self.timestamp.as_deref()?;
        raw.parse::<NaiveDateTime>()
            .ok()
            .or_else(|| chrono::DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_local()))
    }

    /// Build the full snapshot this payload describes.
    ///
    /// `detected_by_default` is used when the payload carries no explicit
    /// `accident_detected` flag: alerts imply an accident, raw detections
    /// infer it from the severity.
    pub fn to_snapshot(&self, detected_by_default: bool) -> DetectionSnapshot {
        let severity = self.severity();
        let vehicle_count = self
            .vehicle_count
            .map_or(0, |n| u32::try_from(n).unwrap_or(u32::MAX));
        DetectionSnapshot {
            accident_detected: self.accident_detected.unwrap_or(detected_by_default),
            severity,
            severity_label: self
                .severity
                .clone()
                .unwrap_or_else(|| severity.wire_name().to_string()),
            severity_confidence_pct: self.confidence_pct(),
            vehicle_count,
            severity_factors: self.factors(),
            location: self.location.clone(),
            detection_id: self.detection_id.clone().or_else(|| self.id.clone()),
            timestamp: self.parsed_timestamp(),
        }
    }

    /// Timeline entry for this alert, stamped with local time when the
    /// server sent none.
    pub fn to_timeline_entry(&self) -> TimelineEntry {
        let severity = self.severity();
        TimelineEntry {
            severity,
            severity_label: self
                .severity
                .clone()
                .unwrap_or_else(|| severity.wire_name().to_string()),
            confidence_pct: self.confidence_pct(),
            timestamp: self
                .parsed_timestamp()
                .unwrap_or_else(|| Local::now().naive_local()),
        }
    }
}

/// Partial aggregate counters. Absent fields keep their previous value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct StatsPayload {
    /// Accidents detected.
    #[serde(default, deserialize_with = "lenient::u64")]
    pub accidents_detected: Option<u64>,
    /// Per-severity counters (each key optional).
    #[serde(default)]
    pub severity_counts: Option<SeverityCountsPayload>,
    /// Frames processed.
    #[serde(default, deserialize_with = "lenient::u64")]
    pub total_detections: Option<u64>,
    /// Alerts pushed.
    #[serde(default, deserialize_with = "lenient::u64")]
    pub alerts_sent: Option<u64>,
    /// Cameras streaming.
    #[serde(default, deserialize_with = "lenient::u64")]
    pub active_cameras: Option<u64>,
    /// Connected dashboards.
    #[serde(default, deserialize_with = "lenient::u64")]
    pub connected_clients: Option<u64>,
    /// Uptime label.
    #[serde(default, deserialize_with = "lenient::string")]
    pub uptime: Option<String>,
    /// Detector accuracy percentage.
    #[serde(default, deserialize_with = "lenient::f64")]
    pub detection_accuracy: Option<f64>,
    /// Mean confidence percentage.
    #[serde(default, deserialize_with = "lenient::f64")]
    pub avg_confidence: Option<f64>,
}

/// Wire form of the per-severity counters.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SeverityCountsPayload {
    /// MINOR count.
    #[serde(rename = "MINOR", default, deserialize_with = "lenient::u64")]
    pub minor: Option<u64>,
    /// MAJOR count.
    #[serde(rename = "MAJOR", default, deserialize_with = "lenient::u64")]
    pub major: Option<u64>,
    /// CRITICAL count.
    #[serde(rename = "CRITICAL", default, deserialize_with = "lenient::u64")]
    pub critical: Option<u64>,
}

impl StatsPayload {
    /// Merge present fields into `stats`, leaving the rest untouched.
    pub fn merge_into(&self, stats: &mut AggregateStats) {
        fn set<T: Clone>(slot: &mut T, value: Option<&T>) {
            if let Some(v) = value {
                slot.clone_from(v);
            }
        }
        fn set_opt<T: Clone>(slot: &mut Option<T>, value: Option<&T>) {
            if let Some(v) = value {
                *slot = Some(v.clone());
            }
        }

        set(&mut stats.accidents_detected, self.accidents_detected.as_ref());
        if let Some(counts) = &self.severity_counts {
            set(&mut stats.severity_counts.minor, counts.minor.as_ref());
            set(&mut stats.severity_counts.major, counts.major.as_ref());
            set(&mut stats.severity_counts.critical, counts.critical.as_ref());
        }
        set_opt(&mut stats.total_detections, self.total_detections.as_ref());
        set_opt(&mut stats.alerts_sent, self.alerts_sent.as_ref());
        set_opt(&mut stats.active_cameras, self.active_cameras.as_ref());
        set_opt(&mut stats.connected_clients, self.connected_clients.as_ref());
        set_opt(&mut stats.uptime, self.uptime.as_ref());
        set_opt(&mut stats.detection_accuracy, self.detection_accuracy.as_ref());
        set_opt(&mut stats.avg_confidence, self.avg_confidence.as_ref());
        stats.received = true;
    }
}

/// Alert history snapshot sent in reply to `request_alerts`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AlertsPayload {
    /// Alerts, oldest first as the server stores them.
    #[serde(default)]
    pub alerts: Vec<DetectionPayload>,
    /// Total alerts the server holds.
    #[serde(default, deserialize_with = "lenient::u64")]
    pub total: Option<u64>,
}

/// Every event the dashboard understands.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// Accident alert: snapshot, timeline entry and notifications.
    AccidentAlert(DetectionPayload),
    /// Raw detection: snapshot only.
    NewDetection(DetectionPayload),
    /// Partial aggregate counters.
    StatsUpdate(StatsPayload),
    /// Alert history snapshot.
    AlertsUpdate(AlertsPayload),
    /// Server-side history was cleared.
    AlertsCleared,
    /// Server asked for the particle effect.
    Celebration,
    /// Number of connected dashboards.
    ClientCount {
        /// Connected clients.
        count: u64,
    },
    /// Greeting after connect.
    Welcome {
        /// Server message.
        message: Option<String>,
        /// Session identifier assigned by the server.
        client_id: Option<String>,
    },
    /// Reply to a client ping.
    Pong,
}

impl ServerEvent {
    /// Decode one `(name, payload)` pair.
    ///
    /// Unrecognized names yield [`EventError::UnknownKind`]. Recognized
    /// names never fail on missing fields; only a payload of the wrong JSON
    /// type (e.g. a string where an object is expected) is rejected.
    pub fn from_wire(name: &str, payload: Value) -> Result<Self, EventError> {
        let payload = if payload.is_null() {
            Value::Object(serde_json::Map::new())
        } else {
            payload
        };
        fn decode<T: serde::de::DeserializeOwned>(name: &str, payload: Value) -> Result<T, EventError> {
            serde_json::from_value(payload).map_err(|source| EventError::Payload {
                kind: name.to_string(),
                source,
            })
        }

        match name {
            kind::ACCIDENT_ALERT => Ok(ServerEvent::AccidentAlert(decode(name, payload)?)),
            kind::NEW_DETECTION => Ok(ServerEvent::NewDetection(decode(name, payload)?)),
            kind::STATS_UPDATE => Ok(ServerEvent::StatsUpdate(decode(name, payload)?)),
            kind::ALERTS_UPDATE => Ok(ServerEvent::AlertsUpdate(decode(name, payload)?)),
            kind::ALERTS_CLEARED => Ok(ServerEvent::AlertsCleared),
            kind::CELEBRATION => Ok(ServerEvent::Celebration),
            kind::PONG => Ok(ServerEvent::Pong),
            kind::CLIENT_COUNT => {
                let count = payload.get("count").and_then(lenient::value_u64).unwrap_or(0);
                Ok(ServerEvent::ClientCount { count })
            }
            kind::CONNECTED => Ok(ServerEvent::Welcome {
                message: payload.get("message").and_then(lenient::value_string),
                client_id: payload.get("client_id").and_then(lenient::value_string),
            }),
            other => Err(EventError::UnknownKind(other.to_string())),
        }
    }

    /// Wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::AccidentAlert(_) => kind::ACCIDENT_ALERT,
            ServerEvent::NewDetection(_) => kind::NEW_DETECTION,
            ServerEvent::StatsUpdate(_) => kind::STATS_UPDATE,
            ServerEvent::AlertsUpdate(_) => kind::ALERTS_UPDATE,
            ServerEvent::AlertsCleared => kind::ALERTS_CLEARED,
            ServerEvent::Celebration => kind::CELEBRATION,
            ServerEvent::ClientCount { .. } => kind::CLIENT_COUNT,
            ServerEvent::Welcome { .. } => kind::CONNECTED,
            ServerEvent::Pong => kind::PONG,
        }
    }
}

/// One line of a recorded event log: `{"event": name, "data": payload}`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecordedEvent {
    /// Event name.
    pub event: String,
    /// Payload (`null` when absent).
    #[serde(default)]
    pub data: Value,
}

/// Deserializers that turn type mismatches into `None` instead of errors.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub(super) fn value_f64(v: &Value) -> Option<f64> {
        match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .filter(|f: &f64| f.is_finite())
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub(super) fn value_u64(v: &Value) -> Option<u64> {
        match v {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.is_finite()).map(|f| f as u64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub(super) fn value_string(v: &Value) -> Option<String> {
        match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn value_bool(v: &Value) -> Option<bool> {
        match v {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_i64().map(|i| i != 0),
            _ => None,
        }
    }

    pub(super) fn f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(Option::<Value>::deserialize(d)?.as_ref().and_then(value_f64))
    }

    pub(super) fn u64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        Ok(Option::<Value>::deserialize(d)?.as_ref().and_then(value_u64))
    }

    pub(super) fn string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(Option::<Value>::deserialize(d)?.as_ref().and_then(value_string))
    }

    pub(super) fn bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        Ok(Option::<Value>::deserialize(d)?.as_ref().and_then(value_bool))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn detection(payload: Value) -> DetectionPayload {
        match ServerEvent::from_wire(kind::NEW_DETECTION, payload).unwrap() {
            ServerEvent::NewDetection(p) => p,
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_confidence_fraction_is_scaled() {
        let p = detection(json!({"confidence": 0.87}));
        assert!((p.confidence_pct() - 87.0).abs() < 1e-9);
    }

    #[test]
    fn test_severity_confidence_is_used_directly() {
        let p = detection(json!({"severity_confidence": 42, "confidence": 0.99}));
        assert!((p.confidence_pct() - 42.0).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_defaults_to_zero() {
        let p = detection(json!({}));
        assert!(p.confidence_pct().abs() < f64::EPSILON);
    }

    #[test]
    fn test_null_severity_confidence_falls_back_to_fraction() {
        let p = detection(json!({"severity_confidence": null, "confidence": 0.5}));
        assert!((p.confidence_pct() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_factors_default_to_zero() {
        let p = detection(json!({"severity_factors": {"overlap": 73.4}}));
        let f = p.factors();
        assert!((f.overlap - 73.4).abs() < 1e-9);
        assert!(f.motion.abs() < f64::EPSILON);
        assert!(f.debris.abs() < f64::EPSILON);
    }

    #[test]
    fn test_alert_snapshot_defaults_to_detected() {
        let p = detection(json!({"severity": "CRITICAL", "confidence": 0.95, "vehicle_count": 4}));
        let snap = p.to_snapshot(true);
        assert!(snap.accident_detected);
        assert_eq!(snap.severity, Severity::Critical);
        assert_eq!(snap.vehicle_count, 4);

        let snap = detection(json!({"accident_detected": false})).to_snapshot(true);
        assert!(!snap.accident_detected);
    }

    #[test]
    fn test_unknown_severity_is_recorded() {
        let snap = detection(json!({"severity": "SEVERE"})).to_snapshot(true);
        assert_eq!(snap.severity, Severity::Unknown);
        assert_eq!(snap.severity_label, "SEVERE");
    }

    #[test]
    fn test_lenient_numbers() {
        let p = detection(json!({"vehicle_count": "3", "confidence": "0.25", "accident_detected": 1}));
        assert_eq!(p.vehicle_count, Some(3));
        assert!((p.confidence_pct() - 25.0).abs() < 1e-9);
        assert_eq!(p.accident_detected, Some(true));

        let p = detection(json!({"vehicle_count": -2, "confidence": [1]}));
        assert_eq!(p.vehicle_count, None);
        assert_eq!(p.confidence, None);
    }

    #[test]
    fn test_server_timestamp_parsed() {
        let p = detection(json!({"timestamp": "2026-01-15T10:20:30.123456"}));
        let ts = p.parsed_timestamp().unwrap();
        assert_eq!(ts.format("%H:%M:%S").to_string(), "10:20:30");
    }

    #[test]
    fn test_stats_merge_keeps_missing_fields() {
        let mut stats = AggregateStats::default();
        let full: StatsPayload = serde_json::from_value(json!({
            "accidents_detected": 10,
            "severity_counts": {"MINOR": 4, "MAJOR": 3, "CRITICAL": 3}
        }))
        .unwrap();
        full.merge_into(&mut stats);

        let partial: StatsPayload =
            serde_json::from_value(json!({"severity_counts": {"MINOR": 5}})).unwrap();
        partial.merge_into(&mut stats);

        assert_eq!(stats.accidents_detected, 10);
        assert_eq!(stats.severity_counts.minor, 5);
        assert_eq!(stats.severity_counts.major, 3);
        assert_eq!(stats.severity_counts.critical, 3);
        assert!(stats.received);
    }

    #[test]
    fn test_unknown_kind_is_an_error() {
        let err = ServerEvent::from_wire("heartbeat", json!({})).unwrap_err();
        assert!(matches!(err, EventError::UnknownKind(k) if k == "heartbeat"));
    }

    #[test]
    fn test_wrong_payload_type_is_an_error() {
        let err = ServerEvent::from_wire(kind::STATS_UPDATE, json!("nope")).unwrap_err();
        assert!(matches!(err, EventError::Payload { .. }));
    }

    #[test]
    fn test_null_payload_is_empty_object() {
        let event = ServerEvent::from_wire(kind::ACCIDENT_ALERT, Value::Null).unwrap();
        assert_eq!(event, ServerEvent::AccidentAlert(DetectionPayload::default()));
    }

    #[test]
    fn test_client_count_and_welcome() {
        assert_eq!(
            ServerEvent::from_wire(kind::CLIENT_COUNT, json!({"count": 3})).unwrap(),
            ServerEvent::ClientCount { count: 3 }
        );
        let welcome = ServerEvent::from_wire(kind::CONNECTED, json!({"client_id": "abc"})).unwrap();
        assert_eq!(
            welcome,
            ServerEvent::Welcome { message: None, client_id: Some("abc".to_string()) }
        );
        assert_eq!(welcome.name(), kind::CONNECTED);
    }
}
