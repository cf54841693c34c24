//! Outbound requests to the detection server.
//!
//! Two calls have side effects a user can trigger (simulate an alert,
//! clear the alert history); the rest are read-only lookups used by the
//! command-line front end and to seed the store.

use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::ActionError;
use crate::event::{AlertsPayload, DetectionPayload, StatsPayload};
use crate::model::Severity;

/// Reply to `POST /api/simulate/<severity>`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SimulateResponse {
    /// Whether the server accepted the request.
    #[serde(default)]
    pub success: bool,
    /// Human-readable result.
    #[serde(default)]
    pub message: Option<String>,
    /// Error text on failure.
    #[serde(default)]
    pub error: Option<String>,
}

/// Reply to `GET /api/health`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HealthResponse {
    /// `online` when healthy.
    #[serde(default)]
    pub status: String,
    /// Server version.
    #[serde(default)]
    pub version: Option<String>,
    /// Connected stream clients.
    #[serde(default)]
    pub connections: Option<u64>,
    /// Advertised features.
    #[serde(default)]
    pub features: Vec<String>,
    /// Server time.
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// One entry of `GET /api/camera/status`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CameraStatus {
    /// Camera number.
    pub id: u64,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// `active`, `maintenance` or `inactive`.
    #[serde(default)]
    pub status: String,
    /// Site category, e.g. `highway`.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

#[derive(Deserialize)]
struct CamerasEnvelope {
    #[serde(default)]
    cameras: Vec<CameraStatus>,
}

/// Export formats offered by `GET /api/export/alerts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// JSON document.
    #[default]
    Json,
    /// CSV with a header row.
    Csv,
}

impl ExportFormat {
    fn as_query(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

/// Outcome of a user-initiated request, fed back into the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// A simulated alert was requested.
    AlertTriggered {
        /// Requested severity.
        severity: Severity,
        /// Success or error text.
        result: Result<String, String>,
    },
    /// History clear was requested.
    HistoryCleared {
        /// Success or error text.
        result: Result<(), String>,
    },
}

/// HTTP client bound to one server.
#[derive(Debug, Clone)]
pub struct ActionClient {
    http: Client,
    base: Url,
}

impl ActionClient {
    /// Create a client for `base_url` (e.g. `http://localhost:5000`).
    pub fn new(base_url: &str) -> Result<Self, ActionError> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            http: Client::new(),
            base,
        })
    }

    /// Server base URL.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url, ActionError> {
        Ok(self.base.join(path)?)
    }

    /// Ask the server to broadcast a simulated alert.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn trigger_alert(&self, severity: Severity) -> Result<SimulateResponse, ActionError> {
        let url = self.url(&format!("api/simulate/{}", severity.wire_name()))?;
        let response = check_status(self.http.post(url).send().await?).await?;
        let body: SimulateResponse = response.json().await?;
        if body.success {
            Ok(body)
        } else {
            Err(ActionError::Rejected(
                body.error.or(body.message).unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }

    /// Ask the server to clear its alert history. Any 2xx counts as success.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn clear_history(&self) -> Result<(), ActionError> {
        let url = self.url("api/clear-alerts")?;
        check_status(self.http.post(url).send().await?).await?;
        Ok(())
    }

    /// Server health.
    pub async fn health(&self) -> Result<HealthResponse, ActionError> {
        let url = self.url("api/health")?;
        Ok(check_status(self.http.get(url).send().await?).await?.json().await?)
    }

    /// Current aggregate counters.
    pub async fn stats(&self) -> Result<StatsPayload, ActionError> {
        let url = self.url("api/stats")?;
        Ok(check_status(self.http.get(url).send().await?).await?.json().await?)
    }

    /// Recent alerts, optionally filtered by severity.
    pub async fn alerts(&self, limit: u32, severity: Option<Severity>) -> Result<AlertsPayload, ActionError> {
        let mut url = self.url("api/alerts")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &limit.to_string());
            if let Some(severity) = severity {
                query.append_pair("severity", severity.wire_name());
            }
        }
        Ok(check_status(self.http.get(url).send().await?).await?.json().await?)
    }

    /// Camera roster with each camera's status.
    pub async fn cameras(&self) -> Result<Vec<CameraStatus>, ActionError> {
        let url = self.url("api/camera/status")?;
        let envelope: CamerasEnvelope = check_status(self.http.get(url).send().await?).await?.json().await?;
        Ok(envelope.cameras)
    }

    /// One alert by its alert or detection id. A 404 surfaces as
    /// [`ActionError::Status`].
    pub async fn alert(&self, id: &str) -> Result<DetectionPayload, ActionError> {
        let mut url = self.url("api/alerts/")?;
        url.path_segments_mut()
            .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .push(id);
        Ok(check_status(self.http.get(url).send().await?).await?.json().await?)
    }

    /// Export the alert history, returning the raw body.
    pub async fn export_alerts(&self, format: ExportFormat) -> Result<String, ActionError> {
        let mut url = self.url("api/export/alerts")?;
        url.query_pairs_mut().append_pair("format", format.as_query());
        let body = check_status(self.http.get(url).send().await?).await?.text().await?;
        if format == ExportFormat::Json {
            // Re-indent so exports are diffable.
            if let Ok(value) = serde_json::from_str::<Value>(&body) {
                return Ok(serde_json::to_string_pretty(&value).unwrap_or(body));
            }
        }
        Ok(body)
    }

    /// Run `trigger_alert` and fold the result into an [`ActionOutcome`].
    pub async fn trigger_alert_outcome(&self, severity: Severity) -> ActionOutcome {
        let result = self
            .trigger_alert(severity)
            .await
            .map(|r| r.message.unwrap_or_else(|| format!("{severity} accident simulated")))
            .map_err(|e| e.to_string());
        ActionOutcome::AlertTriggered { severity, result }
    }

    /// Run `clear_history` and fold the result into an [`ActionOutcome`].
    pub async fn clear_history_outcome(&self) -> ActionOutcome {
        let result = self.clear_history().await.map_err(|e| e.to_string());
        ActionOutcome::HistoryCleared { result }
    }
}

async fn check_status(response: Response) -> Result<Response, ActionError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let body = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or(body);
    Err(ActionError::Status {
        status: status.as_u16(),
        body,
    })
}
