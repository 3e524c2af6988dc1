//! Anomaly notifications shown to the operator.

use chrono::NaiveDateTime;
use vitalscope_protocol::{parse_instant, AnomalyPayload, AnomalySource, Severity, ThermalKind};

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub source: AnomalySource,
    /// Detection time from the payload, else the push envelope, else arrival.
    pub detected_at: NaiveDateTime,
    pub severity: Option<Severity>,
    pub detail: NotificationDetail,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NotificationDetail {
    /// ECG / piezo autoencoder result.
    Reconstruction { error: f64, threshold: f64 },
    Thermal {
        kind: Option<ThermalKind>,
        temperature: f64,
    },
}

impl Notification {
    pub fn from_anomaly(payload: &AnomalyPayload, fallback_time: NaiveDateTime) -> Self {
        let source = payload.source();
        let detected_at = payload
            .timestamp
            .as_deref()
            .and_then(parse_instant)
            .unwrap_or(fallback_time);
        let detail = match (source, payload.temperature) {
            (AnomalySource::Temp, temperature) => NotificationDetail::Thermal {
                kind: payload.thermal_kind(),
                temperature: temperature.unwrap_or_default(),
            },
            _ => NotificationDetail::Reconstruction {
                error: payload.reconstruction_error,
                threshold: payload.threshold,
            },
        };
        Self {
            source,
            detected_at,
            severity: payload.severity(),
            detail,
        }
    }

    pub fn title(&self) -> String {
        match &self.detail {
            NotificationDetail::Thermal {
                kind: Some(ThermalKind::Hypothermia),
                ..
            } => "Hypothermia".to_string(),
            NotificationDetail::Thermal {
                kind: Some(ThermalKind::Hyperthermia),
                ..
            } => "Hyperthermia".to_string(),
            NotificationDetail::Thermal { kind: None, .. } => "Temperature anomaly".to_string(),
            NotificationDetail::Reconstruction { .. } => {
                format!("{} anomaly", self.source.as_str().to_ascii_uppercase())
            }
        }
    }

    pub fn summary(&self) -> String {
        let body = match &self.detail {
            NotificationDetail::Reconstruction { error, threshold } => {
                format!("error {:.4} (threshold {:.4})", error, threshold)
            }
            NotificationDetail::Thermal { temperature, .. } => format!("{:.1} °C", temperature),
        };
        match self.severity {
            Some(severity) => format!("{} [{}]: {}", self.title(), severity.as_str(), body),
            None => format!("{}: {}", self.title(), body),
        }
    }
}
