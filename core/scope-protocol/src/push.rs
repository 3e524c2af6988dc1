//! Push-channel events and the status snapshot shared with polling.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::{lenient, parse_instant, ErrorInfo, Signal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushKind {
    Anomaly,
    Status,
    Log,
}

/// Raw line from the push channel: `{ "type", "timestamp", "data" }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushEnvelope {
    #[serde(rename = "type")]
    pub kind: PushKind,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PushEvent {
    pub timestamp: Option<NaiveDateTime>,
    pub payload: PushPayload,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PushPayload {
    Anomaly(AnomalyPayload),
    Status(StatusPayload),
    Log(LogPayload),
}

/// Decodes one push line. Only the envelope `type` is mandatory; a payload
/// that does not decode is replaced by its neutral default.
pub fn parse_push_event(line: &str) -> Result<PushEvent, ErrorInfo> {
    let envelope: PushEnvelope = serde_json::from_str(line).map_err(|err| {
        ErrorInfo::new(
            "invalid_envelope",
            format!("push event is not a valid envelope: {}", err),
        )
    })?;
    Ok(PushEvent::from_envelope(envelope))
}

impl PushEvent {
    pub fn from_envelope(envelope: PushEnvelope) -> Self {
        let timestamp = envelope.timestamp.as_deref().and_then(parse_instant);
        let data = envelope.data;
        let payload = match envelope.kind {
            PushKind::Anomaly => {
                PushPayload::Anomaly(serde_json::from_value(data).unwrap_or_default())
            }
            PushKind::Status => {
                PushPayload::Status(serde_json::from_value(data).unwrap_or_default())
            }
            PushKind::Log => PushPayload::Log(serde_json::from_value(data).unwrap_or_default()),
        };
        Self { timestamp, payload }
    }

    pub fn kind(&self) -> PushKind {
        match self.payload {
            PushPayload::Anomaly(_) => PushKind::Anomaly,
            PushPayload::Status(_) => PushKind::Status,
            PushPayload::Log(_) => PushKind::Log,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Anomalies
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalySource {
    Ecg,
    Piezo,
    Temp,
}

impl AnomalySource {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ecg" => Some(AnomalySource::Ecg),
            "piezo" | "adc" => Some(AnomalySource::Piezo),
            "temp" | "temperature" => Some(AnomalySource::Temp),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalySource::Ecg => "ecg",
            AnomalySource::Piezo => "piezo",
            AnomalySource::Temp => "temp",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThermalKind {
    Hypothermia,
    Hyperthermia,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

impl Severity {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mild" => Some(Severity::Mild),
            "moderate" => Some(Severity::Moderate),
            "severe" => Some(Severity::Severe),
            _ => None,
        }
    }

    /// Grades a thermal excursion by how far it is from normal.
    pub fn for_temperature(kind: ThermalKind, temperature: f64) -> Self {
        match kind {
            ThermalKind::Hypothermia if temperature < 32.0 => Severity::Severe,
            ThermalKind::Hypothermia if temperature < 34.0 => Severity::Moderate,
            ThermalKind::Hypothermia => Severity::Mild,
            ThermalKind::Hyperthermia if temperature > 40.0 => Severity::Severe,
            ThermalKind::Hyperthermia if temperature > 39.0 => Severity::Moderate,
            ThermalKind::Hyperthermia => Severity::Mild,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Mild => "mild",
            Severity::Moderate => "moderate",
            Severity::Severe => "severe",
        }
    }
}

/// Either a reconstruction-error/threshold pair (ECG, piezo) or a
/// temperature reading with its severity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalyPayload {
    #[serde(default, alias = "sensor", deserialize_with = "lenient::opt_string")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub reconstruction_error: f64,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub threshold: f64,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub temperature: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub anomaly_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub severity: Option<String>,
}

impl AnomalyPayload {
    /// Declared source, else `temp` when a temperature is present, else `ecg`.
    pub fn source(&self) -> AnomalySource {
        self.source
            .as_deref()
            .and_then(AnomalySource::parse)
            .unwrap_or(if self.temperature.is_some() {
                AnomalySource::Temp
            } else {
                AnomalySource::Ecg
            })
    }

    pub fn thermal_kind(&self) -> Option<ThermalKind> {
        match self.anomaly_type.as_deref()?.trim().to_ascii_lowercase().as_str() {
            "hypothermia" => Some(ThermalKind::Hypothermia),
            "hyperthermia" => Some(ThermalKind::Hyperthermia),
            _ => None,
        }
    }

    /// Declared severity, or one derived from the reading for thermal events.
    pub fn severity(&self) -> Option<Severity> {
        if let Some(declared) = self.severity.as_deref().and_then(Severity::parse) {
            return Some(declared);
        }
        let temperature = self.temperature?;
        let kind = self.thermal_kind()?;
        Some(Severity::for_temperature(kind, temperature))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Status
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelStats {
    #[serde(default, deserialize_with = "lenient::u64")]
    pub samples: u64,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub last_update: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub current_temp: Option<f64>,
}

/// Aggregate acquisition status. Every field is optional: push events often
/// carry only the fields that changed, and absent fields mean "unchanged".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusPayload {
    #[serde(default, alias = "connected", deserialize_with = "lenient::opt_bool")]
    pub device_connected: Option<bool>,
    #[serde(default, alias = "is_acquiring", deserialize_with = "lenient::opt_bool")]
    pub acquiring: Option<bool>,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub uptime: Option<u64>,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub packet_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub current_session_id: Option<String>,
    /// Channels whose entry does not decode are left out.
    #[serde(default, deserialize_with = "lenient::opt_map")]
    pub stats: Option<HashMap<String, ChannelStats>>,
}

impl StatusPayload {
    pub fn channel(&self, signal: Signal) -> Option<&ChannelStats> {
        self.stats.as_ref()?.get(signal.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self == &StatusPayload::default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Some(LogLevel::Debug),
            "INFO" => Some(LogLevel::Info),
            "WARNING" | "WARN" => Some(LogLevel::Warning),
            "ERROR" => Some(LogLevel::Error),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(value
            .as_str()
            .and_then(LogLevel::parse)
            .unwrap_or_default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogPayload {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub category: String,
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default, deserialize_with = "lenient::string")]
    pub message: String,
}

/// Response of the recent-logs query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogList {
    #[serde(default, deserialize_with = "lenient::list")]
    pub logs: Vec<LogPayload>,
    #[serde(default)]
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_anomaly_with_error_pair() {
        let event = parse_push_event(
            r#"{"type":"anomaly","timestamp":"2025-01-14T09:31:00","data":{"source":"ecg","reconstruction_error":0.1532,"threshold":0.1}}"#,
        )
        .unwrap();

        assert_eq!(event.kind(), PushKind::Anomaly);
        assert!(event.timestamp.is_some());
        match event.payload {
            PushPayload::Anomaly(anomaly) => {
                assert_eq!(anomaly.source(), AnomalySource::Ecg);
                assert_eq!(anomaly.reconstruction_error, 0.1532);
                assert_eq!(anomaly.severity(), None);
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn test_piezo_sensor_alias_sets_source() {
        let event =
            parse_push_event(r#"{"type":"anomaly","data":{"sensor":"PIEZO","threshold":"0.1"}}"#)
                .unwrap();
        match event.payload {
            PushPayload::Anomaly(anomaly) => {
                assert_eq!(anomaly.source(), AnomalySource::Piezo);
                assert_eq!(anomaly.threshold, 0.1);
                assert_eq!(anomaly.reconstruction_error, 0.0);
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn test_temperature_anomaly_derives_missing_severity() {
        let event = parse_push_event(
            r#"{"type":"anomaly","data":{"temperature":33.1,"anomaly_type":"hypothermia"}}"#,
        )
        .unwrap();
        match event.payload {
            PushPayload::Anomaly(anomaly) => {
                assert_eq!(anomaly.source(), AnomalySource::Temp);
                assert_eq!(anomaly.severity(), Some(Severity::Moderate));
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn test_severity_thresholds() {
        use ThermalKind::*;
        assert_eq!(Severity::for_temperature(Hypothermia, 31.9), Severity::Severe);
        assert_eq!(Severity::for_temperature(Hypothermia, 34.5), Severity::Mild);
        assert_eq!(Severity::for_temperature(Hyperthermia, 40.5), Severity::Severe);
        assert_eq!(Severity::for_temperature(Hyperthermia, 39.5), Severity::Moderate);
        assert_eq!(Severity::for_temperature(Hyperthermia, 38.0), Severity::Mild);
    }

    #[test]
    fn test_malformed_payload_becomes_default() {
        let event = parse_push_event(r#"{"type":"status","data":"garbage"}"#).unwrap();
        assert_eq!(event.payload, PushPayload::Status(StatusPayload::default()));
    }

    #[test]
    fn test_status_accepts_server_field_names() {
        let event = parse_push_event(
            r#"{"type":"status","data":{"connected":true,"is_acquiring":"true","stats":{"TEMP":{"samples":12,"current_temp":"3650"}}}}"#,
        )
        .unwrap();
        match event.payload {
            PushPayload::Status(status) => {
                assert_eq!(status.device_connected, Some(true));
                assert_eq!(status.acquiring, Some(true));
                let temp = status.channel(Signal::Temperature).unwrap();
                assert_eq!(temp.samples, 12);
                assert_eq!(temp.current_temp, Some(3650.0));
                assert!(status.channel(Signal::PrimaryEcg).is_none());
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn test_mistyped_text_field_keeps_the_rest_of_the_anomaly() {
        let event = parse_push_event(
            r#"{"type":"anomaly","data":{"severity":2,"source":7,"anomaly_type":false,"reconstruction_error":0.9,"threshold":0.2}}"#,
        )
        .unwrap();
        match event.payload {
            PushPayload::Anomaly(anomaly) => {
                assert_eq!(anomaly.reconstruction_error, 0.9);
                assert_eq!(anomaly.threshold, 0.2);
                assert_eq!(anomaly.severity.as_deref(), Some("2"));
                assert_eq!(anomaly.severity(), None);
                assert_eq!(anomaly.source(), AnomalySource::Ecg);
                assert_eq!(anomaly.thermal_kind(), None);
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn test_status_with_epoch_last_update_keeps_flags() {
        let event = parse_push_event(
            r#"{"type":"status","timestamp":1736848200,"data":{"is_acquiring":true,"current_session_id":20250114,"stats":{"ECG":{"samples":900,"last_update":1736848200}}}}"#,
        )
        .unwrap();
        assert_eq!(event.timestamp, None);
        match event.payload {
            PushPayload::Status(status) => {
                assert_eq!(status.acquiring, Some(true));
                assert_eq!(status.current_session_id.as_deref(), Some("20250114"));
                let ecg = status.channel(Signal::PrimaryEcg).unwrap();
                assert_eq!(ecg.samples, 900);
                assert_eq!(ecg.last_update.as_deref(), Some("1736848200"));
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn test_bad_stats_entry_drops_only_that_channel() {
        let event = parse_push_event(
            r#"{"type":"status","data":{"connected":true,"stats":{"ECG":null,"ADC":[1,2],"TEMP":{"samples":3,"current_temp":3650}}}}"#,
        )
        .unwrap();
        match event.payload {
            PushPayload::Status(status) => {
                assert_eq!(status.device_connected, Some(true));
                assert!(status.channel(Signal::PrimaryEcg).is_none());
                assert!(status.channel(Signal::AdcArray).is_none());
                assert_eq!(status.channel(Signal::Temperature).map(|t| t.samples), Some(3));
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn test_log_list_skips_unreadable_lines() {
        let list: LogList = serde_json::from_str(
            r#"{"logs":[null,{"category":"MQTT","level":"ERROR","message":"broker down","timestamp":12}],"total":2}"#,
        )
        .unwrap();
        assert_eq!(list.logs.len(), 1);
        assert_eq!(list.logs[0].timestamp.as_deref(), Some("12"));
        assert_eq!(list.logs[0].level, LogLevel::Error);
    }

    #[test]
    fn test_log_level_falls_back_to_info() {
        let event = parse_push_event(
            r#"{"type":"log","data":{"category":"Serial","level":"TRACE","message":"port opened"}}"#,
        )
        .unwrap();
        match event.payload {
            PushPayload::Log(log) => {
                assert_eq!(log.level, LogLevel::Info);
                assert_eq!(log.category, "Serial");
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unknown_event_type() {
        let err = parse_push_event(r#"{"type":"heartbeat","data":{}}"#).unwrap_err();
        assert_eq!(err.code, "invalid_envelope");
    }
}
