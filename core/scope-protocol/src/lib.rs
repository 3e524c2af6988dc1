//! Wire types and boundary validation for the vitalscope monitor server.
//!
//! This crate is shared by the core state library and the operator client so
//! both sides agree on one schema. The server stays authoritative for window
//! bounds and counts; the client uses these types to build requests that are
//! already in range and to normalize whatever comes back.
//!
//! Malformed push payloads are never rejected outright: numeric fields that
//! are missing or mistyped fall back to zero, text fields to empty, so a
//! partially-formed event still renders.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

mod archive;
mod control;
mod lenient;
mod listing;
mod push;
mod window;

pub use archive::{
    anomaly_day_path, AnomalyDay, AnomalyDayCount, AnomalyDetail, AnomalyRecord, AnomalyRef,
    AnomalySummary,
};
pub use control::{ControlAck, ControlCommand};
pub use lenient::number_or_zero;
pub use listing::{parse_instant, DateEntry, DateList, SessionList, SessionSummary};
pub use push::{
    parse_push_event, AnomalyPayload, AnomalySource, ChannelStats, LogLevel, LogList, LogPayload,
    PushEnvelope, PushEvent, PushKind, PushPayload, Severity, StatusPayload, ThermalKind,
};
pub use window::{SeriesPayload, WindowPayload, WindowQuery, WindowSize};

/// Smallest window the server accepts, in samples.
pub const WINDOW_SIZE_MIN: u64 = 100;
/// Largest window the server accepts, in samples.
pub const WINDOW_SIZE_MAX: u64 = 50_000;
/// Raw `window_size` value meaning "the whole dataset".
pub const FULL_WINDOW_SENTINEL: i64 = -1;
pub const DEFAULT_WINDOW_SIZE: u64 = 1_000;
/// Largest push line accepted from the event channel.
pub const MAX_PUSH_LINE_BYTES: usize = 256 * 1024;

const SESSION_ID_FORMAT: &str = "%Y%m%d_%H%M%S";
const DATE_FORMAT: &str = "%Y%m%d";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Acquisition channels the server stores per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    #[serde(rename = "ECG", alias = "primary-ecg")]
    PrimaryEcg,
    #[serde(rename = "ADC", alias = "adc-array")]
    AdcArray,
    #[serde(rename = "TEMP", alias = "temperature")]
    Temperature,
}

impl Signal {
    pub const ALL: [Signal; 3] = [Signal::PrimaryEcg, Signal::AdcArray, Signal::Temperature];

    /// Name used in server paths and in per-channel maps.
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::PrimaryEcg => "ECG",
            Signal::AdcArray => "ADC",
            Signal::Temperature => "TEMP",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ecg" | "primary-ecg" => Some(Signal::PrimaryEcg),
            "adc" | "adc-array" | "piezo" => Some(Signal::AdcArray),
            "temp" | "temperature" => Some(Signal::Temperature),
            _ => None,
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session ids are the acquisition start instant, `YYYYMMDD_HHMMSS`.
pub fn validate_session_id(session_id: &str) -> Result<(), ErrorInfo> {
    if session_id.len() != 15
        || chrono::NaiveDateTime::parse_from_str(session_id, SESSION_ID_FORMAT).is_err()
    {
        return Err(ErrorInfo::new(
            "invalid_session_id",
            format!("session id must be YYYYMMDD_HHMMSS, got {:?}", session_id),
        ));
    }
    Ok(())
}

pub fn validate_date(date: &str) -> Result<(), ErrorInfo> {
    if date.len() != 8 || NaiveDate::parse_from_str(date, DATE_FORMAT).is_err() {
        return Err(ErrorInfo::new(
            "invalid_date",
            format!("date must be YYYYMMDD, got {:?}", date),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_accepts_wire_and_long_names() {
        assert_eq!(Signal::parse("ECG"), Some(Signal::PrimaryEcg));
        assert_eq!(Signal::parse("adc-array"), Some(Signal::AdcArray));
        assert_eq!(Signal::parse("temperature"), Some(Signal::Temperature));
        assert_eq!(Signal::parse("eeg"), None);
    }

    #[test]
    fn test_signal_serializes_to_server_name() {
        let json = serde_json::to_string(&Signal::Temperature).unwrap();
        assert_eq!(json, "\"TEMP\"");
        let parsed: Signal = serde_json::from_str("\"primary-ecg\"").unwrap();
        assert_eq!(parsed, Signal::PrimaryEcg);
    }

    #[test]
    fn test_validates_session_id_format() {
        assert!(validate_session_id("20250114_093012").is_ok());
        assert!(validate_session_id("20250114-093012").is_err());
        assert!(validate_session_id("20251314_093012").is_err());
        assert!(validate_session_id("").is_err());
    }

    #[test]
    fn test_validates_date_format() {
        assert!(validate_date("20250114").is_ok());
        assert!(validate_date("2025-01-14").is_err());
        assert!(validate_date("20250230").is_err());
    }
}
