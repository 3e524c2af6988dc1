use chrono::{DateTime, Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::Signal;

/// Parses the instants the server writes: RFC 3339 with an offset, or the
/// naive local `YYYY-MM-DDTHH:MM:SS[.ffffff]` form.
pub fn parse_instant(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.naive_local());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

/// Metadata for one acquisition run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub signals: Vec<String>,
    #[serde(default)]
    pub total_samples: HashMap<String, u64>,
}

impl SessionSummary {
    pub fn samples_for(&self, signal: Signal) -> u64 {
        self.total_samples
            .get(signal.as_str())
            .copied()
            .unwrap_or(0)
    }

    /// `YYYYMMDD` prefix of the session id.
    pub fn date_key(&self) -> Option<&str> {
        self.session_id
            .split_once('_')
            .map(|(date, _)| date)
            .filter(|date| date.len() == 8)
    }

    pub fn started_at(&self) -> Option<NaiveDateTime> {
        self.start_time.as_deref().and_then(parse_instant)
    }

    pub fn ended_at(&self) -> Option<NaiveDateTime> {
        self.end_time.as_deref().and_then(parse_instant)
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status.as_deref(), Some("active")) || self.end_time.is_none()
    }

    /// Wall-clock span of a finished session. `None` while still acquiring or
    /// when the recorded end precedes the start.
    pub fn duration(&self) -> Option<Duration> {
        let start = self.started_at()?;
        let end = self.ended_at()?;
        let span = end.signed_duration_since(start);
        if span < Duration::zero() {
            None
        } else {
            Some(span)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionList {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub sessions: Vec<SessionSummary>,
    #[serde(default)]
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateEntry {
    pub value: String,
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateList {
    #[serde(default)]
    pub dates: Vec<DateEntry>,
    #[serde(default)]
    pub count: usize,
}
