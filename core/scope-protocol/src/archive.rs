//! Anomaly archive: the per-day logs the server's detectors append to.
//!
//! Each detector keeps one JSON list per day. The data endpoint returns the
//! three lists newest first; the detail endpoint addresses a record by its
//! position in the file, which is oldest first.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::{lenient, parse_instant, validate_date, AnomalyPayload, AnomalySource, ErrorInfo};

/// One logged anomaly. ECG and piezo records carry an error pair and a short
/// excerpt of the offending window; temperature records carry the reading
/// and how many consecutive readings it lasted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub time: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub reconstruction_error: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub threshold: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub temperature: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub anomaly_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub severity: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub duration_readings: Option<u64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub sensor: Option<String>,
    #[serde(default, deserialize_with = "lenient::samples")]
    pub sample_data: Vec<f64>,
}

impl AnomalyRecord {
    /// `timestamp` when it parses, else the separate `date` and `time`.
    pub fn detected_at(&self) -> Option<NaiveDateTime> {
        if let Some(at) = self.timestamp.as_deref().and_then(parse_instant) {
            return Some(at);
        }
        let date = NaiveDate::parse_from_str(self.date.as_deref()?, "%Y-%m-%d").ok()?;
        let time = self
            .time
            .as_deref()
            .and_then(|time| NaiveTime::parse_from_str(time, "%H:%M:%S%.f").ok())
            .unwrap_or(NaiveTime::MIN);
        Some(date.and_time(time))
    }

    /// Same shape as a pushed anomaly, so archived and live events render
    /// alike.
    pub fn to_payload(&self, source: AnomalySource) -> AnomalyPayload {
        AnomalyPayload {
            source: Some(source.as_str().to_string()),
            timestamp: self.timestamp.clone(),
            reconstruction_error: self.reconstruction_error.unwrap_or(0.0),
            threshold: self.threshold.unwrap_or(0.0),
            temperature: self.temperature,
            anomaly_type: self.anomaly_type.clone(),
            severity: self.severity.clone(),
        }
    }
}

/// Everything logged on one day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalyDay {
    #[serde(default, deserialize_with = "lenient::string")]
    pub date: String,
    #[serde(default, deserialize_with = "lenient::list")]
    pub ecg_anomalies: Vec<AnomalyRecord>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub piezo_anomalies: Vec<AnomalyRecord>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub temp_anomalies: Vec<AnomalyRecord>,
    #[serde(default, deserialize_with = "lenient::u64")]
    pub total_count: u64,
}

impl AnomalyDay {
    /// Records from one detector, newest first.
    pub fn records(&self, source: AnomalySource) -> &[AnomalyRecord] {
        match source {
            AnomalySource::Ecg => &self.ecg_anomalies,
            AnomalySource::Piezo => &self.piezo_anomalies,
            AnomalySource::Temp => &self.temp_anomalies,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ecg_anomalies.is_empty()
            && self.piezo_anomalies.is_empty()
            && self.temp_anomalies.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalyDayCount {
    #[serde(default, deserialize_with = "lenient::string")]
    pub date: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub date_label: String,
    #[serde(default, deserialize_with = "lenient::u64")]
    pub ecg_count: u64,
    #[serde(default, deserialize_with = "lenient::u64")]
    pub piezo_count: u64,
    #[serde(default, deserialize_with = "lenient::u64")]
    pub temp_count: u64,
    #[serde(default, deserialize_with = "lenient::u64")]
    pub total: u64,
}

/// Per-day counts, newest day first, plus totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalySummary {
    #[serde(default, deserialize_with = "lenient::list")]
    pub summary: Vec<AnomalyDayCount>,
    #[serde(default, deserialize_with = "lenient::u64")]
    pub total_ecg: u64,
    #[serde(default, deserialize_with = "lenient::u64")]
    pub total_piezo: u64,
    #[serde(default, deserialize_with = "lenient::u64")]
    pub total_temp: u64,
    #[serde(default, deserialize_with = "lenient::u64")]
    pub total: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalyDetail {
    #[serde(default)]
    pub anomaly: AnomalyRecord,
    #[serde(default, rename = "type", deserialize_with = "lenient::opt_string")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub date: String,
    #[serde(default, deserialize_with = "lenient::u64")]
    pub index: u64,
}

/// Address of one archived record: day, detector, position in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnomalyRef {
    pub date: String,
    pub source: AnomalySource,
    pub index: usize,
}

impl AnomalyRef {
    pub fn validate(&self) -> Result<(), ErrorInfo> {
        validate_date(&self.date)
    }

    pub fn path(&self) -> String {
        format!(
            "/api/anomalies/detail/{}/{}/{}",
            self.date,
            self.source.as_str(),
            self.index
        )
    }
}

pub fn anomaly_day_path(date: &str) -> String {
    format!("/api/anomalies/data/{}", date)
}
