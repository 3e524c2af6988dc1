//! Reading the server's anomaly archive.
//!
//! Archived records are turned into the same [`Notification`] the live push
//! channel produces, tagged with the index the detail endpoint expects.

use chrono::{NaiveDate, NaiveDateTime};
use vitalscope_protocol::{
    validate_date, AnomalyDetail, AnomalyRecord, AnomalyRef, AnomalySource, AnomalySummary,
    DateEntry,
};

use crate::error::Result;
use crate::fetch::AnomalyArchive;
use crate::notifications::Notification;

const SOURCES: [AnomalySource; 3] = [AnomalySource::Ecg, AnomalySource::Piezo, AnomalySource::Temp];

#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyEntry {
    /// Detail-endpoint address of this record.
    pub reference: AnomalyRef,
    pub notification: Notification,
    pub record: AnomalyRecord,
}

pub struct AnomalyLog<A> {
    archive: A,
}

impl<A: AnomalyArchive> AnomalyLog<A> {
    pub fn new(archive: A) -> Self {
        Self { archive }
    }

    /// Days with anomalies, newest first.
    pub fn dates(&self) -> Result<Vec<DateEntry>> {
        let mut dates = self.archive.anomaly_dates()?.dates;
        dates.sort_by(|a, b| b.value.cmp(&a.value));
        dates.dedup_by(|a, b| a.value == b.value);
        Ok(dates)
    }

    /// One day's anomalies, newest first, optionally from one detector only.
    pub fn day(&self, date: &str, only: Option<AnomalySource>) -> Result<Vec<AnomalyEntry>> {
        validate_date(date)?;
        let day = self.archive.anomalies_on(date)?;
        let day_start = NaiveDate::parse_from_str(date, "%Y%m%d")
            .ok()
            .and_then(|day| day.and_hms_opt(0, 0, 0))
            .unwrap_or_default();

        let mut entries = Vec::new();
        for source in SOURCES.into_iter().filter(|s| only.map_or(true, |o| o == *s)) {
            let records = day.records(source);
            for (position, record) in records.iter().enumerate() {
                entries.push(entry(date, source, records.len() - 1 - position, record, day_start));
            }
        }
        entries.sort_by(|a, b| b.notification.detected_at.cmp(&a.notification.detected_at));
        tracing::debug!(date, count = entries.len(), "Loaded archived anomalies");
        Ok(entries)
    }

    pub fn summary(&self) -> Result<AnomalySummary> {
        let mut summary = self.archive.anomaly_summary()?;
        summary.summary.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(summary)
    }

    pub fn detail(&self, reference: &AnomalyRef) -> Result<AnomalyDetail> {
        reference.validate()?;
        self.archive.anomaly_detail(reference)
    }
}

fn entry(
    date: &str,
    source: AnomalySource,
    index: usize,
    record: &AnomalyRecord,
    day_start: NaiveDateTime,
) -> AnomalyEntry {
    let fallback = record.detected_at().unwrap_or(day_start);
    AnomalyEntry {
        reference: AnomalyRef {
            date: date.to_string(),
            source,
            index,
        },
        notification: Notification::from_anomaly(&record.to_payload(source), fallback),
        record: record.clone(),
    }
}
