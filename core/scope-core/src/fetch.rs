//! Windowed-history fetching and the transport seams the core depends on.
//!
//! The core never talks to the network itself. Clients implement
//! [`WindowSource`] (history reads), [`AnomalyArchive`] (logged anomalies)
//! and [`MonitorControl`] (status, control, logs) over whatever transport
//! they have; the CLI uses blocking HTTP.
//!
//! [`SessionWindowFetcher`] is stateless: every call validates and issues one
//! query and normalizes the response into a [`WindowResult`]. It does not
//! cancel or order requests; see [`crate::history`] for that.

use vitalscope_protocol::{
    AnomalyDay, AnomalyDetail, AnomalyRef, AnomalySummary, ControlAck, ControlCommand, DateList,
    LogList, SessionList, Signal, StatusPayload, WindowPayload, WindowQuery, WindowSize,
};

use crate::error::Result;
use crate::logs::LogFilter;

/// Read access to the server's history archive.
pub trait WindowSource {
    fn fetch_window(&self, query: &WindowQuery) -> Result<WindowPayload>;

    fn list_dates(&self) -> Result<DateList>;

    /// All sessions, or only those recorded on `date` (`YYYYMMDD`).
    fn list_sessions(&self, date: Option<&str>) -> Result<SessionList>;
}

/// Read access to the anomaly logs kept by the server's detectors.
pub trait AnomalyArchive {
    /// Days with at least one logged anomaly.
    fn anomaly_dates(&self) -> Result<DateList>;

    fn anomalies_on(&self, date: &str) -> Result<AnomalyDay>;

    fn anomaly_summary(&self) -> Result<AnomalySummary>;

    fn anomaly_detail(&self, reference: &AnomalyRef) -> Result<AnomalyDetail>;
}

impl<T: AnomalyArchive + ?Sized> AnomalyArchive for &T {
    fn anomaly_dates(&self) -> Result<DateList> {
        (**self).anomaly_dates()
    }

    fn anomalies_on(&self, date: &str) -> Result<AnomalyDay> {
        (**self).anomalies_on(date)
    }

    fn anomaly_summary(&self) -> Result<AnomalySummary> {
        (**self).anomaly_summary()
    }

    fn anomaly_detail(&self, reference: &AnomalyRef) -> Result<AnomalyDetail> {
        (**self).anomaly_detail(reference)
    }
}

/// Live status, acquisition control and server logs.
pub trait MonitorControl {
    fn status(&self) -> Result<StatusPayload>;

    /// Fire-and-forget: the ack confirms acceptance, not completion.
    fn send_control(&self, command: ControlCommand) -> Result<ControlAck>;

    fn recent_logs(&self, filter: &LogFilter, limit: usize) -> Result<LogList>;
}

impl<T: WindowSource + ?Sized> WindowSource for &T {
    fn fetch_window(&self, query: &WindowQuery) -> Result<WindowPayload> {
        (**self).fetch_window(query)
    }

    fn list_dates(&self) -> Result<DateList> {
        (**self).list_dates()
    }

    fn list_sessions(&self, date: Option<&str>) -> Result<SessionList> {
        (**self).list_sessions(date)
    }
}

/// A normalized window: channel-major series of equal length plus the
/// server's authoritative counts.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowResult {
    /// `series[channel][i]`; every channel has `window_end - window_start`
    /// values.
    pub series: Vec<Vec<f64>>,
    pub total_count: u64,
    pub max_position: u64,
    pub window_start: u64,
    /// Exclusive.
    pub window_end: u64,
}

impl WindowResult {
    pub fn empty() -> Self {
        Self {
            series: Vec::new(),
            total_count: 0,
            max_position: 0,
            window_start: 0,
            window_end: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_count == 0
    }

    pub fn len(&self) -> u64 {
        self.window_end - self.window_start
    }

    pub fn channel_count(&self) -> usize {
        self.series.len()
    }

    /// Fills gaps in a raw payload: bounds missing or inconsistent with the
    /// sample indices are taken from `x`, short channels are padded with
    /// zeros, and an absent `max_position` is recomputed from the request.
    pub fn from_payload(payload: WindowPayload, query: &WindowQuery) -> Self {
        let WindowPayload {
            data,
            count,
            window_start,
            window_end,
            total_count,
            max_position,
            ..
        } = payload;

        // Channels are padded to what was actually sent, never to `count`.
        let sample_count = if !data.x.is_empty() {
            data.x.len()
        } else {
            data.y.iter().map(Vec::len).max().unwrap_or(0)
        };
        let declared = if sample_count > 0 {
            sample_count as u64
        } else {
            count
        };

        let mut start = window_start;
        let mut end = window_end;
        if end < start || end - start != declared {
            start = data.x.first().copied().unwrap_or(window_start);
            end = start.saturating_add(declared);
        }

        let series: Vec<Vec<f64>> = data
            .y
            .into_iter()
            .map(|mut channel| {
                channel.resize(sample_count, 0.0);
                channel
            })
            .collect();

        let total_count = total_count.max(end);
        let max_position = max_position.unwrap_or_else(|| match query.window_size {
            WindowSize::Full => 0,
            WindowSize::Samples(size) => total_count.saturating_sub(size),
        });

        Self {
            series,
            total_count,
            max_position,
            window_start: start,
            window_end: end,
        }
    }
}

pub struct SessionWindowFetcher<S> {
    source: S,
}

impl<S: WindowSource> SessionWindowFetcher<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn fetch_window(
        &self,
        session_id: &str,
        signal: Signal,
        position: u64,
        window_size: WindowSize,
    ) -> Result<WindowResult> {
        self.fetch(&WindowQuery {
            session_id: session_id.to_string(),
            signal,
            position,
            window_size,
        })
    }

    /// Rejects invalid queries before anything is sent.
    pub fn fetch(&self, query: &WindowQuery) -> Result<WindowResult> {
        query.validate()?;
        tracing::debug!(
            session_id = %query.session_id,
            signal = %query.signal,
            position = query.position,
            window_size = query.window_size.to_raw(),
            "Fetching window"
        );
        let payload = self.source.fetch_window(query)?;
        let result = WindowResult::from_payload(payload, query);
        tracing::debug!(
            total_count = result.total_count,
            window_start = result.window_start,
            window_end = result.window_end,
            channels = result.channel_count(),
            "Window received"
        );
        Ok(result)
    }
}
