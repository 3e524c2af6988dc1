//! Plain-text rendering for the terminal.

use std::fmt::Write as _;

use vitalscope_core::{
    AnomalyEntry, HistoryView, Notification, StatusProjection, Toast, ViewState, WindowView,
};
use vitalscope_protocol::{
    AnomalyDetail, AnomalySummary, DateEntry, LogPayload, SessionSummary, Signal,
};

const SPARK_WIDTH: usize = 60;
const SPARK_GLYPHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

pub fn dates(entries: &[DateEntry]) -> String {
    if entries.is_empty() {
        return "No recorded sessions.".to_string();
    }
    let mut out = String::new();
    for entry in entries {
        let _ = writeln!(out, "{}  {}", entry.value, entry.label);
    }
    out
}

pub fn sessions(list: &[SessionSummary]) -> String {
    if list.is_empty() {
        return "No sessions.".to_string();
    }
    let mut out = String::new();
    for summary in list {
        let counts = Signal::ALL
            .iter()
            .map(|signal| format!("{}={}", signal, summary.samples_for(*signal)))
            .collect::<Vec<_>>()
            .join(" ");
        let started = summary
            .started_at()
            .map(|at| at.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "?".to_string());
        let ended = match summary.ended_at() {
            Some(at) => at.format("%H:%M:%S").to_string(),
            None if summary.is_active() => "active".to_string(),
            None => "?".to_string(),
        };
        let _ = writeln!(
            out,
            "{}  {} - {}  {}",
            summary.session_id, started, ended, counts
        );
    }
    out
}

/// Header line, time label, then one sparkline per channel.
pub fn window(view: &WindowView) -> String {
    let mut out = format!(
        "{} {}  [{}..{}) of {}",
        view.session_id, view.signal, view.window_start, view.window_end, view.total_count
    );
    if let Some(label) = view.time_label() {
        let _ = write!(out, "  {}", label);
    }
    out.push('\n');
    for (channel, series) in view.series.iter().enumerate() {
        let _ = writeln!(out, "  ch{:<2} {}", channel, channel_line(series));
    }
    out
}

/// Current window, or why there is none.
pub fn history(view: &HistoryView) -> String {
    let mut out = match (view.state(), view.current()) {
        (ViewState::Empty, _) => format!(
            "{} {}: no samples recorded\n",
            view.session_id(),
            view.signal()
        ),
        (_, Some(current)) => window(current),
        (_, None) => format!("{} {}: nothing loaded\n", view.session_id(), view.signal()),
    };
    if let ViewState::Failed { message } = view.state() {
        let _ = writeln!(out, "! {}", message);
    }
    out
}

pub fn notification(id: u64, notification: &Notification) -> String {
    format!(
        "#{} {} {}",
        id,
        notification.detected_at.format("%H:%M:%S"),
        notification.summary()
    )
}

pub fn anomaly_summary(summary: &AnomalySummary) -> String {
    if summary.summary.is_empty() {
        return "No anomalies logged.".to_string();
    }
    let mut out = String::new();
    for day in &summary.summary {
        let _ = writeln!(
            out,
            "{}  ecg={} piezo={} temp={}  total {}",
            day.date, day.ecg_count, day.piezo_count, day.temp_count, day.total
        );
    }
    let _ = writeln!(
        out,
        "all days  ecg={} piezo={} temp={}  total {}",
        summary.total_ecg, summary.total_piezo, summary.total_temp, summary.total
    );
    out
}

/// One line per archived anomaly, prefixed with the detector and the index
/// `--index` takes.
pub fn anomaly_entries(entries: &[AnomalyEntry]) -> String {
    if entries.is_empty() {
        return "No anomalies logged for this day.".to_string();
    }
    let mut out = String::new();
    for entry in entries {
        let _ = writeln!(
            out,
            "{}/{:<3} {} {}",
            entry.reference.source.as_str(),
            entry.reference.index,
            entry.notification.detected_at.format("%H:%M:%S"),
            entry.notification.summary()
        );
    }
    out
}

pub fn anomaly_detail(detail: &AnomalyDetail) -> String {
    let record = &detail.anomaly;
    let mut out = format!(
        "{} {} #{}",
        detail.date,
        detail.kind.as_deref().unwrap_or("?"),
        detail.index
    );
    if let Some(at) = record.detected_at() {
        let _ = write!(out, "  {}", at.format("%Y-%m-%d %H:%M:%S"));
    }
    out.push('\n');
    if let Some(error) = record.reconstruction_error {
        let _ = writeln!(
            out,
            "  error {:.4} threshold {:.4}",
            error,
            record.threshold.unwrap_or_default()
        );
    }
    if let Some(temperature) = record.temperature {
        let _ = writeln!(
            out,
            "  {} {:.2} °C over {} readings ({})",
            record.anomaly_type.as_deref().unwrap_or("temperature"),
            temperature,
            record.duration_readings.unwrap_or_default(),
            record.severity.as_deref().unwrap_or("unrated")
        );
    }
    if !record.sample_data.is_empty() {
        let _ = writeln!(out, "  samples {}", channel_line(&record.sample_data));
    }
    out
}

pub fn status(status: &StatusProjection) -> String {
    let mut out = format!(
        "device {}  acquisition {}  uptime {}s  packets {}",
        if status.device_connected {
            "connected"
        } else {
            "disconnected"
        },
        if status.acquiring { "running" } else { "stopped" },
        status.uptime_secs,
        status.packet_count
    );
    if let Some(session_id) = &status.current_session_id {
        let _ = write!(out, "  session {}", session_id);
    }
    for signal in Signal::ALL {
        let _ = write!(out, "  {}={}", signal, status.samples(signal));
    }
    out
}

pub fn temperature(celsius: f64) -> String {
    format!("TEMP {:.2} °C", celsius)
}

pub fn log_line(line: &LogPayload) -> String {
    let category = if line.category.is_empty() {
        "-"
    } else {
        line.category.as_str()
    };
    match &line.timestamp {
        Some(timestamp) => format!(
            "{} {:<7} {} {}",
            timestamp,
            line.level.as_str(),
            category,
            line.message
        ),
        None => format!("{:<7} {} {}", line.level.as_str(), category, line.message),
    }
}

pub fn toast(toast: &Toast) -> String {
    format!("[{:?}] {}", toast.level, toast.message)
}

fn channel_line(series: &[f64]) -> String {
    let finite: Vec<f64> = series.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return "(no data)".to_string();
    }
    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = finite.iter().sum::<f64>() / finite.len() as f64;
    format!(
        "{}  min {:.3} max {:.3} mean {:.3}",
        sparkline(&finite, min, max),
        min,
        max,
        mean
    )
}

/// Bucket means scaled to eight levels.
fn sparkline(values: &[f64], min: f64, max: f64) -> String {
    let buckets = values.len().min(SPARK_WIDTH);
    let range = max - min;
    (0..buckets)
        .map(|bucket| {
            let start = bucket * values.len() / buckets;
            let end = ((bucket + 1) * values.len() / buckets).max(start + 1);
            let slice = &values[start..end];
            let mean = slice.iter().sum::<f64>() / slice.len() as f64;
            let level = if range > 0.0 {
                (((mean - min) / range) * (SPARK_GLYPHS.len() - 1) as f64).round() as usize
            } else {
                0
            };
            SPARK_GLYPHS[level.min(SPARK_GLYPHS.len() - 1)]
        })
        .collect()
}
