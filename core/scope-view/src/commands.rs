//! Subcommand implementations. Each returns the first error it hits; none of
//! them retry.

use std::io;
use std::sync::Arc;

use vitalscope_core::{
    AnomalyLog, DashboardStore, HistoryView, LiveEventRouter, LogFilter, LogSink, MonitorControl,
    Result, ScopeConfig, ScopeError, SessionWindowFetcher,
};
use vitalscope_protocol::{
    validate_session_id, AnomalyRef, AnomalySource, ControlCommand, LogLevel, Signal, WindowSize,
};

use crate::browse;
use crate::client::HttpMonitorClient;
use crate::render;
use crate::runtime::{Dashboard, LiveRuntime, WATCH_HELP};

pub fn client(config: &ScopeConfig) -> Result<HttpMonitorClient> {
    HttpMonitorClient::new(&config.server_url, config.request_timeout())
}

pub fn dates(config: &ScopeConfig) -> Result<()> {
    let client = client(config)?;
    let mut store = DashboardStore::new(config);
    store.catalog_mut().refresh_dates(&client)?;
    print!("{}", render::dates(store.catalog().dates()));
    Ok(())
}

pub fn sessions(config: &ScopeConfig, date: Option<&str>) -> Result<()> {
    let client = client(config)?;
    let mut store = DashboardStore::new(config);
    store.catalog_mut().refresh_sessions(&client, date)?;
    print!("{}", render::sessions(store.catalog().sessions()));
    Ok(())
}

pub fn window(
    config: &ScopeConfig,
    session_id: &str,
    signal: &str,
    position: u64,
    size: Option<i64>,
) -> Result<()> {
    let client = client(config)?;
    let mut store = DashboardStore::new(config);
    open_view(&client, &mut store, session_id, signal, window_size(config, size))?;
    let view = store.history_mut().ok_or(ScopeError::NoSelection)?;
    let fetcher = SessionWindowFetcher::new(&client);
    let request = view.set_position(position);
    view.load(&fetcher, request);
    print!("{}", render::history(view));
    Ok(())
}

pub fn browse(
    config: &ScopeConfig,
    session_id: &str,
    signal: &str,
    size: Option<i64>,
) -> Result<()> {
    let client = client(config)?;
    let mut store = DashboardStore::new(config);
    open_view(&client, &mut store, session_id, signal, window_size(config, size))?;
    let fetcher = SessionWindowFetcher::new(&client);
    println!("{}", browse::HELP);
    let stdin = io::stdin();
    browse::run(&fetcher, &mut store, stdin.lock(), io::stdout())
}

pub fn watch(config: &ScopeConfig, push_addr: Option<String>) -> Result<()> {
    let client = Arc::new(client(config)?);
    let push_addr = push_addr.or_else(|| config.push_addr.clone());
    if push_addr.is_none() {
        tracing::info!("No push address configured; polling only");
    }

    let mut runtime = LiveRuntime::new(client, config.poll_interval(), push_addr);
    if runtime.attach_commands(io::BufReader::new(io::stdin())) {
        println!("{}", WATCH_HELP);
    }
    let mut dashboard = Dashboard::new(
        DashboardStore::new(config),
        LiveEventRouter::new().announcing_transitions(),
    );
    runtime.run(&mut dashboard, io::stdout(), |_| true)
}

pub fn control(config: &ScopeConfig, command: &str) -> Result<()> {
    let command = ControlCommand::parse(command).ok_or_else(|| ScopeError::InvalidRequest {
        code: "invalid_command".to_string(),
        message: format!("expected start, stop or reset, got {:?}", command),
    })?;
    let ack = client(config)?.send_control(command)?;
    tracing::info!(command = command.as_str(), status = %ack.status, "Control command sent");
    match (&ack.error, ack.accepted()) {
        (Some(error), _) => println!("{} rejected: {}", command.as_str(), error),
        (None, true) => println!("{}: {}", command.as_str(), ack.status),
        (None, false) => println!("{}: no acknowledgement", command.as_str()),
    }
    Ok(())
}

/// Which part of the anomaly archive to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnomalyQuery {
    Dates,
    Summary,
    Day {
        date: String,
        source: Option<AnomalySource>,
    },
    Detail(AnomalyRef),
}

impl AnomalyQuery {
    /// `--index` needs both a date and a detector; `--summary` stands alone.
    pub fn from_args(
        date: Option<String>,
        source: Option<&str>,
        index: Option<usize>,
        summary: bool,
    ) -> Result<Self> {
        let source = source
            .map(|value| {
                AnomalySource::parse(value).ok_or_else(|| ScopeError::InvalidRequest {
                    code: "invalid_source".to_string(),
                    message: format!("expected ecg, piezo or temp, got {:?}", value),
                })
            })
            .transpose()?;
        match (date, source, index, summary) {
            (None, None, None, true) => Ok(AnomalyQuery::Summary),
            (_, _, _, true) => Err(invalid_anomaly_args("--summary takes no other options")),
            (Some(date), Some(source), Some(index), false) => Ok(AnomalyQuery::Detail(AnomalyRef {
                date,
                source,
                index,
            })),
            (_, _, Some(_), false) => Err(invalid_anomaly_args("--index needs --date and --source")),
            (Some(date), source, None, false) => Ok(AnomalyQuery::Day { date, source }),
            (None, _, None, false) => Ok(AnomalyQuery::Dates),
        }
    }
}

pub fn anomalies(config: &ScopeConfig, query: AnomalyQuery) -> Result<()> {
    let client = client(config)?;
    let log = AnomalyLog::new(&client);
    match query {
        AnomalyQuery::Dates => {
            let dates = log.dates()?;
            if dates.is_empty() {
                println!("No anomalies logged.");
            } else {
                print!("{}", render::dates(&dates));
            }
        }
        AnomalyQuery::Summary => print!("{}", render::anomaly_summary(&log.summary()?)),
        AnomalyQuery::Day { date, source } => {
            print!("{}", render::anomaly_entries(&log.day(&date, source)?))
        }
        AnomalyQuery::Detail(reference) => {
            print!("{}", render::anomaly_detail(&log.detail(&reference)?))
        }
    }
    Ok(())
}

fn invalid_anomaly_args(message: &str) -> ScopeError {
    ScopeError::InvalidRequest {
        code: "invalid_arguments".to_string(),
        message: message.to_string(),
    }
}

pub fn logs(
    config: &ScopeConfig,
    category: Option<String>,
    level: Option<&str>,
    limit: usize,
) -> Result<()> {
    let level = level
        .map(|value| {
            LogLevel::parse(value).ok_or_else(|| ScopeError::InvalidRequest {
                code: "invalid_level".to_string(),
                message: format!("unknown log level {:?}", value),
            })
        })
        .transpose()?;
    let filter = LogFilter::new(category, level);

    let list = client(config)?.recent_logs(&filter, limit)?;
    let mut sink = LogSink::new(config.log_capacity);
    for line in list.logs {
        sink.push(line);
    }
    let recent = sink.recent(&filter, limit);
    if recent.is_empty() {
        println!("No matching log lines.");
    }
    for line in recent {
        println!("{}", render::log_line(line));
    }
    Ok(())
}

/// Opens the session in the store's history view, seeded from the session
/// listing when the server has it; the id alone still yields a usable time
/// anchor.
fn open_view(
    client: &HttpMonitorClient,
    store: &mut DashboardStore,
    session_id: &str,
    signal: &str,
    size: WindowSize,
) -> Result<()> {
    validate_session_id(session_id)?;
    let signal = Signal::parse(signal).ok_or_else(|| ScopeError::InvalidSignal(signal.to_string()))?;

    let catalog = store.catalog_mut();
    let date = session_id.get(..8);
    if let Err(err) = catalog.refresh_sessions(client, date) {
        tracing::warn!(error = %err, session_id, "Session listing unavailable");
    }
    let view = match catalog.get(session_id) {
        Some(summary) => HistoryView::from_summary(summary, signal, size)?,
        None => HistoryView::new(session_id, signal, catalog.anchor_for(session_id), size)?,
    };
    store.open_history(view);
    Ok(())
}

fn window_size(config: &ScopeConfig, raw: Option<i64>) -> WindowSize {
    let raw = raw.unwrap_or(config.default_window_size.min(i64::MAX as u64) as i64);
    WindowSize::from_raw(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anomaly_arguments_pick_the_endpoint() {
        assert_eq!(
            AnomalyQuery::from_args(None, None, None, false).unwrap(),
            AnomalyQuery::Dates
        );
        assert_eq!(
            AnomalyQuery::from_args(None, None, None, true).unwrap(),
            AnomalyQuery::Summary
        );
        assert_eq!(
            AnomalyQuery::from_args(Some("20250114".to_string()), Some("adc"), None, false).unwrap(),
            AnomalyQuery::Day {
                date: "20250114".to_string(),
                source: Some(AnomalySource::Piezo),
            }
        );
        let detail =
            AnomalyQuery::from_args(Some("20250114".to_string()), Some("temp"), Some(2), false)
                .unwrap();
        match detail {
            AnomalyQuery::Detail(reference) => {
                assert_eq!(reference.path(), "/api/anomalies/detail/20250114/temp/2")
            }
            other => panic!("unexpected query: {other:?}"),
        }
    }

    #[test]
    fn test_incomplete_anomaly_arguments_are_rejected() {
        assert!(AnomalyQuery::from_args(Some("20250114".to_string()), None, Some(1), false).is_err());
        assert!(AnomalyQuery::from_args(None, None, None, false).is_ok());
        assert!(AnomalyQuery::from_args(Some("20250114".to_string()), None, None, true).is_err());
        let err = AnomalyQuery::from_args(None, Some("eeg"), None, false).unwrap_err();
        assert!(matches!(err, ScopeError::InvalidRequest { ref code, .. } if code == "invalid_source"));
    }
}
