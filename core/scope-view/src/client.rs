//! Blocking HTTP client for the monitor server.
//!
//! One request per call, no retries: a failed call surfaces as a transport
//! error and the caller keeps its last good state.

use serde::de::DeserializeOwned;
use std::time::Duration;
use vitalscope_core::{AnomalyArchive, LogFilter, MonitorControl, Result, ScopeError, WindowSource};
use vitalscope_protocol::{
    anomaly_day_path, validate_date, AnomalyDay, AnomalyDetail, AnomalyRef, AnomalySummary,
    ControlAck, ControlCommand, DateList, LogList, SessionList, StatusPayload, WindowPayload,
    WindowQuery,
};

pub struct HttpMonitorClient {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpMonitorClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| transport("building HTTP client", err))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        context: &str,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, "GET");
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .map_err(|err| transport(context, err))?;
        decode(response, context)
    }

    fn post_json<T: DeserializeOwned>(&self, path: &str, context: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, "POST");
        let response = self
            .client
            .post(&url)
            .send()
            .map_err(|err| transport(context, err))?;
        decode(response, context)
    }
}

impl WindowSource for HttpMonitorClient {
    fn fetch_window(&self, query: &WindowQuery) -> Result<WindowPayload> {
        self.get_json(&query.path(), &query.query_pairs(), "fetching window")
    }

    fn list_dates(&self) -> Result<DateList> {
        self.get_json("/api/history/dates", &[], "listing dates")
    }

    fn list_sessions(&self, date: Option<&str>) -> Result<SessionList> {
        match date {
            Some(date) => {
                validate_date(date)?;
                self.get_json(
                    &format!("/api/history/sessions/{}", date),
                    &[],
                    "listing sessions",
                )
            }
            None => self.get_json("/api/history/sessions", &[], "listing sessions"),
        }
    }
}

impl AnomalyArchive for HttpMonitorClient {
    fn anomaly_dates(&self) -> Result<DateList> {
        self.get_json("/api/anomalies/dates", &[], "listing anomaly dates")
    }

    fn anomalies_on(&self, date: &str) -> Result<AnomalyDay> {
        validate_date(date)?;
        self.get_json(&anomaly_day_path(date), &[], "loading anomalies")
    }

    fn anomaly_summary(&self) -> Result<AnomalySummary> {
        self.get_json("/api/anomalies/summary", &[], "loading anomaly summary")
    }

    fn anomaly_detail(&self, reference: &AnomalyRef) -> Result<AnomalyDetail> {
        reference.validate()?;
        self.get_json(&reference.path(), &[], "loading anomaly")
    }
}

impl MonitorControl for HttpMonitorClient {
    fn status(&self) -> Result<StatusPayload> {
        self.get_json("/api/status", &[], "polling status")
    }

    fn send_control(&self, command: ControlCommand) -> Result<ControlAck> {
        self.post_json(&command.path(), "sending control command")
    }

    fn recent_logs(&self, filter: &LogFilter, limit: usize) -> Result<LogList> {
        let mut query = vec![("limit", limit.to_string())];
        if let Some(category) = &filter.category {
            query.push(("category", category.clone()));
        }
        if let Some(level) = filter.level {
            query.push(("level", level.as_str().to_string()));
        }
        self.get_json("/api/system/logs", &query, "fetching logs")
    }
}

fn transport(context: &str, err: reqwest::Error) -> ScopeError {
    let details = if err.is_timeout() {
        format!("timed out: {}", err)
    } else {
        err.to_string()
    };
    ScopeError::Transport {
        context: context.to_string(),
        details,
    }
}

/// Non-2xx → `Server` error carrying the body's `error` field when present.
fn decode<T: DeserializeOwned>(response: reqwest::blocking::Response, context: &str) -> Result<T> {
    let status = response.status();
    let body = response.text().map_err(|err| transport(context, err))?;

    if !status.is_success() {
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|value| value.get("error")?.as_str().map(str::to_string))
            .unwrap_or_else(|| body.trim().to_string());
        return Err(ScopeError::Server {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&body).map_err(|err| ScopeError::Json {
        context: context.to_string(),
        source: err,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;
    use vitalscope_protocol::{Signal, WindowSize};

    /// Serves one canned response and reports the request line it saw.
    fn serve_once(status: &'static str, body: &'static str) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buffer = Vec::new();
            let mut chunk = [0u8; 1024];
            while !buffer.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => buffer.extend_from_slice(&chunk[..n]),
                }
            }
            let request = String::from_utf8_lossy(&buffer);
            let request_line = request.lines().next().unwrap_or_default().to_string();
            tx.send(request_line).unwrap();

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
        });
        (format!("http://{}", addr), rx)
    }

    fn client(base_url: &str) -> HttpMonitorClient {
        HttpMonitorClient::new(base_url, Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn test_fetch_window_sends_path_and_sentinel() {
        let (base, requests) = serve_once(
            "200 OK",
            r#"{"data":{"x":[0,1],"y":[[36.5,36.6]]},"count":2,"window_start":0,"window_end":2,"total_count":2,"max_position":0}"#,
        );
        let query = WindowQuery {
            session_id: "20250114_093012".to_string(),
            signal: Signal::Temperature,
            position: 0,
            window_size: WindowSize::Full,
        };
        let payload = client(&base).fetch_window(&query).unwrap();
        assert_eq!(payload.total_count, 2);

        let request_line = requests.recv().unwrap();
        assert!(request_line.starts_with(
            "GET /api/history/window/20250114_093012/TEMP?position=0&window_size=-1 "
        ));
    }

    #[test]
    fn test_server_error_carries_message() {
        let (base, _requests) = serve_once(
            "400 Bad Request",
            r#"{"error":"window_size must be between 100 and 50000"}"#,
        );
        let err = client(&base).list_sessions(None).unwrap_err();
        match err {
            ScopeError::Server { status, message } => {
                assert_eq!(status, 400);
                assert!(message.contains("window_size"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_control_posts_and_reads_ack() {
        let (base, requests) = serve_once("200 OK", r#"{"status":"started"}"#);
        let ack = client(&base).send_control(ControlCommand::Start).unwrap();
        assert!(ack.accepted());
        assert!(requests.recv().unwrap().starts_with("POST /api/control/start "));
    }

    #[test]
    fn test_logs_query_carries_filter() {
        let (base, requests) = serve_once("200 OK", r#"{"success":true,"logs":[],"total":0}"#);
        let filter = LogFilter::new(Some("MQTT".to_string()), Some(vitalscope_protocol::LogLevel::Error));
        client(&base).recent_logs(&filter, 50).unwrap();
        let line = requests.recv().unwrap();
        assert!(line.contains("limit=50"));
        assert!(line.contains("category=MQTT"));
        assert!(line.contains("level=ERROR"));
    }

    #[test]
    fn test_anomaly_day_is_read_from_archive() {
        let (base, requests) = serve_once(
            "200 OK",
            r#"{"date":"20250114","ecg_anomalies":[{"timestamp":"2025-01-14T09:41:07","reconstruction_error":0.2,"threshold":0.1}],"piezo_anomalies":[],"temp_anomalies":[],"total_count":1}"#,
        );
        let day = client(&base).anomalies_on("20250114").unwrap();
        assert_eq!(day.ecg_anomalies.len(), 1);
        assert!(requests.recv().unwrap().starts_with("GET /api/anomalies/data/20250114 "));
    }

    #[test]
    fn test_missing_anomaly_is_a_server_error() {
        let (base, requests) = serve_once("404 Not Found", r#"{"error":"Anomaly index out of range"}"#);
        let reference = AnomalyRef {
            date: "20250114".to_string(),
            source: vitalscope_protocol::AnomalySource::Temp,
            index: 9,
        };
        let err = client(&base).anomaly_detail(&reference).unwrap_err();
        assert!(matches!(err, ScopeError::Server { status: 404, ref message } if message.contains("out of range")));
        assert!(requests
            .recv()
            .unwrap()
            .starts_with("GET /api/anomalies/detail/20250114/temp/9 "));
    }

    #[test]
    fn test_unreachable_server_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let err = client(&format!("http://{}", addr)).status().unwrap_err();
        assert!(err.is_transport());
        assert!(matches!(err, ScopeError::Transport { .. }));
    }

    #[test]
    fn test_invalid_date_is_rejected_locally() {
        let err = client("http://127.0.0.1:9").list_sessions(Some("2025-01-14")).unwrap_err();
        assert!(matches!(err, ScopeError::InvalidRequest { .. }));
    }
}
