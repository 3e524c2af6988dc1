//! Routes push events and polled status into the dashboard store.
//!
//! The push channel and the status poll write the same projections with no
//! ordering between them. Routing is therefore idempotent for status: a
//! repeated or older snapshot changes nothing. Anomalies and log lines are
//! append-only and need no reconciliation.

use std::time::Instant;

use chrono::NaiveDateTime;
use vitalscope_protocol::{PushEvent, PushPayload, Signal, StatusPayload};

use crate::buffer::ArrivalOrder;
use crate::notifications::Notification;
use crate::status::StatusChange;
use crate::store::{DashboardStore, ToastLevel};

/// When an event reached the client, on both clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arrival {
    /// Wall clock, used when a payload carries no timestamp.
    pub wall: NaiveDateTime,
    /// Monotonic clock, used for toast expiry.
    pub instant: Instant,
}

impl Arrival {
    pub fn now() -> Self {
        Self {
            wall: chrono::Local::now().naive_local(),
            instant: Instant::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    Notification {
        id: ArrivalOrder,
        /// Id of the notification pushed out to stay within capacity.
        evicted: Option<ArrivalOrder>,
    },
    Status {
        change: StatusChange,
        /// New live temperature reading, in °C.
        temperature: Option<f64>,
    },
    Log,
}

impl RouteOutcome {
    /// Whether anything visible changed.
    pub fn is_visible(&self) -> bool {
        match self {
            RouteOutcome::Notification { .. } | RouteOutcome::Log => true,
            RouteOutcome::Status {
                change,
                temperature,
            } => change.changed || temperature.is_some(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LiveEventRouter {
    /// Raise toasts when acquisition starts/stops or the device drops.
    announce_transitions: bool,
}

impl LiveEventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn announcing_transitions(mut self) -> Self {
        self.announce_transitions = true;
        self
    }

    pub fn route(
        &self,
        store: &mut DashboardStore,
        event: PushEvent,
        arrival: Arrival,
    ) -> RouteOutcome {
        let at = event.timestamp.unwrap_or(arrival.wall);
        match event.payload {
            PushPayload::Anomaly(anomaly) => {
                let notification = Notification::from_anomaly(&anomaly, at);
                tracing::info!(
                    source = notification.source.as_str(),
                    severity = ?notification.severity,
                    "Anomaly received"
                );
                let (id, evicted) = store.push_notification(notification);
                RouteOutcome::Notification {
                    id,
                    evicted: evicted.map(|entry| entry.arrival_order),
                }
            }
            PushPayload::Status(status) => self.apply_status(store, &status, at, arrival),
            PushPayload::Log(line) => {
                store.logs_mut().push(line);
                RouteOutcome::Log
            }
        }
    }

    /// Same path as a `status` push; used for the periodic poll.
    pub fn route_status(
        &self,
        store: &mut DashboardStore,
        status: &StatusPayload,
        arrival: Arrival,
    ) -> RouteOutcome {
        self.apply_status(store, status, arrival.wall, arrival)
    }

    fn apply_status(
        &self,
        store: &mut DashboardStore,
        status: &StatusPayload,
        at: NaiveDateTime,
        arrival: Arrival,
    ) -> RouteOutcome {
        let change = store.status_mut().apply(status);
        if change.session_changed {
            store.temperature_mut().restart_series();
        }
        let temperature = status
            .channel(Signal::Temperature)
            .and_then(|stats| store.temperature_mut().observe(stats, at));

        if self.announce_transitions {
            if let Some(acquiring) = change.acquiring {
                let message = if acquiring {
                    "Acquisition started"
                } else {
                    "Acquisition stopped"
                };
                store.toast(ToastLevel::Info, message, arrival.instant);
            }
            if change.device_connected == Some(false) {
                store.toast(ToastLevel::Warning, "Device disconnected", arrival.instant);
            }
        }

        RouteOutcome::Status {
            change,
            temperature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScopeConfig;
    use chrono::NaiveDate;
    use vitalscope_protocol::parse_push_event;

    fn arrival() -> Arrival {
        Arrival {
            wall: NaiveDate::from_ymd_opt(2025, 1, 14)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            instant: Instant::now(),
        }
    }

    fn route(router: &LiveEventRouter, store: &mut DashboardStore, line: &str) -> RouteOutcome {
        router.route(store, parse_push_event(line).unwrap(), arrival())
    }

    #[test]
    fn test_anomalies_land_in_notifications() {
        let router = LiveEventRouter::new();
        let mut store = DashboardStore::new(&ScopeConfig::default());
        let outcome = route(
            &router,
            &mut store,
            r#"{"type":"anomaly","data":{"source":"ecg","reconstruction_error":0.5,"threshold":0.1}}"#,
        );
        assert_eq!(
            outcome,
            RouteOutcome::Notification {
                id: 0,
                evicted: None
            }
        );
        assert_eq!(store.badge_count(), 1);
    }

    #[test]
    fn test_overflowing_notifications_report_eviction() {
        let router = LiveEventRouter::new();
        let mut store = DashboardStore::new(&ScopeConfig::default());
        let line = r#"{"type":"anomaly","data":{}}"#;
        for _ in 0..10 {
            route(&router, &mut store, line);
        }
        let outcome = route(&router, &mut store, line);
        assert_eq!(
            outcome,
            RouteOutcome::Notification {
                id: 10,
                evicted: Some(0)
            }
        );
        assert_eq!(store.badge_count(), 10);
    }

    #[test]
    fn test_status_feeds_projection_and_temperature_once() {
        let router = LiveEventRouter::new();
        let mut store = DashboardStore::new(&ScopeConfig::default());
        let line = r#"{"type":"status","data":{"is_acquiring":true,"stats":{"TEMP":{"samples":4,"current_temp":3675}}}}"#;

        let first = route(&router, &mut store, line);
        assert!(matches!(
            first,
            RouteOutcome::Status {
                temperature: Some(t),
                ..
            } if (t - 36.75).abs() < 1e-9
        ));
        let repeat = route(&router, &mut store, line);
        assert!(!repeat.is_visible());
        assert_eq!(store.temperature().len(), 1);
        assert!(store.status().acquiring);
    }

    #[test]
    fn test_polled_status_and_push_share_one_projection() {
        let router = LiveEventRouter::new();
        let mut store = DashboardStore::new(&ScopeConfig::default());
        let polled: StatusPayload = serde_json::from_str(
            r#"{"device_connected":true,"is_acquiring":true,"packet_count":10}"#,
        )
        .unwrap();
        router.route_status(&mut store, &polled, arrival());
        route(&router, &mut store, r#"{"type":"status","data":{"packet_count":25}}"#);
        // An older poll arriving late still wins on the fields it carries.
        router.route_status(&mut store, &polled, arrival());
        assert_eq!(store.status().packet_count, 10);
        assert!(store.status().device_connected);
    }

    #[test]
    fn test_reset_count_keeps_live_temperature_flowing() {
        let router = LiveEventRouter::new();
        let mut store = DashboardStore::new(&ScopeConfig::default());
        route(
            &router,
            &mut store,
            r#"{"type":"status","data":{"stats":{"TEMP":{"samples":50,"current_temp":3650}}}}"#,
        );
        route(
            &router,
            &mut store,
            r#"{"type":"status","data":{"stats":{"TEMP":{"samples":0,"current_temp":null}}}}"#,
        );
        let outcome = route(
            &router,
            &mut store,
            r#"{"type":"status","data":{"stats":{"TEMP":{"samples":1,"current_temp":3700}}}}"#,
        );
        assert!(outcome.is_visible());
        assert_eq!(store.temperature().len(), 2);
        assert_eq!(store.temperature().latest(), Some(37.0));
    }

    #[test]
    fn test_new_session_takes_reading_at_same_count() {
        let router = LiveEventRouter::new();
        let mut store = DashboardStore::new(&ScopeConfig::default());
        route(
            &router,
            &mut store,
            r#"{"type":"status","data":{"current_session_id":"20250114_093012","stats":{"TEMP":{"samples":4,"current_temp":3650}}}}"#,
        );
        route(
            &router,
            &mut store,
            r#"{"type":"status","data":{"current_session_id":"20250114_120000","stats":{"TEMP":{"samples":4,"current_temp":3680}}}}"#,
        );
        assert_eq!(store.temperature().len(), 2);
        assert_eq!(store.temperature().latest(), Some(36.8));
    }

    #[test]
    fn test_logs_are_appended() {
        let router = LiveEventRouter::new();
        let mut store = DashboardStore::new(&ScopeConfig::default());
        route(
            &router,
            &mut store,
            r#"{"type":"log","data":{"category":"MQTT","level":"ERROR","message":"broker down"}}"#,
        );
        assert_eq!(store.logs().len(), 1);
    }

    #[test]
    fn test_transitions_raise_toasts_when_enabled() {
        let router = LiveEventRouter::new().announcing_transitions();
        let mut store = DashboardStore::new(&ScopeConfig::default());
        route(
            &router,
            &mut store,
            r#"{"type":"status","data":{"connected":true,"is_acquiring":true}}"#,
        );
        route(
            &router,
            &mut store,
            r#"{"type":"status","data":{"connected":false,"is_acquiring":false}}"#,
        );
        let messages: Vec<_> = store.toasts().map(|t| t.message.as_str()).collect();
        assert_eq!(
            messages,
            vec!["Acquisition started", "Acquisition stopped", "Device disconnected"]
        );
    }
}
