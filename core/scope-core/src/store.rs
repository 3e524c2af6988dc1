//! The single state store behind the operator UI.
//!
//! Live buffers (notifications, temperature trace, logs, toasts) and the
//! status projection live for the whole process and survive view switches.
//! The active view is replaced wholesale when the selection changes.
//!
//! Not thread-safe: one event loop owns the store and applies every mutation
//! to completion before taking the next event.

use std::time::{Duration, Instant};

use crate::buffer::{ArrivalOrder, BoundedLiveBuffer, BufferEntry};
use crate::catalog::SessionCatalog;
use crate::config::ScopeConfig;
use crate::history::HistoryView;
use crate::logs::LogSink;
use crate::notifications::Notification;
use crate::status::StatusProjection;
use crate::temperature::TemperatureTrace;

pub const TOAST_CAPACITY: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warning,
    Error,
}

/// Transient message that dismisses itself after the configured TTL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
}

#[derive(Debug, Clone)]
enum ActiveView {
    Realtime,
    History(Box<HistoryView>),
}

#[derive(Debug, Clone)]
pub struct DashboardStore {
    notifications: BoundedLiveBuffer<Notification>,
    temperature: TemperatureTrace,
    logs: LogSink,
    status: StatusProjection,
    toasts: BoundedLiveBuffer<Toast>,
    toast_ttl: Duration,
    catalog: SessionCatalog,
    view: ActiveView,
}

impl DashboardStore {
    pub fn new(config: &ScopeConfig) -> Self {
        Self {
            notifications: BoundedLiveBuffer::new(config.notification_capacity),
            temperature: TemperatureTrace::new(
                config.temperature_capacity,
                config.temperature_interval(),
                config.live_temperature_divisor,
            ),
            logs: LogSink::new(config.log_capacity),
            status: StatusProjection::new(),
            toasts: BoundedLiveBuffer::new(TOAST_CAPACITY),
            toast_ttl: config.toast_ttl(),
            catalog: SessionCatalog::new(),
            view: ActiveView::Realtime,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Notifications
    // ─────────────────────────────────────────────────────────────────────

    pub fn notifications(&self) -> &BoundedLiveBuffer<Notification> {
        &self.notifications
    }

    /// Returns the new id and the notification evicted to make room, if any.
    pub fn push_notification(
        &mut self,
        notification: Notification,
    ) -> (ArrivalOrder, Option<BufferEntry<Notification>>) {
        self.notifications.push(notification)
    }

    pub fn dismiss_notification(&mut self, id: ArrivalOrder) -> bool {
        self.notifications.remove_by_id(id).is_some()
    }

    pub fn clear_notifications(&mut self) {
        self.notifications.clear();
    }

    /// Always equal to the number of notifications held.
    pub fn badge_count(&self) -> usize {
        self.notifications.len()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Live channels
    // ─────────────────────────────────────────────────────────────────────

    pub fn temperature(&self) -> &TemperatureTrace {
        &self.temperature
    }

    pub fn temperature_mut(&mut self) -> &mut TemperatureTrace {
        &mut self.temperature
    }

    pub fn logs(&self) -> &LogSink {
        &self.logs
    }

    pub fn logs_mut(&mut self) -> &mut LogSink {
        &mut self.logs
    }

    pub fn status(&self) -> &StatusProjection {
        &self.status
    }

    pub fn status_mut(&mut self) -> &mut StatusProjection {
        &mut self.status
    }

    // ─────────────────────────────────────────────────────────────────────
    // Toasts
    // ─────────────────────────────────────────────────────────────────────

    pub fn toast(
        &mut self,
        level: ToastLevel,
        message: impl Into<String>,
        now: Instant,
    ) -> ArrivalOrder {
        let toast = Toast {
            level,
            message: message.into(),
        };
        match now.checked_add(self.toast_ttl) {
            Some(deadline) => self.toasts.push_expiring(toast, deadline).0,
            None => {
                tracing::debug!(
                    ttl = ?self.toast_ttl,
                    "Toast TTL out of range; toast stays until dismissed"
                );
                self.toasts.push(toast).0
            }
        }
    }

    pub fn toasts(&self) -> impl Iterator<Item = &Toast> + '_ {
        self.toasts.items()
    }

    /// Toasts with their ids, oldest first.
    pub fn toast_entries(&self) -> impl Iterator<Item = &BufferEntry<Toast>> + '_ {
        self.toasts.iter()
    }

    pub fn dismiss_toast(&mut self, id: ArrivalOrder) -> bool {
        self.toasts.remove_by_id(id).is_some()
    }

    /// Drops toasts whose TTL has run out. Returns how many left.
    pub fn expire_toasts(&mut self, now: Instant) -> usize {
        self.toasts.expire_due(now).len()
    }

    /// When the next toast expires, for sizing the event loop's wait.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.toasts.next_deadline()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Views
    // ─────────────────────────────────────────────────────────────────────

    pub fn catalog(&self) -> &SessionCatalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut SessionCatalog {
        &mut self.catalog
    }

    /// Replaces whatever view was active; the previous one is dropped.
    pub fn open_history(&mut self, view: HistoryView) {
        tracing::debug!(
            session_id = %view.session_id(),
            signal = %view.signal(),
            "Opening history view"
        );
        self.view = ActiveView::History(Box::new(view));
    }

    pub fn history(&self) -> Option<&HistoryView> {
        match &self.view {
            ActiveView::History(view) => Some(&**view),
            ActiveView::Realtime => None,
        }
    }

    pub fn history_mut(&mut self) -> Option<&mut HistoryView> {
        match &mut self.view {
            ActiveView::History(view) => Some(&mut **view),
            ActiveView::Realtime => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::NotificationDetail;
    use chrono::NaiveDate;
    use vitalscope_protocol::{AnomalySource, Signal, WindowSize};

    fn notification(error: f64) -> Notification {
        Notification {
            source: AnomalySource::Ecg,
            detected_at: NaiveDate::from_ymd_opt(2025, 1, 14)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            severity: None,
            detail: NotificationDetail::Reconstruction {
                error,
                threshold: 0.1,
            },
        }
    }

    #[test]
    fn test_eleventh_notification_evicts_the_first() {
        let mut store = DashboardStore::new(&ScopeConfig::default());
        for index in 0..11 {
            store.push_notification(notification(index as f64));
        }
        assert_eq!(store.badge_count(), 10);
        let first_kept = store.notifications().items().next().unwrap();
        assert_eq!(
            first_kept.detail,
            NotificationDetail::Reconstruction {
                error: 1.0,
                threshold: 0.1
            }
        );
    }

    #[test]
    fn test_badge_tracks_dismiss_and_clear() {
        let mut store = DashboardStore::new(&ScopeConfig::default());
        let (first, _) = store.push_notification(notification(0.2));
        store.push_notification(notification(0.3));
        assert!(store.dismiss_notification(first));
        assert!(!store.dismiss_notification(first));
        assert_eq!(store.badge_count(), 1);
        store.clear_notifications();
        assert_eq!(store.badge_count(), 0);
    }

    #[test]
    fn test_toasts_expire_after_ttl() {
        let mut store = DashboardStore::new(&ScopeConfig::default());
        let now = Instant::now();
        store.toast(ToastLevel::Error, "server unreachable", now);
        assert_eq!(store.toasts().count(), 1);
        assert_eq!(store.expire_toasts(now + Duration::from_secs(4)), 0);
        assert_eq!(store.expire_toasts(now + Duration::from_secs(5)), 1);
        assert_eq!(store.toasts().count(), 0);
    }

    #[test]
    fn test_huge_ttl_keeps_toast_until_dismissed() {
        let config = ScopeConfig {
            toast_ttl_secs: u64::MAX,
            ..ScopeConfig::default()
        };
        let mut store = DashboardStore::new(&config);
        let now = Instant::now();
        let id = store.toast(ToastLevel::Warning, "device disconnected", now);
        assert_eq!(store.next_deadline(), None);
        assert_eq!(store.expire_toasts(now + Duration::from_secs(3_600)), 0);
        assert!(store.dismiss_toast(id));
    }

    #[test]
    fn test_dismissed_toast_leaves_no_deadline() {
        let mut store = DashboardStore::new(&ScopeConfig::default());
        let id = store.toast(ToastLevel::Info, "acquisition started", Instant::now());
        assert!(store.dismiss_toast(id));
        assert_eq!(store.next_deadline(), None);
    }

    #[test]
    fn test_live_buffers_survive_view_switches() {
        let mut store = DashboardStore::new(&ScopeConfig::default());
        store.push_notification(notification(0.5));
        let view = HistoryView::new(
            "20250114_093012",
            Signal::PrimaryEcg,
            None,
            WindowSize::Samples(1_000),
        )
        .unwrap();
        store.open_history(view.clone());
        store.open_history(view.with_signal(Signal::Temperature));
        assert_eq!(store.history().unwrap().signal(), Signal::Temperature);
        assert_eq!(store.badge_count(), 1);
    }
}
