//! Projection of the monitor's aggregate acquisition status.
//!
//! Fed by both the periodic poll and `status` push events, in no particular
//! order. Each present field overwrites the projection (last write wins);
//! absent fields leave it untouched, so partial pushes never blank values a
//! full poll already filled in.

use std::collections::HashMap;

use vitalscope_protocol::{ChannelStats, Signal, StatusPayload};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelStatus {
    pub samples: u64,
    pub last_update: Option<String>,
    pub current_temp: Option<f64>,
}

/// What one [`StatusProjection::apply`] call changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusChange {
    pub changed: bool,
    /// New value when the acquiring flag flipped.
    pub acquiring: Option<bool>,
    /// New value when the device connection flipped.
    pub device_connected: Option<bool>,
    /// The monitor moved on to a different acquisition session.
    pub session_changed: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusProjection {
    pub device_connected: bool,
    pub acquiring: bool,
    pub uptime_secs: u64,
    pub packet_count: u64,
    pub current_session_id: Option<String>,
    channels: HashMap<Signal, ChannelStatus>,
    revision: u64,
}

impl StatusProjection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bumped on every apply that changed something.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn channel(&self, signal: Signal) -> Option<&ChannelStatus> {
        self.channels.get(&signal)
    }

    pub fn samples(&self, signal: Signal) -> u64 {
        self.channel(signal).map_or(0, |channel| channel.samples)
    }

    pub fn apply(&mut self, payload: &StatusPayload) -> StatusChange {
        let mut change = StatusChange::default();

        if let Some(connected) = payload.device_connected {
            if connected != self.device_connected {
                self.device_connected = connected;
                change.device_connected = Some(connected);
                change.changed = true;
            }
        }
        if let Some(acquiring) = payload.acquiring {
            if acquiring != self.acquiring {
                self.acquiring = acquiring;
                change.acquiring = Some(acquiring);
                change.changed = true;
            }
        }
        change.changed |= overwrite(&mut self.uptime_secs, payload.uptime);
        change.changed |= overwrite(&mut self.packet_count, payload.packet_count);
        if let Some(session_id) = &payload.current_session_id {
            let session_id = Some(session_id.clone()).filter(|id| !id.is_empty());
            if session_id != self.current_session_id {
                change.session_changed = session_id.is_some();
                self.current_session_id = session_id;
                change.changed = true;
            }
        }

        for (name, stats) in payload.stats.iter().flatten() {
            let Some(signal) = Signal::parse(name) else {
                tracing::debug!(channel = %name, "Ignoring status for unknown channel");
                continue;
            };
            change.changed |= self.apply_channel(signal, stats);
        }

        if change.changed {
            self.revision += 1;
        }
        change
    }

    fn apply_channel(&mut self, signal: Signal, stats: &ChannelStats) -> bool {
        let channel = self.channels.entry(signal).or_default();
        let mut changed = false;
        if channel.samples != stats.samples {
            channel.samples = stats.samples;
            changed = true;
        }
        if stats.last_update.is_some() && channel.last_update != stats.last_update {
            channel.last_update = stats.last_update.clone();
            changed = true;
        }
        if stats.current_temp.is_some() && channel.current_temp != stats.current_temp {
            channel.current_temp = stats.current_temp;
            changed = true;
        }
        changed
    }
}

fn overwrite(slot: &mut u64, value: Option<u64>) -> bool {
    match value {
        Some(value) if value != *slot => {
            *slot = value;
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> StatusPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_absent_fields_are_left_untouched() {
        let mut status = StatusProjection::new();
        status.apply(&payload(json!({
            "device_connected": true,
            "is_acquiring": true,
            "packet_count": 120,
            "current_session_id": "20250114_093012"
        })));

        let change = status.apply(&payload(json!({"packet_count": 180})));
        assert!(change.changed);
        assert_eq!(change.acquiring, None);
        assert!(status.device_connected);
        assert!(status.acquiring);
        assert_eq!(status.packet_count, 180);
        assert_eq!(status.current_session_id.as_deref(), Some("20250114_093012"));
    }

    #[test]
    fn test_repeated_snapshot_is_idempotent() {
        let mut status = StatusProjection::new();
        let snapshot = payload(json!({
            "connected": true,
            "stats": {"ECG": {"samples": 5000}, "TEMP": {"samples": 3, "current_temp": 3650}}
        }));
        assert!(status.apply(&snapshot).changed);
        let revision = status.revision();

        assert!(!status.apply(&snapshot).changed);
        assert_eq!(status.revision(), revision);
        assert_eq!(status.samples(Signal::PrimaryEcg), 5_000);
        assert_eq!(
            status.channel(Signal::Temperature).and_then(|c| c.current_temp),
            Some(3_650.0)
        );
    }

    #[test]
    fn test_reports_acquisition_transitions() {
        let mut status = StatusProjection::new();
        let started = status.apply(&payload(json!({"is_acquiring": true})));
        assert_eq!(started.acquiring, Some(true));
        let stopped = status.apply(&payload(json!({"is_acquiring": false})));
        assert_eq!(stopped.acquiring, Some(false));
    }

    #[test]
    fn test_empty_session_id_clears_it() {
        let mut status = StatusProjection::new();
        status.apply(&payload(json!({"current_session_id": "20250114_093012"})));
        let change = status.apply(&payload(json!({"current_session_id": ""})));
        assert_eq!(status.current_session_id, None);
        assert!(!change.session_changed);
    }

    #[test]
    fn test_reports_new_session() {
        let mut status = StatusProjection::new();
        let first = status.apply(&payload(json!({"current_session_id": "20250114_093012"})));
        assert!(first.session_changed);
        let same = status.apply(&payload(json!({"current_session_id": "20250114_093012"})));
        assert!(!same.session_changed);
        let next = status.apply(&payload(json!({"current_session_id": "20250114_120000"})));
        assert!(next.session_changed);
    }

    #[test]
    fn test_unknown_channels_are_skipped() {
        let mut status = StatusProjection::new();
        let change = status.apply(&payload(json!({"stats": {"EEG": {"samples": 1}}})));
        assert!(!change.changed);
    }
}
