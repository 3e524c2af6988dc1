//! Rolling live temperature trace.
//!
//! Readings sit in a bounded buffer; their times come from the arrival order
//! at a fixed interval from the first reading, so the time axis shifts along
//! with evictions instead of being stored per point.

use chrono::{Duration, NaiveDateTime};
use vitalscope_protocol::ChannelStats;

use crate::buffer::BoundedLiveBuffer;
use crate::timeline::{ReconstructionMode, SampleRate, TimeAnchor, TimeRange, TimeReconstructor};

#[derive(Debug, Clone)]
pub struct TemperatureTrace {
    readings: BoundedLiveBuffer<f64>,
    interval: Duration,
    /// Raw status readings are scaled integers; divide to get °C.
    divisor: f64,
    /// Running TEMP sample count at the last reading taken.
    last_samples: Option<u64>,
    origin: Option<NaiveDateTime>,
}

impl TemperatureTrace {
    pub fn new(capacity: usize, interval: Duration, divisor: f64) -> Self {
        Self {
            readings: BoundedLiveBuffer::new(capacity),
            interval,
            divisor: if divisor > 0.0 { divisor } else { 1.0 },
            last_samples: None,
            origin: None,
        }
    }

    /// Takes a reading from a status snapshot when the running count has
    /// moved since the last one seen. A repeated count is ignored; a count
    /// lower than the last one means the server was reset, so it starts a
    /// new series. Returns the appended value in °C.
    pub fn observe(&mut self, stats: &ChannelStats, at: NaiveDateTime) -> Option<f64> {
        match self.last_samples {
            Some(last) if stats.samples == last => return None,
            Some(last) if stats.samples < last => {
                tracing::debug!(
                    last,
                    samples = stats.samples,
                    "Temperature count went back; starting a new series"
                );
                self.last_samples = None;
            }
            _ => {}
        }
        if stats.samples == 0 {
            return None;
        }
        let raw = stats.current_temp?;
        self.last_samples = Some(stats.samples);
        let celsius = raw / self.divisor;
        self.push_reading(celsius, at);
        Some(celsius)
    }

    /// Forgets the running count so the next snapshot is taken whatever its
    /// count. Used when the acquisition session changes.
    pub fn restart_series(&mut self) {
        self.last_samples = None;
    }

    /// Appends a reading already in °C.
    pub fn push_reading(&mut self, celsius: f64, at: NaiveDateTime) {
        if self.origin.is_none() {
            self.origin = Some(at);
        }
        let (_, evicted) = self.readings.push(celsius);
        if evicted.is_some() {
            tracing::trace!(
                capacity = self.readings.capacity(),
                "Temperature trace full; dropped oldest reading"
            );
        }
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.readings.capacity()
    }

    pub fn latest(&self) -> Option<f64> {
        self.readings.latest().map(|entry| entry.item)
    }

    /// `(time, °C)` oldest first.
    pub fn points(&self) -> Vec<(NaiveDateTime, f64)> {
        let Some(reconstructor) = self.reconstructor() else {
            return Vec::new();
        };
        self.readings
            .iter()
            .filter_map(|entry| {
                let time = reconstructor.time_of_sample(entry.arrival_order)?;
                Some((time, entry.item))
            })
            .collect()
    }

    /// Time span covered by the retained readings.
    pub fn range(&self) -> Option<TimeRange> {
        let reconstructor = self.reconstructor()?;
        let first = self.readings.iter().next()?.arrival_order;
        let last = self.readings.latest()?.arrival_order;
        Some(TimeRange {
            start: reconstructor.time_of_sample(first)?,
            end: reconstructor.time_of_sample(last)?,
        })
    }

    /// Drops every reading and forgets the running count.
    pub fn clear(&mut self) {
        // Fresh buffer so arrival orders, and with them times, restart at 0.
        self.readings = BoundedLiveBuffer::new(self.readings.capacity());
        self.last_samples = None;
        self.origin = None;
    }

    fn reconstructor(&self) -> Option<TimeReconstructor> {
        let origin = self.origin?;
        Some(TimeReconstructor::new(
            TimeAnchor::new(origin),
            ReconstructionMode::FixedRate(SampleRate::Interval(self.interval)),
        ))
    }
}
