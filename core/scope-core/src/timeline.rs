//! Wall-clock reconstruction for sample indices and windows.
//!
//! The server only returns sample indices. Times are derived here from the
//! session start plus either the channel's own rate (fixed-rate mode) or the
//! window's share of the whole session span (proportional mode).
//!
//! Charts always plot against an ordinal axis `0..N-1`; the times computed
//! here only feed the axis label, so windowing never distorts the waveform.

use chrono::{Duration, NaiveDateTime};
use vitalscope_protocol::{SessionSummary, Signal};

/// ECG and the ADC array are sampled at 250 Hz.
pub const CONTINUOUS_RATE_HZ: f64 = 250.0;
/// Temperature is read once every two minutes.
pub const TEMPERATURE_INTERVAL_SECS: i64 = 120;

/// How often a channel produces a sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleRate {
    /// Samples per second.
    PerSecond(f64),
    /// One sample per fixed interval.
    Interval(Duration),
}

impl SampleRate {
    pub fn for_signal(signal: Signal) -> Self {
        match signal {
            Signal::PrimaryEcg | Signal::AdcArray => SampleRate::PerSecond(CONTINUOUS_RATE_HZ),
            Signal::Temperature => {
                SampleRate::Interval(Duration::seconds(TEMPERATURE_INTERVAL_SECS))
            }
        }
    }

    /// Elapsed time from sample 0 to sample `index`.
    pub fn offset_of(&self, index: u64) -> Duration {
        match *self {
            SampleRate::PerSecond(rate) if rate > 0.0 => {
                let micros = (index as f64 / rate * 1_000_000.0).round();
                Duration::microseconds(micros.min(i64::MAX as f64) as i64)
            }
            SampleRate::PerSecond(_) => Duration::zero(),
            SampleRate::Interval(step) => {
                let index = i64::try_from(index).unwrap_or(i64::MAX);
                Duration::milliseconds(step.num_milliseconds().max(0).saturating_mul(index))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReconstructionMode {
    /// `origin + index / rate`.
    FixedRate(SampleRate),
    /// Window bounds follow the window's fraction of the session span.
    /// `fallback` is used while the span is unknown (session still running).
    Proportional { fallback: SampleRate },
}

impl ReconstructionMode {
    pub fn for_signal(signal: Signal) -> Self {
        match signal {
            Signal::PrimaryEcg | Signal::AdcArray => {
                ReconstructionMode::FixedRate(SampleRate::for_signal(signal))
            }
            Signal::Temperature => ReconstructionMode::Proportional {
                fallback: SampleRate::for_signal(signal),
            },
        }
    }
}

/// Session start plus, once known, its total span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeAnchor {
    pub origin: NaiveDateTime,
    pub total_duration: Option<Duration>,
}

impl TimeAnchor {
    pub fn new(origin: NaiveDateTime) -> Self {
        Self {
            origin,
            total_duration: None,
        }
    }

    pub fn with_duration(origin: NaiveDateTime, total_duration: Duration) -> Self {
        Self {
            origin,
            total_duration: Some(total_duration),
        }
    }

    pub fn from_session(summary: &SessionSummary) -> Option<Self> {
        let origin = summary.started_at()?;
        Some(Self {
            origin,
            total_duration: summary.duration(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeRange {
    pub fn span(&self) -> Duration {
        self.end.signed_duration_since(self.start)
    }

    /// `HH:MM:SS - HH:MM:SS`; milliseconds are shown for sub-minute spans and
    /// the date when the range crosses midnight.
    pub fn label(&self) -> String {
        let format = if self.start.date() != self.end.date() {
            "%Y-%m-%d %H:%M:%S"
        } else if self.span() < Duration::minutes(1) {
            "%H:%M:%S%.3f"
        } else {
            "%H:%M:%S"
        };
        format!(
            "{} - {}",
            self.start.format(format),
            self.end.format(format)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeReconstructor {
    anchor: TimeAnchor,
    mode: ReconstructionMode,
}

impl TimeReconstructor {
    pub fn new(anchor: TimeAnchor, mode: ReconstructionMode) -> Self {
        Self { anchor, mode }
    }

    pub fn for_signal(anchor: TimeAnchor, signal: Signal) -> Self {
        Self::new(anchor, ReconstructionMode::for_signal(signal))
    }

    pub fn anchor(&self) -> &TimeAnchor {
        &self.anchor
    }

    pub fn mode(&self) -> ReconstructionMode {
        self.mode
    }

    /// Wall-clock time of one sample from the channel's nominal rate, or
    /// `None` when the index lands outside the representable calendar.
    pub fn time_of_sample(&self, index: u64) -> Option<NaiveDateTime> {
        let rate = match self.mode {
            ReconstructionMode::FixedRate(rate) => rate,
            ReconstructionMode::Proportional { fallback } => fallback,
        };
        self.anchor.origin.checked_add_signed(rate.offset_of(index))
    }

    /// Time bounds of the window `[position, position + window_len)` within
    /// a dataset of `total_count` samples. `None` when either bound cannot be
    /// represented; the window is then shown without a time label.
    pub fn window_range(
        &self,
        position: u64,
        window_len: u64,
        total_count: u64,
    ) -> Option<TimeRange> {
        match (self.mode, self.anchor.total_duration) {
            (ReconstructionMode::Proportional { .. }, Some(total)) => {
                if total_count == 0 {
                    return Some(TimeRange {
                        start: self.anchor.origin,
                        end: self.anchor.origin,
                    });
                }
                let progress = position as f64 / total_count as f64;
                let coverage = window_len as f64 / total_count as f64;
                Some(TimeRange {
                    start: self.anchor.origin.checked_add_signed(scale(total, progress))?,
                    end: self
                        .anchor
                        .origin
                        .checked_add_signed(scale(total, progress + coverage))?,
                })
            }
            _ => Some(TimeRange {
                start: self.time_of_sample(position)?,
                end: self.time_of_sample(position.saturating_add(window_len))?,
            }),
        }
    }
}

fn scale(duration: Duration, fraction: f64) -> Duration {
    let micros = duration
        .num_microseconds()
        .unwrap_or_else(|| duration.num_milliseconds().saturating_mul(1_000));
    Duration::microseconds((micros as f64 * fraction).round() as i64)
}
