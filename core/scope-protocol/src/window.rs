use serde::{Deserialize, Serialize};

use crate::{
    lenient, validate_session_id, ErrorInfo, Signal, FULL_WINDOW_SENTINEL, WINDOW_SIZE_MAX,
    WINDOW_SIZE_MIN,
};

/// Requested window length: a sample count, or the whole dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowSize {
    Samples(u64),
    Full,
}

impl WindowSize {
    /// Reads a raw control value, clamping counts into the range the server
    /// accepts. `-1` selects the full dataset.
    pub fn from_raw(raw: i64) -> Self {
        if raw == FULL_WINDOW_SENTINEL {
            return WindowSize::Full;
        }
        let clamped = raw.clamp(WINDOW_SIZE_MIN as i64, WINDOW_SIZE_MAX as i64);
        WindowSize::Samples(clamped as u64)
    }

    pub fn to_raw(self) -> i64 {
        match self {
            WindowSize::Samples(count) => count as i64,
            WindowSize::Full => FULL_WINDOW_SENTINEL,
        }
    }

    pub fn is_full(self) -> bool {
        matches!(self, WindowSize::Full)
    }
}

/// One windowed-history request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowQuery {
    pub session_id: String,
    pub signal: Signal,
    pub position: u64,
    pub window_size: WindowSize,
}

impl WindowQuery {
    pub fn validate(&self) -> Result<(), ErrorInfo> {
        validate_session_id(&self.session_id)?;
        if let WindowSize::Samples(count) = self.window_size {
            if !(WINDOW_SIZE_MIN..=WINDOW_SIZE_MAX).contains(&count) {
                return Err(ErrorInfo::new(
                    "invalid_window_size",
                    format!(
                        "window_size must be between {} and {}, or -1 for all",
                        WINDOW_SIZE_MIN, WINDOW_SIZE_MAX
                    ),
                ));
            }
        }
        Ok(())
    }

    pub fn path(&self) -> String {
        format!(
            "/api/history/window/{}/{}",
            self.session_id,
            self.signal.as_str()
        )
    }

    pub fn query_pairs(&self) -> [(&'static str, String); 2] {
        [
            ("position", self.position.to_string()),
            ("window_size", self.window_size.to_raw().to_string()),
        ]
    }
}

/// Per-channel sample arrays. `x` carries absolute sample indices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesPayload {
    #[serde(default)]
    pub x: Vec<u64>,
    #[serde(default, deserialize_with = "lenient::matrix")]
    pub y: Vec<Vec<f64>>,
}

/// Server response to a [`WindowQuery`].
///
/// `window_start`/`window_end` are sample indices (end exclusive), never
/// timestamps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowPayload {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub signal: Option<String>,
    #[serde(default)]
    pub data: SeriesPayload,
    #[serde(default, deserialize_with = "lenient::u64")]
    pub count: u64,
    #[serde(default, deserialize_with = "lenient::u64")]
    pub window_start: u64,
    #[serde(default, deserialize_with = "lenient::u64")]
    pub window_end: u64,
    #[serde(default, deserialize_with = "lenient::u64")]
    pub total_count: u64,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub max_position: Option<u64>,
}
