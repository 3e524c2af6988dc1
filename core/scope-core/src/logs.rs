//! Display-only sink for server log lines.

use vitalscope_protocol::{LogLevel, LogPayload};

use crate::buffer::BoundedLiveBuffer;

/// Server-side default for the recent-logs query.
pub const DEFAULT_LOG_LIMIT: usize = 100;

/// Exact-match filter on category and level. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    pub category: Option<String>,
    pub level: Option<LogLevel>,
}

impl LogFilter {
    pub fn new(category: Option<String>, level: Option<LogLevel>) -> Self {
        Self {
            category: category.filter(|category| !category.trim().is_empty()),
            level,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.level.is_none()
    }

    pub fn matches(&self, line: &LogPayload) -> bool {
        let category_ok = self
            .category
            .as_deref()
            .map_or(true, |category| line.category == category);
        let level_ok = self.level.map_or(true, |level| line.level == level);
        category_ok && level_ok
    }
}

#[derive(Debug, Clone)]
pub struct LogSink {
    lines: BoundedLiveBuffer<LogPayload>,
}

impl LogSink {
    /// `None` keeps every line.
    pub fn new(capacity: Option<usize>) -> Self {
        let lines = match capacity {
            Some(capacity) => BoundedLiveBuffer::new(capacity),
            None => BoundedLiveBuffer::unbounded(),
        };
        Self { lines }
    }

    pub fn push(&mut self, line: LogPayload) {
        self.lines.push(line);
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Matching lines, oldest first.
    pub fn filtered<'a>(&'a self, filter: &'a LogFilter) -> impl Iterator<Item = &'a LogPayload> + 'a {
        self.lines.items().filter(move |line| filter.matches(line))
    }

    /// The `limit` most recent matching lines, oldest first.
    pub fn recent(&self, filter: &LogFilter, limit: usize) -> Vec<&LogPayload> {
        let mut recent: Vec<&LogPayload> = self
            .lines
            .items()
            .rev()
            .filter(|line| filter.matches(line))
            .take(limit)
            .collect();
        recent.reverse();
        recent
    }

    /// Distinct categories seen, in first-seen order.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for line in self.lines.items() {
            if !line.category.is_empty() && !seen.contains(&line.category.as_str()) {
                seen.push(&line.category);
            }
        }
        seen
    }
}
