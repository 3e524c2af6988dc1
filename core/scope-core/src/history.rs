//! History browsing view: one (session, signal) dataset seen through a window.
//!
//! The view owns its cursor and time anchor exclusively. Navigation produces
//! a [`PendingRequest`]; the caller runs it through a
//! [`SessionWindowFetcher`](crate::fetch::SessionWindowFetcher) and hands the
//! outcome back to [`HistoryView::apply`]. Requests are never cancelled.
//!
//! ## Stale responses
//!
//! Every request carries a ticket from a per-view counter. Responses apply in
//! arrival order, except that one older than the newest response already
//! applied is dropped, so a slow early fetch cannot overwrite a later window.
//!
//! ## Failures
//!
//! A failed fetch moves the view to [`ViewState::Failed`] but keeps the last
//! good window on screen. An empty dataset is its own state, distinct from a
//! failure.

use std::ops::Range;

use vitalscope_protocol::{validate_session_id, SessionSummary, Signal, WindowQuery, WindowSize};

use crate::catalog::anchor_for_summary;
use crate::cursor::{Direction, WindowCursor};
use crate::error::Result;
use crate::fetch::{SessionWindowFetcher, WindowResult, WindowSource};
use crate::timeline::{TimeAnchor, TimeRange, TimeReconstructor};

pub type Ticket = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    /// Nothing requested yet.
    Idle,
    Loaded,
    /// The dataset has no samples.
    Empty,
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub ticket: Ticket,
    pub query: WindowQuery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    Empty,
    Failed,
    /// Older than a response already applied; ignored.
    Stale,
}

/// What the renderer draws: series on an ordinal axis plus a time label.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowView {
    pub session_id: String,
    pub signal: Signal,
    pub series: Vec<Vec<f64>>,
    pub window_start: u64,
    pub window_end: u64,
    pub total_count: u64,
    pub time_range: Option<TimeRange>,
}

impl WindowView {
    pub fn len(&self) -> usize {
        (self.window_end - self.window_start) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.window_end == self.window_start
    }

    /// Ordinal x values `0..N`, independent of sample rate.
    pub fn x_axis(&self) -> Range<usize> {
        0..self.len()
    }

    pub fn time_label(&self) -> Option<String> {
        self.time_range.map(|range| range.label())
    }
}

#[derive(Debug, Clone)]
pub struct HistoryView {
    session_id: String,
    signal: Signal,
    anchor: Option<TimeAnchor>,
    cursor: WindowCursor,
    state: ViewState,
    last_good: Option<WindowView>,
    next_ticket: Ticket,
    applied_ticket: Option<Ticket>,
}

impl HistoryView {
    pub fn new(
        session_id: &str,
        signal: Signal,
        anchor: Option<TimeAnchor>,
        window_size: WindowSize,
    ) -> Result<Self> {
        validate_session_id(session_id)?;
        Ok(Self {
            session_id: session_id.to_string(),
            signal,
            anchor,
            cursor: WindowCursor::new(clamp_size(window_size)),
            state: ViewState::Idle,
            last_good: None,
            next_ticket: 0,
            applied_ticket: None,
        })
    }

    /// Seeds the cursor with the catalog's sample count as a hint. The
    /// listing can lag behind a running session, so positions stay
    /// unclamped until the first response.
    pub fn from_summary(
        summary: &SessionSummary,
        signal: Signal,
        window_size: WindowSize,
    ) -> Result<Self> {
        let mut view = Self::new(
            &summary.session_id,
            signal,
            anchor_for_summary(summary),
            window_size,
        )?;
        view.cursor.hint_total(summary.samples_for(signal));
        Ok(view)
    }

    /// Same session and window size on another channel, with fresh state.
    pub fn with_signal(&self, signal: Signal) -> Self {
        Self {
            session_id: self.session_id.clone(),
            signal,
            anchor: self.anchor,
            cursor: WindowCursor::new(self.cursor.requested_size()),
            state: ViewState::Idle,
            last_good: None,
            next_ticket: 0,
            applied_ticket: None,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn signal(&self) -> Signal {
        self.signal
    }

    pub fn anchor(&self) -> Option<&TimeAnchor> {
        self.anchor.as_ref()
    }

    pub fn cursor(&self) -> &WindowCursor {
        &self.cursor
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Last successfully applied window, kept through failures.
    pub fn current(&self) -> Option<&WindowView> {
        self.last_good.as_ref()
    }

    /// Request for the window the cursor currently points at.
    pub fn request(&mut self) -> PendingRequest {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        PendingRequest {
            ticket,
            query: WindowQuery {
                session_id: self.session_id.clone(),
                signal: self.signal,
                position: self.cursor.position(),
                window_size: self.cursor.requested_size(),
            },
        }
    }

    pub fn navigate(&mut self, direction: Direction) -> PendingRequest {
        self.cursor.navigate(direction);
        self.request()
    }

    /// Counts outside the server's accepted range are clamped first.
    pub fn resize(&mut self, window_size: WindowSize) -> PendingRequest {
        self.cursor.resize(clamp_size(window_size));
        self.request()
    }

    pub fn set_position(&mut self, position: u64) -> PendingRequest {
        self.cursor.set_position(position);
        self.request()
    }

    pub fn apply(&mut self, ticket: Ticket, outcome: Result<WindowResult>) -> ApplyOutcome {
        if self.applied_ticket.is_some_and(|applied| ticket < applied) {
            tracing::debug!(
                ticket,
                applied = ?self.applied_ticket,
                session_id = %self.session_id,
                "Discarding stale window response"
            );
            return ApplyOutcome::Stale;
        }
        self.applied_ticket = Some(ticket);

        let result = match outcome {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    session_id = %self.session_id,
                    signal = %self.signal,
                    "Window fetch failed; keeping last window"
                );
                self.state = ViewState::Failed {
                    message: err.to_string(),
                };
                if let Some(window) = &self.last_good {
                    self.cursor.set_position(window.window_start);
                }
                return ApplyOutcome::Failed;
            }
        };

        self.cursor.set_total(result.total_count);
        if result.is_empty() {
            self.state = ViewState::Empty;
            self.last_good = None;
            return ApplyOutcome::Empty;
        }
        self.cursor.set_position(result.window_start);

        let time_range = self.anchor.and_then(|anchor| {
            TimeReconstructor::for_signal(anchor, self.signal).window_range(
                result.window_start,
                result.len(),
                result.total_count,
            )
        });
        self.last_good = Some(WindowView {
            session_id: self.session_id.clone(),
            signal: self.signal,
            series: result.series,
            window_start: result.window_start,
            window_end: result.window_end,
            total_count: result.total_count,
            time_range,
        });
        self.state = ViewState::Loaded;
        ApplyOutcome::Applied
    }

    /// Issues `request` and applies the result in one step.
    pub fn load<S: WindowSource>(
        &mut self,
        fetcher: &SessionWindowFetcher<S>,
        request: PendingRequest,
    ) -> ApplyOutcome {
        let outcome = fetcher.fetch(&request.query);
        self.apply(request.ticket, outcome)
    }
}

fn clamp_size(window_size: WindowSize) -> WindowSize {
    match window_size {
        WindowSize::Full => WindowSize::Full,
        WindowSize::Samples(count) => WindowSize::from_raw(count.min(i64::MAX as u64) as i64),
    }
}
