//! Known recording dates and sessions.

use chrono::NaiveDateTime;
use vitalscope_protocol::{validate_date, DateEntry, DateList, SessionList, SessionSummary};

use crate::error::Result;
use crate::fetch::WindowSource;
use crate::timeline::TimeAnchor;

#[derive(Debug, Clone, Default)]
pub struct SessionCatalog {
    /// Newest first.
    dates: Vec<DateEntry>,
    /// Newest first.
    sessions: Vec<SessionSummary>,
}

impl SessionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dates(&self) -> &[DateEntry] {
        &self.dates
    }

    pub fn sessions(&self) -> &[SessionSummary] {
        &self.sessions
    }

    pub fn sessions_on<'a>(&'a self, date: &'a str) -> impl Iterator<Item = &'a SessionSummary> + 'a {
        self.sessions
            .iter()
            .filter(move |session| session.date_key() == Some(date))
    }

    pub fn get(&self, session_id: &str) -> Option<&SessionSummary> {
        self.sessions
            .iter()
            .find(|session| session.session_id == session_id)
    }

    pub fn replace_dates(&mut self, list: DateList) {
        let mut dates = list.dates;
        dates.sort_by(|a, b| b.value.cmp(&a.value));
        dates.dedup_by(|a, b| a.value == b.value);
        self.dates = dates;
    }

    /// A list scoped to one date only replaces that date's sessions.
    pub fn replace_sessions(&mut self, list: SessionList) {
        match list.date.as_deref().filter(|date| !date.is_empty()) {
            Some(date) => self
                .sessions
                .retain(|session| session.date_key() != Some(date)),
            None => self.sessions.clear(),
        }
        self.sessions.extend(list.sessions);
        self.sessions
            .sort_by(|a, b| b.session_id.cmp(&a.session_id));
        self.sessions.dedup_by(|a, b| a.session_id == b.session_id);
    }

    pub fn refresh_dates<S: WindowSource>(&mut self, source: &S) -> Result<()> {
        let dates = source.list_dates()?;
        tracing::debug!(count = dates.dates.len(), "Loaded recording dates");
        self.replace_dates(dates);
        Ok(())
    }

    pub fn refresh_sessions<S: WindowSource>(
        &mut self,
        source: &S,
        date: Option<&str>,
    ) -> Result<()> {
        if let Some(date) = date {
            validate_date(date)?;
        }
        let mut list = source.list_sessions(date)?;
        if list.date.is_none() {
            list.date = date.map(str::to_string);
        }
        tracing::debug!(count = list.sessions.len(), date = ?date, "Loaded sessions");
        self.replace_sessions(list);
        Ok(())
    }

    /// Anchor for time reconstruction. A missing start time falls back to the
    /// instant encoded in the session id.
    pub fn anchor_for(&self, session_id: &str) -> Option<TimeAnchor> {
        match self.get(session_id) {
            Some(summary) => anchor_for_summary(summary),
            None => start_from_id(session_id).map(TimeAnchor::new),
        }
    }
}

pub fn anchor_for_summary(summary: &SessionSummary) -> Option<TimeAnchor> {
    TimeAnchor::from_session(summary)
        .or_else(|| start_from_id(&summary.session_id).map(TimeAnchor::new))
}

fn start_from_id(session_id: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(session_id, "%Y%m%d_%H%M%S").ok()
}
