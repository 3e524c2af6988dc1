//! # vitalscope-core
//!
//! Client-side state for the vitalscope monitor: windowed browsing of the
//! server's history archive and the bounded live buffers fed by the push
//! channel and the status poll.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime dependency. Transport lives behind the
//!   [`WindowSource`], [`AnomalyArchive`] and [`MonitorControl`] traits.
//! - **Not thread-safe**: One event loop owns the [`DashboardStore`] and applies
//!   each event to completion. Clients provide their own threading.
//! - **Clamp, don't fail**: Sizes are clamped before any request is built, and
//!   positions are clamped once a response has told us the dataset length.
//!   Malformed fields fall back to neutral values without losing the rest of
//!   the payload.
//! - **Server is authoritative**: Counts and bounds come from responses, never
//!   from what was requested.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use vitalscope_core::{Direction, HistoryView, SessionWindowFetcher};
//!
//! let fetcher = SessionWindowFetcher::new(client);
//! let mut view = HistoryView::new("20250114_093012", Signal::PrimaryEcg, None, size)?;
//! let request = view.navigate(Direction::Next);
//! view.load(&fetcher, request);
//! ```

pub mod anomalies;
pub mod buffer;
pub mod catalog;
pub mod config;
pub mod cursor;
pub mod error;
pub mod fetch;
pub mod history;
pub mod logs;
pub mod notifications;
pub mod router;
pub mod status;
pub mod storage;
pub mod store;
pub mod temperature;
pub mod timeline;

pub use anomalies::{AnomalyEntry, AnomalyLog};
pub use buffer::{ArrivalOrder, BoundedLiveBuffer, BufferEntry};
pub use catalog::SessionCatalog;
pub use config::{load_config, load_config_from, save_config, ScopeConfig};
pub use cursor::{Direction, WindowCursor};
pub use error::{Result, ScopeError};
pub use fetch::{AnomalyArchive, MonitorControl, SessionWindowFetcher, WindowResult, WindowSource};
pub use history::{ApplyOutcome, HistoryView, PendingRequest, Ticket, ViewState, WindowView};
pub use logs::{LogFilter, LogSink, DEFAULT_LOG_LIMIT};
pub use notifications::{Notification, NotificationDetail};
pub use router::{Arrival, LiveEventRouter, RouteOutcome};
pub use status::{ChannelStatus, StatusChange, StatusProjection};
pub use storage::StorageConfig;
pub use store::{DashboardStore, Toast, ToastLevel};
pub use temperature::TemperatureTrace;
pub use timeline::{ReconstructionMode, SampleRate, TimeAnchor, TimeRange, TimeReconstructor};
