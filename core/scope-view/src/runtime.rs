//! Live dashboard runtime.
//!
//! Two background threads feed one channel: the status poller (every
//! `poll_interval`) and the push-channel reader. The event loop on the
//! calling thread owns the [`DashboardStore`] and applies each event to
//! completion before taking the next, so the store needs no locking.
//!
//! Neither source retries. A failed poll is reported and the next tick tries
//! again on schedule; a dropped push connection is reported once and the
//! dashboard carries on from polling alone.
//!
//! Operator commands (`dismiss N`, `clear`, `list`, `quit`) arrive on the
//! same channel from an optional input reader.

use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use vitalscope_core::{
    Arrival, ArrivalOrder, DashboardStore, LiveEventRouter, LogFilter, MonitorControl, Result,
    RouteOutcome, ScopeError, ToastLevel,
};
use vitalscope_protocol::{PushEvent, StatusPayload};

use crate::browse::CommandError;
use crate::{push, render};

/// Upper bound on one wait when no toast is pending.
const IDLE_WAIT: Duration = Duration::from_millis(500);

pub const WATCH_HELP: &str = "commands: list | dismiss N | clear | quit";

#[derive(Debug)]
pub enum LiveEvent {
    Push(PushEvent),
    Status(StatusPayload),
    SourceFailed {
        source: &'static str,
        message: String,
    },
    Command(WatchCommand),
    InvalidCommand(CommandError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchCommand {
    /// Print the notifications held, with their ids.
    List,
    Dismiss(ArrivalOrder),
    Clear,
    Help,
    Quit,
}

impl WatchCommand {
    /// `Ok(None)` for a blank line.
    pub fn parse(line: &str) -> std::result::Result<Option<Self>, CommandError> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let command = match verb.to_ascii_lowercase().as_str() {
            "list" | "ls" => WatchCommand::List,
            "dismiss" | "d" => {
                let value = words.next().ok_or(CommandError::MissingArgument {
                    command: "dismiss",
                })?;
                let id = value
                    .trim_start_matches('#')
                    .parse()
                    .map_err(|_| CommandError::InvalidArgument {
                        command: "dismiss",
                        value: value.to_string(),
                    })?;
                WatchCommand::Dismiss(id)
            }
            "clear" => WatchCommand::Clear,
            "help" | "?" => WatchCommand::Help,
            "quit" | "q" | "exit" => WatchCommand::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }
}

/// Store plus router, applied one event at a time.
pub struct Dashboard {
    store: DashboardStore,
    router: LiveEventRouter,
    /// Next toast id not yet printed.
    toast_mark: ArrivalOrder,
    quit: bool,
}

impl Dashboard {
    pub fn new(store: DashboardStore, router: LiveEventRouter) -> Self {
        Self {
            store,
            router,
            toast_mark: 0,
            quit: false,
        }
    }

    pub fn store(&self) -> &DashboardStore {
        &self.store
    }

    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    /// Applies one event and returns the lines worth printing.
    pub fn apply(&mut self, event: LiveEvent, arrival: Arrival) -> Vec<String> {
        let mut lines = Vec::new();
        match event {
            LiveEvent::Push(event) => {
                let outcome = self.router.route(&mut self.store, event, arrival);
                self.describe(&outcome, &mut lines);
            }
            LiveEvent::Status(status) => {
                let outcome = self.router.route_status(&mut self.store, &status, arrival);
                self.describe(&outcome, &mut lines);
            }
            LiveEvent::SourceFailed { source, message } => {
                tracing::warn!(source, error = %message, "Live source failed");
                self.store.toast(
                    ToastLevel::Error,
                    format!("{}: {}", source, message),
                    arrival.instant,
                );
            }
            LiveEvent::Command(command) => self.execute(command, &mut lines),
            LiveEvent::InvalidCommand(err) => {
                lines.push(format!("{}\n{}", err, WATCH_HELP));
            }
        }
        self.collect_new_toasts(&mut lines);
        lines
    }

    pub fn expire_toasts(&mut self, now: Instant) -> usize {
        self.store.expire_toasts(now)
    }

    fn execute(&mut self, command: WatchCommand, lines: &mut Vec<String>) {
        match command {
            WatchCommand::List => {
                if self.store.notifications().is_empty() {
                    lines.push("No notifications.".to_string());
                }
                for entry in self.store.notifications().iter() {
                    lines.push(render::notification(entry.arrival_order, &entry.item));
                }
            }
            WatchCommand::Dismiss(id) => {
                if self.store.dismiss_notification(id) {
                    lines.push(format!(
                        "dismissed #{} ({} left)",
                        id,
                        self.store.badge_count()
                    ));
                } else {
                    lines.push(format!("no notification #{}", id));
                }
            }
            WatchCommand::Clear => {
                self.store.clear_notifications();
                lines.push("notifications cleared".to_string());
            }
            WatchCommand::Help => lines.push(WATCH_HELP.to_string()),
            WatchCommand::Quit => {
                tracing::debug!("Quit requested");
                self.quit = true;
            }
        }
    }

    fn describe(&self, outcome: &RouteOutcome, lines: &mut Vec<String>) {
        match outcome {
            RouteOutcome::Notification { id, .. } => {
                if let Some(notification) = self.store.notifications().get(*id) {
                    lines.push(render::notification(*id, notification));
                }
            }
            RouteOutcome::Status {
                change,
                temperature,
            } => {
                if change.changed {
                    lines.push(render::status(self.store.status()));
                }
                if let Some(celsius) = temperature {
                    lines.push(render::temperature(*celsius));
                }
            }
            RouteOutcome::Log => {
                if let Some(line) = self.store.logs().recent(&LogFilter::default(), 1).first() {
                    lines.push(render::log_line(line));
                }
            }
        }
    }

    fn collect_new_toasts(&mut self, lines: &mut Vec<String>) {
        for entry in self.store.toast_entries() {
            if entry.arrival_order >= self.toast_mark {
                lines.push(render::toast(&entry.item));
            }
        }
        if let Some(latest) = self.store.toast_entries().last() {
            self.toast_mark = self.toast_mark.max(latest.arrival_order + 1);
        }
    }
}

pub struct LiveRuntime<C> {
    control: Arc<C>,
    poll_interval: Duration,
    push_addr: Option<String>,
    sender: Option<Sender<LiveEvent>>,
    receiver: Receiver<LiveEvent>,
    shutdown: Arc<AtomicBool>,
    started: bool,
}

impl<C> LiveRuntime<C>
where
    C: MonitorControl + Send + Sync + 'static,
{
    pub fn new(control: Arc<C>, poll_interval: Duration, push_addr: Option<String>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            control,
            poll_interval,
            push_addr,
            sender: Some(sender),
            receiver,
            shutdown: Arc::new(AtomicBool::new(false)),
            started: false,
        }
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Feeds operator commands read from `input` into the event loop. Only
    /// possible before [`start`](Self::start); returns whether it attached.
    pub fn attach_commands<R>(&mut self, input: R) -> bool
    where
        R: BufRead + Send + 'static,
    {
        let Some(sender) = self.sender.clone() else {
            return false;
        };
        let shutdown = Arc::clone(&self.shutdown);
        thread::spawn(move || {
            for line in input.lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        tracing::warn!(error = %err, "Command input failed");
                        break;
                    }
                };
                let event = match WatchCommand::parse(&line) {
                    Ok(Some(command)) => LiveEvent::Command(command),
                    Ok(None) => continue,
                    Err(err) => LiveEvent::InvalidCommand(err),
                };
                if shutdown.load(Ordering::Relaxed) || sender.send(event).is_err() {
                    break;
                }
            }
        });
        true
    }

    /// Spawns the poller and the push reader. Returns `false` without doing
    /// anything when they are already running.
    pub fn start(&mut self) -> bool {
        let Some(sender) = self.sender.take() else {
            return false;
        };
        self.started = true;

        spawn_poller(
            Arc::clone(&self.control),
            self.poll_interval,
            sender.clone(),
            Arc::clone(&self.shutdown),
        );
        if let Some(addr) = self.push_addr.clone() {
            spawn_push_reader(addr, sender, Arc::clone(&self.shutdown));
        }
        tracing::info!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            push_addr = ?self.push_addr,
            "Live runtime started"
        );
        true
    }

    /// Runs the event loop until `keep_going` returns `false` after an
    /// event, a `quit` command arrives, or every source has stopped.
    pub fn run<W: Write>(
        &mut self,
        dashboard: &mut Dashboard,
        mut output: W,
        mut keep_going: impl FnMut(&DashboardStore) -> bool,
    ) -> Result<()> {
        self.start();

        loop {
            let wait = dashboard
                .store()
                .next_deadline()
                .map(|deadline| deadline.saturating_duration_since(Instant::now()))
                .map_or(IDLE_WAIT, |until| until.min(IDLE_WAIT));

            match self.receiver.recv_timeout(wait) {
                Ok(event) => {
                    for line in dashboard.apply(event, Arrival::now()) {
                        writeln!(output, "{}", line).map_err(|err| ScopeError::Io {
                            context: "writing dashboard output".to_string(),
                            source: err,
                        })?;
                    }
                    dashboard.expire_toasts(Instant::now());
                    if dashboard.quit_requested() || !keep_going(dashboard.store()) {
                        return Ok(());
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    dashboard.expire_toasts(Instant::now());
                }
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::info!("All live sources stopped");
                    return Ok(());
                }
            }
        }
    }
}

impl<C> Drop for LiveRuntime<C> {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

fn spawn_poller<C>(
    control: Arc<C>,
    interval: Duration,
    sender: Sender<LiveEvent>,
    shutdown: Arc<AtomicBool>,
) where
    C: MonitorControl + Send + Sync + 'static,
{
    thread::spawn(move || {
        while !shutdown.load(Ordering::Relaxed) {
            let event = match control.status() {
                Ok(status) => LiveEvent::Status(status),
                Err(err) => LiveEvent::SourceFailed {
                    source: "status poll",
                    message: err.to_string(),
                },
            };
            if sender.send(event).is_err() {
                break;
            }
            thread::sleep(interval);
        }
    });
}

fn spawn_push_reader(addr: String, sender: Sender<LiveEvent>, shutdown: Arc<AtomicBool>) {
    thread::spawn(move || {
        let result = push::connect(&addr).and_then(|stream| {
            push::read_events(stream, |event| {
                !shutdown.load(Ordering::Relaxed) && sender.send(LiveEvent::Push(event)).is_ok()
            })
        });
        let message = match result {
            Ok(()) => "connection closed".to_string(),
            Err(err) => err.to_string(),
        };
        if !shutdown.load(Ordering::Relaxed) {
            let _ = sender.send(LiveEvent::SourceFailed {
                source: "push channel",
                message,
            });
        }
    });
}
