//! Interactive history browser driven by line commands.
//!
//! Each command moves the view's cursor, issues one window request and
//! prints whatever the view holds afterwards. Failed fetches leave the last
//! window on screen with the error underneath.

use std::io::{BufRead, Write};

use vitalscope_core::{
    DashboardStore, Direction, HistoryView, Result, ScopeError, SessionWindowFetcher,
    WindowSource,
};
use vitalscope_protocol::{Signal, WindowSize};

use crate::render;

pub const HELP: &str =
    "commands: start | prev | next | end | seek N | size N | full | signal ECG|ADC|TEMP | reload | quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseCommand {
    Navigate(Direction),
    Seek(u64),
    Resize(WindowSize),
    SwitchSignal(Signal),
    Reload,
    Help,
    Quit,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("{command} needs an argument")]
    MissingArgument { command: &'static str },
    #[error("invalid argument for {command}: {value}")]
    InvalidArgument { command: &'static str, value: String },
}

impl BrowseCommand {
    /// `Ok(None)` for a blank line.
    pub fn parse(line: &str) -> std::result::Result<Option<Self>, CommandError> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let argument = words.next();
        let verb = verb.to_ascii_lowercase();

        if let Some(direction) = Direction::parse(&verb) {
            return Ok(Some(BrowseCommand::Navigate(direction)));
        }

        let command = match verb.as_str() {
            "seek" | "goto" => {
                let value = require(argument, "seek")?;
                let position = value.parse().map_err(|_| CommandError::InvalidArgument {
                    command: "seek",
                    value: value.to_string(),
                })?;
                BrowseCommand::Seek(position)
            }
            "size" => {
                let value = require(argument, "size")?;
                let raw: i64 = value.parse().map_err(|_| CommandError::InvalidArgument {
                    command: "size",
                    value: value.to_string(),
                })?;
                BrowseCommand::Resize(WindowSize::from_raw(raw))
            }
            "full" | "all" => BrowseCommand::Resize(WindowSize::Full),
            "signal" => {
                let value = require(argument, "signal")?;
                let signal = Signal::parse(value).ok_or_else(|| CommandError::InvalidArgument {
                    command: "signal",
                    value: value.to_string(),
                })?;
                BrowseCommand::SwitchSignal(signal)
            }
            "reload" | "r" => BrowseCommand::Reload,
            "help" | "?" => BrowseCommand::Help,
            "quit" | "q" | "exit" => BrowseCommand::Quit,
            _ => return Err(CommandError::Unknown(verb)),
        };
        Ok(Some(command))
    }
}

fn require<'a>(
    argument: Option<&'a str>,
    command: &'static str,
) -> std::result::Result<&'a str, CommandError> {
    argument.ok_or(CommandError::MissingArgument { command })
}

/// Loads the first window of the store's history view, then applies
/// commands from `input` until `quit` or EOF. The view stays in the store.
pub fn run<S, R, W>(
    fetcher: &SessionWindowFetcher<S>,
    store: &mut DashboardStore,
    input: R,
    mut output: W,
) -> Result<()>
where
    S: WindowSource,
    R: BufRead,
    W: Write,
{
    let view = selected(store)?;
    let request = view.request();
    view.load(fetcher, request);
    emit(&mut output, &render::history(view))?;

    for line in input.lines() {
        let line = line.map_err(|err| ScopeError::Io {
            context: "reading browse commands".to_string(),
            source: err,
        })?;
        let command = match BrowseCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                emit(&mut output, &format!("{}\n{}\n", err, HELP))?;
                continue;
            }
        };

        let view = selected(store)?;
        let request = match command {
            BrowseCommand::Quit => break,
            BrowseCommand::Help => {
                emit(&mut output, &format!("{}\n", HELP))?;
                continue;
            }
            BrowseCommand::Navigate(direction) => view.navigate(direction),
            BrowseCommand::Seek(position) => view.set_position(position),
            BrowseCommand::Resize(size) => view.resize(size),
            BrowseCommand::Reload => view.request(),
            BrowseCommand::SwitchSignal(signal) => {
                let fresh = view.with_signal(signal);
                store.open_history(fresh);
                selected(store)?.request()
            }
        };
        let view = selected(store)?;
        view.load(fetcher, request);
        emit(&mut output, &render::history(view))?;
    }

    Ok(())
}

fn selected(store: &mut DashboardStore) -> Result<&mut HistoryView> {
    store.history_mut().ok_or(ScopeError::NoSelection)
}

fn emit<W: Write>(output: &mut W, text: &str) -> Result<()> {
    output
        .write_all(text.as_bytes())
        .and_then(|_| output.flush())
        .map_err(|err| ScopeError::Io {
            context: "writing browse output".to_string(),
            source: err,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::io::Cursor;
    use vitalscope_core::{ScopeConfig, ViewState};
    use vitalscope_protocol::{DateList, SessionList, WindowPayload, WindowQuery};

    const SESSION: &str = "20250114_093012";

    /// Serves `total` samples per signal; fails while `offline` is set.
    struct Archive {
        total: u64,
        offline: Cell<bool>,
    }

    impl WindowSource for Archive {
        fn fetch_window(&self, query: &WindowQuery) -> Result<WindowPayload> {
            if self.offline.get() {
                return Err(ScopeError::Transport {
                    context: "fetching window".to_string(),
                    details: "connection refused".to_string(),
                });
            }
            let (start, end) = match query.window_size {
                WindowSize::Full => (0, self.total),
                WindowSize::Samples(size) => {
                    let start = query.position.min(self.total.saturating_sub(1));
                    (start, (start + size).min(self.total))
                }
            };
            let x: Vec<u64> = (start..end).collect();
            let y: Vec<f64> = x.iter().map(|i| *i as f64).collect();
            Ok(serde_json::from_value(serde_json::json!({
                "data": {"x": x, "y": [y]},
                "count": end - start,
                "window_start": start,
                "window_end": end,
                "total_count": self.total
            }))
            .unwrap())
        }

        fn list_dates(&self) -> Result<DateList> {
            Ok(DateList::default())
        }

        fn list_sessions(&self, _date: Option<&str>) -> Result<SessionList> {
            Ok(SessionList::default())
        }
    }

    fn archive(total: u64) -> Archive {
        Archive {
            total,
            offline: Cell::new(false),
        }
    }

    fn view(size: u64) -> HistoryView {
        HistoryView::new(SESSION, Signal::PrimaryEcg, None, WindowSize::Samples(size)).unwrap()
    }

    fn store_with(view: HistoryView) -> DashboardStore {
        let mut store = DashboardStore::new(&ScopeConfig::default());
        store.open_history(view);
        store
    }

    #[test]
    fn test_parses_commands() {
        assert_eq!(
            BrowseCommand::parse("next").unwrap(),
            Some(BrowseCommand::Navigate(Direction::Next))
        );
        assert_eq!(
            BrowseCommand::parse("  Seek 4200 ").unwrap(),
            Some(BrowseCommand::Seek(4_200))
        );
        assert_eq!(
            BrowseCommand::parse("size -1").unwrap(),
            Some(BrowseCommand::Resize(WindowSize::Full))
        );
        assert_eq!(
            BrowseCommand::parse("size 10").unwrap(),
            Some(BrowseCommand::Resize(WindowSize::Samples(100)))
        );
        assert_eq!(
            BrowseCommand::parse("signal temp").unwrap(),
            Some(BrowseCommand::SwitchSignal(Signal::Temperature))
        );
        assert_eq!(BrowseCommand::parse("   ").unwrap(), None);
    }

    #[test]
    fn test_rejects_bad_commands() {
        assert_eq!(
            BrowseCommand::parse("jump").unwrap_err(),
            CommandError::Unknown("jump".to_string())
        );
        assert_eq!(
            BrowseCommand::parse("seek").unwrap_err(),
            CommandError::MissingArgument { command: "seek" }
        );
        assert!(matches!(
            BrowseCommand::parse("seek -5").unwrap_err(),
            CommandError::InvalidArgument { .. }
        ));
        assert!(matches!(
            BrowseCommand::parse("signal eeg").unwrap_err(),
            CommandError::InvalidArgument { .. }
        ));
    }

    #[test]
    fn test_session_walks_through_commands() {
        let source = archive(5_000);
        let fetcher = SessionWindowFetcher::new(&source);
        let mut store = store_with(view(1_000));
        let mut output = Vec::new();
        let input = Cursor::new("next\nend\nprev\nbogus\nquit\nnext\n");

        run(&fetcher, &mut store, input, &mut output).unwrap();

        assert_eq!(store.history().unwrap().cursor().position(), 3_500);
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("[0..1000) of 5000"));
        assert!(text.contains("[4000..5000) of 5000"));
        assert!(text.contains("unknown command: bogus"));
    }

    #[test]
    fn test_failure_keeps_last_window() {
        let source = archive(5_000);
        let fetcher = SessionWindowFetcher::new(&source);
        let mut view = view(1_000);
        let request = view.request();
        view.load(&fetcher, request);
        let mut store = store_with(view);

        source.offline.set(true);
        let mut output = Vec::new();
        run(&fetcher, &mut store, Cursor::new("next\n"), &mut output).unwrap();

        let view = store.history().unwrap();
        assert!(matches!(view.state(), ViewState::Failed { .. }));
        assert_eq!(view.current().unwrap().window_start, 0);
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("connection refused"));
    }

    #[test]
    fn test_switching_signal_replaces_the_view() {
        let source = archive(5_000);
        let fetcher = SessionWindowFetcher::new(&source);
        let mut store = store_with(view(1_000));
        let mut output = Vec::new();
        run(
            &fetcher,
            &mut store,
            Cursor::new("end\nsignal TEMP\n"),
            &mut output,
        )
        .unwrap();

        let view = store.history().unwrap();
        assert_eq!(view.signal(), Signal::Temperature);
        assert_eq!(view.cursor().position(), 0);
        assert_eq!(view.current().unwrap().signal, Signal::Temperature);
    }

    #[test]
    fn test_nothing_selected_is_an_error() {
        let source = archive(5_000);
        let fetcher = SessionWindowFetcher::new(&source);
        let mut store = DashboardStore::new(&ScopeConfig::default());
        let err = run(&fetcher, &mut store, Cursor::new("next\n"), Vec::new()).unwrap_err();
        assert!(matches!(err, ScopeError::NoSelection));
    }
}
