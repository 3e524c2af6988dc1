//! vitalscope: operator client for the physiological monitor server.
//!
//! Browses recorded sessions through a sliding window and follows live
//! acquisition (status, anomalies, logs) from the terminal.
//!
//! ## Subcommands
//!
//! - `dates`, `sessions`: list what the server has recorded
//! - `window`: fetch and print one window
//! - `browse`: step through a dataset interactively (commands on stdin)
//! - `watch`: live dashboard fed by the status poll and the push channel
//! - `control`: start, stop or reset acquisition
//! - `logs`: recent server log lines
//! - `anomalies`: the server's per-day anomaly archive

mod browse;
mod client;
mod commands;
mod logging;
mod push;
mod render;
mod runtime;

use clap::{Parser, Subcommand};
use vitalscope_core::{load_config, ScopeConfig, StorageConfig, DEFAULT_LOG_LIMIT};

#[derive(Parser)]
#[command(name = "vitalscope")]
#[command(about = "Physiological monitor client")]
#[command(version)]
struct Cli {
    /// Server base URL (overrides config and VITALSCOPE_SERVER)
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List dates that have recorded sessions
    Dates,

    /// List sessions, optionally for one date
    Sessions {
        /// Date as YYYYMMDD
        #[arg(long)]
        date: Option<String>,
    },

    /// Fetch and print one window of a recorded signal
    Window {
        /// Session id (YYYYMMDD_HHMMSS)
        #[arg(value_name = "SESSION")]
        session_id: String,

        /// ECG, ADC or TEMP
        #[arg(value_name = "SIGNAL")]
        signal: String,

        /// First sample index
        #[arg(long, default_value_t = 0)]
        position: u64,

        /// Samples per window (100-50000), or -1 for the whole dataset
        #[arg(long, allow_hyphen_values = true)]
        size: Option<i64>,
    },

    /// Step through a recorded signal (reads commands from stdin)
    Browse {
        /// Session id (YYYYMMDD_HHMMSS)
        #[arg(value_name = "SESSION")]
        session_id: String,

        /// ECG, ADC or TEMP
        #[arg(value_name = "SIGNAL")]
        signal: String,

        /// Samples per window (100-50000), or -1 for the whole dataset
        #[arg(long, allow_hyphen_values = true)]
        size: Option<i64>,
    },

    /// Follow live status, anomalies and logs
    Watch {
        /// Push channel address (host:port)
        #[arg(long)]
        push_addr: Option<String>,
    },

    /// Send an acquisition control command
    Control {
        /// start, stop or reset
        #[arg(value_name = "COMMAND")]
        command: String,
    },

    /// Browse logged anomalies: dates, one day, one record, or a summary
    Anomalies {
        /// Date as YYYYMMDD
        #[arg(long)]
        date: Option<String>,

        /// ecg, piezo or temp
        #[arg(long)]
        source: Option<String>,

        /// Record index as listed for the day (needs --date and --source)
        #[arg(long)]
        index: Option<usize>,

        /// Per-day counts for every logged day
        #[arg(long)]
        summary: bool,
    },

    /// Show recent server log lines
    Logs {
        #[arg(long)]
        category: Option<String>,

        /// DEBUG, INFO, WARNING or ERROR
        #[arg(long)]
        level: Option<String>,

        #[arg(long, default_value_t = DEFAULT_LOG_LIMIT)]
        limit: usize,
    },
}

fn main() {
    let _logging_guard = logging::init();
    let cli = Cli::parse();
    let config = resolve_config(cli.server);

    let result = match cli.command {
        Commands::Dates => commands::dates(&config),
        Commands::Sessions { date } => commands::sessions(&config, date.as_deref()),
        Commands::Window {
            session_id,
            signal,
            position,
            size,
        } => commands::window(&config, &session_id, &signal, position, size),
        Commands::Browse {
            session_id,
            signal,
            size,
        } => commands::browse(&config, &session_id, &signal, size),
        Commands::Watch { push_addr } => commands::watch(&config, push_addr),
        Commands::Control { command } => commands::control(&config, &command),
        Commands::Logs {
            category,
            level,
            limit,
        } => commands::logs(&config, category, level.as_deref(), limit),
        Commands::Anomalies {
            date,
            source,
            index,
            summary,
        } => commands::AnomalyQuery::from_args(date, source.as_deref(), index, summary)
            .and_then(|query| commands::anomalies(&config, query)),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "vitalscope command failed");
        eprintln!("vitalscope: {}", e);
        std::process::exit(1);
    }
}

fn resolve_config(server: Option<String>) -> ScopeConfig {
    let mut config = match StorageConfig::from_home() {
        Ok(storage) => load_config(&storage),
        Err(e) => {
            tracing::warn!(error = %e, "No home directory; using default config");
            ScopeConfig::default().with_env_overrides()
        }
    };
    if let Some(server) = server {
        config.server_url = server;
    }
    config
}
