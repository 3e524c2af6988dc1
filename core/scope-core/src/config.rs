//! Client configuration loading and saving.
//!
//! The config file is optional. A missing file yields defaults; a corrupt one
//! is reported by [`load_config_from`] and downgraded to defaults (with a
//! warning) by [`load_config`].

use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tempfile::NamedTempFile;

use crate::error::{Result, ScopeError};
use crate::storage::StorageConfig;

pub const SERVER_ENV: &str = "VITALSCOPE_SERVER";
pub const PUSH_ADDR_ENV: &str = "VITALSCOPE_PUSH_ADDR";
const MAX_TEMPERATURE_INTERVAL_SECS: u64 = 86_400;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    /// Base URL of the monitor server.
    pub server_url: String,
    /// `host:port` of the newline-JSON push channel.
    pub push_addr: Option<String>,
    pub poll_interval_secs: u64,
    pub request_timeout_ms: u64,
    pub notification_capacity: usize,
    pub temperature_capacity: usize,
    /// Nominal spacing of live temperature readings.
    pub temperature_interval_secs: u64,
    /// Live status readings arrive in hundredths of a degree.
    pub live_temperature_divisor: f64,
    /// `None` keeps every log line.
    pub log_capacity: Option<usize>,
    pub default_window_size: u64,
    pub toast_ttl_secs: u64,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5001".to_string(),
            push_addr: None,
            poll_interval_secs: 5,
            request_timeout_ms: 5_000,
            notification_capacity: 10,
            temperature_capacity: 1_200,
            temperature_interval_secs: 120,
            live_temperature_divisor: 100.0,
            log_capacity: Some(1_000),
            default_window_size: vitalscope_protocol::DEFAULT_WINDOW_SIZE,
            toast_ttl_secs: 5,
        }
    }
}

impl ScopeConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(1))
    }

    pub fn toast_ttl(&self) -> Duration {
        Duration::from_secs(self.toast_ttl_secs)
    }

    /// At most one day between readings.
    pub fn temperature_interval(&self) -> chrono::Duration {
        let secs = self.temperature_interval_secs.clamp(1, MAX_TEMPERATURE_INTERVAL_SECS);
        chrono::Duration::seconds(secs as i64)
    }

    /// Applies `VITALSCOPE_SERVER` / `VITALSCOPE_PUSH_ADDR` when set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(server) = non_empty_env(SERVER_ENV) {
            self.server_url = server;
        }
        if let Some(addr) = non_empty_env(PUSH_ADDR_ENV) {
            self.push_addr = Some(addr);
        }
        self
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Reads a config file. Missing file → defaults.
pub fn load_config_from(path: &Path) -> Result<ScopeConfig> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(ScopeConfig::default())
        }
        Err(err) => {
            return Err(ScopeError::Io {
                context: format!("reading {}", path.display()),
                source: err,
            })
        }
    };

    if content.trim().is_empty() {
        return Ok(ScopeConfig::default());
    }

    serde_json::from_str(&content).map_err(|err| ScopeError::ConfigMalformed {
        path: path.to_path_buf(),
        details: err.to_string(),
    })
}

/// Loads the config with env overrides, falling back to defaults on error.
pub fn load_config(storage: &StorageConfig) -> ScopeConfig {
    let path = storage.config_file();
    let config = match load_config_from(&path) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(error = %err, "Failed to load config; using defaults");
            ScopeConfig::default()
        }
    };
    config.with_env_overrides()
}

/// Writes the config atomically (temp file + rename).
pub fn save_config(storage: &StorageConfig, config: &ScopeConfig) -> Result<()> {
    let path = storage.config_file();
    let write_failed = |details: String| ScopeError::ConfigWriteFailed {
        path: path.clone(),
        details,
    };

    fs::create_dir_all(storage.root()).map_err(|e| write_failed(e.to_string()))?;
    let content = serde_json::to_string_pretty(config).map_err(|e| ScopeError::Json {
        context: "serializing config".to_string(),
        source: e,
    })?;

    let mut temp_file =
        NamedTempFile::new_in(storage.root()).map_err(|e| write_failed(e.to_string()))?;
    temp_file
        .write_all(content.as_bytes())
        .map_err(|e| write_failed(e.to_string()))?;
    temp_file.flush().map_err(|e| write_failed(e.to_string()))?;
    temp_file
        .persist(&path)
        .map_err(|e| write_failed(e.error.to_string()))?;
    Ok(())
}
