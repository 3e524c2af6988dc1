//! Storage path management for vitalscope client data.
//!
//! Production code uses `StorageConfig::from_home()`, which points to
//! `~/.vitalscope/`. Tests use `StorageConfig::with_root(temp_dir)`.

use std::path::{Path, PathBuf};

use crate::error::{Result, ScopeError};

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root directory for all client data (default: ~/.vitalscope)
    root: PathBuf,
}

impl StorageConfig {
    /// Resolves the default root under the home directory.
    pub fn from_home() -> Result<Self> {
        let home = dirs::home_dir().ok_or(ScopeError::HomeDirNotFound)?;
        Ok(Self {
            root: home.join(".vitalscope"),
        })
    }

    /// Creates a StorageConfig with a custom root directory.
    /// Used for testing with temp directories.
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to config.json (client preferences).
    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.json")
    }

    /// Directory for rolling client log files.
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }
}
