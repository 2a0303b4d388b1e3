//! Application settings and paths.
//!
//! Settings are optional defaults for the scan flags, read from a JSON file in
//! the XDG config directory or from an explicit `--config` path.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Application directory paths following the XDG Base Directory layout.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/netscout)
    pub config_dir: PathBuf,
}

impl Paths {
    /// Resolve the platform directories. Nothing is created on disk.
    pub fn resolve() -> ConfigResult<Self> {
        let project =
            ProjectDirs::from("io", "netscout", "netscout").ok_or(ConfigError::DirectoryNotFound)?;

        Ok(Self {
            config_dir: project.config_dir().to_path_buf(),
        })
    }

    /// Get the path to the settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }
}

/// Defaults for scan options not given on the command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Default port specification.
    pub ports: String,
    /// Default number of workers.
    pub workers: usize,
    /// Default connect timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum probes per second, 0 for unlimited.
    pub rate_limit: u32,
    /// Default output format.
    pub output_format: String,
    /// Seconds between progress reports in verbose mode.
    pub progress_interval_secs: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            ports: "80,443".to_string(),
            workers: 100,
            timeout_ms: 2000,
            rate_limit: 0,
            output_format: "text".to_string(),
            progress_interval_secs: 5,
        }
    }
}

impl AppSettings {
    /// Load settings from `path`, or from the default location.
    ///
    /// An explicit path must exist. A missing default file, or a platform
    /// without a config directory, yields the built-in defaults.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        if let Some(path) = path {
            return Self::load_from(path);
        }

        let file = match Paths::resolve() {
            Ok(paths) => paths.settings_file(),
            Err(_) => return Ok(Self::default()),
        };
        if !file.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&file)
    }

    /// Load settings from a specific file.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        serde_json::from_str(&content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))
    }
}
