//! Run configuration for grm.
//!
//! A `Configuration` is loaded once per run from a JSON document (see
//! [`loader`]) and then shared read-only. Every key is optional; a missing
//! key takes its default and a missing file yields [`Configuration::default`].
//!
//! ```json
//! {
//!   "default_csv_file": "repositories.csv",
//!   "clean_directory": ".",
//!   "default_patterns": ["*.txt", "*.log", "*~"],
//!   "log_level": "info",
//!   "max_workers": 4
//! }
//! ```

use crate::cleanup::patterns;
use crate::error::{ErrorCode, GrmError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub mod loader;


pub use loader::{load_config, DEFAULT_CONFIG_FILE};

/// Valid log levels for configuration validation.
pub const VALID_LOG_LEVELS: &[&str] = &["debug", "info", "warn", "error"];

/// Upper bound for `max_workers`
pub const MAX_WORKERS: usize = 1024;

/// Verbosity of the log file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!(
                "invalid log_level '{}', expected one of: {}",
                other,
                VALID_LOG_LEVELS.join(", ")
            )),
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, String> {
        value.parse()
    }
}

impl From<LogLevel> for String {
    fn from(level: LogLevel) -> Self {
        level.as_str().to_string()
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Configuration for a single grm run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// CSV manifest used when no path is given.
    #[serde(default = "default_csv_file")]
    pub default_csv_file: PathBuf,

    /// Directory cleaned when no path is given.
    #[serde(default = "default_clean_directory")]
    pub clean_directory: PathBuf,

    /// Root that every clone target is resolved against and must stay within.
    #[serde(default = "default_clone_root")]
    pub clone_root: PathBuf,

    /// Retention patterns used when a task has no custom patterns.
    #[serde(default = "default_patterns")]
    pub default_patterns: Vec<String>,

    #[serde(default)]
    pub log_level: LogLevel,

    /// Append-only log file.
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    /// Number of repositories processed concurrently.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Report intended actions without touching the filesystem or running commands.
    #[serde(default)]
    pub dry_run: bool,

    /// Shell command run inside each fresh clone; `{target}` expands to its path.
    #[serde(default, alias = "post_cloning_command")]
    pub post_clone_command: Option<String>,

    /// Abort a `git clone` that runs longer than this many seconds.
    #[serde(default)]
    pub clone_timeout_secs: Option<u64>,

    /// Remove the `origin` remote and strip `.git` metadata after cloning.
    #[serde(default)]
    pub detach_clones: bool,
}

fn default_csv_file() -> PathBuf {
    PathBuf::from("repositories.csv")
}

fn default_clean_directory() -> PathBuf {
    PathBuf::from(".")
}

fn default_clone_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_patterns() -> Vec<String> {
    vec!["*.txt".to_string(), "*.log".to_string(), "*~".to_string()]
}

fn default_log_file() -> PathBuf {
    PathBuf::from("git_repo_manager.log")
}

fn default_max_workers() -> usize {
    4
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            default_csv_file: default_csv_file(),
            clean_directory: default_clean_directory(),
            clone_root: default_clone_root(),
            default_patterns: default_patterns(),
            log_level: LogLevel::default(),
            log_file: default_log_file(),
            max_workers: default_max_workers(),
            dry_run: false,
            post_clone_command: None,
            clone_timeout_secs: None,
            detach_clones: false,
        }
    }
}

impl Configuration {
    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.max_workers < 1 {
            return Err(GrmError::config_with_code(
                ErrorCode::CONFIG_INVALID_VALUE,
                format!("max_workers must be at least 1, got {}", self.max_workers),
            ));
        }
        if self.max_workers > MAX_WORKERS {
            return Err(GrmError::config_with_code(
                ErrorCode::CONFIG_INVALID_VALUE,
                format!(
                    "max_workers must be at most {}, got {}",
                    MAX_WORKERS, self.max_workers
                ),
            ));
        }
        if self.clone_timeout_secs == Some(0) {
            return Err(GrmError::config_with_code(
                ErrorCode::CONFIG_INVALID_VALUE,
                "clone_timeout_secs must be at least 1",
            ));
        }

        patterns::validate(&self.default_patterns).map_err(|(pattern, e)| {
            GrmError::config_with_code(
                ErrorCode::CONFIG_INVALID_PATTERN,
                format!("default_patterns contains invalid glob '{pattern}': {e}"),
            )
        })?;

        if let Some(command) = &self.post_clone_command {
            if command.trim().is_empty() {
                return Err(GrmError::config_with_code(
                    ErrorCode::CONFIG_INVALID_VALUE,
                    "post_clone_command must not be empty",
                ));
            }
        }

        Ok(())
    }

    pub fn clone_timeout(&self) -> Option<Duration> {
        self.clone_timeout_secs.map(Duration::from_secs)
    }

    /// Apply command-line overrides on top of the file values.
    pub fn with_overrides(mut self, dry_run: bool, max_workers: Option<usize>) -> Self {
        if dry_run {
            self.dry_run = true;
        }
        if let Some(workers) = max_workers {
            self.max_workers = workers;
        }
        self
    }
}
