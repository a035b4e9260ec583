use std::path::PathBuf;
use thiserror::Error;

pub mod codes;

pub use codes::ErrorCode;

/// Processing stage of a single repository task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Clone,
    Cleanup,
    Hook,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Clone => "clone",
            Stage::Cleanup => "cleanup",
            Stage::Hook => "hook",
        };
        f.write_str(name)
    }
}

/// The unified error type for grm
///
/// `Config` and unreadable-input `Input` errors are fatal for a run. `Clone`,
/// `Cleanup` and `Hook` errors belong to a single task and are converted into
/// a failed outcome at the task boundary. `Filesystem` errors describe one
/// entry inside a cleanup pass.
#[derive(Error, Debug)]
pub enum GrmError {
    #[error("[E{code:04}] Configuration error: {message}")]
    Config {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Input error{}: {message}", .line.map(|l| format!(" at line {l}")).unwrap_or_default())]
    Input {
        code: u16,
        message: String,
        line: Option<u64>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Clone failed: {message}")]
    Clone {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Cleanup failed: {message}")]
    Cleanup {
        code: u16,
        message: String,
        path: Option<PathBuf>,
    },

    #[error("[E{code:04}] Post-clone hook failed: {message}")]
    Hook {
        code: u16,
        message: String,
        command: String,
        exit_code: Option<i32>,
    },

    #[error("[E{code:04}] {}: {source}", .path.display())]
    Filesystem {
        code: u16,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GrmError {
    /// Create a configuration error with default code
    pub fn config(message: impl Into<String>) -> Self {
        Self::config_with_code(ErrorCode::CONFIG_GENERIC, message)
    }

    /// Create a configuration error with specific code
    pub fn config_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Config {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create an input error tied to an optional CSV line
    pub fn input(code: u16, message: impl Into<String>, line: Option<u64>) -> Self {
        Self::Input {
            code,
            message: message.into(),
            line,
            source: None,
        }
    }

    pub fn clone_failed(code: u16, message: impl Into<String>) -> Self {
        Self::Clone {
            code,
            message: message.into(),
            source: None,
        }
    }

    pub fn cleanup(code: u16, message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::Cleanup {
            code,
            message: message.into(),
            path,
        }
    }

    pub fn hook(
        code: u16,
        message: impl Into<String>,
        command: impl Into<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::Hook {
            code,
            message: message.into(),
            command: command.into(),
            exit_code,
        }
    }

    pub fn filesystem(code: u16, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            code,
            path: path.into(),
            source,
        }
    }

    /// Attach a source error (no-op for variants without a boxed source)
    pub fn with_source(mut self, err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        match &mut self {
            Self::Config { source, .. } | Self::Input { source, .. } | Self::Clone { source, .. } => {
                *source = Some(err.into());
            }
            Self::Cleanup { .. } | Self::Hook { .. } | Self::Filesystem { .. } => {}
        }
        self
    }

    pub fn code(&self) -> u16 {
        match self {
            Self::Config { code, .. }
            | Self::Input { code, .. }
            | Self::Clone { code, .. }
            | Self::Cleanup { code, .. }
            | Self::Hook { code, .. }
            | Self::Filesystem { code, .. } => *code,
        }
    }

    /// The task stage an error belongs to, if it is a per-task error
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Clone { .. } => Some(Stage::Clone),
            Self::Cleanup { .. } | Self::Filesystem { .. } => Some(Stage::Cleanup),
            Self::Hook { .. } => Some(Stage::Hook),
            Self::Config { .. } | Self::Input { .. } => None,
        }
    }

    /// Whether this error aborts the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config { .. })
            || matches!(self, Self::Input { code, .. } if *code != ErrorCode::INPUT_MALFORMED_RECORD
                && *code != ErrorCode::INPUT_INVALID_FIELD
                && *code != ErrorCode::INPUT_TARGET_ESCAPES_ROOT)
    }

    /// Message without the code prefix, used in report entries
    pub fn detail(&self) -> String {
        match self {
            Self::Config { message, .. }
            | Self::Input { message, .. }
            | Self::Clone { message, .. }
            | Self::Cleanup { message, .. }
            | Self::Hook { message, .. } => message.clone(),
            Self::Filesystem { path, source, .. } => format!("{}: {}", path.display(), source),
        }
    }
}

pub type Result<T> = std::result::Result<T, GrmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_code() {
        let err = GrmError::config_with_code(ErrorCode::CONFIG_INVALID_VALUE, "max_workers must be >= 1");
        assert_eq!(
            err.to_string(),
            "[E1002] Configuration error: max_workers must be >= 1"
        );
        assert_eq!(err.code(), ErrorCode::CONFIG_INVALID_VALUE);
    }

    #[test]
    fn test_input_error_display_with_line() {
        let err = GrmError::input(ErrorCode::INPUT_INVALID_FIELD, "depth is not a number", Some(3));
        assert_eq!(
            err.to_string(),
            "[E2004] Input error at line 3: depth is not a number"
        );

        let err = GrmError::input(ErrorCode::INPUT_UNREADABLE, "missing.csv", None);
        assert_eq!(err.to_string(), "[E2001] Input error: missing.csv");
    }

    #[test]
    fn test_stage_mapping() {
        assert_eq!(
            GrmError::clone_failed(ErrorCode::CLONE_COMMAND_FAILED, "x").stage(),
            Some(Stage::Clone)
        );
        assert_eq!(
            GrmError::cleanup(ErrorCode::CLEANUP_PARTIAL, "x", None).stage(),
            Some(Stage::Cleanup)
        );
        assert_eq!(
            GrmError::hook(ErrorCode::HOOK_NON_ZERO_EXIT, "x", "make", Some(2)).stage(),
            Some(Stage::Hook)
        );
        assert_eq!(GrmError::config("x").stage(), None);
    }

    #[test]
    fn test_fatal_classification() {
        assert!(GrmError::config("bad").is_fatal());
        assert!(GrmError::input(ErrorCode::INPUT_UNREADABLE, "gone", None).is_fatal());
        assert!(!GrmError::input(ErrorCode::INPUT_MALFORMED_RECORD, "row", Some(2)).is_fatal());
        assert!(!GrmError::clone_failed(ErrorCode::CLONE_COMMAND_FAILED, "x").is_fatal());
    }

    #[test]
    fn test_with_source_is_preserved() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "nope");
        let err = GrmError::config("could not read").with_source(io);
        assert!(std::error::Error::source(&err).is_some());
    }
}
