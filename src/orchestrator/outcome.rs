use crate::error::{GrmError, Stage};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    Inactive,
    DryRun,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Inactive => f.write_str("inactive"),
            SkipReason::DryRun => f.write_str("dry-run"),
        }
    }
}

/// Final state of one repository task. Exactly one is recorded per task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloneOutcome {
    /// The clone succeeded. A cleanup problem does not undo it; it is carried
    /// here and listed separately in the report.
    Cloned {
        target: PathBuf,
        removed: usize,
        cleanup_error: Option<String>,
    },
    Skipped(SkipReason),
    Failed { stage: Stage, detail: String },
}

impl CloneOutcome {
    pub fn failed(stage: Stage, detail: impl Into<String>) -> Self {
        CloneOutcome::Failed {
            stage,
            detail: detail.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, CloneOutcome::Failed { .. })
    }
}

impl From<&GrmError> for CloneOutcome {
    fn from(err: &GrmError) -> Self {
        CloneOutcome::failed(err.stage().unwrap_or(Stage::Clone), err.detail())
    }
}

impl fmt::Display for CloneOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloneOutcome::Cloned {
                target,
                removed,
                cleanup_error: None,
            } => write!(f, "cloned to {} ({} removed)", target.display(), removed),
            CloneOutcome::Cloned {
                target,
                cleanup_error: Some(err),
                ..
            } => write!(f, "cloned to {} (cleanup failed: {})", target.display(), err),
            CloneOutcome::Skipped(reason) => write!(f, "skipped ({reason})"),
            CloneOutcome::Failed { stage, detail } => write!(f, "failed at {stage}: {detail}"),
        }
    }
}
