//! Thread-safe aggregate of task outcomes.

use super::outcome::CloneOutcome;
use crate::error::Stage;
use crate::manifest::RepositoryTask;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A failure entry; entries are appended in the order outcomes arrive
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureEntry {
    pub url: String,
    pub target: PathBuf,
    pub stage: Stage,
    pub detail: String,
}

#[derive(Debug, Default)]
struct Tally {
    cloned: usize,
    skipped: usize,
    failed: usize,
    removed: usize,
    failures: Vec<FailureEntry>,
}

/// Counts and failures across concurrent workers.
///
/// Every write goes through [`SummaryReport::record_outcome`] under one lock,
/// so `total_processed() == cloned() + skipped() + failed()` holds at every
/// observation point.
#[derive(Debug, Default)]
pub struct SummaryReport {
    tally: Mutex<Tally>,
}

/// Serializable copy of a report, used for `--json` output
#[derive(Debug, Clone, Serialize)]
pub struct ReportSnapshot {
    pub generated_at: DateTime<Utc>,
    pub total_processed: usize,
    pub cloned: usize,
    pub skipped: usize,
    pub failed: usize,
    pub removed_entries: usize,
    pub failures: Vec<FailureEntry>,
}

impl SummaryReport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tally> {
        self.tally.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count one outcome and append its failure entries
    pub fn record_outcome(&self, task: &RepositoryTask, outcome: &CloneOutcome) {
        let mut tally = self.lock();
        match outcome {
            CloneOutcome::Cloned {
                removed,
                cleanup_error,
                ..
            } => {
                tally.cloned += 1;
                tally.removed += removed;
                if let Some(detail) = cleanup_error {
                    tally.failures.push(entry(task, Stage::Cleanup, detail));
                }
            }
            CloneOutcome::Skipped(_) => tally.skipped += 1,
            CloneOutcome::Failed { stage, detail } => {
                tally.failed += 1;
                tally.failures.push(entry(task, *stage, detail));
            }
        }
    }

    pub fn cloned(&self) -> usize {
        self.lock().cloned
    }

    pub fn skipped(&self) -> usize {
        self.lock().skipped
    }

    pub fn failed(&self) -> usize {
        self.lock().failed
    }

    pub fn total_processed(&self) -> usize {
        let tally = self.lock();
        tally.cloned + tally.skipped + tally.failed
    }

    /// Entries removed by post-clone cleanup across all tasks
    pub fn removed_entries(&self) -> usize {
        self.lock().removed
    }

    pub fn failures(&self) -> Vec<FailureEntry> {
        self.lock().failures.clone()
    }

    pub fn has_failures(&self) -> bool {
        !self.lock().failures.is_empty()
    }

    pub fn snapshot(&self) -> ReportSnapshot {
        let tally = self.lock();
        ReportSnapshot {
            generated_at: Utc::now(),
            total_processed: tally.cloned + tally.skipped + tally.failed,
            cloned: tally.cloned,
            skipped: tally.skipped,
            failed: tally.failed,
            removed_entries: tally.removed,
            failures: tally.failures.clone(),
        }
    }

    /// Human-readable summary: counts, then failures in arrival order
    pub fn render(&self) -> String {
        self.snapshot().render()
    }
}

impl ReportSnapshot {
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Summary Report");
        let _ = writeln!(out, "  Processed:       {}", self.total_processed);
        let _ = writeln!(out, "  Cloned:          {}", self.cloned);
        let _ = writeln!(out, "  Skipped:         {}", self.skipped);
        let _ = writeln!(out, "  Failed:          {}", self.failed);
        let _ = writeln!(out, "  Entries removed: {}", self.removed_entries);

        if self.failures.is_empty() {
            let _ = writeln!(out, "No errors.");
        } else {
            let _ = writeln!(out, "Errors:");
            for failure in &self.failures {
                let _ = writeln!(
                    out,
                    "  - [{}] {} -> {}: {}",
                    failure.stage,
                    failure.url,
                    failure.target.display(),
                    failure.detail
                );
            }
        }
        out
    }
}

fn entry(task: &RepositoryTask, stage: Stage, detail: &str) -> FailureEntry {
    FailureEntry {
        url: task.url().to_string(),
        target: task.target().to_path_buf(),
        stage,
        detail: detail.to_string(),
    }
}
