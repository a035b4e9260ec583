//! Bounded-parallel clone orchestration.
//!
//! [`CloneOrchestrator::run`] takes the tasks from a manifest and drives each
//! active one through clone, cleanup and post-clone hook on a fixed pool of
//! workers, recording exactly one [`CloneOutcome`] per task in a shared
//! [`SummaryReport`]. A failing task never stops the batch.

pub mod detach;
pub mod hook;
pub mod outcome;
pub mod report;

#[cfg(test)]
mod tests;

pub use outcome::{CloneOutcome, SkipReason};
pub use report::{FailureEntry, ReportSnapshot, SummaryReport};

use crate::cleanup::{CleanReport, DirectoryCleaner};
use crate::config::Configuration;
use crate::error::{ErrorCode, GrmError, Result, Stage};
use crate::manifest::RepositoryTask;
use crate::subprocess::{GitRunner, GitRunnerImpl, ProcessError, ProcessRunner, SubprocessManager};
use futures::future::join_all;
use futures::FutureExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;

pub const DUPLICATE_TARGET: &str = "duplicate target directory";

pub struct CloneOrchestrator {
    subprocess: SubprocessManager,
    config: Arc<Configuration>,
    show_progress: bool,
}

impl CloneOrchestrator {
    pub fn new(subprocess: SubprocessManager, config: Arc<Configuration>) -> Self {
        Self {
            subprocess,
            config,
            show_progress: false,
        }
    }

    /// Draw a progress bar on stderr while workers run
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Process every task and wait for all workers to report.
    ///
    /// Only configuration problems are returned as errors; they are detected
    /// before any task starts.
    pub async fn run(&self, tasks: Vec<RepositoryTask>) -> Result<Arc<SummaryReport>> {
        self.config.validate()?;

        let report = Arc::new(SummaryReport::new());
        let dispatch = self.triage(tasks, &report);

        tracing::info!(
            "Dispatching {} repositories to {} workers{}",
            dispatch.len(),
            self.config.max_workers,
            if self.config.dry_run { " (dry run)" } else { "" }
        );

        let progress = create_progress_bar(dispatch.len(), self.show_progress);
        progress.set_message("Cloning repositories");

        let semaphore = Arc::new(Semaphore::new(self.config.max_workers));
        let mut pending = Vec::with_capacity(dispatch.len());

        for task in dispatch {
            let task = Arc::new(task);
            let worker = Worker {
                git: self.git(),
                runner: self.subprocess.runner(),
                config: Arc::clone(&self.config),
            };
            let semaphore = Arc::clone(&semaphore);
            let report = Arc::clone(&report);
            let progress = progress.clone();
            let worker_task = Arc::clone(&task);

            let handle = tokio::spawn(async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => AssertUnwindSafe(worker.process(&worker_task))
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|payload| panicked(&worker_task, payload)),
                    Err(e) => CloneOutcome::failed(Stage::Clone, format!("worker pool closed: {e}")),
                };

                log_outcome(&worker_task, &outcome);
                report.record_outcome(&worker_task, &outcome);
                progress.inc(1);
            });
            pending.push((task, handle));
        }

        let (tasks, handles): (Vec<_>, Vec<_>) = pending.into_iter().unzip();
        let results = join_all(handles).await;

        for (task, result) in tasks.iter().zip(results) {
            if let Err(e) = result {
                // The worker never reached record_outcome
                tracing::error!("Worker for {} did not complete: {}", task.url(), e);
                let outcome = CloneOutcome::from(&GrmError::clone_failed(
                    ErrorCode::CLONE_WORKER_PANICKED,
                    format!("worker did not complete: {e}"),
                ));
                report.record_outcome(task, &outcome);
            }
        }

        progress.finish_with_message(format!(
            "Done: {} cloned, {} skipped, {} failed",
            report.cloned(),
            report.skipped(),
            report.failed()
        ));

        tracing::info!(
            "Batch complete: {} processed, {} cloned, {} skipped, {} failed",
            report.total_processed(),
            report.cloned(),
            report.skipped(),
            report.failed()
        );

        Ok(report)
    }

    fn git(&self) -> GitRunnerImpl {
        let git = self.subprocess.git();
        match self.config.clone_timeout() {
            Some(timeout) => git.with_timeout(timeout),
            None => git,
        }
    }

    /// Record inactive and colliding-target tasks; return the rest in order.
    ///
    /// A target collides with a claimed one when either contains the other.
    fn triage(&self, tasks: Vec<RepositoryTask>, report: &SummaryReport) -> Vec<RepositoryTask> {
        let mut claimed: Vec<PathBuf> = Vec::new();
        let mut dispatch = Vec::new();

        for task in tasks {
            if !task.is_active() {
                tracing::info!("Skipping inactive repository {}", task.url());
                report.record_outcome(&task, &CloneOutcome::Skipped(SkipReason::Inactive));
                continue;
            }

            let target = task.target();
            if let Some(owner) = claimed
                .iter()
                .find(|c| c.starts_with(target) || target.starts_with(c))
            {
                tracing::warn!(
                    "Line {}: target {} overlaps claimed {}, not cloning {}",
                    task.line(),
                    target.display(),
                    owner.display(),
                    task.url()
                );
                let err = GrmError::clone_failed(ErrorCode::CLONE_DUPLICATE_TARGET, DUPLICATE_TARGET);
                report.record_outcome(&task, &CloneOutcome::from(&err));
                continue;
            }

            claimed.push(target.to_path_buf());
            dispatch.push(task);
        }

        dispatch
    }
}

/// Everything one task needs, owned so it can move into a spawned future
struct Worker {
    git: GitRunnerImpl,
    runner: Arc<dyn ProcessRunner>,
    config: Arc<Configuration>,
}

impl Worker {
    async fn process(&self, task: &RepositoryTask) -> CloneOutcome {
        if self.config.dry_run {
            tracing::info!(
                "[DRY RUN] Would clone {} into {} (depth {})",
                task.url(),
                task.target().display(),
                task.depth()
                    .map_or_else(|| "full".to_string(), |d| d.to_string())
            );
            return CloneOutcome::Skipped(SkipReason::DryRun);
        }

        if let Err(e) = self.clone_repo(task).await {
            return CloneOutcome::from(&e);
        }

        if self.config.detach_clones {
            detach::detach(&self.git, task.target()).await;
        }

        let (removed, cleanup_error) = match self.cleanup(task).await {
            Ok(Some(report)) if report.has_errors() => {
                (report.removed, Some(report.error_summary()))
            }
            Ok(Some(report)) => (report.removed, None),
            Ok(None) => (0, None),
            Err(e) => (0, Some(e.detail())),
        };

        if let Some(error) = &cleanup_error {
            tracing::warn!(
                "Cleanup of {} failed, skipping post-clone hook: {}",
                task.target().display(),
                error
            );
        } else if let Some(template) = task
            .post_clone_command()
            .or(self.config.post_clone_command.as_deref())
        {
            if let Err(e) = hook::run_hook(self.runner.as_ref(), template, task.target()).await {
                return CloneOutcome::from(&e);
            }
        }

        CloneOutcome::Cloned {
            target: task.target().to_path_buf(),
            removed,
            cleanup_error,
        }
    }

    async fn clone_repo(&self, task: &RepositoryTask) -> Result<()> {
        tracing::info!("Cloning {} into {}", task.url(), task.target().display());

        self.git
            .clone_repo(task.url(), task.target(), task.depth())
            .await
            .map_err(|e| {
                let detail = match &e {
                    ProcessError::Failed { stderr, code, .. } if !stderr.is_empty() => {
                        format!("git exited with code {code}: {stderr}")
                    }
                    other => other.to_string(),
                };
                GrmError::clone_failed(ErrorCode::CLONE_COMMAND_FAILED, detail).with_source(e)
            })
    }

    /// Apply retention patterns to a fresh clone; `None` if the target is gone
    async fn cleanup(&self, task: &RepositoryTask) -> Result<Option<CleanReport>> {
        if !task.target().exists() {
            tracing::warn!(
                "Target {} missing after clone, skipping cleanup",
                task.target().display()
            );
            return Ok(None);
        }

        let patterns = task.effective_patterns(&self.config.default_patterns);
        let cleaner = DirectoryCleaner::from_patterns(patterns, false)?;
        let target = task.target().to_path_buf();

        let report = tokio::task::spawn_blocking(move || cleaner.clean(&target))
            .await
            .map_err(|e| {
                GrmError::cleanup(
                    ErrorCode::CLEANUP_GENERIC,
                    format!("cleanup worker failed: {e}"),
                    Some(task.target().to_path_buf()),
                )
            })??;

        tracing::info!(
            "Cleaned {}: kept {}, removed {}",
            task.target().display(),
            report.kept,
            report.removed
        );
        Ok(Some(report))
    }
}

fn panicked(task: &RepositoryTask, payload: Box<dyn Any + Send>) -> CloneOutcome {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    tracing::error!("Worker for {} panicked: {}", task.url(), message);

    CloneOutcome::from(&GrmError::clone_failed(
        ErrorCode::CLONE_WORKER_PANICKED,
        format!("worker panicked: {message}"),
    ))
}

fn log_outcome(task: &RepositoryTask, outcome: &CloneOutcome) {
    if outcome.is_failure() {
        tracing::error!("{}: {}", task.url(), outcome);
    } else {
        tracing::info!("{}: {}", task.url(), outcome);
    }
}

fn create_progress_bar(total: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
    {
        pb.set_style(style.progress_chars("█▓▒░ "));
    }
    pb
}
