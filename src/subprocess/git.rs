use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::builder::ProcessCommandBuilder;
use super::error::ProcessError;
use super::runner::{ProcessOutput, ProcessRunner};

/// Keeps git from blocking on a credential prompt inside a worker
const NO_TERMINAL_PROMPT: (&str, &str) = ("GIT_TERMINAL_PROMPT", "0");

#[async_trait]
pub trait GitRunner: Send + Sync {
    /// Clone `url` into `target`, recursing into submodules.
    async fn clone_repo(
        &self,
        url: &str,
        target: &Path,
        depth: Option<u32>,
    ) -> Result<(), ProcessError>;
    async fn has_remote(&self, repo: &Path, name: &str) -> Result<bool, ProcessError>;
    async fn remove_remote(&self, repo: &Path, name: &str) -> Result<(), ProcessError>;
}

pub struct GitRunnerImpl {
    runner: Arc<dyn ProcessRunner>,
    timeout: Option<Duration>,
}

/// Argument vector for `git clone`; `--` keeps a URL starting with a dash
/// from being read as an option
pub fn clone_args(url: &str, target: &Path, depth: Option<u32>) -> Vec<String> {
    let mut args = vec!["clone".to_string(), "--recurse-submodules".to_string()];
    if let Some(depth) = depth {
        args.push("--depth".to_string());
        args.push(depth.to_string());
    }
    args.push("--".to_string());
    args.push(url.to_string());
    args.push(target.to_string_lossy().into_owned());
    args
}

/// Translate a finished git invocation into a Result, keeping stderr for
/// the failure detail
#[inline]
fn check_command_success(output: &ProcessOutput, command: &str) -> Result<(), ProcessError> {
    if output.status.success() {
        return Ok(());
    }
    match output.status.code() {
        Some(code) => Err(ProcessError::Failed {
            command: command.to_string(),
            code,
            stderr: output.stderr.trim().to_string(),
        }),
        None => match output.status {
            super::runner::ExitStatus::Signal(signal) => Err(ProcessError::Signal(signal)),
            _ => Err(ProcessError::ExitCode(1)),
        },
    }
}

impl GitRunnerImpl {
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            runner,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn builder(&self) -> ProcessCommandBuilder {
        let builder =
            ProcessCommandBuilder::new("git").env(NO_TERMINAL_PROMPT.0, NO_TERMINAL_PROMPT.1);
        match self.timeout {
            Some(timeout) => builder.timeout(timeout),
            None => builder,
        }
    }
}

#[async_trait]
impl GitRunner for GitRunnerImpl {
    async fn clone_repo(
        &self,
        url: &str,
        target: &Path,
        depth: Option<u32>,
    ) -> Result<(), ProcessError> {
        let command = self.builder().args(clone_args(url, target, depth)).build();
        let display = command.display();
        let output = self.runner.run(command).await?;

        check_command_success(&output, &display)
    }

    async fn has_remote(&self, repo: &Path, name: &str) -> Result<bool, ProcessError> {
        let output = self
            .runner
            .run(
                self.builder()
                    .args(["remote", "get-url", name])
                    .current_dir(repo)
                    .build(),
            )
            .await?;

        Ok(output.status.success())
    }

    async fn remove_remote(&self, repo: &Path, name: &str) -> Result<(), ProcessError> {
        let command = self
            .builder()
            .args(["remote", "remove", name])
            .current_dir(repo)
            .build();
        let display = command.display();
        let output = self.runner.run(command).await?;

        check_command_success(&output, &display)
    }
}
