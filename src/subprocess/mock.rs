use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::error::ProcessError;
use super::runner::{ExitStatus, ProcessCommand, ProcessOutput, ProcessRunner};

type ArgsMatcher = Box<dyn Fn(&[String]) -> bool + Send + Sync>;
type SideEffect = Box<dyn Fn(&ProcessCommand) + Send + Sync>;

/// Scripted `ProcessRunner` for tests.
///
/// Expectations are checked in registration order; the first one whose
/// program and argument matcher accept a command answers it.
#[derive(Clone)]
pub struct MockProcessRunner {
    expectations: Arc<Mutex<Vec<MockExpectation>>>,
    call_history: Arc<Mutex<Vec<ProcessCommand>>>,
}

struct MockExpectation {
    program: String,
    args_matcher: Option<ArgsMatcher>,
    side_effect: Option<SideEffect>,
    response: ProcessOutput,
    spawn_error: bool,
    delay: Option<Duration>,
    times_called: usize,
    expected_times: Option<usize>,
}

pub struct MockCommandConfig {
    runner: MockProcessRunner,
    expectation: MockExpectation,
}

impl MockProcessRunner {
    pub fn new() -> Self {
        Self {
            expectations: Arc::new(Mutex::new(Vec::new())),
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn expect_command(&mut self, program: &str) -> MockCommandConfig {
        MockCommandConfig {
            runner: self.clone(),
            expectation: MockExpectation {
                program: program.to_string(),
                args_matcher: None,
                side_effect: None,
                response: ProcessOutput {
                    status: ExitStatus::Success,
                    stdout: String::new(),
                    stderr: String::new(),
                    duration: Duration::from_millis(10),
                },
                spawn_error: false,
                delay: None,
                times_called: 0,
                expected_times: None,
            },
        }
    }

    pub fn verify_called(&self, program: &str, times: usize) -> bool {
        let history = self.call_history.lock().unwrap_or_else(PoisonError::into_inner);
        let count = history.iter().filter(|cmd| cmd.program == program).count();
        count == times
    }

    pub fn get_call_history(&self) -> Vec<ProcessCommand> {
        self.call_history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn reset(&mut self) {
        self.expectations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.call_history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[async_trait]
impl ProcessRunner for MockProcessRunner {
    async fn run(&self, command: ProcessCommand) -> Result<ProcessOutput, ProcessError> {
        self.call_history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command.clone());

        let (result, delay) = {
            let mut expectations = self
                .expectations
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            answer(&mut expectations, &command)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        result
    }
}

fn answer(
    expectations: &mut [MockExpectation],
    command: &ProcessCommand,
) -> (Result<ProcessOutput, ProcessError>, Option<Duration>) {
    for expectation in expectations.iter_mut() {
        if expectation.program != command.program {
            continue;
        }

        if let Some(ref args_matcher) = expectation.args_matcher {
            if !(args_matcher)(&command.args) {
                continue;
            }
        }

        expectation.times_called += 1;

        if let Some(expected) = expectation.expected_times {
            if expectation.times_called > expected {
                return (
                    Err(ProcessError::MockExpectationNotMet(format!(
                        "Command '{}' called {} times, expected {}",
                        command.program, expectation.times_called, expected
                    ))),
                    None,
                );
            }
        }

        if expectation.spawn_error {
            return (
                Err(ProcessError::CommandNotFound(command.program.clone())),
                expectation.delay,
            );
        }

        if let Some(ref effect) = expectation.side_effect {
            effect(command);
        }

        return (Ok(expectation.response.clone()), expectation.delay);
    }

    (
        Err(ProcessError::MockExpectationNotMet(format!(
            "No expectation found for command: {} {:?}",
            command.program, command.args
        ))),
        None,
    )
}

impl MockCommandConfig {
    pub fn with_args<F>(mut self, matcher: F) -> Self
    where
        F: Fn(&[String]) -> bool + Send + Sync + 'static,
    {
        self.expectation.args_matcher = Some(Box::new(matcher));
        self
    }

    /// Run `effect` whenever this expectation answers, e.g. to create the
    /// directory a real `git clone` would have produced
    pub fn with_side_effect<F>(mut self, effect: F) -> Self
    where
        F: Fn(&ProcessCommand) + Send + Sync + 'static,
    {
        self.expectation.side_effect = Some(Box::new(effect));
        self
    }

    pub fn returns_stdout(mut self, stdout: &str) -> Self {
        self.expectation.response.stdout = stdout.to_string();
        self
    }

    pub fn returns_stderr(mut self, stderr: &str) -> Self {
        self.expectation.response.stderr = stderr.to_string();
        self
    }

    pub fn returns_exit_code(mut self, code: i32) -> Self {
        self.expectation.response.status = if code == 0 {
            ExitStatus::Success
        } else {
            ExitStatus::Error(code)
        };
        self
    }

    pub fn returns_success(mut self) -> Self {
        self.expectation.response.status = ExitStatus::Success;
        self
    }

    /// Simulate a program that cannot be launched
    pub fn fails_to_spawn(mut self) -> Self {
        self.expectation.spawn_error = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.expectation.delay = Some(delay);
        self
    }

    pub fn times(mut self, n: usize) -> Self {
        self.expectation.expected_times = Some(n);
        self
    }

    pub fn finish(self) {
        self.runner
            .expectations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(self.expectation);
    }
}

impl Default for MockProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}
