use super::*;
use crate::subprocess::{MockProcessRunner, ProcessCommand, ProcessOutput};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

const OK_URL: &str = "https://example.com/ok.git";
const BAD_URL: &str = "https://unreachable.invalid/missing.git";

fn config(workers: usize) -> Arc<Configuration> {
    Arc::new(Configuration {
        max_workers: workers,
        ..Configuration::default()
    })
}

/// Make `git clone <url>` succeed and populate the target like a checkout
fn expect_clone(mock: &mut MockProcessRunner, url: &'static str, files: &'static [&'static str]) {
    mock.expect_command("git")
        .with_args(move |args| args.first().map(String::as_str) == Some("clone") && args.iter().any(|a| a == url))
        .with_side_effect(move |command| {
            let target = PathBuf::from(command.args.last().unwrap());
            std::fs::create_dir_all(&target).unwrap();
            for file in files {
                let path = target.join(file);
                std::fs::create_dir_all(path.parent().unwrap()).unwrap();
                std::fs::write(path, "content").unwrap();
            }
        })
        .returns_success()
        .finish();
}

fn expect_clone_failure(mock: &mut MockProcessRunner, url: &'static str) {
    mock.expect_command("git")
        .with_args(move |args| args.iter().any(|a| a == url))
        .returns_exit_code(128)
        .returns_stderr("fatal: unable to access 'https://unreachable.invalid/': Could not resolve host\n")
        .finish();
}

fn clone_calls(mock: &MockProcessRunner) -> Vec<ProcessCommand> {
    mock.get_call_history()
        .into_iter()
        .filter(|c| c.program == "git" && c.args.first().map(String::as_str) == Some("clone"))
        .collect()
}

#[tokio::test]
async fn test_valid_unreachable_and_inactive() {
    let temp = TempDir::new().unwrap();
    let (manager, mut mock) = SubprocessManager::mock();
    expect_clone(&mut mock, OK_URL, &["README.txt"]);
    expect_clone_failure(&mut mock, BAD_URL);

    let tasks = vec![
        RepositoryTask::new(OK_URL, temp.path().join("ok")),
        RepositoryTask::new(BAD_URL, temp.path().join("missing")),
        RepositoryTask::new("https://example.com/off.git", temp.path().join("off")).with_active(false),
    ];

    let report = CloneOrchestrator::new(manager, config(2))
        .run(tasks)
        .await
        .unwrap();

    assert_eq!(report.skipped(), 1);
    assert_eq!(report.cloned(), 1);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.total_processed(), 3);

    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].stage, Stage::Clone);
    assert_eq!(failures[0].url, BAD_URL);
    assert!(failures[0].detail.contains("Could not resolve host"));

    assert!(temp.path().join("ok/README.txt").exists());
    assert_eq!(clone_calls(&mock).len(), 2);
}

#[tokio::test]
async fn test_clone_invocation_carries_depth() {
    let temp = TempDir::new().unwrap();
    let (manager, mut mock) = SubprocessManager::mock();
    expect_clone(&mut mock, OK_URL, &[]);

    let target = temp.path().join("shallow");
    let tasks = vec![RepositoryTask::new(OK_URL, &target).with_depth(Some(1))];
    CloneOrchestrator::new(manager, config(1))
        .run(tasks)
        .await
        .unwrap();

    let calls = clone_calls(&mock);
    assert_eq!(
        calls[0].args,
        vec![
            "clone".to_string(),
            "--recurse-submodules".to_string(),
            "--depth".to_string(),
            "1".to_string(),
            "--".to_string(),
            OK_URL.to_string(),
            target.to_string_lossy().into_owned(),
        ]
    );
}

#[tokio::test]
async fn test_duplicate_targets_never_both_clone() {
    let temp = TempDir::new().unwrap();
    let (manager, mut mock) = SubprocessManager::mock();
    expect_clone(&mut mock, OK_URL, &[]);
    expect_clone(&mut mock, "https://example.com/other.git", &[]);

    let target = temp.path().join("shared");
    let tasks = vec![
        RepositoryTask::new(OK_URL, &target),
        RepositoryTask::new("https://example.com/other.git", &target),
    ];

    let report = CloneOrchestrator::new(manager, config(4))
        .run(tasks)
        .await
        .unwrap();

    assert_eq!(report.cloned(), 1);
    assert_eq!(report.failed(), 1);
    let failures = report.failures();
    assert_eq!(failures[0].url, "https://example.com/other.git");
    assert_eq!(failures[0].detail, DUPLICATE_TARGET);
    assert_eq!(clone_calls(&mock).len(), 1);
}

#[tokio::test]
async fn test_nested_targets_are_treated_as_duplicates() {
    let temp = TempDir::new().unwrap();
    let (manager, mut mock) = SubprocessManager::mock();
    expect_clone(&mut mock, OK_URL, &[]);
    expect_clone(&mut mock, "https://example.com/inner.git", &[]);
    expect_clone(&mut mock, "https://example.com/outer.git", &[]);
    expect_clone(&mut mock, "https://example.com/sibling.git", &[]);

    let tasks = vec![
        RepositoryTask::new(OK_URL, temp.path().join("a")),
        RepositoryTask::new("https://example.com/inner.git", temp.path().join("a/sub")),
        RepositoryTask::new("https://example.com/outer.git", temp.path()),
        RepositoryTask::new("https://example.com/sibling.git", temp.path().join("ab")),
    ];

    let report = CloneOrchestrator::new(manager, config(2))
        .run(tasks)
        .await
        .unwrap();

    assert_eq!(report.cloned(), 2);
    assert_eq!(report.failed(), 2);
    let mut failed: Vec<_> = report.failures().into_iter().map(|f| f.url).collect();
    failed.sort();
    assert_eq!(
        failed,
        vec!["https://example.com/inner.git", "https://example.com/outer.git"]
    );
    assert!(report
        .failures()
        .iter()
        .all(|f| f.detail == DUPLICATE_TARGET));
    assert_eq!(clone_calls(&mock).len(), 2);
}

#[tokio::test]
async fn test_clone_timeout_is_applied_to_git() {
    let temp = TempDir::new().unwrap();
    let (manager, mut mock) = SubprocessManager::mock();
    expect_clone(&mut mock, OK_URL, &[]);

    let config = Arc::new(Configuration {
        clone_timeout_secs: Some(30),
        ..Configuration::default()
    });
    CloneOrchestrator::new(manager, config)
        .run(vec![RepositoryTask::new(OK_URL, temp.path().join("ok"))])
        .await
        .unwrap();

    let calls = clone_calls(&mock);
    assert_eq!(calls[0].timeout, Some(Duration::from_secs(30)));
}

#[tokio::test]
async fn test_worker_count_above_cap_is_fatal() {
    let (manager, mock) = SubprocessManager::mock();
    let err = CloneOrchestrator::new(manager, config(usize::MAX >> 2))
        .run(vec![RepositoryTask::new(OK_URL, "x")])
        .await
        .unwrap_err();

    assert!(err.is_fatal());
    assert_eq!(err.code(), ErrorCode::CONFIG_INVALID_VALUE);
    assert!(mock.get_call_history().is_empty());
}

#[tokio::test]
async fn test_inactive_task_does_not_claim_target() {
    let temp = TempDir::new().unwrap();
    let (manager, mut mock) = SubprocessManager::mock();
    expect_clone(&mut mock, OK_URL, &[]);

    let target = temp.path().join("shared");
    let tasks = vec![
        RepositoryTask::new("https://example.com/old.git", &target).with_active(false),
        RepositoryTask::new(OK_URL, &target),
    ];

    let report = CloneOrchestrator::new(manager, config(2))
        .run(tasks)
        .await
        .unwrap();
    assert_eq!(report.skipped(), 1);
    assert_eq!(report.cloned(), 1);
    assert_eq!(report.failed(), 0);
}

#[tokio::test]
async fn test_cleanup_keeps_only_matching_files() {
    let temp = TempDir::new().unwrap();
    let (manager, mut mock) = SubprocessManager::mock();
    expect_clone(&mut mock, OK_URL, &["a.py", "b.log", "notes.txt"]);

    let target = temp.path().join("repo");
    let tasks = vec![RepositoryTask::new(OK_URL, &target).with_patterns(vec!["*.py".to_string()])];

    let report = CloneOrchestrator::new(manager, config(1))
        .run(tasks)
        .await
        .unwrap();

    assert_eq!(report.cloned(), 1);
    assert_eq!(report.removed_entries(), 2);
    assert!(target.join("a.py").exists());
    assert!(!target.join("b.log").exists());
    assert!(!target.join("notes.txt").exists());
}

#[tokio::test]
async fn test_cleanup_uses_default_patterns_without_custom() {
    let temp = TempDir::new().unwrap();
    let (manager, mut mock) = SubprocessManager::mock();
    expect_clone(&mut mock, OK_URL, &["keep.txt", "drop.rs", "src/lib.rs"]);

    let target = temp.path().join("repo");
    let report = CloneOrchestrator::new(manager, config(1))
        .run(vec![RepositoryTask::new(OK_URL, &target)])
        .await
        .unwrap();

    assert_eq!(report.removed_entries(), 3);
    assert!(target.join("keep.txt").exists());
    assert!(!target.join("src").exists());
}

#[tokio::test]
async fn test_hook_runs_in_target_with_placeholder() {
    let temp = TempDir::new().unwrap();
    let (manager, mut mock) = SubprocessManager::mock();
    expect_clone(&mut mock, OK_URL, &[]);
    mock.expect_command("sh").returns_success().finish();

    let target = temp.path().join("repo");
    let config = Arc::new(Configuration {
        max_workers: 1,
        post_clone_command: Some("echo {target} > done".to_string()),
        ..Configuration::default()
    });

    let report = CloneOrchestrator::new(manager, config)
        .run(vec![RepositoryTask::new(OK_URL, &target)])
        .await
        .unwrap();
    assert_eq!(report.cloned(), 1);

    let hooks: Vec<_> = mock
        .get_call_history()
        .into_iter()
        .filter(|c| c.program == "sh")
        .collect();
    assert_eq!(hooks.len(), 1);
    assert_eq!(hooks[0].args[0], "-c");
    assert_eq!(hooks[0].args[1], format!("echo {} > done", target.display()));
    assert_eq!(hooks[0].working_dir.as_deref(), Some(target.as_path()));
}

#[tokio::test]
async fn test_task_hook_overrides_config_hook() {
    let temp = TempDir::new().unwrap();
    let (manager, mut mock) = SubprocessManager::mock();
    expect_clone(&mut mock, OK_URL, &[]);
    mock.expect_command("sh").returns_success().finish();

    let config = Arc::new(Configuration {
        post_clone_command: Some("make global".to_string()),
        ..Configuration::default()
    });
    let task = RepositoryTask::new(OK_URL, temp.path().join("repo"))
        .with_post_clone_command(Some("make local".to_string()));

    CloneOrchestrator::new(manager, config)
        .run(vec![task])
        .await
        .unwrap();

    let history = mock.get_call_history();
    let hook = history.iter().find(|c| c.program == "sh").unwrap();
    assert_eq!(hook.args[1], "make local");
}

#[tokio::test]
async fn test_hook_failure_keeps_clone() {
    let temp = TempDir::new().unwrap();
    let (manager, mut mock) = SubprocessManager::mock();
    expect_clone(&mut mock, OK_URL, &["setup.txt"]);
    mock.expect_command("sh")
        .returns_exit_code(3)
        .returns_stderr("setup failed")
        .finish();

    let target = temp.path().join("repo");
    let config = Arc::new(Configuration {
        post_clone_command: Some("./setup.sh".to_string()),
        ..Configuration::default()
    });

    let report = CloneOrchestrator::new(manager, config)
        .run(vec![RepositoryTask::new(OK_URL, &target)])
        .await
        .unwrap();

    assert_eq!(report.failed(), 1);
    assert_eq!(report.cloned(), 0);
    let failures = report.failures();
    assert_eq!(failures[0].stage, Stage::Hook);
    assert!(failures[0].detail.contains("code 3"));
    assert!(failures[0].detail.contains("setup failed"));
    assert!(target.join("setup.txt").exists());
}

#[tokio::test]
async fn test_hook_launch_failure() {
    let temp = TempDir::new().unwrap();
    let (manager, mut mock) = SubprocessManager::mock();
    expect_clone(&mut mock, OK_URL, &[]);
    mock.expect_command("sh").fails_to_spawn().finish();

    let config = Arc::new(Configuration {
        post_clone_command: Some("true".to_string()),
        ..Configuration::default()
    });
    let report = CloneOrchestrator::new(manager, config)
        .run(vec![RepositoryTask::new(OK_URL, temp.path().join("repo"))])
        .await
        .unwrap();

    assert_eq!(report.failed(), 1);
    assert_eq!(report.failures()[0].stage, Stage::Hook);
}

#[tokio::test]
async fn test_cleanup_error_counts_as_cloned_and_skips_hook() {
    let temp = TempDir::new().unwrap();
    let (manager, mut mock) = SubprocessManager::mock();
    // The "clone" leaves a plain file where the directory should be
    mock.expect_command("git")
        .with_side_effect(|command| {
            std::fs::write(command.args.last().unwrap(), "not a directory").unwrap();
        })
        .returns_success()
        .finish();
    mock.expect_command("sh").returns_success().finish();

    let config = Arc::new(Configuration {
        post_clone_command: Some("make".to_string()),
        ..Configuration::default()
    });
    let report = CloneOrchestrator::new(manager, config)
        .run(vec![RepositoryTask::new(OK_URL, temp.path().join("repo"))])
        .await
        .unwrap();

    assert_eq!(report.cloned(), 1);
    assert_eq!(report.failed(), 0);
    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].stage, Stage::Cleanup);
    assert!(mock.verify_called("sh", 0));
}

#[tokio::test]
async fn test_dry_run_makes_no_external_calls() {
    let temp = TempDir::new().unwrap();
    let (manager, mock) = SubprocessManager::mock();

    let config = Arc::new(Configuration {
        dry_run: true,
        post_clone_command: Some("make".to_string()),
        ..Configuration::default()
    });
    let tasks = vec![
        RepositoryTask::new(OK_URL, temp.path().join("a")),
        RepositoryTask::new(BAD_URL, temp.path().join("b")),
        RepositoryTask::new(OK_URL, temp.path().join("c")).with_active(false),
    ];

    let report = CloneOrchestrator::new(manager, config)
        .run(tasks)
        .await
        .unwrap();

    assert_eq!(report.skipped(), 3);
    assert_eq!(report.total_processed(), 3);
    assert!(mock.get_call_history().is_empty());
    assert!(!temp.path().join("a").exists());
}

#[tokio::test]
async fn test_detach_strips_git_metadata() {
    let temp = TempDir::new().unwrap();
    let (manager, mut mock) = SubprocessManager::mock();
    mock.expect_command("git")
        .with_args(|args| args.first().map(String::as_str) == Some("clone"))
        .with_side_effect(|command| {
            let target = PathBuf::from(command.args.last().unwrap());
            std::fs::create_dir_all(target.join(".git/objects")).unwrap();
            std::fs::create_dir_all(target.join("vendor/lib")).unwrap();
            std::fs::write(target.join("vendor/lib/.git"), "gitdir: ../../.git/modules/lib").unwrap();
            std::fs::write(
                target.join(".gitmodules"),
                "[submodule \"lib\"]\n\tpath = vendor/lib\n\turl = https://example.com/lib.git\n",
            )
            .unwrap();
            std::fs::write(target.join("vendor/lib/lib.txt"), "x").unwrap();
        })
        .finish();
    mock.expect_command("git")
        .with_args(|args| args == ["remote", "get-url", "origin"])
        .returns_stdout(OK_URL)
        .finish();
    mock.expect_command("git")
        .with_args(|args| args == ["remote", "remove", "origin"])
        .finish();

    let target = temp.path().join("repo");
    let config = Arc::new(Configuration {
        detach_clones: true,
        default_patterns: vec!["*.txt".to_string(), ".gitmodules".to_string()],
        ..Configuration::default()
    });

    let report = CloneOrchestrator::new(manager, config)
        .run(vec![RepositoryTask::new(OK_URL, &target)])
        .await
        .unwrap();

    assert_eq!(report.cloned(), 1);
    assert!(!target.join(".git").exists());
    assert!(!target.join("vendor/lib/.git").exists());
    assert!(target.join("vendor/lib/lib.txt").exists());
    assert!(mock.verify_called("git", 3));
}

#[tokio::test]
async fn test_invalid_config_is_fatal_before_any_work() {
    let (manager, mock) = SubprocessManager::mock();
    let err = CloneOrchestrator::new(manager, config(0))
        .run(vec![RepositoryTask::new(OK_URL, "x")])
        .await
        .unwrap_err();

    assert!(err.is_fatal());
    assert_eq!(err.code(), ErrorCode::CONFIG_INVALID_VALUE);
    assert!(mock.get_call_history().is_empty());
}

#[tokio::test]
async fn test_counts_hold_for_any_worker_count() {
    for workers in 1..=5 {
        let temp = TempDir::new().unwrap();
        let (manager, mut mock) = SubprocessManager::mock();
        expect_clone(&mut mock, OK_URL, &[]);
        expect_clone_failure(&mut mock, BAD_URL);

        let tasks: Vec<_> = (0..9)
            .map(|i| {
                let url = if i % 3 == 1 { BAD_URL } else { OK_URL };
                RepositoryTask::new(url, temp.path().join(format!("r{i}"))).with_active(i % 3 != 2)
            })
            .collect();

        let report = CloneOrchestrator::new(manager, config(workers))
            .run(tasks)
            .await
            .unwrap();

        assert_eq!(report.total_processed(), 9, "workers = {workers}");
        assert_eq!(report.cloned(), 3, "workers = {workers}");
        assert_eq!(report.failed(), 3, "workers = {workers}");
        assert_eq!(report.skipped(), 3, "workers = {workers}");
    }
}

/// Runner that records how many commands are in flight at once
#[derive(Default)]
struct ConcurrencyProbe {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl ProcessRunner for ConcurrencyProbe {
    async fn run(&self, command: ProcessCommand) -> std::result::Result<ProcessOutput, ProcessError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        if let Some(target) = command.args.last() {
            let _ = std::fs::create_dir_all(target);
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(ProcessOutput {
            status: crate::subprocess::ExitStatus::Success,
            stdout: String::new(),
            stderr: String::new(),
            duration: Duration::from_millis(20),
        })
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_worker_pool_is_bounded() {
    let temp = TempDir::new().unwrap();
    let probe = Arc::new(ConcurrencyProbe::default());
    let manager = SubprocessManager::new(Arc::clone(&probe) as Arc<dyn ProcessRunner>);

    let tasks: Vec<_> = (0..10)
        .map(|i| RepositoryTask::new(format!("https://example.com/r{i}.git"), temp.path().join(format!("r{i}"))))
        .collect();

    let report = CloneOrchestrator::new(manager, config(3))
        .run(tasks)
        .await
        .unwrap();

    assert_eq!(report.cloned(), 10);
    let peak = probe.peak.load(Ordering::SeqCst);
    assert!(peak <= 3, "peak concurrency {peak} exceeded the pool");
    assert!(peak >= 2, "expected parallel clones, peak was {peak}");
}

struct PanickingRunner;

#[async_trait]
impl ProcessRunner for PanickingRunner {
    async fn run(&self, command: ProcessCommand) -> std::result::Result<ProcessOutput, ProcessError> {
        if command.args.iter().any(|a| a.contains("explode")) {
            panic!("runner exploded");
        }
        if let Some(target) = command.args.last() {
            let _ = std::fs::create_dir_all(target);
        }
        Ok(ProcessOutput {
            status: crate::subprocess::ExitStatus::Success,
            stdout: String::new(),
            stderr: String::new(),
            duration: Duration::ZERO,
        })
    }
}

#[tokio::test]
async fn test_panicking_worker_is_recorded() {
    let temp = TempDir::new().unwrap();
    let manager = SubprocessManager::new(Arc::new(PanickingRunner));

    let tasks = vec![
        RepositoryTask::new("https://example.com/explode.git", temp.path().join("boom")),
        RepositoryTask::new(OK_URL, temp.path().join("fine")),
    ];

    let report = CloneOrchestrator::new(manager, config(2))
        .run(tasks)
        .await
        .unwrap();

    assert_eq!(report.total_processed(), 2);
    assert_eq!(report.cloned(), 1);
    assert_eq!(report.failed(), 1);
    let failures = report.failures();
    assert!(failures[0].detail.contains("runner exploded"));
    assert!(Path::new(&temp.path().join("fine")).exists());
}
