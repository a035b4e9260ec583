use super::*;
use std::path::Path;
use std::time::Duration;

#[tokio::test]
async fn test_production_runner_success() {
    let runner = TokioProcessRunner;
    let command = ProcessCommandBuilder::new("echo")
        .arg("hello world")
        .build();

    let output = runner.run(command).await.unwrap();
    assert!(output.status.success());
    assert_eq!(output.stdout.trim(), "hello world");
    assert!(output.stderr.is_empty());
}

#[tokio::test]
async fn test_production_runner_failure() {
    let runner = TokioProcessRunner;
    let command = ProcessCommandBuilder::new("false").build();

    let output = runner.run(command).await.unwrap();
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));
}

#[tokio::test]
async fn test_production_runner_command_not_found() {
    let runner = TokioProcessRunner;
    let command = ProcessCommandBuilder::new("nonexistent-command-12345").build();

    let result = runner.run(command).await;
    assert!(matches!(result, Err(ProcessError::CommandNotFound(_))));
}

#[tokio::test]
async fn test_production_runner_timeout() {
    let runner = TokioProcessRunner;
    let command = ProcessCommandBuilder::new("sleep")
        .arg("5")
        .timeout(Duration::from_millis(100))
        .build();

    let result = runner.run(command).await;
    assert!(matches!(result, Err(ProcessError::Timeout(_))));
}

#[tokio::test]
async fn test_production_runner_env_and_dir() {
    let temp = tempfile::TempDir::new().unwrap();
    let runner = TokioProcessRunner;
    let command = ProcessCommandBuilder::new("sh")
        .args(["-c", "echo $GRM_PROBE; pwd"])
        .env("GRM_PROBE", "probe-value")
        .current_dir(temp.path())
        .build();

    let output = runner.run(command).await.unwrap();
    let mut lines = output.stdout.lines();
    assert_eq!(lines.next(), Some("probe-value"));
    let pwd = lines.next().unwrap();
    assert_eq!(
        Path::new(pwd).canonicalize().unwrap(),
        temp.path().canonicalize().unwrap()
    );
}

#[tokio::test]
async fn test_mock_runner_basic() {
    let mut mock = MockProcessRunner::new();

    mock.expect_command("git")
        .with_args(|args| args == ["remote", "get-url", "origin"])
        .returns_stdout("https://example.com/repo.git\n")
        .returns_success()
        .finish();

    let output = mock
        .run(
            ProcessCommandBuilder::new("git")
                .args(["remote", "get-url", "origin"])
                .build(),
        )
        .await
        .unwrap();

    assert!(output.status.success());
    assert_eq!(output.stdout, "https://example.com/repo.git\n");
    assert!(mock.verify_called("git", 1));
}

#[tokio::test]
async fn test_mock_runner_times_limit() {
    let mut mock = MockProcessRunner::new();

    mock.expect_command("sh").returns_success().times(2).finish();

    let command = ProcessCommandBuilder::new("sh").args(["-c", "true"]).build();
    assert!(mock.run(command.clone()).await.is_ok());
    assert!(mock.run(command.clone()).await.is_ok());

    let third = mock.run(command).await;
    assert!(matches!(third, Err(ProcessError::MockExpectationNotMet(_))));
}

#[tokio::test]
async fn test_mock_runner_unexpected_command() {
    let mock = MockProcessRunner::new();
    let result = mock.run(ProcessCommandBuilder::new("git").build()).await;
    assert!(matches!(result, Err(ProcessError::MockExpectationNotMet(_))));
    assert_eq!(mock.get_call_history().len(), 1);
}

#[tokio::test]
async fn test_mock_runner_side_effect_and_spawn_failure() {
    let temp = tempfile::TempDir::new().unwrap();
    let marker = temp.path().join("created");
    let mut mock = MockProcessRunner::new();

    let marker_clone = marker.clone();
    mock.expect_command("git")
        .with_side_effect(move |_| {
            std::fs::create_dir_all(&marker_clone).unwrap();
        })
        .finish();
    mock.expect_command("missing-tool").fails_to_spawn().finish();

    mock.run(ProcessCommandBuilder::new("git").build())
        .await
        .unwrap();
    assert!(marker.is_dir());

    let result = mock
        .run(ProcessCommandBuilder::new("missing-tool").build())
        .await;
    assert!(matches!(result, Err(ProcessError::CommandNotFound(_))));
}

#[tokio::test]
async fn test_subprocess_manager() {
    let (manager, mut mock) = SubprocessManager::mock();

    mock.expect_command("ls")
        .returns_stdout("file1.txt\nfile2.txt\n")
        .returns_success()
        .finish();

    let output = manager
        .runner()
        .run(ProcessCommandBuilder::new("ls").build())
        .await
        .unwrap();

    assert!(output.status.success());
    assert_eq!(output.stdout, "file1.txt\nfile2.txt\n");
}

#[tokio::test]
async fn test_git_clone_command_shape() {
    let (manager, mut mock) = SubprocessManager::mock();

    mock.expect_command("git")
        .with_args(|args| args.first().map(String::as_str) == Some("clone"))
        .returns_success()
        .finish();

    manager
        .git()
        .clone_repo("https://host/lib.git", Path::new("out/lib"), Some(1))
        .await
        .unwrap();

    let history = mock.get_call_history();
    assert_eq!(history.len(), 1);
    assert_eq!(
        history[0].args,
        vec![
            "clone",
            "--recurse-submodules",
            "--depth",
            "1",
            "--",
            "https://host/lib.git",
            "out/lib"
        ]
    );
    assert_eq!(
        history[0].env.get("GIT_TERMINAL_PROMPT").map(String::as_str),
        Some("0")
    );
}

#[tokio::test]
async fn test_git_clone_failure_keeps_stderr() {
    let (manager, mut mock) = SubprocessManager::mock();

    mock.expect_command("git")
        .returns_exit_code(128)
        .returns_stderr("fatal: repository not found\n")
        .finish();

    let err = manager
        .git()
        .clone_repo("https://host/missing.git", Path::new("missing"), None)
        .await
        .unwrap_err();

    assert!(matches!(err, ProcessError::Failed { code: 128, .. }));
    assert!(err.to_string().contains("repository not found"));
}

#[tokio::test]
async fn test_git_remote_helpers() {
    let (manager, mut mock) = SubprocessManager::mock();

    mock.expect_command("git")
        .with_args(|args| args == ["remote", "get-url", "origin"])
        .returns_exit_code(2)
        .finish();
    mock.expect_command("git")
        .with_args(|args| args == ["remote", "remove", "origin"])
        .returns_success()
        .finish();

    let git = manager.git();
    let repo = Path::new("repo");
    assert!(!git.has_remote(repo, "origin").await.unwrap());
    git.remove_remote(repo, "origin").await.unwrap();

    let history = mock.get_call_history();
    assert_eq!(history[1].working_dir.as_deref(), Some(repo));
}

#[test]
fn test_process_command_builder() {
    let cmd = ProcessCommandBuilder::new("sh")
        .args(["-c", "make setup"])
        .env("KEY", "value")
        .current_dir(Path::new("/tmp"))
        .timeout(Duration::from_secs(30))
        .build();

    assert_eq!(cmd.program, "sh");
    assert_eq!(cmd.args, vec!["-c", "make setup"]);
    assert_eq!(cmd.env.get("KEY"), Some(&"value".to_string()));
    assert_eq!(cmd.working_dir, Some(Path::new("/tmp").to_path_buf()));
    assert_eq!(cmd.timeout, Some(Duration::from_secs(30)));
}
