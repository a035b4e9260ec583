use crate::error::{ErrorCode, GrmError, Result};
use crate::subprocess::{ProcessCommandBuilder, ProcessError, ProcessRunner};
use std::path::Path;

pub const TARGET_PLACEHOLDER: &str = "{target}";

/// Expand `{target}` in a hook template
pub fn render_command(template: &str, target: &Path) -> String {
    template.replace(TARGET_PLACEHOLDER, &target.to_string_lossy())
}

#[cfg(unix)]
fn shell() -> ProcessCommandBuilder {
    ProcessCommandBuilder::new("sh").arg("-c")
}

#[cfg(windows)]
fn shell() -> ProcessCommandBuilder {
    ProcessCommandBuilder::new("cmd").arg("/C")
}

/// Run a post-clone hook through the shell inside `target`
pub async fn run_hook(runner: &dyn ProcessRunner, template: &str, target: &Path) -> Result<()> {
    let command = render_command(template, target);
    tracing::info!("Running post-clone hook in {}: {}", target.display(), command);

    let output = runner
        .run(shell().arg(&command).current_dir(target).build())
        .await
        .map_err(|e| spawn_error(&command, e))?;

    if output.status.success() {
        tracing::debug!("Post-clone hook succeeded in {}", target.display());
        return Ok(());
    }

    let code = output.status.code();
    let stderr = output.stderr.trim();
    let message = match (code, stderr.is_empty()) {
        (Some(code), true) => format!("`{command}` exited with code {code}"),
        (Some(code), false) => format!("`{command}` exited with code {code}: {stderr}"),
        (None, _) => format!("`{command}` terminated abnormally ({:?})", output.status),
    };
    Err(GrmError::hook(
        ErrorCode::HOOK_NON_ZERO_EXIT,
        message,
        command,
        code,
    ))
}

fn spawn_error(command: &str, e: ProcessError) -> GrmError {
    GrmError::hook(
        ErrorCode::HOOK_SPAWN_FAILED,
        format!("could not run `{command}`: {e}"),
        command,
        None,
    )
}
