//! Turning a fresh clone into a plain source tree.
//!
//! Every step is best effort: problems are logged as warnings and never
//! change the task outcome.

use crate::subprocess::GitRunner;
use std::path::{Path, PathBuf};

const ORIGIN: &str = "origin";

/// Submodule paths declared in a `.gitmodules` file
pub fn submodule_paths(gitmodules: &str) -> Vec<PathBuf> {
    gitmodules
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            (key.trim() == "path" && !value.trim().is_empty()).then(|| PathBuf::from(value.trim()))
        })
        .collect()
}

pub async fn detach(git: &dyn GitRunner, target: &Path) {
    match git.has_remote(target, ORIGIN).await {
        Ok(true) => {
            if let Err(e) = git.remove_remote(target, ORIGIN).await {
                tracing::warn!("Failed to remove remote '{}' in {}: {}", ORIGIN, target.display(), e);
            } else {
                tracing::info!("Removed remote '{}' from {}", ORIGIN, target.display());
            }
        }
        Ok(false) => {
            tracing::debug!("No remote '{}' in {}", ORIGIN, target.display());
        }
        Err(e) => {
            tracing::warn!("Could not query remotes in {}: {}", target.display(), e);
        }
    }

    remove_git_entry(&target.join(".git")).await;

    let gitmodules = target.join(".gitmodules");
    let content = match tokio::fs::read_to_string(&gitmodules).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
        Err(e) => {
            tracing::warn!("Failed to read {}: {}", gitmodules.display(), e);
            return;
        }
    };

    for path in submodule_paths(&content) {
        match crate::manifest::target::resolve_within(target, &path) {
            Some(submodule) => remove_git_entry(&submodule.join(".git")).await,
            None => tracing::warn!(
                "Ignoring submodule path {} outside {}",
                path.display(),
                target.display()
            ),
        }
    }
}

/// Remove a `.git` directory or gitlink file if present
async fn remove_git_entry(path: &Path) {
    let metadata = match tokio::fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(_) => return,
    };

    let result = if metadata.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };

    match result {
        Ok(()) => tracing::debug!("Removed {}", path.display()),
        Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
    }
}
