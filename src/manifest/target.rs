//! Lexical resolution of clone targets against the clone root.

use std::path::{Component, Path, PathBuf};

/// Repository name from a clone URL: last path segment without `.git`.
///
/// Handles scp-style remotes (`git@host:org/repo.git`) as well as URLs.
pub fn repo_name_from_url(url: &str) -> Option<String> {
    let trimmed = url.trim().trim_end_matches('/');
    let last = trimmed.rsplit(['/', ':']).next()?;
    let name = last.strip_suffix(".git").unwrap_or(last);
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name.to_string())
    }
}

/// Remove `.` and fold `..` without touching the filesystem. Leading `..`
/// components that cannot be folded are kept.
fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out.iter().collect()
}

/// Resolve `target` under `root`, or `None` if it would land on or outside
/// the root.
pub fn resolve_within(root: &Path, target: &Path) -> Option<PathBuf> {
    let joined = if target.is_absolute() {
        target.to_path_buf()
    } else {
        root.join(target)
    };
    let normalized_root = normalize(root);
    let normalized = normalize(&joined);

    let rest = normalized.strip_prefix(&normalized_root).ok()?;
    match rest.components().next() {
        Some(Component::Normal(_)) => Some(root.join(rest)),
        _ => None,
    }
}
