//! Bottom-up removal of entries that are not on the retention allow-list.

use super::patterns::PatternSet;
use crate::error::{ErrorCode, GrmError, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// One entry that could not be removed or read
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanFailure {
    pub path: PathBuf,
    pub code: u16,
    pub reason: String,
}

impl CleanFailure {
    fn from_error(path: &Path, err: &GrmError) -> Self {
        let reason = match err {
            GrmError::Filesystem { source, .. } => source.to_string(),
            other => other.detail(),
        };
        Self {
            path: path.to_path_buf(),
            code: err.code(),
            reason,
        }
    }
}

/// Result of a single cleaning pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanReport {
    pub root: PathBuf,
    pub dry_run: bool,
    /// Entries left in place (matching names and non-empty directories)
    pub kept: usize,
    /// Entries removed, or that would be removed in dry-run mode
    pub removed: usize,
    /// Every entry selected for deletion, in walk order
    pub candidates: Vec<PathBuf>,
    pub errors: Vec<CleanFailure>,
}

impl CleanReport {
    pub fn errored(&self) -> usize {
        self.errors.len()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// One-line description of the errored entries
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| format!("{} ({})", e.path.display(), e.reason))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Removes every file or emptied directory under a root whose base name
/// does not match the retention patterns.
#[derive(Debug, Clone)]
pub struct DirectoryCleaner {
    patterns: PatternSet,
    dry_run: bool,
}

impl DirectoryCleaner {
    pub fn new(patterns: PatternSet, dry_run: bool) -> Self {
        Self { patterns, dry_run }
    }

    /// Build a cleaner from raw glob strings
    pub fn from_patterns(patterns: &[String], dry_run: bool) -> Result<Self> {
        let patterns = PatternSet::new(patterns).map_err(|e| {
            GrmError::cleanup(
                ErrorCode::CLEANUP_GENERIC,
                format!("invalid retention pattern: {e}"),
                None,
            )
        })?;
        Ok(Self::new(patterns, dry_run))
    }

    pub fn clean(&self, root: &Path) -> Result<CleanReport> {
        let metadata = fs::metadata(root).map_err(|e| {
            GrmError::cleanup(
                ErrorCode::CLEANUP_MISSING_ROOT,
                format!("cannot clean {}: {}", root.display(), e),
                Some(root.to_path_buf()),
            )
        })?;
        if !metadata.is_dir() {
            return Err(GrmError::cleanup(
                ErrorCode::CLEANUP_MISSING_ROOT,
                format!("{} is not a directory", root.display()),
                Some(root.to_path_buf()),
            ));
        }

        let mut report = CleanReport {
            root: root.to_path_buf(),
            dry_run: self.dry_run,
            ..CleanReport::default()
        };
        // Directories that still hold at least one surviving entry.
        let mut occupied: HashSet<PathBuf> = HashSet::new();

        let walker = WalkDir::new(root)
            .min_depth(1)
            .follow_links(false)
            .contents_first(true);

        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().unwrap_or(root).to_path_buf();
                    warn!("Failed to read {}: {}", path.display(), err);
                    occupied.insert(path.clone());
                    mark_occupied(&mut occupied, root, &path);
                    report.errors.push(CleanFailure {
                        path,
                        code: ErrorCode::FS_WALK_FAILED,
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            let path = entry.path();
            let is_dir = entry.file_type().is_dir();

            if is_dir && occupied.contains(path) {
                report.kept += 1;
                mark_occupied(&mut occupied, root, path);
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            if self.patterns.matches(&name) {
                debug!("Matched: {}", path.display());
                report.kept += 1;
                mark_occupied(&mut occupied, root, path);
                continue;
            }

            report.candidates.push(path.to_path_buf());

            if self.dry_run {
                info!("[DRY RUN] Would delete: {}", path.display());
                report.removed += 1;
                continue;
            }

            match remove_entry(path, is_dir) {
                Ok(()) => {
                    info!(
                        "Deleted {}: {}",
                        if is_dir { "directory" } else { "file" },
                        path.display()
                    );
                    report.removed += 1;
                }
                Err(err) => {
                    warn!("Error deleting {}", err.detail());
                    report.errors.push(CleanFailure::from_error(path, &err));
                    mark_occupied(&mut occupied, root, path);
                }
            }
        }

        info!(
            "Cleaned {}: {} kept, {} {}, {} errors",
            root.display(),
            report.kept,
            report.removed,
            if self.dry_run { "would be removed" } else { "removed" },
            report.errored()
        );

        Ok(report)
    }
}

fn remove_entry(path: &Path, is_dir: bool) -> Result<()> {
    let removal = if is_dir {
        fs::remove_dir(path)
    } else {
        fs::remove_file(path)
    };
    removal.map_err(|e| GrmError::filesystem(ErrorCode::FS_REMOVE_FAILED, path, e))
}

/// Record that every ancestor of `path` below `root` keeps a child
fn mark_occupied(occupied: &mut HashSet<PathBuf>, root: &Path, path: &Path) {
    let mut current = path.parent();
    while let Some(dir) = current {
        if dir == root || !occupied.insert(dir.to_path_buf()) {
            break;
        }
        current = dir.parent();
    }
}

/// Clean `root` with raw glob patterns
pub fn clean(root: &Path, patterns: &[String], dry_run: bool) -> Result<CleanReport> {
    DirectoryCleaner::from_patterns(patterns, dry_run)?.clean(root)
}
