//! Repository manifest: the pipe-delimited CSV listing clone targets.
//!
//! ```text
//! repo_url|target_directory|is_active|depth|custom_patterns|post_clone_command
//! https://github.com/org/tool.git|tools/tool|true|1|*.rs,Cargo.toml|
//! ```
//!
//! The first three columns are required in the header; the rest are
//! optional. A row that fails validation is skipped with a warning and kept
//! in [`TaskManifest::rejected`].

use crate::cleanup::patterns;
use crate::error::{ErrorCode, GrmError, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

pub mod target;


pub const REQUIRED_COLUMNS: &[&str] = &["repo_url", "target_directory", "is_active"];

/// One repository to clone, validated and resolved against the clone root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryTask {
    url: String,
    target: PathBuf,
    is_active: bool,
    depth: Option<u32>,
    custom_patterns: Vec<String>,
    post_clone_command: Option<String>,
    line: u64,
}

impl RepositoryTask {
    /// Active task with full history, no custom patterns and no hook
    pub fn new(url: impl Into<String>, target: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            target: target.into(),
            is_active: true,
            depth: None,
            custom_patterns: Vec::new(),
            post_clone_command: None,
            line: 0,
        }
    }

    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    pub fn with_depth(mut self, depth: Option<u32>) -> Self {
        self.depth = depth.filter(|d| *d > 0);
        self
    }

    pub fn with_patterns(mut self, patterns: Vec<String>) -> Self {
        self.custom_patterns = patterns;
        self
    }

    pub fn with_post_clone_command(mut self, command: Option<String>) -> Self {
        self.post_clone_command = command;
        self
    }

    pub fn with_line(mut self, line: u64) -> Self {
        self.line = line;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Clone depth; `None` means full history
    pub fn depth(&self) -> Option<u32> {
        self.depth
    }

    pub fn custom_patterns(&self) -> &[String] {
        &self.custom_patterns
    }

    pub fn post_clone_command(&self) -> Option<&str> {
        self.post_clone_command.as_deref()
    }

    /// Source line in the manifest, 0 for tasks built in code
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Retention patterns for this task, falling back to `defaults`
    pub fn effective_patterns<'a>(&'a self, defaults: &'a [String]) -> &'a [String] {
        if self.custom_patterns.is_empty() {
            defaults
        } else {
            &self.custom_patterns
        }
    }
}

/// Result of loading a manifest
#[derive(Debug, Default)]
pub struct TaskManifest {
    pub tasks: Vec<RepositoryTask>,
    /// Rows skipped during validation, in file order
    pub rejected: Vec<GrmError>,
}

impl TaskManifest {
    pub fn active_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.is_active()).count()
    }
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    repo_url: Option<String>,
    #[serde(default)]
    target_directory: Option<String>,
    #[serde(default)]
    is_active: Option<String>,
    #[serde(default)]
    depth: Option<String>,
    #[serde(default)]
    custom_patterns: Option<String>,
    #[serde(default)]
    post_clone_command: Option<String>,
}

/// Load and validate the manifest at `path`
pub fn load_manifest(path: &Path, clone_root: &Path) -> Result<TaskManifest> {
    let file = File::open(path).map_err(|e| {
        GrmError::input(
            ErrorCode::INPUT_UNREADABLE,
            format!("cannot read CSV file {}: {}", path.display(), e),
            None,
        )
        .with_source(e)
    })?;

    tracing::info!("Loading repositories from {}", path.display());
    parse_manifest(file, clone_root)
}

/// Parse manifest content from any reader
pub fn parse_manifest<R: Read>(reader: R, clone_root: &Path) -> Result<TaskManifest> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'|')
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| {
            GrmError::input(
                ErrorCode::INPUT_UNREADABLE,
                format!("cannot read CSV header: {e}"),
                Some(1),
            )
            .with_source(e)
        })?
        .clone();

    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == *column) {
            return Err(GrmError::input(
                ErrorCode::INPUT_MISSING_COLUMN,
                format!(
                    "CSV header is missing required column '{}' (found: {})",
                    column,
                    headers.iter().collect::<Vec<_>>().join("|")
                ),
                Some(1),
            ));
        }
    }

    let mut manifest = TaskManifest::default();

    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                let line = e.position().map(|p| p.line());
                reject(
                    &mut manifest,
                    GrmError::input(
                        ErrorCode::INPUT_MALFORMED_RECORD,
                        format!("unreadable record: {e}"),
                        line,
                    ),
                );
                continue;
            }
        };

        let line = record.position().map(|p| p.line()).unwrap_or_default();
        if record.iter().all(str::is_empty) {
            continue;
        }

        let parsed = record
            .deserialize::<RawRecord>(Some(&headers))
            .map_err(|e| {
                GrmError::input(
                    ErrorCode::INPUT_MALFORMED_RECORD,
                    format!("malformed record: {e}"),
                    Some(line),
                )
            })
            .and_then(|raw| validate_record(raw, line, clone_root));

        match parsed {
            Ok(task) => manifest.tasks.push(task),
            Err(e) => reject(&mut manifest, e),
        }
    }

    if manifest.tasks.is_empty() && !manifest.rejected.is_empty() {
        return Err(GrmError::input(
            ErrorCode::INPUT_NO_VALID_RECORDS,
            format!(
                "no valid repository rows ({} rejected)",
                manifest.rejected.len()
            ),
            None,
        ));
    }

    tracing::info!(
        "Loaded {} repositories ({} active, {} rejected)",
        manifest.tasks.len(),
        manifest.active_count(),
        manifest.rejected.len()
    );

    Ok(manifest)
}

fn reject(manifest: &mut TaskManifest, error: GrmError) {
    tracing::warn!("Skipping CSV row: {}", error);
    manifest.rejected.push(error);
}

fn validate_record(raw: RawRecord, line: u64, clone_root: &Path) -> Result<RepositoryTask> {
    let url = raw.repo_url.unwrap_or_default();
    if url.is_empty() {
        return Err(GrmError::input(
            ErrorCode::INPUT_INVALID_FIELD,
            "repo_url is empty",
            Some(line),
        ));
    }

    let is_active = parse_active(raw.is_active.as_deref().unwrap_or_default(), line);
    let depth = parse_depth(raw.depth.as_deref().unwrap_or_default(), line)?;
    let custom_patterns = parse_patterns(raw.custom_patterns.as_deref().unwrap_or_default(), line)?;

    let requested = match raw.target_directory.filter(|t| !t.is_empty()) {
        Some(target) => target,
        None => target::repo_name_from_url(&url).ok_or_else(|| {
            GrmError::input(
                ErrorCode::INPUT_INVALID_FIELD,
                format!("target_directory is empty and cannot be derived from '{url}'"),
                Some(line),
            )
        })?,
    };

    let target = target::resolve_within(clone_root, Path::new(&requested)).ok_or_else(|| {
        GrmError::input(
            ErrorCode::INPUT_TARGET_ESCAPES_ROOT,
            format!(
                "target_directory '{}' escapes clone root {}",
                requested,
                clone_root.display()
            ),
            Some(line),
        )
    })?;

    Ok(RepositoryTask::new(url, target)
        .with_active(is_active)
        .with_depth(depth)
        .with_patterns(custom_patterns)
        .with_post_clone_command(raw.post_clone_command.filter(|c| !c.is_empty()))
        .with_line(line))
}

fn parse_active(value: &str, line: u64) -> bool {
    match value.to_lowercase().as_str() {
        "true" => true,
        "false" => false,
        other => {
            tracing::warn!(
                "Line {}: is_active '{}' is not true/false, treating as inactive",
                line,
                other
            );
            false
        }
    }
}

fn parse_depth(value: &str, line: u64) -> Result<Option<u32>> {
    if value.is_empty() {
        return Ok(None);
    }
    let depth: u32 = value.parse().map_err(|_| {
        GrmError::input(
            ErrorCode::INPUT_INVALID_FIELD,
            format!("depth '{value}' is not a non-negative integer"),
            Some(line),
        )
    })?;
    Ok((depth > 0).then_some(depth))
}

fn parse_patterns(value: &str, line: u64) -> Result<Vec<String>> {
    let list: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();

    patterns::validate(&list).map_err(|(pattern, e)| {
        GrmError::input(
            ErrorCode::INPUT_INVALID_FIELD,
            format!("custom_patterns contains invalid glob '{pattern}': {e}"),
            Some(line),
        )
    })?;

    Ok(list)
}
