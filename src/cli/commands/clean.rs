use crate::cleanup::{retention_patterns, CleanReport, DirectoryCleaner, RetentionPreset};
use crate::config::Configuration;
use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

/// Keep-list for a clean: explicit choices, or the configured defaults when
/// nothing was chosen
pub fn keep_list(config: &Configuration, presets: &[RetentionPreset], keep: &[String]) -> Vec<String> {
    if presets.is_empty() && keep.is_empty() {
        config.default_patterns.clone()
    } else {
        retention_patterns(presets, &config.default_patterns, keep)
    }
}

/// Clean `directory` on the blocking pool
pub async fn clean_directory(
    directory: &Path,
    patterns: &[String],
    dry_run: bool,
) -> Result<CleanReport> {
    let cleaner = DirectoryCleaner::from_patterns(patterns, dry_run)?;
    let root = directory.to_path_buf();

    let report = tokio::task::spawn_blocking(move || cleaner.clean(&root))
        .await
        .context("cleanup task failed")??;
    Ok(report)
}

pub fn print_clean_report<W: Write>(out: &mut W, report: &CleanReport) -> io::Result<()> {
    if report.dry_run {
        for candidate in &report.candidates {
            writeln!(out, "[DRY RUN] Would delete: {}", candidate.display())?;
        }
        writeln!(
            out,
            "[DRY RUN] {}: {} kept, {} would be removed",
            report.root.display(),
            report.kept,
            report.removed
        )?;
    } else {
        writeln!(
            out,
            "Cleaned {}: {} kept, {} removed",
            report.root.display(),
            report.kept,
            report.removed
        )?;
    }

    if report.has_errors() {
        writeln!(out, "{} entries could not be removed:", report.errored())?;
        for failure in &report.errors {
            writeln!(out, "  - {}: {}", failure.path.display(), failure.reason)?;
        }
    }
    Ok(())
}

/// Ask a yes/no question; anything but `y`/`yes` (including EOF) is no
pub fn confirm<R: BufRead, W: Write>(input: &mut R, out: &mut W, question: &str) -> Result<bool> {
    write!(out, "{question} [y/N]: ")?;
    out.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;

    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

pub async fn run_clean_command(
    config: &Configuration,
    directory: Option<PathBuf>,
    keep: Vec<String>,
    presets: Vec<RetentionPreset>,
    yes: bool,
) -> Result<()> {
    let directory = directory.unwrap_or_else(|| config.clean_directory.clone());
    let patterns = keep_list(config, &presets, &keep);
    let mut stdout = io::stdout();

    if !config.dry_run && !yes {
        let question = format!(
            "Delete everything under {} not matching [{}]?",
            directory.display(),
            patterns.join(", ")
        );
        if !confirm(&mut io::stdin().lock(), &mut stdout, &question)? {
            println!("Cleanup cancelled");
            return Ok(());
        }
    }

    tracing::info!(
        "Cleaning {} keeping {:?}{}",
        directory.display(),
        patterns,
        if config.dry_run { " (dry run)" } else { "" }
    );

    let report = clean_directory(&directory, &patterns, config.dry_run).await?;
    print_clean_report(&mut stdout, &report)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    #[test]
    fn test_keep_list_defaults_when_nothing_chosen() {
        let config = Configuration::default();
        assert_eq!(keep_list(&config, &[], &[]), config.default_patterns);
    }

    #[test]
    fn test_keep_list_uses_only_chosen_groups() {
        let config = Configuration::default();
        let patterns = keep_list(&config, &[RetentionPreset::Temp], &["*.md".to_string()]);
        assert_eq!(patterns, vec!["*~", "*.md"]);
    }

    #[test]
    fn test_confirm() {
        let mut out = Vec::new();
        assert!(confirm(&mut Cursor::new("Y\n"), &mut out, "go?").unwrap());
        assert!(confirm(&mut Cursor::new("yes\n"), &mut out, "go?").unwrap());
        assert!(!confirm(&mut Cursor::new("n\n"), &mut out, "go?").unwrap());
        assert!(!confirm(&mut Cursor::new(""), &mut out, "go?").unwrap());
        assert!(String::from_utf8(out).unwrap().contains("go? [y/N]: "));
    }

    #[tokio::test]
    async fn test_clean_directory_and_print() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.py"), "").unwrap();
        std::fs::write(temp.path().join("b.log"), "").unwrap();

        let report = clean_directory(temp.path(), &["*.py".to_string()], true)
            .await
            .unwrap();
        let mut out = Vec::new();
        print_clean_report(&mut out, &report).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Would delete"));
        assert!(text.contains("b.log"));
        assert!(temp.path().join("b.log").exists());
    }
}
