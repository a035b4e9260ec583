use crate::config::Configuration;
use crate::manifest::load_manifest;
use crate::orchestrator::{CloneOrchestrator, SummaryReport};
use crate::subprocess::SubprocessManager;
use anyhow::{Context, Result};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Load a manifest and run every task in it
pub async fn clone_from_csv(
    config: Arc<Configuration>,
    subprocess: SubprocessManager,
    csv: &Path,
    show_progress: bool,
) -> Result<Arc<SummaryReport>> {
    let manifest = load_manifest(csv, &config.clone_root)?;
    if !manifest.rejected.is_empty() {
        eprintln!(
            "Warning: skipped {} invalid row(s) in {}",
            manifest.rejected.len(),
            csv.display()
        );
    }

    let report = CloneOrchestrator::new(subprocess, config)
        .with_progress(show_progress)
        .run(manifest.tasks)
        .await?;
    Ok(report)
}

pub async fn run_clone_command(
    config: Configuration,
    csv: Option<PathBuf>,
    workers: Option<usize>,
    json: bool,
) -> Result<()> {
    let config = config.with_overrides(false, workers);
    config.validate()?;
    let config = Arc::new(config);
    let csv = csv.unwrap_or_else(|| config.default_csv_file.clone());

    let show_progress = !json && std::io::stderr().is_terminal();
    let report = clone_from_csv(
        Arc::clone(&config),
        SubprocessManager::production(),
        &csv,
        show_progress,
    )
    .await?;

    if report.has_failures() {
        tracing::warn!(
            "{} of {} repositories failed",
            report.failed(),
            report.total_processed()
        );
    }

    if json {
        let snapshot = serde_json::to_string_pretty(&report.snapshot())
            .context("failed to serialize report")?;
        println!("{snapshot}");
    } else {
        print!("{}", report.render());
    }
    Ok(())
}
