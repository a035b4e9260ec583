//! Interactive menu: clean, clone from CSV, show the session report.

use super::commands::{clean_directory, clone_from_csv, confirm, keep_list, print_clean_report};
use crate::cleanup::{CleanReport, RetentionPreset};
use crate::config::Configuration;
use crate::orchestrator::ReportSnapshot;
use crate::subprocess::SubprocessManager;
use anyhow::Result;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Choice {
    Clean,
    Clone,
    Report,
    Exit,
}

impl Choice {
    fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "1" | "clean" => Some(Choice::Clean),
            "2" | "clone" => Some(Choice::Clone),
            "3" | "report" => Some(Choice::Report),
            "4" | "exit" | "quit" | "q" => Some(Choice::Exit),
            _ => None,
        }
    }
}

pub struct Menu<R, W> {
    input: R,
    output: W,
    config: Arc<Configuration>,
    subprocess: SubprocessManager,
    show_progress: bool,
    last_clean: Option<CleanReport>,
    last_clone: Option<ReportSnapshot>,
}

impl<R: BufRead, W: Write> Menu<R, W> {
    pub fn new(input: R, output: W, config: Arc<Configuration>, subprocess: SubprocessManager) -> Self {
        Self {
            input,
            output,
            config,
            subprocess,
            show_progress: false,
            last_clean: None,
            last_clone: None,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Loop until the user exits or input ends
    pub async fn run(&mut self) -> Result<()> {
        loop {
            self.print_menu()?;
            let Some(line) = self.read_line()? else {
                writeln!(self.output)?;
                return Ok(());
            };

            let result = match Choice::parse(&line) {
                Some(Choice::Clean) => self.clean().await,
                Some(Choice::Clone) => self.clone_repositories().await,
                Some(Choice::Report) => self.report(),
                Some(Choice::Exit) => {
                    writeln!(self.output, "Goodbye.")?;
                    return Ok(());
                }
                None => {
                    writeln!(self.output, "Invalid choice '{}', enter 1-4.", line.trim())?;
                    Ok(())
                }
            };

            // A failed operation returns to the menu
            if let Err(e) = result {
                tracing::error!("{:#}", e);
                writeln!(self.output, "Error: {e:#}")?;
            }
        }
    }

    fn print_menu(&mut self) -> Result<()> {
        writeln!(self.output)?;
        writeln!(self.output, "Git Repository Manager")?;
        writeln!(self.output, "  1. Clean directory")?;
        writeln!(self.output, "  2. Clone repositories from CSV")?;
        writeln!(self.output, "  3. Generate report")?;
        writeln!(self.output, "  4. Exit")?;
        write!(self.output, "Select an option: ")?;
        self.output.flush()?;
        Ok(())
    }

    /// `None` at end of input
    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn prompt(&mut self, question: &str) -> Result<String> {
        write!(self.output, "{question}")?;
        self.output.flush()?;
        Ok(self.read_line()?.unwrap_or_default())
    }

    async fn clean(&mut self) -> Result<()> {
        let default_dir = self.config.clean_directory.display().to_string();
        let answer = self.prompt(&format!("Directory to clean [{default_dir}]: "))?;
        let directory = if answer.is_empty() {
            self.config.clean_directory.clone()
        } else {
            PathBuf::from(answer)
        };

        let answer = self.prompt("Presets to keep (comma separated: logs, temp, custom) []: ")?;
        let presets = split_list(&answer)
            .iter()
            .map(|s| s.parse::<RetentionPreset>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(anyhow::Error::msg)?;

        let answer = self.prompt("Additional patterns to keep (comma separated) []: ")?;
        let extra = split_list(&answer);

        // Nothing chosen keeps the configured defaults
        let patterns = keep_list(&self.config, &presets, &extra);

        let dry_run = self.config.dry_run
            || confirm(&mut self.input, &mut self.output, "Perform a dry run?")?;

        if !dry_run {
            let question = format!(
                "Delete everything under {} not matching [{}]?",
                directory.display(),
                patterns.join(", ")
            );
            if !confirm(&mut self.input, &mut self.output, &question)? {
                writeln!(self.output, "Cleanup cancelled")?;
                return Ok(());
            }
        }

        let report = clean_directory(&directory, &patterns, dry_run).await?;
        print_clean_report(&mut self.output, &report)?;
        self.last_clean = Some(report);
        Ok(())
    }

    async fn clone_repositories(&mut self) -> Result<()> {
        let default_csv = self.config.default_csv_file.display().to_string();
        let answer = self.prompt(&format!("CSV file [{default_csv}]: "))?;
        let csv = if answer.is_empty() {
            self.config.default_csv_file.clone()
        } else {
            PathBuf::from(answer)
        };

        let config = if !self.config.dry_run
            && confirm(&mut self.input, &mut self.output, "Enable dry run mode?")?
        {
            Arc::new(self.config.as_ref().clone().with_overrides(true, None))
        } else {
            Arc::clone(&self.config)
        };

        let report = clone_from_csv(
            config,
            self.subprocess.clone(),
            &csv,
            self.show_progress,
        )
        .await?;

        let snapshot = report.snapshot();
        write!(self.output, "{}", snapshot.render())?;
        self.last_clone = Some(snapshot);
        Ok(())
    }

    fn report(&mut self) -> Result<()> {
        if self.last_clean.is_none() && self.last_clone.is_none() {
            writeln!(self.output, "No operations have been run yet.")?;
            return Ok(());
        }

        if let Some(clean) = &self.last_clean {
            writeln!(self.output, "Last cleanup:")?;
            print_clean_report(&mut self.output, clean)?;
        }
        if let Some(clone) = &self.last_clone {
            writeln!(self.output, "Last clone run ({}):", clone.generated_at.to_rfc3339())?;
            write!(self.output, "{}", clone.render())?;
        }
        Ok(())
    }
}

/// Comma separated answer to trimmed, non-empty items
fn split_list(answer: &str) -> Vec<String> {
    answer
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
