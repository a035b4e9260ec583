//! Command routing and execution

use crate::cli::args::Commands;
use crate::cli::commands::{run_clean_command, run_clone_command};
use crate::cli::menu::Menu;
use crate::config::Configuration;
use crate::subprocess::SubprocessManager;
use anyhow::Result;
use std::io::{self, IsTerminal};
use std::sync::Arc;

/// Execute a CLI command based on the parsed arguments
pub async fn execute_command(command: Option<Commands>, config: Configuration) -> Result<()> {
    match command {
        Some(Commands::Clean {
            directory,
            keep,
            presets,
            yes,
        }) => run_clean_command(&config, directory, keep, presets, yes).await,
        Some(Commands::Clone { csv, workers, json }) => {
            run_clone_command(config, csv, workers, json).await
        }
        Some(Commands::Menu) | None => run_menu(config).await,
    }
}

async fn run_menu(config: Configuration) -> Result<()> {
    let show_progress = io::stderr().is_terminal();
    let mut menu = Menu::new(
        io::stdin().lock(),
        io::stdout(),
        Arc::new(config),
        SubprocessManager::production(),
    )
    .with_progress(show_progress);
    menu.run().await
}
