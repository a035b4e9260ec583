//! CLI argument structures

use crate::cleanup::RetentionPreset;
use crate::config::DEFAULT_CONFIG_FILE;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Clean directory trees and clone batches of git repositories
#[derive(Parser, Debug)]
#[command(name = "grm")]
#[command(about = "grm - Git repository manager: pattern-based cleanup and batch cloning", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to the JSON configuration file
    #[arg(short = 'c', long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Report what would happen without deleting files or running commands
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Remove everything under a directory that does not match the keep-list
    Clean {
        /// Directory to clean (defaults to `clean_directory` from the config)
        directory: Option<PathBuf>,

        /// Additional glob to keep (repeatable)
        #[arg(short = 'k', long = "keep", value_name = "PATTERN")]
        keep: Vec<String>,

        /// Named pattern group to keep (repeatable)
        #[arg(short = 'p', long = "preset", value_enum, value_name = "PRESET")]
        presets: Vec<RetentionPreset>,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },

    /// Clone every active repository listed in a CSV manifest
    Clone {
        /// Pipe-delimited manifest (defaults to `default_csv_file` from the config)
        csv: Option<PathBuf>,

        /// Number of concurrent clones
        #[arg(short = 'w', long)]
        workers: Option<usize>,

        /// Print the summary report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Interactive menu (default when no command is given)
    Menu,
}
