//! # grm
//!
//! Git repository manager: cleans directory trees against a glob allow-list
//! and clones batches of repositories listed in a pipe-delimited CSV.
//!
//! ## Usage
//!
//! ```bash
//! grm [--config PATH] [--dry-run] clean [DIR] [--keep PATTERN]... [--preset logs|temp|custom]...
//! grm [--config PATH] [--dry-run] clone [CSV] [--workers N] [--json]
//! grm            # interactive menu
//! ```
//!
//! ## Modules
//!
//! - `cleanup` - pattern matching and bottom-up directory cleaning
//! - `cli` - argument parsing, subcommands and the interactive menu
//! - `config` - JSON configuration with per-key defaults
//! - `error` - error types with numeric codes
//! - `logging` - file and stderr log layers
//! - `manifest` - CSV manifest parsing into repository tasks
//! - `orchestrator` - bounded-parallel clone, cleanup and hook pipeline
//! - `subprocess` - process execution behind a mockable runner
pub mod cleanup;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod orchestrator;
pub mod subprocess;
