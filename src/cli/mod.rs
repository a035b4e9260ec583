//! CLI command handlers
//!
//! - `args` - clap argument structures
//! - `commands` - clean and clone implementations
//! - `menu` - the interactive menu
//! - `router` - dispatch from parsed arguments

pub mod args;
pub mod commands;
pub mod menu;
pub mod router;

pub use args::{Cli, Commands};
pub use router::execute_command;
