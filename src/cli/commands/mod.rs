//! Command implementations shared by the subcommands and the interactive menu

pub mod clean;
pub mod clone;

pub use clean::{clean_directory, confirm, keep_list, print_clean_report, run_clean_command};
pub use clone::{clone_from_csv, run_clone_command};
