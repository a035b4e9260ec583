//! Log setup: leveled lines appended to the configured log file, plus
//! warnings on stderr that `-v` makes chattier.

use crate::config::Configuration;
use crate::error::{ErrorCode, GrmError, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::level_filters::LevelFilter;
use tracing::Subscriber;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// stderr filter for a `-v` count; `RUST_LOG` takes precedence when set
fn stderr_filter(verbose: u8) -> EnvFilter {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Build the subscriber without installing it
pub fn build_subscriber(
    config: &Configuration,
    verbose: u8,
) -> Result<impl Subscriber + Send + Sync + 'static> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)
        .map_err(|e| {
            GrmError::config_with_code(
                ErrorCode::CONFIG_IO_ERROR,
                format!("cannot open log file {}: {}", config.log_file.display(), e),
            )
            .with_source(e)
        })?;

    let file_layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .with_filter(LevelFilter::from_level(config.log_level.into()));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose >= 2)
        .with_thread_ids(verbose >= 3)
        .with_line_number(verbose >= 3)
        .with_filter(stderr_filter(verbose));

    Ok(tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer))
}

/// Install the global subscriber for this process
pub fn init_logging(config: &Configuration, verbose: u8) -> Result<()> {
    let subscriber = build_subscriber(config, verbose)?;
    tracing::subscriber::set_global_default(subscriber).map_err(|e| {
        GrmError::config(format!("logging already initialized: {e}")).with_source(e)
    })?;

    tracing::debug!("grm started with verbosity level: {}", verbose);
    Ok(())
}
