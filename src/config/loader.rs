use super::Configuration;
use crate::error::{ErrorCode, GrmError, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// Configuration file read when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Load and validate the configuration at `path`.
///
/// Returns `None` when the file does not exist so the caller can fall back to
/// [`Configuration::default`] and say so once logging is up. Unreadable files,
/// malformed JSON and out-of-range values are configuration errors.
pub fn load_config(path: &Path) -> Result<Option<Configuration>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(GrmError::config_with_code(
                ErrorCode::CONFIG_IO_ERROR,
                format!("failed to read {}", path.display()),
            )
            .with_source(e))
        }
    };

    let config = parse_config(&content).map_err(|e| match e {
        GrmError::Config {
            code,
            message,
            source,
        } => GrmError::Config {
            code,
            message: format!("{}: {}", path.display(), message),
            source,
        },
        other => other,
    })?;

    debug!("Loaded configuration from {}: {:?}", path.display(), config);
    Ok(Some(config))
}

/// Parse and validate a JSON configuration document
pub fn parse_config(content: &str) -> Result<Configuration> {
    let config: Configuration = serde_json::from_str(content).map_err(|e| {
        GrmError::config_with_code(ErrorCode::CONFIG_INVALID_JSON, e.to_string()).with_source(e)
    })?;
    config.validate()?;
    Ok(config)
}
