//! Pattern-based retention cleaning of directory trees
//!
//! - `patterns` - glob allow-list matching on base names
//! - `cleaner` - bottom-up removal of everything the allow-list rejects

pub mod cleaner;
pub mod patterns;

pub use cleaner::{clean, CleanFailure, CleanReport, DirectoryCleaner};
pub use patterns::{matches, PatternSet};

/// Named groups of patterns offered by the interactive clean
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RetentionPreset {
    /// Keep log files (`*.log`)
    Logs,
    /// Keep editor backup files (`*~`)
    Temp,
    /// Keep the configured default patterns
    Custom,
}

impl std::str::FromStr for RetentionPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "logs" => Ok(Self::Logs),
            "temp" => Ok(Self::Temp),
            "custom" => Ok(Self::Custom),
            other => Err(format!("unknown cleanup option '{other}'")),
        }
    }
}

/// Build the keep-list from presets plus explicit patterns, without duplicates
pub fn retention_patterns(
    presets: &[RetentionPreset],
    defaults: &[String],
    extra: &[String],
) -> Vec<String> {
    let mut keep: Vec<String> = Vec::new();
    let mut push = |p: &str| {
        if !keep.iter().any(|existing| existing == p) {
            keep.push(p.to_string());
        }
    };

    for preset in presets {
        match preset {
            RetentionPreset::Logs => patterns::LOGS_PRESET.iter().for_each(|p| push(*p)),
            RetentionPreset::Temp => patterns::TEMP_PRESET.iter().for_each(|p| push(*p)),
            RetentionPreset::Custom => defaults.iter().for_each(|p| push(p.as_str())),
        }
    }
    extra.iter().for_each(|p| push(p.as_str()));

    keep
}
