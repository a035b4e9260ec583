//! Glob matching of entry base names against a retention allow-list.

use glob::{MatchOptions, Pattern, PatternError};

/// Patterns kept by the `logs` retention preset
pub const LOGS_PRESET: &[&str] = &["*.log"];

/// Patterns kept by the `temp` retention preset
pub const TEMP_PRESET: &[&str] = &["*~"];

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A compiled, validated set of glob patterns
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
}

impl PatternSet {
    /// Compile every pattern, failing on the first invalid one
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, PatternError> {
        let patterns = patterns
            .iter()
            .map(|p| Pattern::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Returns true if `name` matches at least one pattern.
    ///
    /// An empty set matches nothing.
    pub fn matches(&self, name: &str) -> bool {
        self.patterns
            .iter()
            .any(|p| p.matches_with(name, MATCH_OPTIONS))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }
}

/// Check a base name against uncompiled patterns.
///
/// Patterns that are not valid globs only match a name equal to them.
pub fn matches(name: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|raw| match Pattern::new(raw) {
        Ok(pattern) => pattern.matches_with(name, MATCH_OPTIONS),
        Err(_) => raw == name,
    })
}

/// Validate a list of patterns, returning the offending pattern and reason
pub fn validate(patterns: &[String]) -> Result<(), (String, PatternError)> {
    for raw in patterns {
        Pattern::new(raw).map_err(|e| (raw.clone(), e))?;
    }
    Ok(())
}
