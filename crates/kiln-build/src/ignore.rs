//! Ignore patterns.
//!
//! Paths matching any configured pattern are counted as completed units but
//! never compiled or written to the build output.

use regex::Regex;

use kiln_config::{AppConfig, ConfigError};

/// Compiled ignore patterns, matched against `/`-separated paths relative to
/// the application root.
#[derive(Debug, Clone, Default)]
pub struct IgnoreSet {
    patterns: Vec<Regex>,
}

impl IgnoreSet {
    pub fn new<I, S>(patterns: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                let p = p.as_ref();
                Regex::new(p).map_err(|source| ConfigError::InvalidPattern {
                    field: "ignore".to_string(),
                    pattern: p.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Self::new(config.ignore_patterns())
    }

    pub fn is_ignored(&self, rel_path: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(rel_path))
    }
}
