//! Error types for configuration loading and validation.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    // Application config (kiln.toml and overlays)
    #[error("failed to load application config: {0}")]
    Extract(String),

    #[error("invalid value for '{field}': {value}\n\nHint: {hint}")]
    InvalidValue {
        field: String,
        value: String,
        hint: String,
    },

    #[error("invalid pattern in '{field}': {pattern}: {source}")]
    InvalidPattern {
        field: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error(
        "https is enabled but `https.{missing}` is not set\n\nHint: set both `https.key` and `https.cert` in kiln.toml or remove the [https] table"
    )]
    TlsIncomplete { missing: &'static str },

    // Framework metadata (framework.json)
    #[error("cannot read framework metadata at {}: {source}", .path.display())]
    FrameworkMetaUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed framework metadata at {}: {source}", .path.display())]
    FrameworkMetaInvalid {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown environment '{0}' (expected default, dev or tests)")]
    UnknownEnvironment(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Extract(err.to_string())
    }
}
