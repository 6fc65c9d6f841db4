//! Error types for builds and compiler stages.
//!
//! `BuildError` is reserved for failures that abort a whole job. Anything that
//! goes wrong with a single file is a `CompileError` (or an I/O error) that the
//! builder logs and counts as a completed unit.

use std::path::PathBuf;

use kiln_config::ConfigError;
use thiserror::Error;

pub type Result<T, E = BuildError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum BuildError {
    /// Application config or framework metadata could not be resolved
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The build root or the job's output directory could not be created
    #[error("cannot create output directory {}: {source}", .path.display())]
    OutputRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Another build already owns this name
    #[error("build '{name}' already exists at {}\n\nHint: pick another --name or remove the directory", .path.display())]
    DuplicateBuildName { name: String, path: PathBuf },

    /// Name cannot be used as a single directory component
    #[error("invalid build name '{0}': use a single path component without separators")]
    InvalidBuildName(String),

    /// `build()` was called a second time on the same job
    #[error("build '{0}' has already run")]
    AlreadyBuilt(String),
}

/// Failure of a single compiler stage on a single file.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("{} is not valid UTF-8", .path)]
    NotUtf8 { path: String },

    #[error("invalid locale file {path}: {source}")]
    Locale {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure to produce one output file. Logged and counted, never fatal.
#[derive(Debug, Error)]
pub enum UnitError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
