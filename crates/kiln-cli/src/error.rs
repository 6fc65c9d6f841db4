//! Error handling for the kiln CLI.
//!
//! Library crates report their own error types (`ConfigError`, `BuildError`);
//! this module wraps them in [`CliError`], adds the server and CI failures
//! that only exist at the command level, and converts the result into a
//! `miette` report in `main`.
//!
//! # Example
//!
//! ```rust,no_run
//! use kiln_cli::error::{Result, ResultExt};
//! use std::path::Path;
//!
//! fn read_shell(path: &Path) -> Result<String> {
//!     std::fs::read_to_string(path).with_path(path)
//! }
//! ```

mod report;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub use kiln_build::BuildError;
pub use kiln_config::ConfigError;
pub use report::cli_error_to_miette;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    #[error("Server error: {0}")]
    Server(#[from] ServerError),

    /// Invalid command-line arguments or options
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The test browser could not be started or crashed before reporting
    #[error("Browser error: {0}\n\nHint: install the browser or pick another with --browser")]
    Browser(String),

    /// No test report arrived before the watchdog fired
    #[error("No test report after {}s\n\nHint: open the harness URL manually to see where it stalls", .0.as_secs())]
    CiTimeout(Duration),

    /// The test run completed with failures
    #[error("{failed} test(s) failed")]
    TestsFailed { failed: u64 },

    #[error("{0}")]
    Custom(String),
}

/// Dev server startup and runtime errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// HTTPS requested without both key and certificate
    #[error("{0}")]
    TlsMisconfigured(String),

    /// Key or certificate files could not be loaded
    #[error("cannot load TLS material: {0}")]
    TlsMaterial(String),

    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Serve(std::io::Error),
}

pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Extension trait for adding context to `Result` types.
pub trait ResultExt<T> {
    /// Turn a not-found I/O error into [`CliError::FileNotFound`] for `path`.
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T>;
}

impl<T, E: Into<CliError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T> {
        self.map_err(|e| match e.into() {
            CliError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
                CliError::FileNotFound(path.as_ref().to_path_buf())
            }
            other => other,
        })
    }
}
