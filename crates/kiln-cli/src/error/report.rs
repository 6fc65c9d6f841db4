//! Miette report conversion for CLI errors.

use miette::Report;

use crate::error::{BuildError, CliError, ConfigError};

/// Convert a `CliError` into a miette report for `main`.
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Build(BuildError::Config(e)) | CliError::Config(e) => config_error_to_miette(e),
        CliError::Build(BuildError::DuplicateBuildName { name, path }) => miette::miette!(
            help = "pass another --name, or remove the existing directory",
            "Build '{}' already exists at {}",
            name,
            path.display()
        ),
        CliError::TestsFailed { failed } => miette::miette!("Unit tests failed: {failed} failing"),
        _ => miette::miette!("{}", err),
    }
}

fn config_error_to_miette(err: ConfigError) -> Report {
    match err {
        ConfigError::FrameworkMetaUnreadable { path, source } => miette::miette!(
            help = "every build needs the framework metadata file",
            "Cannot read {}: {}",
            path.display(),
            source
        ),
        ConfigError::FrameworkMetaInvalid { path, source } => miette::miette!(
            help = "expected an object with \"name\" and \"version\" strings",
            "Malformed {}: {}",
            path.display(),
            source
        ),
        other => miette::miette!("Configuration error: {}", other),
    }
}
