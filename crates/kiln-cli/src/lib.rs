//! kiln CLI - build, serve and test modular client-side applications.
//!
//! This crate wires `kiln-config` and `kiln-build` into three commands and
//! hosts the development server.
//!
//! # Architecture
//!
//! - [`cli`] - `clap` definitions for `build`, `dev` and `ci`
//! - [`commands`] - one `execute` function per command
//! - [`dev`] - the request router, test harness, fixtures and TLS listener
//! - [`error`] - [`CliError`] and its conversion to `miette` reports
//! - [`logger`] - `tracing` subscriber setup
//! - [`ui`] - colored status lines and the build summary
//!
//! # Example
//!
//! ```rust
//! use kiln_cli::{error::Result, logger};
//!
//! fn main() -> Result<()> {
//!     logger::init_logger(false, false, false);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod dev;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{BuildError, CliError, ConfigError, Result, ResultExt};
