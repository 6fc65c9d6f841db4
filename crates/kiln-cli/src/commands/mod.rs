//! Command implementations for the kiln CLI.
//!
//! - [`build`] - compile the application into a named build directory
//! - [`dev`] - development server
//! - [`ci`] - headless unit-test run
//!
//! Each command provides an `execute` function that takes the parsed
//! arguments and returns a Result.

pub mod build;
pub mod ci;
pub mod dev;
pub(crate) mod utils;

pub use build::execute as build_execute;
pub use ci::execute as ci_execute;
pub use dev::execute as dev_execute;
