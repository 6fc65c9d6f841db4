//! Command-line interface definition.
//!
//! - `kiln build` - compile the application into a versioned build directory
//! - `kiln dev` - serve the source tree, compiling files on request
//! - `kiln ci` - run the unit-test harness in a browser and report the result

mod commands;

use clap::Parser;

pub use commands::{BrowserKind, BuildArgs, CiArgs, Command, DevArgs};

/// kiln - build and serve modular client-side applications
#[derive(Parser, Debug)]
#[command(
    name = "kiln",
    version,
    about = "Build and serve modular client-side applications",
    long_about = "kiln compiles an application source tree into a versioned bundle,\n\
                  serves the same tree on demand during development, and runs its\n\
                  unit tests in a browser for CI."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}
