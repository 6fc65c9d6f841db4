//! kiln - build and serve modular client-side applications.
//!
//! Parses the command line, sets up logging and colors, and dispatches to the
//! selected command.

use clap::Parser;
use kiln_cli::{cli, commands, error, logger, ui};
use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    logger::init_logger(args.verbose, args.quiet, args.no_color);
    ui::init_colors(args.no_color);

    let result = match args.command {
        cli::Command::Build(build_args) => commands::build_execute(build_args).await,
        cli::Command::Dev(dev_args) => commands::dev_execute(dev_args).await,
        cli::Command::Ci(ci_args) => commands::ci_execute(ci_args).await,
    };

    result.map_err(error::cli_error_to_miette)
}
