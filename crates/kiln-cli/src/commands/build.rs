//! `kiln build`.

use std::time::Instant;

use kiln_build::{BuildOptions, Builder};
use kiln_config::ConfigError;

use crate::cli::BuildArgs;
use crate::commands::utils;
use crate::error::Result;
use crate::ui;

/// Execute the build command.
///
/// 1. Resolve the application root and configuration
/// 2. Load framework metadata (fatal if missing, nothing on disk is touched)
/// 3. Compile every source directory into `<build_root>/<name>/`
/// 4. Apply banners, minifier and the post-build step
///
/// Per-file failures are logged and counted; the command still succeeds.
pub async fn execute(args: BuildArgs) -> Result<()> {
    let start = Instant::now();
    let root = utils::resolve_root(args.cwd.as_deref())?;

    let mut options = BuildOptions::new(&root)
        .with_environment(args.env)
        .with_minify(!args.no_minify);
    if let Some(name) = args.name {
        options = options.with_name(name);
    }

    let builder = Builder::init(options)?;
    check_config(&builder)?;

    tracing::info!(name = %builder.name(), out = %builder.out_dir().display(), "starting build");
    let report = builder.build().await?;

    ui::print_build_summary(&report, start.elapsed());
    if report.failed > 0 {
        ui::warning(&format!(
            "{} file(s) failed to compile, see the log above",
            report.failed
        ));
    }
    if !report.post_build_ok {
        ui::warning("post-build command failed");
    }
    ui::success(&format!("Build {} finished", report.name));
    Ok(())
}

/// The server-only `https` settings do not matter for a build.
fn check_config(builder: &Builder) -> Result<()> {
    match builder.config().validate() {
        Ok(()) => Ok(()),
        Err(err @ ConfigError::TlsIncomplete { .. }) => {
            ui::warning(&err.to_string());
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}
