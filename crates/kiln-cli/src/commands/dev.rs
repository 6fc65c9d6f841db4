//! `kiln dev`.

use std::sync::Arc;

use crate::cli::DevArgs;
use crate::commands::utils;
use crate::dev::{DevServer, DevState};
use crate::error::Result;
use crate::ui;

/// Execute the dev command.
///
/// Serves the source tree until Ctrl-C. Nothing is built ahead of time;
/// each request is compiled on demand.
pub async fn execute(args: DevArgs) -> Result<()> {
    let root = utils::resolve_root(args.cwd.as_deref())?;
    let state = Arc::new(DevState::load(&root, args.env, args.port)?);
    let config = state.current_config().await;

    let server = DevServer::bind(state).await?;
    ui::success(&format!(
        "Development server running at {}",
        server.url(&config.ci.host)
    ));
    ui::info(&format!(
        "Unit tests at {}/__unittests",
        server.url(&config.ci.host)
    ));

    server.serve(shutdown_signal()).await?;
    ui::info("Development server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("cannot listen for Ctrl-C: {err}");
        std::future::pending::<()>().await;
    }
}
