//! `kiln ci`.
//!
//! Starts the dev server with a report sink, opens the harness in a browser
//! in auto-run mode and waits for the posted report. The exit status is 0
//! only when the report has no failures; a browser that cannot start or a
//! report that never arrives fails the run.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};

use crate::cli::{BrowserKind, CiArgs};
use crate::commands::utils;
use crate::dev::{DevServer, DevState, TestReport};
use crate::error::{CliError, Result};
use crate::ui;

/// Execute the ci command.
pub async fn execute(args: CiArgs) -> Result<()> {
    let root = utils::resolve_root(args.cwd.as_deref())?;
    let (report_tx, mut reports) = mpsc::channel(1);
    let state = Arc::new(DevState::load(&root, args.env, args.port)?.with_report_sink(report_tx));
    let config = state.current_config().await;

    let browser = match args.browser {
        Some(kind) => kind,
        None => BrowserKind::from_config(&config.ci.browser).ok_or_else(|| {
            CliError::InvalidArgument(format!(
                "unknown browser `{}` in ci.browser (expected chromium, chrome or firefox)",
                config.ci.browser
            ))
        })?,
    };
    let timeout = Duration::from_secs(args.timeout.unwrap_or(config.ci.timeout_secs));

    let server = DevServer::bind(state).await?;
    let url = harness_url(&server.url(&config.ci.host), args.framework);
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server_task = tokio::spawn(server.serve(async move {
        let _ = stop_rx.await;
    }));

    ui::info(&format!("Running tests at {url}"));
    let headless = args.headless || ui::is_ci();
    let outcome = match launch_browser(browser, &url, headless) {
        Ok(mut child) => {
            let outcome = wait_for_report(&mut reports, &mut child, timeout).await;
            if let Err(err) = child.kill().await {
                tracing::debug!("browser already exited: {err}");
            }
            outcome
        }
        Err(err) => Err(err),
    };

    let _ = stop_tx.send(());
    match server_task.await {
        Ok(Err(err)) => tracing::warn!("dev server stopped with an error: {err}"),
        Err(err) => tracing::warn!("dev server task failed: {err}"),
        Ok(Ok(())) => {}
    }

    let report = outcome?;
    ui::success(&format!(
        "All tests passed ({} of {})",
        report.passed, report.total
    ));
    Ok(())
}

/// Harness URL under `base`.
pub fn harness_url(base: &str, framework: bool) -> String {
    if framework {
        format!("{base}/__unittests/framework/auto")
    } else {
        format!("{base}/__unittests/auto")
    }
}

/// Start the first available executable for `kind`.
fn launch_browser(kind: BrowserKind, url: &str, headless: bool) -> Result<Child> {
    let args = kind.args(url, headless);
    for program in kind.programs() {
        let spawned = Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();
        match spawned {
            Ok(child) => {
                tracing::info!(browser = program, "browser started");
                return Ok(child);
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(browser = program, "not installed");
            }
            Err(err) => return Err(CliError::Browser(format!("cannot start {program}: {err}"))),
        }
    }
    Err(CliError::Browser(format!(
        "none of {} is installed",
        kind.programs().join(", ")
    )))
}

/// Wait for the harness report.
///
/// Some browsers hand the URL to an already running instance and exit with
/// status 0 right away, so only a failing exit ends the wait early.
pub async fn wait_for_report(
    reports: &mut mpsc::Receiver<TestReport>,
    browser: &mut Child,
    timeout: Duration,
) -> Result<TestReport> {
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);
    let mut browser_running = true;

    loop {
        tokio::select! {
            report = reports.recv() => {
                return match report {
                    Some(report) if report.failed == 0 => Ok(report),
                    Some(report) => Err(CliError::TestsFailed { failed: report.failed }),
                    None => Err(CliError::Custom("test report channel closed".to_string())),
                };
            }
            _ = &mut deadline => return Err(CliError::CiTimeout(timeout)),
            status = browser.wait(), if browser_running => match status {
                Ok(status) if status.success() => {
                    tracing::debug!("browser exited, still waiting for the report");
                    browser_running = false;
                }
                Ok(status) => {
                    return Err(CliError::Browser(format!(
                        "browser exited with {status} before reporting"
                    )));
                }
                Err(err) => return Err(CliError::Browser(err.to_string())),
            },
        }
    }
}
