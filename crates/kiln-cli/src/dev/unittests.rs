//! Browser unit-test harness.
//!
//! `/__unittests` runs the application suite, made of every
//! `views/<view>/tests/*.js`. `/__unittests/framework` runs the framework
//! suite in `<framework_dir>/core/tests/`. The `/auto` variants start the run
//! on load and post the result to `/__unittests/report`.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use axum::body::Body;
use axum::http::{StatusCode, header};
use axum::response::Response;
use kiln_build::compiler::{TemplateVars, expand_placeholders};
use kiln_build::enumerator::path_key;
use kiln_config::AppConfig;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::state::DevState;

const HARNESS_TEMPLATE: &str = include_str!("../../assets/unittests.html");

/// Where the harness posts its result.
pub const REPORT_PATH: &str = "/__unittests/report";

static TEST_MODULE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\.add\(\s*['"]([^'"]+)['"]"#).expect("test module pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestSuite {
    App,
    Framework,
}

/// Result posted by the harness when an automatic run completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestReport {
    pub failed: u64,
    #[serde(default)]
    pub passed: u64,
    #[serde(default)]
    pub total: u64,
}

/// A test file found by the scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestFile {
    /// URL the harness loads the file from.
    pub src: String,
    /// Module name registered by the file.
    pub module: String,
}

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("cannot scan {}: {source}", .dir.display())]
    Scan {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} does not register a module (expected `.add('<name>', …)`)", .path.display())]
    MissingModuleId { path: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubRoute {
    Harness { suite: TestSuite, auto: bool },
    Report,
}

fn sub_route(path: &str) -> Option<SubRoute> {
    let rest = path.strip_prefix("/__unittests")?;
    let harness = |suite, auto| Some(SubRoute::Harness { suite, auto });
    match rest.trim_end_matches('/') {
        "" => harness(TestSuite::App, false),
        "/auto" => harness(TestSuite::App, true),
        "/framework" => harness(TestSuite::Framework, false),
        "/framework/auto" => harness(TestSuite::Framework, true),
        "/report" => Some(SubRoute::Report),
        _ => None,
    }
}

/// Module name registered by a test file.
pub fn extract_module_id(source: &str) -> Option<&str> {
    TEST_MODULE_ID
        .captures(source)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

async fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, HarnessError> {
    let scan_err = |source| HarnessError::Scan {
        dir: dir.to_path_buf(),
        source,
    };
    let mut entries = tokio::fs::read_dir(dir).await.map_err(scan_err)?;
    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(scan_err)? {
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok_and(|meta| meta.is_dir())
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok_and(|meta| meta.is_file())
}

fn is_test_script(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "js")
        && path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| !name.starts_with('.'))
}

async fn collect_tests(
    root: &Path,
    dir: &Path,
    files: &mut Vec<TestFile>,
) -> Result<(), HarnessError> {
    for path in sorted_entries(dir).await? {
        if !is_test_script(&path) || !is_file(&path).await {
            continue;
        }
        let source = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| HarnessError::Read {
                path: path.clone(),
                source,
            })?;
        let module = extract_module_id(&source)
            .ok_or_else(|| HarnessError::MissingModuleId { path: path.clone() })?
            .to_string();
        let rel = path.strip_prefix(root).unwrap_or(path.as_path());
        files.push(TestFile {
            src: format!("/{}", path_key(rel)),
            module,
        });
    }
    Ok(())
}

/// Find the test files of `suite`, sorted by path.
///
/// # Errors
///
/// A missing suite directory, an unreadable file, or a test file without a
/// module registration.
pub async fn scan_tests(config: &AppConfig, suite: TestSuite) -> Result<Vec<TestFile>, HarnessError> {
    let mut files = Vec::new();
    match suite {
        TestSuite::App => {
            for view in sorted_entries(&config.root.join("views")).await? {
                let tests = view.join("tests");
                if is_dir(&tests).await {
                    collect_tests(&config.root, &tests, &mut files).await?;
                }
            }
        }
        TestSuite::Framework => {
            let tests = config.framework_path().join("core").join("tests");
            collect_tests(&config.root, &tests, &mut files).await?;
        }
    }
    Ok(files)
}

/// Harness page for `files`.
pub fn render_harness(files: &[TestFile], auto: bool) -> String {
    let scripts = files
        .iter()
        .map(|file| format!("<script src=\"{}\"></script>", file.src))
        .collect::<Vec<_>>()
        .join("\n    ");
    let modules: Vec<&str> = files.iter().map(|file| file.module.as_str()).collect();
    let modules = serde_json::to_string(&modules).unwrap_or_else(|_| "[]".to_string());

    let vars = TemplateVars::new()
        .with("testssrc", scripts)
        .with("testsmodules", modules)
        .with("autorun", if auto { "true" } else { "false" })
        .with("reporturl", REPORT_PATH);
    expand_placeholders(HARNESS_TEMPLATE, &vars).into_owned()
}

fn text(status: StatusCode, message: impl Into<String>) -> Response {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Body::from(message.into()))
        .unwrap()
}

/// Serve anything under `/__unittests`.
pub async fn handle(state: &DevState, config: &AppConfig, path: &str, body: &[u8]) -> Response {
    match sub_route(path) {
        Some(SubRoute::Harness { suite, auto }) => match scan_tests(config, suite).await {
            Ok(files) => {
                tracing::debug!(?suite, tests = files.len(), "serving test harness");
                Response::builder()
                    .status(StatusCode::OK)
                    .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
                    .header(header::CACHE_CONTROL, "no-cache")
                    .body(Body::from(render_harness(&files, auto)))
                    .unwrap()
            }
            Err(err) => {
                tracing::warn!("test harness unavailable: {err}");
                text(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        },
        Some(SubRoute::Report) => receive_report(state, body).await,
        None => text(StatusCode::NOT_FOUND, format!("Unknown test route: {path}")),
    }
}

/// Accept a report posted by the harness.
pub async fn receive_report(state: &DevState, body: &[u8]) -> Response {
    let report: TestReport = match serde_json::from_slice(body) {
        Ok(report) => report,
        Err(err) => return text(StatusCode::BAD_REQUEST, format!("Invalid test report: {err}")),
    };
    tracing::info!(failed = report.failed, passed = report.passed, "test report received");
    if state.submit_report(report).await {
        text(StatusCode::OK, "ok")
    } else {
        text(StatusCode::NOT_FOUND, "No test run is waiting for a report")
    }
}
