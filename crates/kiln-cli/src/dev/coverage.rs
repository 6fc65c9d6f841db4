//! Coverage routes.
//!
//! `/__coverage/<path>` serves `<path>` like the on-demand fallback, with
//! scripts passed through a [`CoverageInstrumenter`]. `/coverage/<path>`
//! serves the generated report from `<root>/coverage/`.

use axum::body::Body;
use axum::http::{StatusCode, header};
use axum::response::Response;
use kiln_build::resolve::relative_request_path;
use kiln_build::{content_type_for, resolve_on_demand};
use kiln_config::AppConfig;

use super::state::DevState;

pub const PROXY_PREFIX: &str = "/__coverage/";
pub const ASSET_PREFIX: &str = "/coverage/";

/// Rewrites scripts so a coverage tool can record execution.
pub trait CoverageInstrumenter: Send + Sync + std::fmt::Debug {
    fn instrument(&self, path: &str, source: &[u8]) -> Vec<u8>;
}

/// Serves scripts unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughInstrumenter;

impl CoverageInstrumenter for PassthroughInstrumenter {
    fn instrument(&self, _path: &str, source: &[u8]) -> Vec<u8> {
        source.to_vec()
    }
}

fn respond(status: u16, content_type: &str, body: Vec<u8>) -> Response {
    Response::builder()
        .status(StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR))
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from(body))
        .unwrap()
}

/// Compile `path` on demand and instrument it when it is a script.
pub async fn proxy(state: &DevState, config: &AppConfig, path: &str) -> Response {
    let target = path.strip_prefix("/__coverage").unwrap_or(path);
    let resolved = resolve_on_demand(config, state.registry(), target).await;
    let body = if resolved.status == 200 && resolved.content_type == "application/javascript" {
        state.instrumenter().instrument(target, &resolved.body)
    } else {
        resolved.body
    };
    respond(resolved.status, resolved.content_type, body)
}

/// Serve a coverage report asset. A missing asset is an empty 200.
pub async fn asset(config: &AppConfig, path: &str) -> Response {
    let rest = path.strip_prefix(ASSET_PREFIX).unwrap_or(path);
    let Some(rel) = relative_request_path(rest) else {
        return respond(403, "text/plain; charset=utf-8", format!("Forbidden: {path}").into_bytes());
    };
    let content_type = content_type_for(&rel);
    match tokio::fs::read(config.root.join("coverage").join(&rel)).await {
        Ok(body) => respond(200, content_type, body),
        Err(err) => {
            tracing::debug!(path = %rel, "coverage asset unavailable: {err}");
            respond(200, content_type, Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[derive(Debug)]
    struct Marker;

    impl CoverageInstrumenter for Marker {
        fn instrument(&self, path: &str, source: &[u8]) -> Vec<u8> {
            let mut out = format!("/* cov {path} */").into_bytes();
            out.extend_from_slice(source);
            out
        }
    }

    fn app(dir: &TempDir) -> AppConfig {
        AppConfig {
            root: dir.path().to_path_buf(),
            ..AppConfig::default()
        }
    }

    #[tokio::test]
    async fn proxy_instruments_scripts_only() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("views/a")).unwrap();
        fs::write(dir.path().join("views/a/a.js"), "/* @module a */\nrun();").unwrap();
        fs::write(dir.path().join("views/a/a.css"), "p{}").unwrap();
        let config = app(&dir);
        let state = DevState::new(config.clone()).with_instrumenter(Arc::new(Marker));

        let response = proxy(&state, &config, "/__coverage/views/a/a.js").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.starts_with("/* cov /views/a/a.js */YUI.add('a'"));

        let response = proxy(&state, &config, "/__coverage/views/a/a.css").await;
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"p{}");
    }

    #[tokio::test]
    async fn report_assets() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("coverage")).unwrap();
        fs::write(dir.path().join("coverage/index.html"), "<h1>cov</h1>").unwrap();
        let config = app(&dir);

        let response = asset(&config, "/coverage/index.html").await;
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/html; charset=utf-8"
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"<h1>cov</h1>");

        let response = asset(&config, "/coverage/missing.css").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/css");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());

        let response = asset(&config, "/coverage/../kiln.toml").await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
