//! Fixture-mocked paths.
//!
//! A fixture rule pairs a path regex with a response description. The router
//! picks the first matching rule and hands it to a [`FixtureHandler`].
//!
//! The default handler understands:
//!
//! ```toml
//! [[fixtures]]
//! path = "^/api/cart"
//! response = { status = 200, contentType = "application/json", body = { items = [] } }
//!
//! [[fixtures]]
//! path = "^/api/catalog"
//! response = { file = "fixtures/catalog.json" }
//!
//! [[fixtures]]
//! path = "^/api/ping"
//! response = "pong"
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::Response;
use kiln_config::FixtureRule;
use serde::Deserialize;

/// The request a fixture answers.
#[derive(Debug, Clone, Copy)]
pub struct FixtureRequest<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub body: &'a [u8],
    /// Application root, for rules that point at files.
    pub root: &'a Path,
}

#[async_trait]
pub trait FixtureHandler: Send + Sync + std::fmt::Debug {
    async fn respond(&self, rule: &FixtureRule, request: &FixtureRequest<'_>) -> Response;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ResponseSpec {
    #[serde(default = "default_status")]
    status: u16,
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    body: Option<serde_json::Value>,
    #[serde(default)]
    file: Option<PathBuf>,
}

fn default_status() -> u16 {
    200
}

/// Serves the response described in `kiln.toml`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticFixtureHandler;

impl StaticFixtureHandler {
    async fn render(
        &self,
        rule: &FixtureRule,
        request: &FixtureRequest<'_>,
    ) -> Result<(StatusCode, HeaderValue, Vec<u8>), String> {
        if let serde_json::Value::String(text) = &rule.response {
            return Ok((
                StatusCode::OK,
                HeaderValue::from_static("application/json"),
                text.clone().into_bytes(),
            ));
        }

        let spec: ResponseSpec = serde_json::from_value(rule.response.clone())
            .map_err(|err| format!("invalid fixture response for `{}`: {err}", rule.path))?;
        let status = StatusCode::from_u16(spec.status)
            .map_err(|_| format!("invalid fixture status {} for `{}`", spec.status, rule.path))?;

        let (default_type, body) = match (&spec.file, spec.body) {
            (Some(file), _) => {
                let path = request.root.join(file);
                let bytes = tokio::fs::read(&path)
                    .await
                    .map_err(|err| format!("cannot read fixture {}: {err}", path.display()))?;
                (kiln_build::content_type_for(&file.to_string_lossy()), bytes)
            }
            (None, Some(serde_json::Value::String(text))) => ("application/json", text.into_bytes()),
            (None, Some(value)) => ("application/json", value.to_string().into_bytes()),
            (None, None) => ("application/json", Vec::new()),
        };

        let content_type = match spec.content_type {
            Some(value) => HeaderValue::try_from(value)
                .map_err(|_| format!("invalid fixture content type for `{}`", rule.path))?,
            None => HeaderValue::from_static(default_type),
        };
        Ok((status, content_type, body))
    }
}

#[async_trait]
impl FixtureHandler for StaticFixtureHandler {
    async fn respond(&self, rule: &FixtureRule, request: &FixtureRequest<'_>) -> Response {
        match self.render(rule, request).await {
            Ok((status, content_type, body)) => {
                tracing::debug!(path = request.path, rule = %rule.path, %status, "fixture");
                Response::builder()
                    .status(status)
                    .header(header::CONTENT_TYPE, content_type)
                    .header(header::CACHE_CONTROL, "no-cache")
                    .body(Body::from(body))
                    .unwrap()
            }
            Err(message) => {
                tracing::warn!("{message}");
                Response::builder()
                    .status(StatusCode::INTERNAL_SERVER_ERROR)
                    .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
                    .body(Body::from(message))
                    .unwrap()
            }
        }
    }
}
