//! On-demand compilation of a single requested file.
//!
//! The dev server falls back to this for every request no other route
//! claims. Files go through the same [`CompilerRegistry`] as a full build, so
//! what the browser sees in development matches the build output.

use std::io;
use std::path::{Component, Path, PathBuf};

use kiln_config::{AppConfig, FrameworkMeta};

use crate::compiler::{CompileContext, CompilerRegistry, FileClass, source_vars};
use crate::enumerator::path_key;

/// Status, content type and body for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Resolved {
    pub fn ok(content_type: &'static str, body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type,
            body,
        }
    }

    pub fn text(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            body: message.into().into_bytes(),
        }
    }
}

/// Content type by file extension.
pub fn content_type_for(path: &str) -> &'static str {
    let extension = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "js" | "mjs" => "application/javascript",
        "json" | "map" => "application/json",
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "txt" => "text/plain; charset=utf-8",
        "xml" => "application/xml",
        _ => "application/octet-stream",
    }
}

/// Decode `url_path` into a path relative to the application root.
///
/// `None` when the path would leave the root.
pub fn relative_request_path(url_path: &str) -> Option<String> {
    let decoded = urlencoding::decode(url_path).ok()?;
    let rel = Path::new(decoded.trim_start_matches('/'));
    rel.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        .then(|| path_key(rel))
}

/// Compile the file behind `url_path` on demand.
///
/// `url_path` has had its query stripped. The shell page is compiled with an
/// empty basepath, since development serves from the root.
pub async fn resolve_on_demand(
    config: &AppConfig,
    registry: &CompilerRegistry,
    url_path: &str,
) -> Resolved {
    let Some(rel) = relative_request_path(url_path) else {
        return Resolved::text(403, format!("Forbidden: {url_path}"));
    };
    if rel.is_empty() {
        return Resolved::text(404, format!("File not found: {url_path}"));
    }

    let file = config.root.join(&rel);
    let input = match tokio::fs::read(&file).await {
        Ok(input) => input,
        Err(err) if matches!(err.kind(), io::ErrorKind::NotFound | io::ErrorKind::IsADirectory) => {
            return Resolved::text(404, format!("File not found: {url_path}"));
        }
        Err(err) => {
            let is_dir = tokio::fs::metadata(&file).await.is_ok_and(|meta| meta.is_dir());
            if is_dir {
                return Resolved::text(404, format!("File not found: {url_path}"));
            }
            tracing::warn!(path = %rel, "cannot read requested file: {err}");
            return Resolved::text(500, format!("Cannot read {url_path}: {err}"));
        }
    };

    let is_entry = rel == path_key(&config.entry);
    let class = if is_entry {
        FileClass::Html
    } else {
        FileClass::classify(Path::new(&rel))
    };

    let framework = match class {
        FileClass::Static => None,
        _ => load_framework(config.framework_path()).await,
    };
    let mut vars = source_vars(framework.as_ref());
    if is_entry {
        vars.insert("basepath", "");
    }

    let ctx = CompileContext {
        path: &rel,
        vars: &vars,
    };
    match registry.compile(class, &input, &ctx) {
        Ok(body) => Resolved::ok(content_type_for(&rel), body),
        Err(err) => {
            tracing::warn!(path = %rel, "on-demand compile failed: {err}");
            Resolved::text(500, err.to_string())
        }
    }
}

/// Framework metadata for placeholder expansion, read off the async runtime.
async fn load_framework(dir: PathBuf) -> Option<FrameworkMeta> {
    match tokio::task::spawn_blocking(move || FrameworkMeta::load(&dir)).await {
        Ok(Ok(meta)) => Some(meta),
        Ok(Err(err)) => {
            tracing::debug!("framework metadata unavailable: {err}");
            None
        }
        Err(err) => {
            tracing::warn!("framework metadata read aborted: {err}");
            None
        }
    }
}
