//! Client error sink.
//!
//! The browser reports uncaught errors as `GET /logerror?<url-encoded json>`,
//! usually through an image beacon. The payload is logged and the request
//! always succeeds with an empty image.

use axum::body::Body;
use axum::http::{StatusCode, header};
use axum::response::Response;

pub const LOGERROR_PATH: &str = "/logerror";

/// Log a client error report. Never fails.
pub fn log_error(query: Option<&str>) -> Response {
    let raw = query.unwrap_or_default();
    let decoded = urlencoding::decode(raw)
        .map(|text| text.into_owned())
        .unwrap_or_else(|_| raw.to_string());

    match serde_json::from_str::<serde_json::Value>(&decoded) {
        Ok(payload) => tracing::warn!(target: "kiln::client", %payload, "client error"),
        Err(_) if decoded.is_empty() => tracing::warn!(target: "kiln::client", "empty client error report"),
        Err(_) => tracing::warn!(target: "kiln::client", raw = %decoded, "client error"),
    }

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "image/png")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::empty())
        .unwrap()
}
