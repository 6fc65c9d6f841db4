//! Request routing for the development server.
//!
//! Every request goes through a single fallback handler. The route is picked
//! by [`route_request`] against the configuration of that request, so
//! fixture edits in `kiln.toml` apply immediately.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri, header};
use axum::response::Response;
use kiln_build::resolve_on_demand;
use kiln_config::{AppConfig, FixtureRule};
use tower_http::cors::{Any, CorsLayer};

use super::coverage::{self, ASSET_PREFIX, PROXY_PREFIX};
use super::fixtures::FixtureRequest;
use super::state::DevState;
use super::telemetry::{self, LOGERROR_PATH};
use super::unittests::{self, REPORT_PATH};

/// Which handler serves a request, in order of precedence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RouteKind<'a> {
    /// CI report sink, only while a CI run is waiting.
    Report,
    UnitTests,
    CoverageProxy,
    CoverageAsset,
    LogError,
    Fixture(&'a FixtureRule),
    OnDemand,
}

/// Drop the query and map `/` to `/index.html`.
pub fn normalize_path(path: &str) -> &str {
    let path = path.split_once('?').map_or(path, |(path, _)| path);
    if path.is_empty() || path == "/" {
        "/index.html"
    } else {
        path
    }
}

/// Pick the handler for a normalized `path`.
pub fn route_request<'a>(path: &str, config: &'a AppConfig, reports: bool) -> RouteKind<'a> {
    if reports && path.trim_end_matches('/') == REPORT_PATH {
        return RouteKind::Report;
    }
    if path == "/__unittests" || path.starts_with("/__unittests/") {
        return RouteKind::UnitTests;
    }
    if path.starts_with(PROXY_PREFIX) {
        return RouteKind::CoverageProxy;
    }
    if path.starts_with(ASSET_PREFIX) {
        return RouteKind::CoverageAsset;
    }
    if path == LOGERROR_PATH {
        return RouteKind::LogError;
    }
    if let Some(rule) = config.match_fixture(path) {
        return RouteKind::Fixture(rule);
    }
    RouteKind::OnDemand
}

/// Build the router over `state`.
pub fn build_router(state: Arc<DevState>) -> Router {
    Router::new()
        .fallback(handle_request)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn handle_request(
    State(state): State<Arc<DevState>>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    let config = state.current_config().await;
    let path = normalize_path(uri.path());
    let route = route_request(path, &config, state.reports_enabled());
    tracing::debug!(%method, path, ?route, "request");

    match route {
        RouteKind::Report => unittests::receive_report(&state, &body).await,
        RouteKind::UnitTests => unittests::handle(&state, &config, path, &body).await,
        RouteKind::CoverageProxy => coverage::proxy(&state, &config, path).await,
        RouteKind::CoverageAsset => coverage::asset(&config, path).await,
        RouteKind::LogError => telemetry::log_error(uri.query()),
        RouteKind::Fixture(rule) => {
            let request = FixtureRequest {
                method: &method,
                path,
                query: uri.query(),
                body: &body,
                root: &config.root,
            };
            state.fixtures().respond(rule, &request).await
        }
        RouteKind::OnDemand => {
            let resolved = resolve_on_demand(&config, state.registry(), path).await;
            Response::builder()
                .status(
                    StatusCode::from_u16(resolved.status)
                        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                )
                .header(header::CONTENT_TYPE, resolved.content_type)
                .header(header::CACHE_CONTROL, "no-cache")
                .body(Body::from(resolved.body))
                .unwrap()
        }
    }
}
