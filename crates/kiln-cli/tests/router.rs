//! Router behavior over a real application tree, driven with `oneshot`.

use std::fs;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use kiln_cli::dev::{DevState, TestReport, build_router};
use kiln_config::Environment;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;

const KILN_TOML: &str = r#"
[[fixtures]]
path = "^/views/cart/cart\\.js$"
response = { status = 200, contentType = "application/javascript", body = "mocked();" }

[[fixtures]]
path = "^/api/"
response = { body = { items = [] } }
"#;

fn app() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::write(root.join("kiln.toml"), KILN_TOML).unwrap();
    fs::write(root.join("index.html"), "<base href=\"{$basepath}/\"><h1>shop</h1>").unwrap();
    fs::create_dir_all(root.join("views/cart/tests")).unwrap();
    fs::create_dir_all(root.join("views/list")).unwrap();
    fs::write(root.join("views/cart/cart.js"), "/* @module cart */\ncart();").unwrap();
    fs::write(root.join("views/list/list.js"), "/* @module list */\nlist();").unwrap();
    fs::write(
        root.join("views/cart/tests/cart_test.js"),
        "YUI.add('cart-tests', function (Y) {});",
    )
    .unwrap();
    dir
}

fn router(dir: &TempDir) -> Router {
    let state = DevState::load(dir.path(), Environment::Dev, Some(0)).unwrap();
    build_router(Arc::new(state))
}

async fn get(router: Router, uri: &str) -> (StatusCode, String, Vec<u8>) {
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string())
        .unwrap_or_default();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, content_type, body.to_vec())
}

#[tokio::test]
async fn root_serves_the_shell_page() {
    let dir = app();
    let root = get(router(&dir), "/").await;
    let index = get(router(&dir), "/index.html").await;
    assert_eq!(root, index);
    assert_eq!(root.0, StatusCode::OK);
    assert_eq!(root.2, b"<base href=\"/\"><h1>shop</h1>");
}

#[tokio::test]
async fn fixture_beats_the_file_on_disk() {
    let dir = app();
    let (status, content_type, body) = get(router(&dir), "/views/cart/cart.js").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type, "application/javascript");
    assert_eq!(body, b"mocked();");

    let (_, _, body) = get(router(&dir), "/api/cart?id=3").await;
    assert_eq!(body, br#"{"items":[]}"#);
}

#[tokio::test]
async fn other_files_compile_on_demand() {
    let dir = app();
    let (status, content_type, body) = get(router(&dir), "/views/list/list.js").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type, "application/javascript");
    assert!(String::from_utf8(body).unwrap().starts_with("YUI.add('list'"));

    let (status, _, _) = get(router(&dir), "/views/list/missing.js").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn fixture_edits_apply_without_restart() {
    let dir = app();
    let router = router(&dir);
    fs::write(dir.path().join("kiln.toml"), "").unwrap();
    let (_, _, body) = get(router, "/views/cart/cart.js").await;
    assert!(String::from_utf8(body).unwrap().starts_with("YUI.add('cart'"));
}

#[tokio::test]
async fn logerror_is_always_an_empty_png() {
    let dir = app();
    for uri in ["/logerror?%7B%22msg%22%3A%22x%22%7D", "/logerror?garbage", "/logerror"] {
        let (status, content_type, body) = get(router(&dir), uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type, "image/png");
        assert!(body.is_empty());
    }
}

#[tokio::test]
async fn harness_lists_view_tests() {
    let dir = app();
    let (status, content_type, body) = get(router(&dir), "/__unittests/auto").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type, "text/html; charset=utf-8");
    let html = String::from_utf8(body).unwrap();
    assert!(html.contains("<script src=\"/views/cart/tests/cart_test.js\"></script>"));
    assert!(html.contains(r#"["cart-tests"]"#));
}

#[tokio::test]
async fn test_without_module_id_is_a_server_error() {
    let dir = app();
    fs::write(dir.path().join("views/cart/tests/broken.js"), "describe('x');").unwrap();
    let (status, _, body) = get(router(&dir), "/__unittests").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(String::from_utf8(body).unwrap().contains("broken.js"));
}

#[tokio::test]
async fn missing_framework_suite_is_a_server_error() {
    let dir = app();
    let (status, _, _) = get(router(&dir), "/__unittests/framework").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn coverage_asset_missing_is_empty() {
    let dir = app();
    let (status, _, body) = get(router(&dir), "/coverage/lcov-report/index.html").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
}

#[tokio::test]
async fn report_reaches_the_ci_runner() {
    let dir = app();
    let (tx, mut rx) = mpsc::channel(1);
    let state = DevState::load(dir.path(), Environment::Tests, Some(0))
        .unwrap()
        .with_report_sink(tx);
    let router = build_router(Arc::new(state));

    let response = router
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/__unittests/report/")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"failed":1,"passed":4,"total":5}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        rx.recv().await.unwrap(),
        TestReport {
            failed: 1,
            passed: 4,
            total: 5
        }
    );
}

#[tokio::test]
async fn report_without_a_ci_run_is_not_found() {
    let dir = app();
    let response = router(&dir)
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/__unittests/report")
                .body(Body::from(r#"{"failed":0}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
