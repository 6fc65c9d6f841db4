//! End-to-end builds over small application trees.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use kiln_build::{
    BUILD_CONFIG_FILE, BuildError, BuildManifest, BuildOptions, BuildState, Builder, SequenceIds,
};
use kiln_config::ConfigError;
use tempfile::TempDir;
use walkdir::WalkDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn sample_app() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(
        root,
        "framework/framework.json",
        r#"{ "name": "kiln", "version": "2.1.0", "copyright": "MIT" }"#,
    );
    write(root, "framework/core/loader.js", "/* @module loader */\nboot();\n");
    write(root, "framework/core/core_config.js", "var secret = 1;\n");
    write(
        root,
        "index.html",
        "<script src=\"{$basepath}/framework/core/loader.js\"></script>\n",
    );
    write(root, "locales/en.json", "{\n  \"hello\": \"Hello\"\n}\n");
    write(
        root,
        "views/cart/cart.js",
        "/**\n * @module cart\n * @requires loader, ys_i18n\n */\nvar v = '{$framework_version}';\n",
    );
    write(root, "views/cart/cart.css", ".cart { color: red; }\n");
    write(root, "views/cart/cart.tpl.html", "<div>{{items}}</div>\n");
    write(root, "views/cart/tests/cart_test.js", "/* @module cart_test */\n");
    write(root, "views/cart/img/logo.png", "\u{89}PNG");
    write(root, "config/routes.js", "/* @module routes */\nroute('/item/{$id}');\n");
    write(root, "config/config.js", "var local = true;\n");
    write(root, "plugins/promo/promo.js", "promo();\n");
    dir
}

fn options(root: &Path) -> BuildOptions {
    BuildOptions::new(root).with_ids(Arc::new(SequenceIds::starting_at(1000)))
}

fn tree(dir: &Path) -> BTreeMap<String, Vec<u8>> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .map(Result::unwrap)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(dir).unwrap();
            let key = rel.to_string_lossy().replace('\\', "/");
            (key, fs::read(e.path()).unwrap())
        })
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn ignored_files_are_counted_but_not_written() {
    let app = sample_app();
    let builder = Builder::init(options(app.path()).with_name("alpha")).unwrap();
    let report = builder.build().await.unwrap();

    let out = app.path().join("build/alpha");
    assert!(!out.join("config/config.js").exists());
    assert!(!out.join("framework/core/core_config.js").exists());
    assert!(!out.join("views/cart/tests/cart_test.js").exists());
    assert!(!out.join("views/cart/cart.tpl.html").exists());
    assert_eq!(report.skipped, 4);

    // 11 source files plus the entry page.
    assert_eq!(report.units, 12);
    assert_eq!(report.written + report.skipped + report.failed + 1, report.units);
    assert!(report.entry_written);
    assert_eq!(builder.state(), BuildState::Done);
}

#[tokio::test]
async fn output_is_compiled_per_class() {
    let app = sample_app();
    let builder = Builder::init(options(app.path()).with_name("alpha")).unwrap();
    builder.build().await.unwrap();
    let out = app.path().join("build/alpha");

    let cart = fs::read_to_string(out.join("views/cart/cart.js")).unwrap();
    assert!(cart.starts_with("YUI.add('cart', function(Y) {"));
    assert!(cart.contains("var v = '2.1.0';"));
    assert!(cart.ends_with(r#"}, '1.0', {requires: ["loader","ys_i18n"]});"#));

    let routes = fs::read_to_string(out.join("config/routes.js")).unwrap();
    assert!(routes.starts_with("YUI.add('routes'"));
    assert!(routes.contains("route('/item/{$id}');"));

    assert_eq!(
        fs::read_to_string(out.join("locales/en.json")).unwrap(),
        r#"{"hello":"Hello"}"#
    );
    assert_eq!(
        fs::read_to_string(out.join("plugins/promo/promo.js")).unwrap(),
        "promo();\n"
    );
    assert_eq!(fs::read(out.join("views/cart/img/logo.png")).unwrap(), "\u{89}PNG".as_bytes());

    let shell = fs::read_to_string(app.path().join("build/index.html")).unwrap();
    assert_eq!(
        shell,
        "<script src=\"/alpha/framework/core/loader.js\"></script>\n"
    );

    let manifest: BuildManifest =
        serde_json::from_slice(&fs::read(out.join(BUILD_CONFIG_FILE)).unwrap()).unwrap();
    assert_eq!(
        manifest.modules.keys().collect::<Vec<_>>(),
        vec!["cart", "routes"]
    );
    assert_eq!(manifest.locales, vec!["en"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn distinct_names_produce_identical_trees() {
    let app = sample_app();
    Builder::init(options(app.path()).with_name("alpha"))
        .unwrap()
        .build()
        .await
        .unwrap();
    Builder::init(options(app.path()).with_name("beta"))
        .unwrap()
        .build()
        .await
        .unwrap();

    let alpha = tree(&app.path().join("build/alpha"));
    let beta = tree(&app.path().join("build/beta"));
    assert!(!alpha.is_empty());
    assert_eq!(alpha, beta);
}

#[tokio::test]
async fn duplicate_name_is_rejected() {
    let app = sample_app();
    Builder::init(options(app.path()).with_name("alpha"))
        .unwrap()
        .build()
        .await
        .unwrap();
    let before = tree(&app.path().join("build/alpha"));

    let err = Builder::init(options(app.path()).with_name("alpha"))
        .unwrap()
        .build()
        .await
        .unwrap_err();
    assert!(matches!(err, BuildError::DuplicateBuildName { ref name, .. } if name == "alpha"));
    assert_eq!(tree(&app.path().join("build/alpha")), before);
}

#[tokio::test]
async fn a_builder_runs_once() {
    let app = sample_app();
    let builder = Builder::init(options(app.path())).unwrap();
    builder.build().await.unwrap();
    assert!(matches!(
        builder.build().await,
        Err(BuildError::AlreadyBuilt(_))
    ));
}

#[test]
fn missing_framework_metadata_is_fatal_before_any_write() {
    let app = sample_app();
    fs::remove_file(app.path().join("framework/framework.json")).unwrap();

    let err = Builder::init(options(app.path())).unwrap_err();
    assert!(matches!(
        err,
        BuildError::Config(ConfigError::FrameworkMetaUnreadable { .. })
    ));
    assert!(!app.path().join("build").exists());
}

#[test]
fn malformed_framework_metadata_is_fatal() {
    let app = sample_app();
    write(app.path(), "framework/framework.json", "{ \"name\": ");
    let err = Builder::init(options(app.path())).unwrap_err();
    assert!(matches!(
        err,
        BuildError::Config(ConfigError::FrameworkMetaInvalid { .. })
    ));
}

#[tokio::test]
async fn stale_generated_builds_are_removed() {
    let app = sample_app();
    for stale in ["100", "200"] {
        write(app.path(), &format!("build/{stale}/old.js"), "old");
    }
    write(app.path(), "build/release/keep.js", "keep");

    let builder = Builder::init(options(app.path())).unwrap();
    let report = builder.build().await.unwrap();

    assert_eq!(report.name, "1000");
    let build = app.path().join("build");
    assert!(!build.join("100").exists());
    assert!(!build.join("200").exists());
    assert!(build.join("release/keep.js").exists());
    assert!(build.join("1000/views/cart/cart.js").exists());
}

#[tokio::test]
async fn state_transitions_are_observable() {
    let app = sample_app();
    let builder = Builder::init(options(app.path())).unwrap();
    let mut states = builder.subscribe();
    assert_eq!(*states.borrow_and_update(), BuildState::Enumerating);

    builder.build().await.unwrap();
    assert!(states.has_changed().unwrap());
    assert_eq!(*states.borrow_and_update(), BuildState::Done);
}

#[tokio::test]
async fn banners_follow_scope() {
    let app = sample_app();
    write(
        app.path(),
        "kiln.toml",
        r#"
[copyright]
name = "Shop"
version = "4.0"
banner = ["\\.js$"]
"#,
    );
    let builder = Builder::init(options(app.path()).with_name("stamped")).unwrap();
    let report = builder.build().await.unwrap();
    let out = app.path().join("build/stamped");

    let loader = fs::read_to_string(out.join("framework/core/loader.js")).unwrap();
    assert!(loader.starts_with("/*! kiln v2.1.0 | MIT */\n"));
    let cart = fs::read_to_string(out.join("views/cart/cart.js")).unwrap();
    assert!(cart.starts_with("/*! Shop v4.0 */\nYUI.add('cart'"));
    let css = fs::read_to_string(out.join("views/cart/cart.css")).unwrap();
    assert!(!css.starts_with("/*!"));
    assert!(report.banners >= 4);
}
