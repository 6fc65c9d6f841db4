//! End-to-end runs of the `kiln` binary.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn kiln() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_kiln"));
    cmd.env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn sample_app() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "kiln.toml", "[minify]\nenabled = false\n");
    write(
        root,
        "framework/framework.json",
        r#"{"name": "kiln", "version": "2.1.0"}"#,
    );
    write(root, "index.html", "<base href=\"{$basepath}/\">");
    write(root, "views/cart/cart.js", "/* @module cart */\ncart();");
    dir
}

#[test]
fn help_lists_commands() {
    kiln()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("dev"))
        .stdout(predicate::str::contains("ci"));
}

#[test]
fn build_writes_a_named_tree() {
    let dir = sample_app();
    kiln()
        .args(["build", "--name", "r1", "--cwd"])
        .arg(dir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Build r1 finished"));

    let out = dir.path().join("build");
    assert!(out.join("r1/views/cart/cart.js").is_file());
    assert!(out.join("r1/build_config.json").is_file());
    assert_eq!(
        fs::read_to_string(out.join("index.html")).unwrap(),
        "<base href=\"/r1/\">"
    );
}

#[test]
fn duplicate_build_name_fails() {
    let dir = sample_app();
    kiln()
        .args(["build", "--name", "r1", "--cwd"])
        .arg(dir.path())
        .assert()
        .success();
    kiln()
        .args(["build", "--name", "r1", "--cwd"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn build_without_framework_metadata_fails() {
    let dir = sample_app();
    fs::remove_file(dir.path().join("framework/framework.json")).unwrap();
    kiln()
        .args(["build", "--cwd"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("framework.json"));
    assert!(!dir.path().join("build").exists());
}

#[test]
fn dev_refuses_incomplete_https() {
    let dir = sample_app();
    write(
        dir.path(),
        "kiln.toml",
        "port = 0\n[https]\nkey = \"key.pem\"\n",
    );
    kiln()
        .args(["dev", "--cwd"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("https.cert"));
}
