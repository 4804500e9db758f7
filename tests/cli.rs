//! Integration tests for the CLI interface of the `bb2gh` tool.
//!
//! Validates configuration loading, stdin and file processing, the
//! `--in-place` flag, and the `--report` summary.

use std::{
    fs,
    path::{Path, PathBuf},
};

use tempfile::tempdir;

#[macro_use]
mod prelude;
use prelude::*;

fn write_config(dir: &Path) -> PathBuf {
    let path = dir.join("migration.json");
    fs::write(
        &path,
        r#"{
            "bitbucket": {"workspace": "workspace", "repo": "repo"},
            "github": {"owner": "owner", "repo": "repo"},
            "issues": {"123": 456, "789": 1001},
            "pull_requests": {"45": 200},
            "users": {"jdoe": "jdoe-gh"}
        }"#,
    )
    .expect("failed to write config");
    path
}

#[test]
fn cli_requires_a_config() {
    Command::cargo_bin("bb2gh")
        .expect("failed to create cargo command for bb2gh")
        .assert()
        .failure();
}

#[test]
fn cli_in_place_requires_files() {
    let dir = tempdir().expect("failed to create temporary directory");
    let config = write_config(dir.path());
    Command::cargo_bin("bb2gh")
        .expect("failed to create cargo command for bb2gh")
        .arg("--config")
        .arg(&config)
        .arg("--in-place")
        .assert()
        .failure();
}

#[test]
fn cli_version_flag() {
    Command::cargo_bin("bb2gh")
        .expect("failed to create cargo command for bb2gh")
        .arg("--version")
        .assert()
        .success()
        .stdout(format!("bb2gh {}\n", env!("CARGO_PKG_VERSION")));
}

#[test]
fn cli_fails_on_missing_config() {
    Command::cargo_bin("bb2gh")
        .expect("failed to create cargo command for bb2gh")
        .arg("--config")
        .arg("/nonexistent/migration.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load"));
}

#[test]
fn cli_rewrites_stdin() {
    let dir = tempdir().expect("failed to create temporary directory");
    let config = write_config(dir.path());
    Command::cargo_bin("bb2gh")
        .expect("failed to create cargo command for bb2gh")
        .arg("--config")
        .arg(&config)
        .write_stdin("see https://bitbucket.org/workspace/repo/issues/123 now\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("[#456](https://github.com/owner/repo/issues/456)"));
}

#[test]
fn cli_rewrites_a_file_to_stdout() {
    let dir = tempdir().expect("failed to create temporary directory");
    let config = write_config(dir.path());
    let file = dir.path().join("body.md");
    fs::write(&file, "[a bug](https://bitbucket.org/workspace/repo/issues/789)\n")
        .expect("failed to write body");
    Command::cargo_bin("bb2gh")
        .expect("failed to create cargo command for bb2gh")
        .arg("--config")
        .arg(&config)
        .arg(&file)
        .assert()
        .success()
        .stdout("[a bug](https://github.com/owner/repo/issues/1001)\n");
}

#[test]
fn cli_rewrites_in_place() {
    let dir = tempdir().expect("failed to create temporary directory");
    let config = write_config(dir.path());
    let file = dir.path().join("body.md");
    fs::write(&file, "see #123 and @jdoe\n").expect("failed to write body");
    Command::cargo_bin("bb2gh")
        .expect("failed to create cargo command for bb2gh")
        .arg("--config")
        .arg(&config)
        .arg("--in-place")
        .arg(&file)
        .assert()
        .success();
    let rewritten = fs::read_to_string(&file).expect("failed to read body");
    assert!(rewritten.contains("[#456](https://github.com/owner/repo/issues/456)"));
    assert!(rewritten.contains("@jdoe-gh"));
}

#[test]
fn cli_in_place_is_idempotent() {
    let dir = tempdir().expect("failed to create temporary directory");
    let config = write_config(dir.path());
    let file = dir.path().join("body.md");
    fs::write(&file, "see https://bitbucket.org/workspace/repo/issues/123\n")
        .expect("failed to write body");
    for _ in 0..2 {
        Command::cargo_bin("bb2gh")
            .expect("failed to create cargo command for bb2gh")
            .arg("--config")
            .arg(&config)
            .arg("--in-place")
            .arg(&file)
            .assert()
            .success();
    }
    let once = fs::read_to_string(&file).expect("failed to read body");
    Command::cargo_bin("bb2gh")
        .expect("failed to create cargo command for bb2gh")
        .arg("--config")
        .arg(&config)
        .arg("--in-place")
        .arg(&file)
        .assert()
        .success();
    assert_eq!(fs::read_to_string(&file).expect("failed to read body"), once);
}

#[test]
fn cli_processes_multiple_files_in_order() {
    let dir = tempdir().expect("failed to create temporary directory");
    let config = write_config(dir.path());
    let mut files = Vec::new();
    let mut expected = String::new();
    for i in 0..4 {
        let path = dir.path().join(format!("file{i}.md"));
        fs::write(&path, format!("file {i}: #123\n")).expect("failed to write body");
        expected.push_str(&format!(
            "file {i}: [#456](https://github.com/owner/repo/issues/456) *(was BB `#123`)*\n"
        ));
        files.push(path);
    }
    let mut cmd = Command::cargo_bin("bb2gh").expect("failed to create cargo command for bb2gh");
    cmd.arg("--config").arg(&config);
    for file in &files {
        cmd.arg(file);
    }
    cmd.assert().success().stdout(expected);
}

#[test]
fn cli_report_goes_to_stderr() {
    let dir = tempdir().expect("failed to create temporary directory");
    let config = write_config(dir.path());
    Command::cargo_bin("bb2gh")
        .expect("failed to create cargo command for bb2gh")
        .arg("--config")
        .arg(&config)
        .arg("--report")
        .write_stdin("see https://bitbucket.org/workspace/repo/issues/123\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("1 rewritten, 0 unhandled"));
}
