//! Integration tests for the `battwatch` CLI binary.
//!
//! These tests validate argument parsing, help output, configuration
//! handling, and the one-shot status report -- the latter against a
//! mock automation server, so no real one is required.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use chrono::Local;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `battwatch` binary with env isolation.
///
/// Points config directories at a nonexistent path and clears all
/// `BATTWATCH_*` env vars so tests never touch the user's real
/// configuration.
fn battwatch_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("battwatch");
    cmd.env("HOME", "/tmp/battwatch-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/battwatch-cli-test-nonexistent")
        .env("XDG_DATA_HOME", "/tmp/battwatch-cli-test-nonexistent")
        .env("NO_COLOR", "1")
        .env_remove("BATTWATCH_CONFIG")
        .env_remove("BATTWATCH_SERVER__URL")
        .env_remove("BATTWATCH_SERVER__TIMEOUT_SECS")
        .env_remove("BATTWATCH_MONITOR__EMPTY_LEVEL")
        .env_remove("BATTWATCH_PLAN__NAME");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn write_config(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    std::fs::write(&path, body).unwrap();
    path
}

fn device_json(id: &str, name: &str, level: f64) -> serde_json::Value {
    json!({
        "HardwareTypeVal": 15,
        "HardwareID": 2,
        "HardwareType": "Zigbee bridge",
        "ID": id,
        "Name": name,
        "BatteryLevel": level,
        "LastUpdate": Local::now().naive_local().format("%Y-%m-%d %H:%M:%S").to_string(),
        "Type": "Temp"
    })
}

async fn mount_devices(server: &MockServer, result: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/json.htm"))
        .and(query_param("type", "devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "title": "Devices",
            "result": result
        })))
        .mount(server)
        .await;
}

/// Run the binary on a blocking thread so the mock server stays live.
async fn run_against(server: &MockServer, args: &[&str]) -> std::process::Output {
    let uri = server.uri();
    let args: Vec<String> = args.iter().map(ToString::to_string).collect();
    tokio::task::spawn_blocking(move || {
        let mut cmd = battwatch_cmd();
        cmd.args(["--server", &uri]);
        cmd.args(&args);
        cmd.output().unwrap()
    })
    .await
    .unwrap()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn no_args_shows_help() {
    let output = battwatch_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(
        text.contains("Usage"),
        "Expected 'Usage' in output:\n{text}"
    );
}

#[test]
fn help_lists_the_commands() {
    battwatch_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("battery")
            .and(predicate::str::contains("run"))
            .and(predicate::str::contains("status"))
            .and(predicate::str::contains("check-config")),
    );
}

#[test]
fn version_flag() {
    battwatch_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("battwatch"));
}

#[test]
fn invalid_subcommand_fails() {
    let output = battwatch_cmd().arg("foobar").output().unwrap();
    assert!(
        !output.status.success(),
        "Expected failure for invalid subcommand"
    );
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("invalid") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

// ── check-config ────────────────────────────────────────────────────

#[test]
fn check_config_prints_the_defaults() {
    battwatch_cmd().arg("check-config").assert().success().stdout(
        predicate::str::contains("http://127.0.0.1:8080")
            .and(predicate::str::contains("empty_level"))
            .and(predicate::str::contains("Batteries")),
    );
}

#[test]
fn check_config_reads_an_explicit_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        "[server]\nurl = \"http://10.0.0.9:8080\"\n\n[plan]\nname = \"Cellar\"\n",
    );

    battwatch_cmd()
        .args(["--config", path.to_str().unwrap(), "check-config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("10.0.0.9").and(predicate::str::contains("Cellar")));
}

#[test]
fn environment_overrides_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "[server]\nurl = \"http://10.0.0.9:8080\"\n");

    battwatch_cmd()
        .args(["--config", path.to_str().unwrap(), "check-config"])
        .env("BATTWATCH_SERVER__URL", "http://env.example:8080")
        .assert()
        .success()
        .stdout(predicate::str::contains("env.example"));
}

#[test]
fn server_flag_overrides_everything() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "[server]\nurl = \"http://10.0.0.9:8080\"\n");

    battwatch_cmd()
        .args([
            "--config",
            path.to_str().unwrap(),
            "--server",
            "http://flag.example:8080",
            "check-config",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("flag.example"));
}

#[test]
fn invalid_url_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "[server]\nurl = \"not a url\"\n");

    let output = battwatch_cmd()
        .args(["--config", path.to_str().unwrap(), "check-config"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected usage exit code");
    let text = combined_output(&output);
    assert!(
        text.contains("server.url"),
        "Expected the failing field in output:\n{text}"
    );
}

// ── status ──────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn status_renders_a_battery_table() {
    let server = MockServer::start().await;
    mount_devices(
        &server,
        json!([
            device_json("00124b0000aaaa", "Door sensor", 80.0),
            device_json("00124b0000bbbb", "Thermostat", 12.0),
        ]),
    )
    .await;

    let output = run_against(&server, &["status"]).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Zigbee: Door sensor"), "{stdout}");
    assert!(stdout.contains("80.0%"), "{stdout}");
    assert!(stdout.contains("12.0%"), "{stdout}");
    assert!(stdout.contains("empty-soon"), "{stdout}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn status_orders_by_level_when_asked() {
    let server = MockServer::start().await;
    mount_devices(
        &server,
        json!([
            device_json("00124b0000aaaa", "Door sensor", 80.0),
            device_json("00124b0000bbbb", "Thermostat", 12.0),
        ]),
    )
    .await;

    let output = run_against(&server, &["status", "--by-level"]).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let thermostat = stdout.find("Zigbee: Thermostat").unwrap();
    let door = stdout.find("Zigbee: Door sensor").unwrap();
    assert!(
        thermostat < door,
        "Expected the emptier battery first:\n{stdout}"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn status_reports_an_empty_listing() {
    let server = MockServer::start().await;
    mount_devices(&server, json!([])).await;

    let output = run_against(&server, &["status"]).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("No battery-reporting devices"), "{stdout}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn server_side_rejection_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json.htm"))
        .and(query_param("type", "devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ERR",
            "title": "Devices"
        })))
        .mount(&server)
        .await;

    let output = run_against(&server, &["status"]).await;
    assert_eq!(output.status.code(), Some(1), "{}", combined_output(&output));
    let text = combined_output(&output);
    assert!(text.contains("rejected"), "{text}");
}

#[test]
fn unreachable_server_exits_with_the_connection_code() {
    let output = battwatch_cmd()
        .args(["--server", "http://127.0.0.1:9", "--timeout", "2", "status"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(7), "Expected connection exit code");
    let text = combined_output(&output);
    assert!(
        text.contains("Could not reach"),
        "Expected a connection diagnostic:\n{text}"
    );
}
