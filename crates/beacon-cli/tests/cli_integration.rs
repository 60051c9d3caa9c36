//! Integration tests for the beacon binary.

use std::io::Write;
use std::process::{Command, Output};

use tempfile::NamedTempFile;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{contents}").unwrap();
    file.flush().unwrap();
    file
}

fn beacon(config: &NamedTempFile, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_beacon"))
        .arg("--config")
        .arg(config.path())
        .args(args)
        .env_remove("BEACON_APP_KEY")
        .env_remove("BEACON_FLUSH_INTERVAL_SECS")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run beacon")
}

fn json_lines(output: &Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("stdout line is not JSON"))
        .collect()
}

#[test]
fn test_track_prints_flushed_envelope() {
    let config = config_file(
        r#"
app_key = "A-DEV-0000000000"
debug = true
app_build_number = "7"
"#,
    );

    let output = beacon(
        &config,
        &["track", "app_started", "-p", "plan=pro", "-p", "seats=3"],
    );

    assert!(
        output.status.success(),
        "track failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let envelopes = json_lines(&output);
    assert_eq!(envelopes.len(), 1);
    let envelope = &envelopes[0];
    assert_eq!(envelope["eventName"], "app_started");
    assert_eq!(envelope["props"]["plan"], "pro");
    assert_eq!(envelope["props"]["seats"], 3);
    assert_eq!(envelope["systemProps"]["isDebug"], true);
    assert_eq!(envelope["systemProps"]["appBuildNumber"], "7");
    assert!(
        envelope["sessionId"]
            .as_str()
            .is_some_and(|id| id.chars().all(|c| c.is_ascii_digit()))
    );
}

#[test]
fn test_track_without_app_key_fails() {
    let config = config_file(r#"base_url = "http://localhost:3000""#);

    let output = beacon(&config, &["track", "app_started"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid app key"), "unexpected error: {stderr}");
    assert!(output.stdout.is_empty());
}

#[test]
fn test_track_rejects_malformed_property() {
    let config = config_file(r#"app_key = "A-DEV-0000000000""#);

    let output = beacon(&config, &["track", "app_started", "-p", "plan"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Use key=value"));
}

#[test]
fn test_heartbeat_emits_every_beat_once() {
    let config = config_file(
        r#"
app_key = "A-DEV-0000000000"
flush_interval_secs = 0.05
"#,
    );

    let output = beacon(&config, &["heartbeat", "--count", "3", "--every", "0.1"]);

    assert!(
        output.status.success(),
        "heartbeat failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let mut beats: Vec<u64> = json_lines(&output)
        .iter()
        .map(|envelope| {
            assert_eq!(envelope["eventName"], "heartbeat");
            envelope["props"]["beat"].as_u64().unwrap()
        })
        .collect();
    beats.sort_unstable();
    assert_eq!(beats, vec![1, 2, 3]);
}

#[test]
fn test_env_overrides_config_file() {
    let config = config_file(r#"app_key = "A-DEV-0000000000""#);

    let output = Command::new(env!("CARGO_BIN_EXE_beacon"))
        .arg("--config")
        .arg(config.path())
        .args(["track", "from_env"])
        .env_remove("BEACON_APP_KEY")
        .env_remove("BEACON_FLUSH_INTERVAL_SECS")
        .env_remove("RUST_LOG")
        .env("BEACON_APP_VERSION", "9.9.9")
        .output()
        .expect("Failed to run beacon");

    assert!(output.status.success());
    let envelopes = json_lines(&output);
    assert_eq!(envelopes[0]["systemProps"]["appVersion"], "9.9.9");
}

#[test]
fn test_session_prints_decoded_id() {
    let output = Command::new(env!("CARGO_BIN_EXE_beacon"))
        .arg("session")
        .output()
        .expect("Failed to run beacon");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("Session ID: "));
    assert!(stdout.contains("Minted at:"));
}
