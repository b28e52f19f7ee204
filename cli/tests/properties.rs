use assert_cmd::Command;
use std::path::Path;
use std::process::Output;
use tempfile::TempDir;

fn k3sctl(properties: &Path, args: &[&str]) -> Output {
    Command::cargo_bin("k3sctl")
        .unwrap()
        .env_remove("RUST_LOG")
        .arg("--properties-file")
        .arg(properties)
        .args(args)
        .output()
        .unwrap()
}

/// Runs `k3sctl`, requires success and returns its stdout.
fn stdout(properties: &Path, args: &[&str]) -> String {
    let output = k3sctl(properties, args);
    assert!(output.status.success(), "{:?}", output);
    String::from_utf8(output.stdout).unwrap()
}

#[test]
fn global_value_is_reported() {
    let dir = TempDir::new().unwrap();
    let properties = dir.path().join("properties.json");

    stdout(&properties, &["set", "--global", "namespace", "apps"]);
    let value = stdout(&properties, &["report", "--property", "namespace"]);
    assert_eq!(value, "apps\n");
}

#[test]
fn app_report_falls_back_to_global_and_default() {
    let dir = TempDir::new().unwrap();
    let properties = dir.path().join("properties.json");

    stdout(&properties, &["set", "--global", "deploy-timeout", "600s"]);
    stdout(
        &properties,
        &["set", "--app", "node-js-app", "namespace", "web"],
    );

    let report = stdout(
        &properties,
        &["report", "--app", "node-js-app", "--format", "json"],
    );
    let report: serde_json::Value = serde_json::from_str(&report).unwrap();
    assert_eq!(report["namespace"], "web");
    assert_eq!(report["deploy-timeout"], "600s");
    assert_eq!(report["rollback-on-failure"], "");
    assert!(report.get("token").is_none());
}

#[test]
fn missing_value_clears_property() {
    let dir = TempDir::new().unwrap();
    let properties = dir.path().join("properties.json");

    stdout(&properties, &["set", "--global", "network-interface", "ens5"]);
    stdout(&properties, &["set", "--global", "network-interface"]);
    let value = stdout(&properties, &["report", "--property", "network-interface"]);
    assert_eq!(value, "eth0\n");
}

#[test]
fn global_only_property_is_rejected_for_app() {
    let dir = TempDir::new().unwrap();
    let properties = dir.path().join("properties.json");

    let output = k3sctl(
        &properties,
        &["set", "--app", "node-js-app", "token", "0a1b2c3d4e"],
    );
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(
        stderr.contains("cannot be set for app 'node-js-app'"),
        "{}",
        stderr
    );
    assert!(!properties.exists());
}

#[test]
fn set_requires_a_scope() {
    let dir = TempDir::new().unwrap();
    let properties = dir.path().join("properties.json");

    for args in [
        &["set", "namespace", "apps"][..],
        &["set", "--global", "--app", "node-js-app", "namespace", "apps"][..],
        &["set", "--global", "not-a-property", "x"][..],
    ] {
        let output = k3sctl(&properties, args);
        assert!(!output.status.success(), "{:?}", args);
    }
    assert!(!properties.exists());
}

#[test]
fn properties_file_can_come_from_environment() {
    let dir = TempDir::new().unwrap();
    let properties = dir.path().join("properties.json");

    Command::cargo_bin("k3sctl")
        .unwrap()
        .env("K3SCTL_PROPERTIES_FILE", &properties)
        .args(["set", "--global", "letsencrypt-email-prod", "ops@example.com"])
        .assert()
        .success();
    let value = stdout(&properties, &["report", "--property", "letsencrypt-email-prod"]);
    assert_eq!(value, "ops@example.com\n");
}
