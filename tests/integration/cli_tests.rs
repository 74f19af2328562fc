use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

const FAST_CONFIG: &str = r#"
[timing]
verification_delay_ms = 20
connection_test_delay_ms = 20
save_verification_delay_ms = 20
health_check_interval_ms = 60000
"#;

fn fast_config() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(FAST_CONFIG.as_bytes()).unwrap();
    file
}

#[allow(deprecated)]
fn uihealth() -> Command {
    let mut cmd = Command::cargo_bin("uihealth").unwrap();
    cmd.env_remove("UIHEALTH_GITHUB_TOKEN")
        .env_remove("UIHEALTH_AUTO_REPORTING")
        .env_remove("UIHEALTH_AUTO_FIX");
    cmd
}

#[test]
fn test_cli_version() {
    uihealth().arg("--version").assert().success();
}

#[test]
fn test_cli_help() {
    uihealth()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("simulate"));
}

#[test]
fn test_cli_check_healthy() {
    uihealth()
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("Health: OK"));
}

#[test]
fn test_cli_check_missing_capability_json() {
    uihealth()
        .args(["check", "--scenario", "missing-capability", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("closeSettings function is not defined"));
}

#[test]
fn test_cli_simulate_unresponsive_settings() {
    let config = fast_config();
    uihealth()
        .arg("--config")
        .arg(config.path())
        .args(["simulate", "--scenario", "unresponsive-settings"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Issue: [Auto-Detected] Settings button not working after auto-fix attempts",
        ))
        .stdout(predicate::str::contains("Auto-fix attempts [settingsButton]: 3"));
}

#[test]
fn test_cli_simulate_removed_modal_json() {
    let config = fast_config();
    let output = uihealth()
        .arg("--config")
        .arg(config.path())
        .args(["simulate", "--scenario", "removed-modal", "--clicks", "1", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["scenario"], "removed-modal");
    let filed = report["filedIssues"].as_array().unwrap();
    assert!(filed
        .iter()
        .any(|t| t == "[Auto-Detected] Critical UI element removed: settingsModal"));
}

#[test]
fn test_cli_config_masks_token() {
    uihealth()
        .env("UIHEALTH_GITHUB_TOKEN", "ghp_supersecret000000000000")
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("settingsFab"))
        .stdout(predicate::str::contains("ghp_supersecret").not());
}

#[test]
fn test_cli_invalid_config_exit_code() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"[limits]\ncritical_error_threshold = 0\n")
        .unwrap();
    uihealth()
        .arg("--config")
        .arg(file.path())
        .arg("config")
        .assert()
        .code(2);
}

#[test]
fn test_cli_unknown_scenario_rejected() {
    uihealth()
        .args(["simulate", "--scenario", "nonsense"])
        .assert()
        .failure();
}
