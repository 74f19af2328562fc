//! Unit tests for the config module
//!
//! Tests cover:
//! - Loading TOML files with partial sections
//! - Environment overrides
//! - Validation failures and their exit codes

use std::collections::HashMap;
use std::io::Write;
use tempfile::NamedTempFile;
use uihealth::config::MonitorConfig;
use uihealth::errors::{get_exit_code, EXIT_CONFIG_ERROR};

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_partial_file_keeps_defaults() {
    let file = write_config(
        r#"
[timing]
verification_delay_ms = 250

[features]
auto_reporting = false
"#,
    );
    let config = MonitorConfig::load(file.path().to_str()).unwrap();

    assert_eq!(config.timing.verification_delay_ms, 250);
    assert_eq!(config.timing.connection_test_delay_ms, 2000);
    assert!(!config.features.auto_reporting);
    assert!(config.features.auto_fix);
    assert_eq!(config.limits.max_auto_fix_attempts, 3);
    assert_eq!(config.elements.settings_trigger, "settingsFab");
}

#[test]
fn test_load_custom_element_ids() {
    let file = write_config(
        r#"
[elements]
settings_trigger = "prefsButton"
settings_modal = "prefsDialog"
"#,
    );
    let config = MonitorConfig::load(file.path().to_str()).unwrap();
    assert_eq!(
        config.elements.structurally_monitored(),
        vec!["prefsDialog".to_string(), "prefsButton".to_string()]
    );
    assert_eq!(config.elements.chat_trigger, "chatFab");
}

#[test]
fn test_load_missing_file_fails() {
    let result = MonitorConfig::load(Some("/nonexistent/uihealth/config.toml"));
    assert!(result.is_err());
}

#[test]
fn test_invalid_limits_map_to_config_exit_code() {
    let file = write_config(
        r#"
[limits]
max_auto_fix_attempts = 0
"#,
    );
    let err = MonitorConfig::load(file.path().to_str()).unwrap_err();
    assert_eq!(get_exit_code(&err), EXIT_CONFIG_ERROR);
}

#[test]
fn test_malformed_toml_maps_to_config_exit_code() {
    let file = write_config("[timing\nverification_delay_ms = ");
    let err = MonitorConfig::load(file.path().to_str()).unwrap_err();
    assert_eq!(get_exit_code(&err), EXIT_CONFIG_ERROR);
}

#[test]
fn test_env_overrides_apply_over_file_values() {
    let mut config = MonitorConfig::default();
    let env: HashMap<&str, &str> = [
        ("UIHEALTH_GITHUB_TOKEN", "ghp_fromenvironment000000"),
        ("UIHEALTH_GITHUB_REPO", "acme/desktop"),
        ("UIHEALTH_AUTO_FIX", "off"),
        ("UIHEALTH_TELEMETRY", "not-a-flag"),
    ]
    .into_iter()
    .collect();
    config.apply_env_overrides(|k| env.get(k).map(|v| v.to_string()));

    assert_eq!(
        config.tracker.token.as_deref(),
        Some("ghp_fromenvironment000000")
    );
    assert_eq!(config.tracker.repo, "acme/desktop");
    assert!(!config.features.auto_fix);
    // Unparseable flags leave the value unchanged
    assert!(config.features.telemetry);
}

#[test]
fn test_debug_output_hides_token() {
    let mut config = MonitorConfig::default();
    config.tracker.token = Some("ghp_verysecretvalue1234567".into());
    let debug = format!("{:?}", config);
    assert!(!debug.contains("ghp_verysecretvalue1234567"));
}
