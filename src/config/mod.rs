//! Configuration Management
//!
//! Loads and manages monitor configuration from TOML files.
//! Configuration includes:
//! - Timing (verification delays, health-check interval)
//! - Limits (auto-fix attempts, critical-error threshold)
//! - Feature toggles (auto-fix, telemetry, auto-reporting)
//! - Interaction record retention
//! - Identifiers of the monitored UI surface
//! - Issue tracker connection
//!
//! The loaded configuration is wrapped in an `Arc` by the monitor and is
//! never mutated afterwards.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::MonitorError;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MonitorConfig {
    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub features: FeatureToggles,

    #[serde(default)]
    pub retention: RetentionConfig,

    #[serde(default)]
    pub elements: ElementIds,

    #[serde(default)]
    pub tracker: TrackerConfig,
}

/// Delays and intervals, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimingConfig {
    /// Wait before checking that a click produced its effect
    #[serde(default = "default_verification_delay")]
    pub verification_delay_ms: u64,
    /// Extra wait for the asynchronous connection test
    #[serde(default = "default_connection_test_delay")]
    pub connection_test_delay_ms: u64,
    /// Extra wait before checking that a settings save closed the modal
    #[serde(default = "default_save_verification_delay")]
    pub save_verification_delay_ms: u64,
    /// Period of the checklist re-validation
    #[serde(default = "default_health_check_interval")]
    pub health_check_interval_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            verification_delay_ms: default_verification_delay(),
            connection_test_delay_ms: default_connection_test_delay(),
            save_verification_delay_ms: default_save_verification_delay(),
            health_check_interval_ms: default_health_check_interval(),
        }
    }
}

impl TimingConfig {
    pub fn verification_delay(&self) -> Duration {
        Duration::from_millis(self.verification_delay_ms)
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_millis(self.health_check_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LimitsConfig {
    #[serde(default = "default_max_auto_fix_attempts")]
    pub max_auto_fix_attempts: u32,
    #[serde(default = "default_critical_error_threshold")]
    pub critical_error_threshold: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_auto_fix_attempts: default_max_auto_fix_attempts(),
            critical_error_threshold: default_critical_error_threshold(),
        }
    }
}

/// Boolean toggles set once at startup.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeatureToggles {
    #[serde(default = "default_true")]
    pub auto_fix: bool,
    #[serde(default = "default_true")]
    pub telemetry: bool,
    #[serde(default = "default_true")]
    pub auto_reporting: bool,
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self {
            auto_fix: true,
            telemetry: true,
            auto_reporting: true,
        }
    }
}

/// Bounds on how many interaction records are kept alive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetentionConfig {
    #[serde(default = "default_max_records")]
    pub max_records: usize,
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_records: default_max_records(),
            max_age_secs: default_max_age_secs(),
        }
    }
}

/// Stable identifiers of the monitored surface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ElementIds {
    #[serde(default = "default_settings_trigger")]
    pub settings_trigger: String,
    #[serde(default = "default_settings_modal")]
    pub settings_modal: String,
    #[serde(default = "default_chat_trigger")]
    pub chat_trigger: String,
    #[serde(default = "default_chat_panel")]
    pub chat_panel: String,
    #[serde(default = "default_connection_result")]
    pub connection_result: String,
    #[serde(default = "default_open_settings")]
    pub open_settings: String,
    #[serde(default = "default_close_settings")]
    pub close_settings: String,
}

impl Default for ElementIds {
    fn default() -> Self {
        Self {
            settings_trigger: default_settings_trigger(),
            settings_modal: default_settings_modal(),
            chat_trigger: default_chat_trigger(),
            chat_panel: default_chat_panel(),
            connection_result: default_connection_result(),
            open_settings: default_open_settings(),
            close_settings: default_close_settings(),
        }
    }
}

impl ElementIds {
    /// Elements whose absence makes core functionality unreachable, in check order.
    pub fn critical_checklist(&self) -> Vec<(&str, &'static str)> {
        vec![
            (self.settings_trigger.as_str(), "Settings button"),
            (self.settings_modal.as_str(), "Settings modal"),
            (self.chat_trigger.as_str(), "Chat button"),
            (self.chat_panel.as_str(), "Chat panel"),
        ]
    }

    /// Elements whose unexpected removal is a structural failure.
    pub fn structurally_monitored(&self) -> Vec<String> {
        vec![self.settings_modal.clone(), self.settings_trigger.clone()]
    }

    /// Global capabilities that must stay callable.
    pub fn required_capabilities(&self) -> Vec<&str> {
        vec![self.open_settings.as_str(), self.close_settings.as_str()]
    }
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackerConfig {
    /// `owner/name` of the repository issues are filed against
    #[serde(default = "default_repo")]
    pub repo: String,
    pub token: Option<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_tracker_timeout")]
    pub timeout_secs: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            repo: default_repo(),
            token: None,
            api_base: default_api_base(),
            timeout_secs: default_tracker_timeout(),
        }
    }
}

impl std::fmt::Debug for TrackerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackerConfig")
            .field("repo", &self.repo)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_true() -> bool {
    true
}
fn default_verification_delay() -> u64 {
    500
}
fn default_connection_test_delay() -> u64 {
    2000
}
fn default_save_verification_delay() -> u64 {
    1000
}
fn default_health_check_interval() -> u64 {
    5000
}
fn default_max_auto_fix_attempts() -> u32 {
    3
}
fn default_critical_error_threshold() -> u32 {
    3
}
fn default_max_records() -> usize {
    1000
}
fn default_max_age_secs() -> u64 {
    600
}
fn default_settings_trigger() -> String {
    "settingsFab".to_string()
}
fn default_settings_modal() -> String {
    "settingsModal".to_string()
}
fn default_chat_trigger() -> String {
    "chatFab".to_string()
}
fn default_chat_panel() -> String {
    "chatPanel".to_string()
}
fn default_connection_result() -> String {
    "dbTestResult".to_string()
}
fn default_open_settings() -> String {
    "openSettings".to_string()
}
fn default_close_settings() -> String {
    "closeSettings".to_string()
}
fn default_repo() -> String {
    "uihealth/uihealth".to_string()
}
fn default_api_base() -> String {
    "https://api.github.com".to_string()
}
fn default_tracker_timeout() -> u64 {
    30
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl MonitorConfig {
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(p) => {
                let content = std::fs::read_to_string(p)
                    .with_context(|| format!("Failed to read config from {}", p))?;
                toml::from_str(&content).context("Failed to parse config")?
            }
            None => {
                let home_config = dirs::home_dir()
                    .map(|h| h.join(".config/uihealth/config.toml"))
                    .and_then(|p| p.to_str().map(String::from));

                let mut default_paths: Vec<&str> = vec!["uihealth.toml"];
                let home_config_str: String;
                if let Some(ref hc) = home_config {
                    home_config_str = hc.clone();
                    default_paths.push(&home_config_str);
                }

                let mut loaded = None;
                for p in &default_paths {
                    if let Ok(content) = std::fs::read_to_string(p) {
                        loaded = Some(toml::from_str(&content).context("Failed to parse config")?);
                        break;
                    }
                }
                loaded.unwrap_or_else(|| {
                    tracing::debug!("No config file found, using defaults");
                    Self::default()
                })
            }
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Apply `UIHEALTH_*` overrides using the given variable lookup.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("UIHEALTH_GITHUB_TOKEN") {
            if !token.trim().is_empty() {
                self.tracker.token = Some(token);
            }
        }
        if let Some(repo) = lookup("UIHEALTH_GITHUB_REPO") {
            self.tracker.repo = repo;
        }
        if let Some(flag) = lookup("UIHEALTH_AUTO_FIX").as_deref().and_then(parse_flag) {
            self.features.auto_fix = flag;
        }
        if let Some(flag) = lookup("UIHEALTH_AUTO_REPORTING")
            .as_deref()
            .and_then(parse_flag)
        {
            self.features.auto_reporting = flag;
        }
        if let Some(flag) = lookup("UIHEALTH_TELEMETRY").as_deref().and_then(parse_flag) {
            self.features.telemetry = flag;
        }
    }

    pub fn validate(&self) -> std::result::Result<(), MonitorError> {
        if self.limits.max_auto_fix_attempts == 0 {
            return Err(MonitorError::Config(
                "limits.max_auto_fix_attempts must be at least 1".into(),
            ));
        }
        if self.limits.critical_error_threshold == 0 {
            return Err(MonitorError::Config(
                "limits.critical_error_threshold must be at least 1".into(),
            ));
        }
        if self.timing.health_check_interval_ms == 0 {
            return Err(MonitorError::Config(
                "timing.health_check_interval_ms must be greater than 0".into(),
            ));
        }
        if self.retention.max_records == 0 {
            return Err(MonitorError::Config(
                "retention.max_records must be at least 1".into(),
            ));
        }
        if !self.tracker.repo.contains('/') {
            return Err(MonitorError::Config(format!(
                "tracker.repo must be 'owner/name', got '{}'",
                self.tracker.repo
            )));
        }
        Ok(())
    }
}
