//! Interaction classification

use serde::{Deserialize, Serialize};

use super::remediation::{CHAT_BUTTON, SETTINGS_BUTTON, TEST_CONNECTION};
use crate::config::ElementIds;
use crate::host::TargetDescriptor;

/// Click-target classification. Only monitored categories get a
/// verification check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionCategory {
    SettingsOpen,
    ChatOpen,
    ConnectionTest,
    SettingsSave,
    Unmonitored,
}

impl ActionCategory {
    /// Classify a click target.
    ///
    /// Exact trigger ids win. Then the visible label (description plus
    /// text) is matched, most specific first, so "Save Settings" is a save
    /// and not a settings-open.
    pub fn classify(target: &TargetDescriptor, ids: &ElementIds) -> Self {
        if target.id == ids.settings_trigger {
            return Self::SettingsOpen;
        }
        if target.id == ids.chat_trigger {
            return Self::ChatOpen;
        }

        let label = format!("{} {}", target.description(), target.text);
        if label.contains("Test Connection") {
            Self::ConnectionTest
        } else if label.contains("Save") && label.contains("Settings") {
            Self::SettingsSave
        } else if label.contains("Settings") {
            Self::SettingsOpen
        } else if label.contains("Chat") {
            Self::ChatOpen
        } else {
            Self::Unmonitored
        }
    }

    /// Remediation target repaired when verification of this category fails.
    pub fn remediation_target(self) -> Option<&'static str> {
        match self {
            Self::SettingsOpen => Some(SETTINGS_BUTTON),
            Self::ChatOpen => Some(CHAT_BUTTON),
            Self::ConnectionTest => Some(TEST_CONNECTION),
            Self::SettingsSave | Self::Unmonitored => None,
        }
    }

    pub fn is_monitored(self) -> bool {
        self != Self::Unmonitored
    }
}

impl std::fmt::Display for ActionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SettingsOpen => write!(f, "settings-open"),
            Self::ChatOpen => write!(f, "chat-open"),
            Self::ConnectionTest => write!(f, "connection-test"),
            Self::SettingsSave => write!(f, "settings-save"),
            Self::Unmonitored => write!(f, "unmonitored"),
        }
    }
}
